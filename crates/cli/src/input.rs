use dnsbatch_domain::reverse_name;
use std::net::IpAddr;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

/// Opens `path`, or stdin when no path is given.
pub async fn open(path: Option<&str>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .await
                .map_err(|e| anyhow::anyhow!("cannot open {}: {}", path, e))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Reads the next name to resolve along with its 1-based line number.
pub async fn next_name<R>(
    lines: &mut io::Lines<R>,
    line_no: &mut usize,
    ptr: bool,
) -> anyhow::Result<Option<(usize, String)>>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        *line_no += 1;
        if let Some(name) = parse_line(&line, ptr) {
            return Ok(Some((*line_no, name)));
        }
    }
    Ok(None)
}

/// Extracts the name from one input line. Blank lines and `#` comments yield
/// nothing; with `ptr`, IP addresses become their reverse lookup names.
pub fn parse_line(line: &str, ptr: bool) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if ptr {
        if let Ok(ip) = line.parse::<IpAddr>() {
            return Some(reverse_name(ip));
        }
    }
    Some(line.to_string())
}
