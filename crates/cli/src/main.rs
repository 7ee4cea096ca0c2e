use clap::Parser;
use dnsbatch_domain::CliOverrides;
use dnsbatch_infrastructure::dns::resolver::ResolveError;
use dnsbatch_infrastructure::dns::{Resolver, UpstreamDispatcher};
use dnsbatch_jobs::QueueError;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

mod bootstrap;
mod input;
mod output;

use output::{LineMeta, ResultFormatter};

type BatchResolver = Resolver<UpstreamDispatcher, LineMeta>;

#[derive(Parser)]
#[command(name = "dnsbatch")]
#[command(version)]
#[command(about = "dnsbatch - Rate-limited bulk DNS resolution")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Upstream server, repeatable
    #[arg(short = 's', long = "server", value_name = "IP")]
    servers: Vec<IpAddr>,

    /// Record type to request, repeatable, resolved in the given order
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    record_types: Vec<String>,

    /// Concurrent workers
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Queries per second allowed against each server
    #[arg(short = 'r', long = "rate")]
    rate_limit: Option<u32>,

    /// Per-query timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    query_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Turn IP addresses into reverse lookup names; requests PTR unless
    /// types are given
    #[arg(long)]
    ptr: bool,

    /// Sort each answer list before printing
    #[arg(long)]
    sort: bool,

    /// Do not print names that resolved to no records at all
    #[arg(long)]
    skip_empty: bool,

    /// File with one name per line, stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut record_types = cli.record_types.clone();
    if cli.ptr && record_types.is_empty() {
        record_types.push("PTR".to_string());
    }

    let cli_overrides = CliOverrides {
        servers: cli.servers.clone(),
        record_types,
        workers: cli.workers,
        rate_limit: cli.rate_limit,
        query_timeout_secs: cli.query_timeout_secs,
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting dnsbatch v{}", env!("CARGO_PKG_VERSION"));

    let record_types = config.resolver.parsed_record_types()?;
    let resolver: Arc<BatchResolver> = Arc::new(Resolver::from_config(&config.resolver)?);
    resolver.start();

    let reader = input::open(cli.input.as_deref()).await?;
    let producer = tokio::spawn(submit_names(
        Arc::clone(&resolver),
        reader.lines(),
        record_types,
        cli.ptr,
    ));

    let started = Instant::now();
    let mut formatter = ResultFormatter::new(cli.sort, cli.skip_empty);
    let mut stdout = tokio::io::stdout();
    let mut abandoned = 0usize;

    while let Some(result) = resolver.next().await {
        match result {
            Ok(resolution) => {
                if let Some(line) = formatter.render(resolution)? {
                    stdout.write_all(line.as_bytes()).await?;
                }
            }
            Err(QueueError::Shutdown) => abandoned += 1,
            Err(e) => warn!(error = %e, "Result stream error"),
        }
    }
    stdout.flush().await?;

    let submitted = producer.await??;

    info!(
        submitted,
        printed = formatter.rendered(),
        skipped = formatter.skipped(),
        abandoned,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch complete"
    );

    Ok(())
}

/// Feeds every input name to the resolver, then waits for all of them and
/// closes it so the result stream ends.
async fn submit_names<R>(
    resolver: Arc<BatchResolver>,
    mut lines: tokio::io::Lines<R>,
    record_types: Vec<dnsbatch_domain::RecordType>,
    ptr: bool,
) -> anyhow::Result<usize>
where
    R: tokio::io::AsyncBufRead + Unpin + Send,
{
    let mut line_no = 0usize;
    let mut submitted = 0usize;

    let outcome = loop {
        let next = match input::next_name(&mut lines, &mut line_no, ptr).await {
            Ok(next) => next,
            Err(e) => break Err(e),
        };
        let Some((line, name)) = next else {
            break Ok(());
        };

        match resolver.add(&name, &record_types, LineMeta { line }).await {
            Ok(()) => submitted += 1,
            Err(ResolveError::Invalid(e)) => {
                warn!(line, name = %name, error = %e, "Skipping invalid name");
            }
            Err(ResolveError::Queue(e)) => break Err(e.into()),
        }
    };

    debug!(submitted, "All names submitted");
    resolver.wait().await;
    resolver.close().await;

    outcome.map(|_| submitted)
}
