use dnsbatch_domain::Resolution;
use serde::Serialize;

/// Metadata attached to every submitted name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineMeta {
    pub line: usize,
}

/// Turns finished resolutions into JSON lines.
#[derive(Debug, Default)]
pub struct ResultFormatter {
    sort: bool,
    skip_empty: bool,
    rendered: usize,
    skipped: usize,
}

impl ResultFormatter {
    pub fn new(sort: bool, skip_empty: bool) -> Self {
        Self {
            sort,
            skip_empty,
            ..Self::default()
        }
    }

    /// Renders one resolution, or `None` when it is filtered out.
    pub fn render(
        &mut self,
        mut resolution: Resolution<LineMeta>,
    ) -> serde_json::Result<Option<String>> {
        if self.skip_empty && resolution.is_empty() {
            self.skipped += 1;
            return Ok(None);
        }
        if self.sort {
            resolution.sort_answers();
        }

        let mut line = serde_json::to_string(&resolution)?;
        line.push('\n');
        self.rendered += 1;
        Ok(Some(line))
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
