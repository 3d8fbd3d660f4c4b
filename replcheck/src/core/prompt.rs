//! Start-of-line prompt recognition.

use std::ops::Range;

use anyhow::{Context, Result, bail};
use regex::bytes::Regex;

/// Finds the interpreter prompt in accumulated output.
///
/// The marker only counts at the start of the buffer or right after a `\n`,
/// so program output that merely contains the marker text never ends a turn.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    marker: String,
    pattern: Regex,
}

impl PromptMatcher {
    pub fn new(marker: &str) -> Result<Self> {
        if marker.is_empty() {
            bail!("prompt marker must not be empty");
        }
        let pattern = Regex::new(&format!("(?m)^{}", regex::escape(marker)))
            .with_context(|| format!("compile prompt pattern for {marker:?}"))?;
        Ok(Self {
            marker: marker.to_string(),
            pattern,
        })
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Byte range of the first start-of-line prompt in `buf`.
    pub fn find(&self, buf: &[u8]) -> Option<Range<usize>> {
        self.pattern.find(buf).map(|m| m.range())
    }
}
