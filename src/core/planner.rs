//! Range planning: splits a resource into contiguous byte ranges, one per worker.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{DownloadError, DownloadResult};

/// Half-open byte interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Range` header value. HTTP ranges are inclusive on both ends, so an
    /// empty range has no header form.
    pub fn header_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("bytes={}-{}", self.start, self.end - 1))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.start, self.end, self.len())
    }
}

/// Partitions `[0, content_length)` into `workers` ranges.
pub fn plan(content_length: u64, workers: usize) -> DownloadResult<Vec<ByteRange>> {
    plan_span(ByteRange::new(0, content_length), workers)
}

/// Partitions an arbitrary window into `workers` ranges.
///
/// Every range is clamped to the window, so when there are more workers than
/// bytes the trailing ranges come out empty rather than inverted.
pub fn plan_span(span: ByteRange, workers: usize) -> DownloadResult<Vec<ByteRange>> {
    if workers == 0 {
        return Err(DownloadError::InvalidPartition("worker count must be positive".to_string()));
    }
    if span.end < span.start {
        return Err(DownloadError::InvalidPartition(format!(
            "window end {} precedes start {}",
            span.end, span.start
        )));
    }

    let chunk = span.len().div_ceil(workers as u64);
    let ranges = (0..workers as u64)
        .map(|i| {
            let start = span.start.saturating_add(i * chunk).min(span.end);
            let end = span.start.saturating_add((i + 1) * chunk).min(span.end);
            ByteRange::new(start, end)
        })
        .collect();
    Ok(ranges)
}

/// Renders ranges the way the outcome detail lists them.
pub fn describe(ranges: &[ByteRange]) -> String {
    ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
