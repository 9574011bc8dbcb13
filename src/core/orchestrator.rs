//! Drives one index run: probe, plan, fetch-commit and report, one URL at a time.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::fs::OpenOptions;

use super::engine::{fetch_and_commit, FetchSettings};
use super::error::{DownloadError, DownloadResult};
use super::http::{ResourceLocator, Transport};
use super::index::fetch_index;
use super::planner::{describe, plan, plan_span, ByteRange};
use super::probe::probe;
use crate::ui::ProgressManager;

/// How each listed file is downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// Whole file with a single request
    Whole,
    /// Only `[lower, upper)`; files of at most `lower` bytes are skipped
    Bounded { lower: u64, upper: u64 },
    /// Whole file split across `workers` concurrent range requests
    Parallel { workers: usize },
}

impl DownloadMode {
    pub fn validate(&self) -> DownloadResult<()> {
        match *self {
            DownloadMode::Bounded { lower, upper } if lower >= upper => Err(DownloadError::InvalidPartition(
                format!("range {}-{} is empty", lower, upper),
            )),
            DownloadMode::Parallel { workers: 0 } => Err(DownloadError::InvalidPartition(
                "worker count must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl FromStr for DownloadMode {
    type Err = DownloadError;

    /// `lower-upper` selects bounded mode, a bare number the worker count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mode = match s.split_once('-') {
            Some((lower, upper)) => DownloadMode::Bounded {
                lower: lower.trim().parse().map_err(|_| bad_mode(s))?,
                upper: upper.trim().parse().map_err(|_| bad_mode(s))?,
            },
            None => DownloadMode::Parallel { workers: s.parse().map_err(|_| bad_mode(s))? },
        };
        mode.validate()?;
        Ok(mode)
    }
}

fn bad_mode(s: &str) -> DownloadError {
    DownloadError::InvalidPartition(format!("expected `lower-upper` or a worker count, got {:?}", s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    NotFound,
    SkippedTooSmall,
    Downloaded,
    RangeDownloaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub url: String,
    pub status: OutcomeStatus,
    pub detail: String,
    /// Bytes appended to the output file
    pub bytes: u64,
}

impl DownloadOutcome {
    fn new(url: &str, status: OutcomeStatus, detail: String, bytes: u64) -> Self {
        Self { url: url.to_string(), status, detail, bytes }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.url, self.detail)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub mode: DownloadMode,
    pub output_dir: PathBuf,
    pub head_budget: usize,
    pub index_budget: usize,
    pub fetch: FetchSettings,
    /// Remove an existing destination before writing instead of appending to it
    pub truncate_existing: bool,
}

pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    options: DownloadOptions,
    progress: ProgressManager,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, options: DownloadOptions, progress: ProgressManager) -> Self {
        Self { transport, options, progress }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Fetches the index and downloads every listed file in order.
    ///
    /// Only an unusable mode or a failed index fetch is an error; per-file
    /// problems come back as outcomes. `on_outcome` sees each outcome as soon
    /// as its download finishes.
    pub async fn run<F>(&self, index_url: &str, mut on_outcome: F) -> DownloadResult<Vec<DownloadOutcome>>
    where
        F: FnMut(usize, &DownloadOutcome),
    {
        self.options.mode.validate()?;
        let urls = self.fetch_index(index_url).await?;

        let mut outcomes = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let outcome = self.process_download(url).await;
            on_outcome(i + 1, &outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    pub async fn fetch_index(&self, index_url: &str) -> DownloadResult<Vec<String>> {
        fetch_index(
            self.transport.as_ref(),
            index_url,
            self.options.index_budget,
            self.options.fetch.matching,
        )
        .await
    }

    /// Downloads one URL. Never fails; errors become a `Failed` outcome.
    pub async fn process_download(&self, url: &str) -> DownloadOutcome {
        match self.try_download(url).await {
            Ok(outcome) => {
                log::info!("{}", outcome);
                outcome
            }
            Err(e) => {
                log::warn!("download of {} failed: {}", url, e);
                DownloadOutcome::new(url, OutcomeStatus::Failed, format!("failed: {}", e), 0)
            }
        }
    }

    async fn try_download(&self, url: &str) -> DownloadResult<DownloadOutcome> {
        let locator = ResourceLocator::parse(url)?;
        let probed = probe(
            self.transport.as_ref(),
            &locator,
            self.options.head_budget,
            self.options.fetch.matching,
        )
        .await?;
        if !probed.exists {
            return Ok(DownloadOutcome::new(url, OutcomeStatus::NotFound, "is not found".to_string(), 0));
        }
        let len = probed.content_length;

        let (ranges, status, detail) = match self.options.mode {
            DownloadMode::Bounded { lower, .. } if len <= lower => {
                return Ok(DownloadOutcome::new(
                    url,
                    OutcomeStatus::SkippedTooSmall,
                    format!("(size = {}) is not downloaded", len),
                    0,
                ));
            }
            DownloadMode::Bounded { lower, upper } => {
                let window = ByteRange::new(lower, upper.min(len));
                (
                    plan_span(window, 1)?,
                    OutcomeStatus::RangeDownloaded,
                    format!("(range = {}-{}) is downloaded", window.start, window.end),
                )
            }
            DownloadMode::Whole => (
                plan(len, 1)?,
                OutcomeStatus::Downloaded,
                format!("(size = {}) is downloaded", len),
            ),
            DownloadMode::Parallel { workers } => {
                let ranges = plan(len, workers)?;
                let detail = format!("(size = {}) is downloaded\nFile parts: {}", len, describe(&ranges));
                (ranges, OutcomeStatus::Downloaded, detail)
            }
        };

        let path = self.output_path(&locator);
        let sink = self.open_output(&path).await?;
        let total: u64 = ranges.iter().map(ByteRange::len).sum();
        log::debug!("{} -> {} ({} ranges, {} bytes)", url, path.display(), ranges.len(), total);

        let bar = self.progress.start(&file_label(&path), total);
        let result = fetch_and_commit(
            Arc::clone(&self.transport),
            &locator,
            &ranges,
            sink,
            self.options.fetch,
            &bar,
        )
        .await;
        bar.finish_and_clear();
        result?;

        Ok(DownloadOutcome::new(url, status, detail, total))
    }

    /// Destination for `locator`: the last path segment under the output directory.
    pub fn output_path(&self, locator: &ResourceLocator) -> PathBuf {
        let name = locator
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| {
                let tag = uuid::Uuid::new_v4().simple().to_string();
                format!("download_{}_{}", chrono::Utc::now().timestamp(), &tag[..8])
            });
        self.options.output_dir.join(name)
    }

    async fn open_output(&self, path: &Path) -> DownloadResult<tokio::fs::File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if self.options.truncate_existing {
            match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(file)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
