//! Core: the hand-rolled HTTP client, range planning, ordered fetch-commit and the per-index run

pub mod engine;
pub mod error;
pub mod http;
pub mod index;
pub mod orchestrator;
pub mod planner;
pub mod probe;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{fetch_and_commit, FetchSettings, RangeTask};
pub use error::{DownloadError, DownloadResult, TransportKind};
pub use orchestrator::{DownloadMode, DownloadOptions, DownloadOutcome, Orchestrator, OutcomeStatus};
pub use planner::{plan, plan_span, ByteRange};
pub use probe::{probe, ProbeResult};
