use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

use crate::core::DownloadOutcome;

/// Machine-readable record of one run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub index_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<DownloadOutcome>,
}

impl RunReport {
    pub fn new(index_url: &str, started_at: DateTime<Utc>, outcomes: Vec<DownloadOutcome>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            index_url: index_url.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
