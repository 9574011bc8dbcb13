mod progress;
mod report;

use crossterm::style::Stylize;
use std::fmt;

use crate::core::{DownloadOutcome, OutcomeStatus};
pub use progress::ProgressManager;
pub use report::RunReport;

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// Prints `"<n>. <url> <detail>"`, coloured by outcome.
pub fn print_outcome(position: usize, outcome: &DownloadOutcome) {
    let line = format!("{}. {}", position, outcome);
    let line = match outcome.status {
        OutcomeStatus::Downloaded | OutcomeStatus::RangeDownloaded => line.green(),
        OutcomeStatus::SkippedTooSmall => line.yellow(),
        OutcomeStatus::NotFound | OutcomeStatus::Failed => line.red(),
    };
    println!("{}", line);
}

pub struct RunSummary {
    pub total_files: usize,
    pub total_size: u64,
    pub elapsed_time: std::time::Duration,
    pub downloaded: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[DownloadOutcome], elapsed_time: std::time::Duration) -> Self {
        let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            total_files: outcomes.len(),
            total_size: outcomes.iter().map(|o| o.bytes).sum(),
            elapsed_time,
            downloaded: count(OutcomeStatus::Downloaded) + count(OutcomeStatus::RangeDownloaded),
            skipped: count(OutcomeStatus::SkippedTooSmall),
            not_found: count(OutcomeStatus::NotFound),
            failed: count(OutcomeStatus::Failed),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nSummary:")?;
        writeln!(f, "  files in index: {}", self.total_files)?;
        writeln!(f, "  bytes written:  {}", format_size(self.total_size))?;
        writeln!(f, "  elapsed:        {:.2}s", self.elapsed_time.as_secs_f64())?;
        writeln!(f, "  downloaded:     {}", self.downloaded)?;
        writeln!(f, "  skipped:        {}", self.skipped)?;
        writeln!(f, "  not found:      {}", self.not_found)?;
        write!(f, "  failed:         {}", self.failed)
    }
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
