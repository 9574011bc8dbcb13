use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::engine::FetchSettings;
use crate::core::error::DownloadError;
use crate::core::http::StatusMatching;
use crate::core::{DownloadMode, DownloadOptions};
use crate::utils::validator;

/// Settings file contents
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory downloaded files are written to
    pub download_dir: String,
    /// Range workers per file when no mode is given on the command line; 1 downloads whole files
    pub thread_count: usize,
    /// Read timeout per socket read (seconds)
    pub timeout: u64,
    /// Connect timeout (seconds)
    pub connect_timeout: u64,
    /// Receive budget for HEAD responses (bytes)
    pub head_budget: usize,
    /// Receive budget for the header block of ranged GETs, on top of the range length (bytes)
    pub header_budget: usize,
    /// Receive budget for the index document (bytes)
    pub index_budget: usize,
    /// Compare exact status codes instead of matching substrings of the status line
    pub strict_status: bool,
    /// Remove an existing destination file before downloading instead of appending
    pub truncate_existing: bool,
    /// Draw progress bars
    pub show_progress: bool,
    /// Run log file
    pub log_file: String,
    /// Log level: error, warn, info, debug, trace
    pub log_level: String,
    /// Rotate the run log past this size (bytes)
    pub log_max_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: ".".to_string(),
            thread_count: 1,
            timeout: 30,
            connect_timeout: 10,
            head_budget: 8192,
            header_budget: 8192,
            index_budget: 1024 * 1024,
            strict_status: false,
            truncate_existing: false,
            show_progress: true,
            log_file: "logs/indexfetch.log".to_string(),
            log_level: "info".to_string(),
            log_max_size: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if !Path::new(path).exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| DownloadError::Config(format!("{}: {}", path, e)))
    }

    /// Writes the config with a commented header explaining every field.
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::Config(format!("cannot serialize config: {}", e)))?;
        fs::write(path, format!("{}\n{}", Config::tutorial(), body))?;
        Ok(())
    }

    fn tutorial() -> &'static str {
        r#"# indexfetch configuration
# =========================
#
# TOML file. Command-line arguments override these values.
#
#   indexfetch example.com/index.txt            # whole files
#   indexfetch example.com/index.txt 4          # 4 range workers per file
#   indexfetch example.com/index.txt 100-2000   # bytes [100, 2000) of each file
#
# download_dir       directory files are written to (files are appended to,
#                    set truncate_existing = true to start from scratch)
# thread_count       range workers per file when no mode argument is given
# timeout            seconds a single socket read may take
# connect_timeout    seconds to resolve and connect
# head_budget        bytes read for a HEAD response
# header_budget      bytes allowed for headers on top of each range's length
# index_budget       bytes read for the index document
# strict_status      true compares exact status codes; false treats any status
#                    line containing "404" as not found and "200" as success
# show_progress      draw progress bars
# log_file           run log, rotated to <log_file>.backup past log_max_size
# log_level          error | warn | info | debug | trace
"#
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        let checks = [
            validator::validate_output_dir(&self.download_dir),
            validator::validate_worker_count(self.thread_count),
            validator::validate_budget("head_budget", self.head_budget),
            validator::validate_budget("header_budget", self.header_budget),
            validator::validate_budget("index_budget", self.index_budget),
        ];
        for check in checks {
            check.map_err(|e| DownloadError::Config(e.to_string()))?;
        }
        if self.timeout == 0 || self.connect_timeout == 0 {
            return Err(DownloadError::Config("timeouts must be greater than 0".to_string()));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(DownloadError::Config(format!("unknown log level {:?}", self.log_level)));
        }
        Ok(())
    }

    /// Command-line arguments take precedence over the file.
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(dir) = &args.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(timeout) = args.timeout {
            self.timeout = timeout;
        }
        if args.truncate {
            self.truncate_existing = true;
        }
        if args.strict_status {
            self.strict_status = true;
        }
        if args.no_progress {
            self.show_progress = false;
        }
    }

    pub fn status_matching(&self) -> StatusMatching {
        if self.strict_status { StatusMatching::Strict } else { StatusMatching::Loose }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Mode used when none is given on the command line.
    pub fn default_mode(&self) -> DownloadMode {
        if self.thread_count > 1 {
            DownloadMode::Parallel { workers: self.thread_count }
        } else {
            DownloadMode::Whole
        }
    }

    pub fn download_options(&self, mode: DownloadMode) -> DownloadOptions {
        DownloadOptions {
            mode,
            output_dir: PathBuf::from(&self.download_dir),
            head_budget: self.head_budget,
            index_budget: self.index_budget,
            fetch: FetchSettings {
                header_budget: self.header_budget,
                matching: self.status_matching(),
            },
            truncate_existing: self.truncate_existing,
        }
    }

    pub fn get_summary(&self) -> String {
        format!(
            "Configuration:\n\
            - download dir: {}\n\
            - workers per file: {}\n\
            - read timeout: {} s\n\
            - connect timeout: {} s\n\
            - status matching: {}\n\
            - existing files: {}",
            self.download_dir,
            self.thread_count,
            self.timeout,
            self.connect_timeout,
            if self.strict_status { "strict" } else { "loose" },
            if self.truncate_existing { "truncated" } else { "appended to" },
        )
    }
}
