//! CLI: argument parsing and config resolution
//!
//! ```text
//! indexfetch <INDEX_URL>              download every listed file whole
//! indexfetch <INDEX_URL> 4            split each file across 4 range workers
//! indexfetch <INDEX_URL> 100-2000     download bytes [100, 2000) of each file
//! indexfetch --init-config            write a commented default config
//! ```

use clap::Parser;
use std::env;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::core::DownloadMode;
use crate::utils::validator;

/// Platform default config path
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/indexfetch/indexfetch.conf", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/indexfetch/indexfetch.conf", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/indexfetch/indexfetch.conf", home)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "indexfetch",
    version = env!("CARGO_PKG_VERSION"),
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("VERGEN_BUILD_TIMESTAMP"), ")"),
    about = "Download every file listed in an HTTP index, optionally with parallel range requests"
)]
pub struct Args {
    /// URL of the index document, one file URL per line
    #[arg(required_unless_present = "init_config")]
    pub index_url: Option<String>,

    /// `lower-upper` to fetch a byte window of each file, or a worker count to split each file
    pub mode: Option<DownloadMode>,

    /// Config file path
    #[arg(short = 'c', long, default_value_t = default_config_path())]
    pub config: String,

    /// Directory to write files to (overrides the config)
    #[arg(short = 'd', long)]
    pub download_dir: Option<String>,

    /// Read timeout in seconds (overrides the config)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Remove existing destination files instead of appending to them
    #[arg(long)]
    pub truncate: bool,

    /// Compare exact status codes instead of substrings of the status line
    #[arg(long)]
    pub strict_status: bool,

    /// Do not draw progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Write a JSON report of all outcomes to this path
    #[arg(long)]
    pub report: Option<String>,

    /// Write the default config (with comments) to the config path and exit
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parses the process arguments and resolves the effective config.
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();
        let config = args.resolve_config()?;
        Ok((args, config))
    }

    /// Loads the config file and applies argument overrides.
    pub fn resolve_config(&self) -> Result<Config, DownloadError> {
        if let Some(url) = self.index_url.as_deref().filter(|u| !validator::is_valid_url(u)) {
            return Err(DownloadError::InvalidUrl(url.to_string()));
        }
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    /// Mode from the command line, else the config's default.
    pub fn download_mode(&self, config: &Config) -> DownloadMode {
        self.mode.unwrap_or_else(|| config.default_mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["indexfetch", "example.com/index.txt"]).unwrap();
        assert_eq!(args.index_url.as_deref(), Some("example.com/index.txt"));
        assert!(args.mode.is_none());
    }

    #[test]
    fn test_mode_argument() {
        let args = Args::try_parse_from(["indexfetch", "example.com/index.txt", "3"]).unwrap();
        assert_eq!(args.mode, Some(DownloadMode::Parallel { workers: 3 }));

        let args = Args::try_parse_from(["indexfetch", "example.com/index.txt", "10-500"]).unwrap();
        assert_eq!(args.mode, Some(DownloadMode::Bounded { lower: 10, upper: 500 }));

        assert!(Args::try_parse_from(["indexfetch", "example.com/index.txt", "0"]).is_err());
        assert!(Args::try_parse_from(["indexfetch", "example.com/index.txt", "9-3"]).is_err());
    }

    #[test]
    fn test_index_url_required() {
        assert!(Args::try_parse_from(["indexfetch"]).is_err());
        assert!(Args::try_parse_from(["indexfetch", "--init-config"]).is_ok());
    }

    #[test]
    fn test_unusable_index_url_rejected() {
        let args = Args::try_parse_from(["indexfetch", "-c", "/nonexistent/x.conf", "https://example.com/i.txt"]).unwrap();
        assert!(matches!(args.resolve_config(), Err(DownloadError::InvalidUrl(_))));
    }

    #[test]
    fn test_overrides_applied() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("indexfetch.conf");
        std::fs::write(&conf, "thread_count = 4\ntimeout = 5\n").unwrap();

        let args = Args::try_parse_from([
            "indexfetch",
            "-c",
            conf.to_str().unwrap(),
            "-d",
            "out",
            "--truncate",
            "--strict-status",
            "example.com/index.txt",
        ])
        .unwrap();
        let config = args.resolve_config().unwrap();
        assert_eq!(config.download_dir, "out");
        assert_eq!(config.timeout, 5);
        assert!(config.truncate_existing);
        assert!(config.strict_status);
        assert_eq!(args.download_mode(&config), DownloadMode::Parallel { workers: 4 });
    }
}
