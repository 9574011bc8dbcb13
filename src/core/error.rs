use thiserror::Error;
use std::io;

/// Transport failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Name resolution failed
    Dns,
    /// Connection could not be established
    Connect,
    /// Peer reset the connection
    Reset,
    /// Connect or read exceeded the configured timeout
    Timeout,
    /// Any other socket error
    Io,
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("transport error ({kind:?}): {reason}")]
    Transport {
        kind: TransportKind,
        reason: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("missing or invalid Content-Length: {0}")]
    MissingLength(String),

    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("index could not be fetched: {0}")]
    IndexFetch(String),

    #[error("size mismatch: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error("commit chain broken before range {0}")]
    ChainBroken(usize),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl DownloadError {
    pub fn transport(kind: TransportKind, reason: impl Into<String>) -> Self {
        DownloadError::Transport { kind, reason: reason.into() }
    }

    /// Maps a socket error onto the transport taxonomy.
    pub fn from_socket(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => TransportKind::Reset,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::NotConnected => TransportKind::Connect,
            io::ErrorKind::TimedOut => TransportKind::Timeout,
            _ => TransportKind::Io,
        };
        DownloadError::transport(kind, err.to_string())
    }

    /// Worth retrying in principle. Nothing in this crate retries; the flag
    /// only separates resets and timeouts from terminal failures in reports.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::Transport { kind: TransportKind::Reset | TransportKind::Timeout, .. }
        )
    }

    /// Errors that invalidate the whole invocation rather than a single URL.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::InvalidPartition(_)
                | DownloadError::IndexFetch(_)
                | DownloadError::Config(_)
        )
    }
}

impl From<String> for DownloadError {
    fn from(error: String) -> Self {
        DownloadError::Unknown(error)
    }
}

impl From<&str> for DownloadError {
    fn from(error: &str) -> Self {
        DownloadError::Unknown(error.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
