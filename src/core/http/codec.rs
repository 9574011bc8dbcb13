//! HTTP/1.1 request building and response parsing.

use bytes::{Bytes, BytesMut, BufMut};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::locator::ResourceLocator;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::planner::ByteRange;

pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Head => f.write_str("HEAD"),
            Method::Get => f.write_str("GET"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequestSpec {
    pub method: Method,
    pub locator: ResourceLocator,
    pub range: Option<ByteRange>,
}

impl HttpRequestSpec {
    pub fn head(locator: ResourceLocator) -> Self {
        Self { method: Method::Head, locator, range: None }
    }

    pub fn get(locator: ResourceLocator) -> Self {
        Self { method: Method::Get, locator, range: None }
    }

    pub fn get_range(locator: ResourceLocator, range: ByteRange) -> Self {
        Self { method: Method::Get, locator, range: Some(range) }
    }
}

/// Serializes a request. No body is ever sent, and an empty range sends no
/// `Range` header.
pub fn build_request(spec: &HttpRequestSpec) -> Bytes {
    let mut buf = BytesMut::with_capacity(128);
    buf.put_slice(
        format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\n",
            spec.method, spec.locator.path, spec.locator.host
        )
        .as_bytes(),
    );
    if let Some(value) = spec.range.and_then(|r| r.header_value()) {
        buf.put_slice(format!("Range: {}\r\n", value).as_bytes());
    }
    buf.put_slice(b"\r\n");
    buf.freeze()
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_line: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Header lookup: exact key first, then case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    /// Three-digit code from the second token of the status line.
    pub fn status_code(&self) -> Option<u16> {
        self.status_line
            .split_whitespace()
            .nth(1)
            .filter(|code| code.len() == 3)
            .and_then(|code| code.parse().ok())
    }
}

/// Locates the end of the header block (index of the first `\r\n\r\n`).
pub fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(HEADER_TERMINATOR.len()).position(|w| w == HEADER_TERMINATOR)
}

/// Splits a raw response at the first blank line. Everything after it is the
/// body, byte for byte, whatever it contains.
pub fn parse_response(raw: Bytes) -> DownloadResult<HttpResponse> {
    let (head, body) = match find_header_end(&raw) {
        Some(idx) => (raw.slice(..idx), raw.slice(idx + HEADER_TERMINATOR.len()..)),
        None => (raw.clone(), Bytes::new()),
    };

    let head = String::from_utf8_lossy(&head);
    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default().trim().to_string();
    if !status_line.starts_with("HTTP/") {
        return Err(DownloadError::MalformedResponse(if status_line.is_empty() {
            "missing status line".to_string()
        } else {
            format!("unexpected status line {:?}", status_line)
        }));
    }

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.to_string(), value.trim().to_string());
        }
    }

    Ok(HttpResponse { status_line, headers, body })
}

/// How status lines are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMatching {
    /// Substring match on the whole status line (`"404"` anywhere means not found)
    #[default]
    Loose,
    /// Exact comparison of the parsed status code
    Strict,
}

impl StatusMatching {
    fn matches(&self, response: &HttpResponse, code: u16) -> bool {
        match self {
            StatusMatching::Loose => response.status_line.contains(&code.to_string()),
            StatusMatching::Strict => response.status_code() == Some(code),
        }
    }

    pub fn is_not_found(&self, response: &HttpResponse) -> bool {
        self.matches(response, 404)
    }

    pub fn is_success(&self, response: &HttpResponse) -> bool {
        self.matches(response, 200)
    }

    pub fn is_partial(&self, response: &HttpResponse) -> bool {
        self.matches(response, 206)
    }
}
