//! In-memory HTTP server standing in for the network in unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::error::{DownloadError, DownloadResult, TransportKind};
use super::http::{ReadLimit, ResourceLocator, Transport};

#[derive(Default)]
pub struct FakeTransport {
    files: HashMap<String, Vec<u8>>,
    raw: HashMap<String, Vec<u8>>,
    delays: HashMap<(String, u64), Duration>,
    failures: HashSet<(String, u64)>,
    ignore_range: bool,
    log: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), content);
        self
    }

    /// Serves `response` verbatim for every request to `path`.
    pub fn with_raw(mut self, path: &str, response: &[u8]) -> Self {
        self.raw.insert(path.to_string(), response.to_vec());
        self
    }

    /// Delays the ranged GET of `path` starting at `start`.
    pub fn with_delay(mut self, path: &str, start: u64, delay: Duration) -> Self {
        self.delays.insert((path.to_string(), start), delay);
        self
    }

    /// Fails the ranged GET of `path` starting at `start` with a reset.
    pub fn with_failure(mut self, path: &str, start: u64) -> Self {
        self.failures.insert((path.to_string(), start));
        self
    }

    /// Answers ranged GETs with the whole file and a 200.
    pub fn ignoring_range(mut self) -> Self {
        self.ignore_range = true;
        self
    }

    /// Requests seen for `path`, as `"HEAD"`, `"GET"` or `"GET bytes=a-b"`.
    pub fn requests_for(&self, path: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn respond(&self, method: &str, path: &str, range: Option<(u64, u64)>) -> Vec<u8> {
        if let Some(raw) = self.raw.get(path) {
            return raw.clone();
        }
        let Some(content) = self.files.get(path) else {
            return b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec();
        };

        let (status, body): (&str, &[u8]) = match range {
            Some((start, end)) if !self.ignore_range => {
                let end = (end as usize + 1).min(content.len());
                ("206 Partial Content", &content[start as usize..end])
            }
            _ => ("200 OK", &content[..]),
        };
        let mut out = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n\r\n", status, body.len()).into_bytes();
        if method != "HEAD" {
            out.extend_from_slice(body);
        }
        out
    }
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.trim().strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        _locator: &ResourceLocator,
        request: &[u8],
        _limit: ReadLimit,
    ) -> DownloadResult<Bytes> {
        let text = String::from_utf8_lossy(request).to_string();
        let mut lines = text.split("\r\n");
        let mut request_line = lines.next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        let range_value = lines.find_map(|l| l.strip_prefix("Range: ")).map(str::to_string);
        let range = range_value.as_deref().and_then(parse_range);

        let entry = match &range_value {
            Some(r) => format!("{} {}", method, r),
            None => method.clone(),
        };
        self.log.lock().unwrap().push((path.clone(), entry));

        if let Some((start, _)) = range {
            if let Some(delay) = self.delays.get(&(path.clone(), start)) {
                tokio::time::sleep(*delay).await;
            }
            if self.failures.contains(&(path.clone(), start)) {
                return Err(DownloadError::transport(TransportKind::Reset, "connection reset by peer"));
            }
        }

        Ok(Bytes::from(self.respond(&method, &path, range)))
    }
}
