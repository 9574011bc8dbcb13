//! One TCP connection per HTTP exchange.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::codec::{find_header_end, HEADER_TERMINATOR};
use super::locator::ResourceLocator;
use crate::core::error::{DownloadError, DownloadResult, TransportKind};

const READ_CHUNK: usize = 8192;

/// When to stop reading a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimit {
    /// Stop once this many bytes have arrived
    pub max_bytes: usize,
    /// Whether a body follows the header block (false for HEAD)
    pub expects_body: bool,
}

impl ReadLimit {
    pub fn headers(max_bytes: usize) -> Self {
        Self { max_bytes, expects_body: false }
    }

    pub fn body(max_bytes: usize) -> Self {
        Self { max_bytes, expects_body: true }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to `locator`'s host and returns the raw response bytes.
    async fn send(
        &self,
        locator: &ResourceLocator,
        request: &[u8],
        limit: ReadLimit,
    ) -> DownloadResult<Bytes>;
}

/// Plain TCP transport. Every call opens and closes its own connection.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self { connect_timeout, read_timeout }
    }

    async fn connect(&self, locator: &ResourceLocator) -> DownloadResult<TcpStream> {
        let target = (locator.host_name(), locator.port());
        let addrs: Vec<_> = match timeout(self.connect_timeout, tokio::net::lookup_host(target)).await {
            Ok(Ok(addrs)) => addrs.collect(),
            Ok(Err(e)) => {
                return Err(DownloadError::transport(
                    TransportKind::Dns,
                    format!("cannot resolve {}: {}", locator.host_name(), e),
                ))
            }
            Err(_) => {
                return Err(DownloadError::transport(
                    TransportKind::Timeout,
                    format!("resolving {} timed out", locator.host_name()),
                ))
            }
        };
        if addrs.is_empty() {
            return Err(DownloadError::transport(
                TransportKind::Dns,
                format!("no addresses for {}", locator.host_name()),
            ));
        }

        match timeout(self.connect_timeout, TcpStream::connect(&addrs[..])).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(DownloadError::from_socket(e)),
            Err(_) => Err(DownloadError::transport(
                TransportKind::Timeout,
                format!("connecting to {} timed out", locator.host),
            )),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(
        &self,
        locator: &ResourceLocator,
        request: &[u8],
        limit: ReadLimit,
    ) -> DownloadResult<Bytes> {
        let mut stream = self.connect(locator).await?;
        log::debug!("connected to {} ({} byte request)", locator.host, request.len());
        // the stream is dropped, and the socket closed, on every return path
        exchange(&mut stream, request, limit, self.read_timeout).await
    }
}

/// Writes `request` and reads until the peer closes, the declared body
/// boundary is reached, or `limit.max_bytes` have arrived.
pub async fn exchange<S>(
    stream: &mut S,
    request: &[u8],
    limit: ReadLimit,
    read_timeout: Duration,
) -> DownloadResult<Bytes>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await.map_err(DownloadError::from_socket)?;
    stream.flush().await.map_err(DownloadError::from_socket)?;

    let mut response = BytesMut::with_capacity(READ_CHUNK.min(limit.max_bytes.max(1)));
    let mut chunk = vec![0u8; READ_CHUNK];
    let mut boundary: Option<usize> = None;

    loop {
        if let Some(end) = boundary {
            if response.len() >= end {
                response.truncate(end);
                break;
            }
        }
        if response.len() >= limit.max_bytes {
            log::debug!("read budget of {} bytes reached", limit.max_bytes);
            break;
        }

        let n = match timeout(read_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(DownloadError::from_socket(e)),
            Err(_) => {
                return Err(DownloadError::transport(
                    TransportKind::Timeout,
                    format!("read timed out after {} bytes", response.len()),
                ))
            }
        };
        if n == 0 {
            break;
        }
        response.extend_from_slice(&chunk[..n]);

        if boundary.is_none() {
            boundary = declared_boundary(&response, limit.expects_body);
        }
    }

    Ok(response.freeze())
}

/// Total response size implied by the header block, once it is complete.
fn declared_boundary(raw: &[u8], expects_body: bool) -> Option<usize> {
    let header_end = find_header_end(raw)? + HEADER_TERMINATOR.len();
    if !expects_body {
        return Some(header_end);
    }
    let head = String::from_utf8_lossy(&raw[..header_end]);
    head.split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .map(|len| header_end + len)
}
