use super::error::{DownloadError, DownloadResult};
use super::http::{build_request, parse_response, HttpRequestSpec, ReadLimit, ResourceLocator, StatusMatching, Transport};

/// Result of a HEAD request against a download target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub exists: bool,
    pub content_length: u64,
}

impl ProbeResult {
    pub fn not_found() -> Self {
        Self { exists: false, content_length: 0 }
    }
}

/// Issues a HEAD for `locator` and reads its declared size.
pub async fn probe<T: Transport + ?Sized>(
    transport: &T,
    locator: &ResourceLocator,
    head_budget: usize,
    matching: StatusMatching,
) -> DownloadResult<ProbeResult> {
    let request = build_request(&HttpRequestSpec::head(locator.clone()));
    let raw = transport.send(locator, &request, ReadLimit::headers(head_budget)).await?;
    let response = parse_response(raw)?;
    log::debug!("HEAD {} -> {}", locator, response.status_line);

    if matching.is_not_found(&response) {
        return Ok(ProbeResult::not_found());
    }

    let content_length = response.content_length().ok_or_else(|| {
        DownloadError::MissingLength(format!("{} ({})", locator, response.status_line))
    })?;
    Ok(ProbeResult { exists: true, content_length })
}
