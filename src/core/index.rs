//! Index document retrieval and URL extraction.

use regex::Regex;
use std::sync::OnceLock;

use super::error::{DownloadError, DownloadResult};
use super::http::{build_request, parse_response, HttpRequestSpec, ReadLimit, ResourceLocator, StatusMatching, Transport};

const URL_PATTERN: &str =
    r"^((http|https)://)?[a-zA-Z0-9./?:@\-_=#]+\.([a-zA-Z]){2,6}([a-zA-Z0-9.&/?:@\-_=#])*";

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("URL pattern is valid"))
}

/// Keeps, in order, every index line that looks like a URL.
pub fn extract_urls(body: &str) -> Vec<String> {
    body.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty() && url_regex().is_match(line))
        .map(str::to_string)
        .collect()
}

/// Downloads the index document. Any failure here ends the run.
pub async fn fetch_index<T: Transport + ?Sized>(
    transport: &T,
    index_url: &str,
    index_budget: usize,
    matching: StatusMatching,
) -> DownloadResult<Vec<String>> {
    let locator = ResourceLocator::parse(index_url)?;
    let request = build_request(&HttpRequestSpec::get(locator.clone()));
    let raw = transport
        .send(&locator, &request, ReadLimit::body(index_budget))
        .await
        .map_err(|e| DownloadError::IndexFetch(format!("{}: {}", index_url, e)))?;
    let response = parse_response(raw)
        .map_err(|e| DownloadError::IndexFetch(format!("{}: {}", index_url, e)))?;

    if !matching.is_success(&response) {
        return Err(DownloadError::IndexFetch(format!("{}: {}", index_url, response.status_line)));
    }
    // a listing cut short by the read budget would end in a partial URL
    if let Some(declared) = response.content_length() {
        if (response.body.len() as u64) < declared {
            return Err(DownloadError::IndexFetch(format!(
                "{}: got {} of {} bytes, raise index_budget",
                index_url,
                response.body.len(),
                declared
            )));
        }
    }

    let urls = extract_urls(&String::from_utf8_lossy(&response.body));
    log::info!("index {} lists {} files", index_url, urls.len());
    Ok(urls)
}
