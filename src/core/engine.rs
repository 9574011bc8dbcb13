//! Concurrent range fetching with strictly ordered commits.
//!
//! Every range gets its own task and all fetches run at once. Commits are
//! serialized by handing the output sink itself down a chain of one-shot
//! channels: worker `i` receives the sink from worker `i - 1`, appends its
//! bytes, and sends the sink on to worker `i + 1`. Whoever holds the sink
//! holds the commit turn, so no two workers can write concurrently and the
//! file is always assembled in index order.

use bytes::Bytes;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::error::{DownloadError, DownloadResult};
use super::http::{build_request, parse_response, HttpRequestSpec, ReadLimit, ResourceLocator, StatusMatching, Transport};
use super::planner::ByteRange;

/// Per-download fetch settings
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    /// Extra receive budget on top of each range's length, for the header block
    pub header_budget: usize,
    pub matching: StatusMatching,
}

/// One worker's share of a download
#[derive(Debug, Clone)]
pub struct RangeTask {
    pub index: usize,
    pub locator: Arc<ResourceLocator>,
    pub range: ByteRange,
}

/// How a worker obtains the commit turn.
enum Turn<W> {
    /// First in line: holds the sink from the start
    Holding(W),
    /// Waits for the predecessor to hand the sink over
    After(oneshot::Receiver<W>),
}

/// Fetches a single range via a ranged GET and checks what came back.
pub async fn fetch_range<T: Transport + ?Sized>(
    transport: &T,
    task: &RangeTask,
    settings: FetchSettings,
) -> DownloadResult<Bytes> {
    let request = build_request(&HttpRequestSpec::get_range((*task.locator).clone(), task.range));
    let budget = task.range.len() as usize + settings.header_budget;
    let raw = transport.send(&task.locator, &request, ReadLimit::body(budget)).await?;
    let response = parse_response(raw)?;

    if !(settings.matching.is_partial(&response) || settings.matching.is_success(&response)) {
        return Err(DownloadError::ServerError(format!(
            "range {} of {}: {}",
            task.index, task.locator, response.status_line
        )));
    }
    if response.body.len() as u64 != task.range.len() {
        return Err(DownloadError::SizeMismatch {
            expected: task.range.len(),
            actual: response.body.len() as u64,
        });
    }
    Ok(response.body)
}

async fn run_worker<T, W>(
    transport: Arc<T>,
    task: RangeTask,
    settings: FetchSettings,
    turn: Turn<W>,
    done: oneshot::Sender<W>,
    progress: ProgressBar,
) -> DownloadResult<()>
where
    T: Transport + ?Sized,
    W: AsyncWrite + Unpin,
{
    let body = if task.range.is_empty() {
        Bytes::new()
    } else {
        let body = fetch_range(transport.as_ref(), &task, settings).await?;
        log::debug!("range {} ({}) fetched", task.index, task.range);
        body
    };

    let mut sink = match turn {
        Turn::Holding(sink) => sink,
        Turn::After(rx) => rx.await.map_err(|_| DownloadError::ChainBroken(task.index))?,
    };

    if !body.is_empty() {
        sink.write_all(&body).await?;
        sink.flush().await?;
        progress.inc(body.len() as u64);
        log::debug!("range {} committed", task.index);
    }

    // a closed channel means the successor already failed and reports that itself
    let _ = done.send(sink);
    Ok(())
}

/// Fetches all `ranges` of `locator` concurrently and appends them to `sink`
/// in ascending index order. Returns the sink once the last range has been
/// committed.
///
/// The first failing range aborts the download; ranges before it stay
/// committed.
pub async fn fetch_and_commit<T, W>(
    transport: Arc<T>,
    locator: &ResourceLocator,
    ranges: &[ByteRange],
    sink: W,
    settings: FetchSettings,
    progress: &ProgressBar,
) -> DownloadResult<W>
where
    T: Transport + ?Sized + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let locator = Arc::new(locator.clone());
    let mut turn = Turn::Holding(sink);
    let mut handles: Vec<JoinHandle<DownloadResult<()>>> = Vec::with_capacity(ranges.len());

    for (index, range) in ranges.iter().enumerate() {
        let (done, next) = oneshot::channel();
        let task = RangeTask { index, locator: Arc::clone(&locator), range: *range };
        let own_turn = std::mem::replace(&mut turn, Turn::After(next));
        handles.push(tokio::spawn(run_worker(
            Arc::clone(&transport),
            task,
            settings,
            own_turn,
            done,
            progress.clone(),
        )));
    }

    // workers finish in commit order, so the first error seen is the root cause
    for index in 0..handles.len() {
        let result = match (&mut handles[index]).await {
            Ok(result) => result,
            Err(e) => Err(DownloadError::Unknown(format!("range worker {} panicked: {}", index, e))),
        };
        if let Err(e) = result {
            log::warn!("range {} of {} failed: {}", index, locator, e);
            for rest in &handles[index + 1..] {
                rest.abort();
            }
            return Err(e);
        }
    }

    match turn {
        Turn::Holding(sink) => Ok(sink),
        Turn::After(last) => last.await.map_err(|_| DownloadError::ChainBroken(ranges.len())),
    }
}
