use indexfetch::config::Config;
use indexfetch::core::http::TcpTransport;
use indexfetch::core::{DownloadError, DownloadMode, Orchestrator, OutcomeStatus};
use indexfetch::ui::ProgressManager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Minimal HTTP/1.1 file server: one request per connection, Range aware.
struct TestServer {
    port: u16,
    files: Files,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    async fn start() -> Self {
        let files: Files = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (served, log) = (Arc::clone(&files), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, Arc::clone(&served), Arc::clone(&log)));
            }
        });
        Self { port, files, requests }
    }

    fn add(&self, path: &str, content: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), content);
    }

    /// Publishes an index listing `paths` on this server.
    fn add_index(&self, paths: &[&str]) {
        let index: String = paths.iter().map(|p| format!("{}\n", self.url(p))).collect();
        self.add("/index.txt", index.into_bytes());
    }

    fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut socket: TcpStream, files: Files, log: Arc<Mutex<Vec<String>>>) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    let text = String::from_utf8_lossy(&raw).to_string();
    let mut lines = text.split("\r\n");
    let mut request_line = lines.next().unwrap().split(' ');
    let method = request_line.next().unwrap().to_string();
    let path = request_line.next().unwrap().to_string();
    let range = lines
        .find_map(|l| l.strip_prefix("Range: bytes="))
        .and_then(|r| r.split_once('-'))
        .map(|(a, b)| (a.parse::<usize>().unwrap(), b.parse::<usize>().unwrap()));
    log.lock().unwrap().push(format!("{} {} {:?}", method, path, range));

    let content = files.lock().unwrap().get(&path).cloned();
    let response = match content {
        None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot found".to_vec(),
        Some(content) => {
            let (status, body) = match range {
                Some((start, end)) => ("206 Partial Content", &content[start..=end.min(content.len() - 1)]),
                None => ("200 OK", &content[..]),
            };
            let mut out = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
                status,
                body.len()
            )
            .into_bytes();
            if method == "GET" {
                out.extend_from_slice(body);
            }
            out
        }
    };

    // dribble the response out so the client sees partial reads
    for piece in response.chunks(64) {
        if socket.write_all(piece).await.is_err() {
            return;
        }
        socket.flush().await.ok();
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Content that deliberately contains header-looking bytes.
fn tricky_content(len: usize) -> Vec<u8> {
    b"Content-Length: 1\r\n\r\nHTTP/1.1 200 OK\r\n"
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        download_dir: dir.path().to_string_lossy().to_string(),
        timeout: 5,
        connect_timeout: 5,
        ..Config::default()
    }
}

fn orchestrator(dir: &TempDir, mode: DownloadMode) -> Orchestrator {
    orchestrator_with(test_config(dir), mode)
}

fn orchestrator_with(config: Config, mode: DownloadMode) -> Orchestrator {
    let transport = Arc::new(TcpTransport::new(config.connect_timeout(), config.read_timeout()));
    Orchestrator::new(transport, config.download_options(mode), ProgressManager::hidden())
}

#[tokio::test]
async fn test_parallel_download_over_tcp() {
    let server = TestServer::start().await;
    server.add("/a.txt", tricky_content(300));
    server.add_index(&["/a.txt", "/missing.bin"]);

    let dir = TempDir::new().unwrap();
    let orch = orchestrator(&dir, DownloadMode::Parallel { workers: 3 });
    let outcomes = orch.run(&server.url("/index.txt"), |_, _| {}).await.unwrap();

    let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![OutcomeStatus::Downloaded, OutcomeStatus::NotFound]);
    assert_eq!(outcomes[1].detail, "is not found");
    assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), tricky_content(300));
    assert!(!dir.path().join("missing.bin").exists());

    let mut ranged: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| r.starts_with("GET /a.txt"))
        .collect();
    ranged.sort();
    assert_eq!(
        ranged,
        vec![
            "GET /a.txt Some((0, 99))",
            "GET /a.txt Some((100, 199))",
            "GET /a.txt Some((200, 299))",
        ]
    );
}

#[tokio::test]
async fn test_whole_and_bounded_over_tcp() {
    let server = TestServer::start().await;
    server.add("/big.bin", tricky_content(5000));
    server.add("/small.bin", tricky_content(80));
    server.add_index(&["/big.bin", "/small.bin"]);

    let whole_dir = TempDir::new().unwrap();
    let outcomes = orchestrator(&whole_dir, DownloadMode::Whole)
        .run(&server.url("/index.txt"), |_, _| {})
        .await
        .unwrap();
    assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Downloaded));
    assert_eq!(std::fs::read(whole_dir.path().join("big.bin")).unwrap(), tricky_content(5000));
    assert_eq!(std::fs::read(whole_dir.path().join("small.bin")).unwrap(), tricky_content(80));

    let bounded_dir = TempDir::new().unwrap();
    let outcomes = orchestrator(&bounded_dir, DownloadMode::Bounded { lower: 100, upper: 1000 })
        .run(&server.url("/index.txt"), |_, _| {})
        .await
        .unwrap();
    assert_eq!(outcomes[0].status, OutcomeStatus::RangeDownloaded);
    assert_eq!(outcomes[0].detail, "(range = 100-1000) is downloaded");
    assert_eq!(
        std::fs::read(bounded_dir.path().join("big.bin")).unwrap(),
        tricky_content(5000)[100..1000].to_vec()
    );
    assert_eq!(outcomes[1].status, OutcomeStatus::SkippedTooSmall);
    assert!(!bounded_dir.path().join("small.bin").exists());
}

#[tokio::test]
async fn test_missing_index_aborts_run() {
    let server = TestServer::start().await;
    let dir = TempDir::new().unwrap();
    let result = orchestrator(&dir, DownloadMode::Whole)
        .run(&server.url("/index.txt"), |_, _| {})
        .await;
    assert!(matches!(result, Err(DownloadError::IndexFetch(_))));
}

#[tokio::test]
async fn test_index_over_budget_aborts_run() {
    let server = TestServer::start().await;
    let paths: Vec<String> = (0..400).map(|i| format!("/file{:03}.bin", i)).collect();
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
    server.add_index(&paths);

    let dir = TempDir::new().unwrap();
    let config = Config { index_budget: 200, ..test_config(&dir) };
    let result = orchestrator_with(config, DownloadMode::Whole)
        .run(&server.url("/index.txt"), |_, _| {})
        .await;

    match result {
        Err(DownloadError::IndexFetch(msg)) => assert!(msg.contains("index_budget")),
        other => panic!("expected IndexFetch, got {:?}", other.map(|o| o.len())),
    }
    // nothing from the partial listing was requested
    assert!(server.requests().iter().all(|r| r.contains("/index.txt")));
}
