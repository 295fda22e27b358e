//! Minimal HTTP/1.1 server standing in for the DOI resolver

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use bibtidy_core::FetchSettings;

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct Request {
    /// Path including the query string
    pub path: String,
    pub accept: Option<String>,
}

impl Request {
    pub fn wants_bibtex(&self) -> bool {
        self.accept
            .as_deref()
            .is_some_and(|a| a.contains("application/x-bibtex"))
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.to_string(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            location: Some(location.to_string()),
            body: String::new(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            location: None,
            body: "not found".to_string(),
        }
    }
}

pub struct TestServer {
    pub base: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    /// Requests received so far
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Fetch settings pointing at this server
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            resolver: self.base.clone(),
            timeout_secs: 5,
            use_proxy: false,
            ..FetchSettings::default()
        }
    }
}

/// Serve every connection with `handler` until the runtime shuts down
pub async fn serve<F>(handler: F) -> TestServer
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let handler = Arc::new(handler);
    let requests = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&requests);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                handle(stream, handler.as_ref(), &log).await;
            });
        }
    });

    TestServer { base, requests }
}

async fn handle<F>(mut stream: TcpStream, handler: &F, log: &Mutex<Vec<Request>>)
where
    F: Fn(&Request) -> Reply,
{
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head).into_owned();
    let mut lines = head.split("\r\n");
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let accept = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("accept"))
        .map(|(_, value)| value.trim().to_string());

    let request = Request { path, accept };
    let reply = handler(&request);
    log.lock().unwrap().push(request);

    let reason = match reply.status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        _ => "Unknown",
    };
    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason,
        reply.body.len()
    );
    if let Some(location) = &reply.location {
        response.push_str(&format!("Location: {}\r\n", location));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
