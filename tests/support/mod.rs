#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};
use socialat::Session;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub enum Reply {
    Json {
        status: u16,
        body: Value,
    },
    Bytes {
        status: u16,
        content_type: String,
        body: Vec<u8>,
        delay: Duration,
    },
    /// Answers `uploadBlob` with a blob whose CID is derived from the body.
    BlobEcho,
}

pub fn json_reply(status: u16, body: Value) -> Reply {
    Reply::Json { status, body }
}

pub fn bytes_reply(content_type: &str, body: &[u8]) -> Reply {
    Reply::Bytes {
        status: 200,
        content_type: content_type.to_owned(),
        body: body.to_vec(),
        delay: Duration::ZERO,
    }
}

pub fn delayed_bytes_reply(content_type: &str, body: &[u8], delay: Duration) -> Reply {
    Reply::Bytes {
        status: 200,
        content_type: content_type.to_owned(),
        body: body.to_vec(),
        delay,
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }
}

type Routes = HashMap<(String, String), Vec<Reply>>;

/// Local HTTP server answering by method and path.
///
/// A route with several replies hands them out in order and then keeps
/// repeating the last one. Unknown routes answer 404.
pub struct RoutedServer {
    pub base_url: String,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

impl RoutedServer {
    pub async fn start() -> Self {
        let routes = Arc::new(Mutex::new(Routes::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");

        let handle = tokio::spawn({
            let routes = Arc::clone(&routes);
            let requests = Arc::clone(&requests);
            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let routes = Arc::clone(&routes);
                    let requests = Arc::clone(&requests);
                    tokio::spawn(async move {
                        serve_one(socket, routes, requests).await;
                    });
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            routes,
            requests,
            handle,
        }
    }

    pub fn route(&self, method: &str, path: &str, reply: Reply) {
        lock_unpoisoned(&self.routes)
            .entry((method.to_owned(), path.to_owned()))
            .or_default()
            .push(reply);
    }

    pub fn xrpc(&self, method: &str, nsid: &str, reply: Reply) {
        self.route(method, &format!("/xrpc/{nsid}"), reply);
    }

    pub fn url(&self, path: &str) -> url::Url {
        url::Url::parse(&format!("{}{path}", self.base_url)).expect("server URL")
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

impl Drop for RoutedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn session_json(access: &str, handle: &str, did: &str) -> Value {
    json!({
        "accessJwt": access,
        "refreshJwt": format!("{access}-refresh"),
        "handle": handle,
        "did": did,
    })
}

pub fn alice_session() -> Session {
    Session::new("access-1", "access-1-refresh", "alice.test", "did:plc:alice")
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn next_reply(routes: &Mutex<Routes>, method: &str, path: &str) -> Option<Reply> {
    let mut routes = lock_unpoisoned(routes);
    let replies = routes.get_mut(&(method.to_owned(), path.to_owned()))?;
    if replies.len() > 1 {
        Some(replies.remove(0))
    } else {
        replies.first().cloned()
    }
}

async fn serve_one(
    mut socket: TcpStream,
    routes: Arc<Mutex<Routes>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let Ok(Some(request)) = read_request(&mut socket).await else {
        return;
    };

    let reply = next_reply(&routes, &request.method, &request.path)
        .unwrap_or_else(|| json_reply(404, json!({"error": "MethodNotImplemented"})));
    let (status, content_type, body, delay) = match reply {
        Reply::Json { status, body } => (
            status,
            "application/json".to_owned(),
            body.to_string().into_bytes(),
            Duration::ZERO,
        ),
        Reply::Bytes {
            status,
            content_type,
            body,
            delay,
        } => (status, content_type, body, delay),
        Reply::BlobEcho => {
            let mime_type = request
                .header("content-type")
                .unwrap_or("application/octet-stream")
                .to_owned();
            let blob = json!({
                "blob": {
                    "$type": "blob",
                    "ref": {"$link": format!("cid-{}", String::from_utf8_lossy(&request.body))},
                    "mimeType": mime_type,
                    "size": request.body.len(),
                }
            });
            (
                200,
                "application/json".to_owned(),
                blob.to_string().into_bytes(),
                Duration::ZERO,
            )
        }
    };
    lock_unpoisoned(&requests).push(request);

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let head = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_reason(status),
        body.len(),
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    let _ = socket.write_all(&body).await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<Option<CapturedRequest>> {
    let mut raw = Vec::new();
    let mut buffer = [0_u8; 2048];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Ok(None);
        }
        raw.extend_from_slice(&buffer[..n]);
        if let Some(position) = raw.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_owned();
    let target = request_line.next().unwrap_or_default();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
        None => (target.to_owned(), None),
    };
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(key, _)| key == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = raw[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Ok(Some(CapturedRequest {
        method,
        path,
        query,
        headers,
        body,
    }))
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
