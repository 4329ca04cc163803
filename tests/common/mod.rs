//! In-process HTTP stub used by the integration tests

#![allow(dead_code)]

use sales_dashboard::http::{parse_head, HttpRequest};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
pub struct Route {
    pub method: &'static str,
    /// Matched against the request target including the query string
    pub target: String,
    pub status: u16,
    pub body: String,
}

pub fn get(target: impl Into<String>, status: u16, body: impl Into<String>) -> Route {
    Route {
        method: "GET",
        target: target.into(),
        status,
        body: body.into(),
    }
}

pub fn post(target: impl Into<String>, status: u16, body: impl Into<String>) -> Route {
    Route {
        method: "POST",
        target: target.into(),
        status,
        body: body.into(),
    }
}

pub struct StubServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<(HttpRequest, String)>>>,
}

impl StubServer {
    /// Serve `routes` until the test ends. Unknown targets get a 404.
    pub async fn start(routes: Vec<Route>) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let Some((request, target)) = read_raw(&mut stream).await else {
                        return;
                    };
                    let route = routes
                        .iter()
                        .find(|r| r.method == request.method && r.target == target);
                    let (status, body) = match route {
                        Some(r) => (r.status, r.body.clone()),
                        None => (404, "not found".to_string()),
                    };
                    seen.lock().unwrap().push((request, target));

                    let response = format!(
                        "HTTP/1.1 {} STUB\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        StubServer {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn targets(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

/// Read one request, keeping the raw target (query string included)
async fn read_raw(stream: &mut TcpStream) -> Option<(HttpRequest, String)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let target = head.lines().next()?.split_whitespace().nth(1)?.to_string();
    let mut request = parse_head(&head).ok()?;
    let length: usize = request
        .headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let mut body = buffer[head_end + 4..].to_vec();
    while body.len() < length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    request.body = String::from_utf8_lossy(&body).to_string();
    Some((request, target))
}

pub const SHEET_ID: &str = "test-sheet";

pub fn export_target(gid: u32) -> String {
    format!("/spreadsheets/d/{}/export?format=csv&gid={}", SHEET_ID, gid)
}

pub fn gviz_target(gid: u32) -> String {
    format!("/spreadsheets/d/{}/gviz/tq?tqx=out:csv&gid={}", SHEET_ID, gid)
}

pub fn edit_target() -> String {
    format!("/spreadsheets/d/{}/edit", SHEET_ID)
}

/// CSV with a header and `n` sales rows
pub fn sales_csv(n: usize) -> String {
    let mut csv = String::from("Produto,Categoria,Região,Receita Total,Data\n");
    for i in 0..n {
        csv.push_str(&format!("Produto {},Eletrônicos,Sul,\"R$ {},00\",2025-01-{:02}\n", i, 100 + i, i % 28 + 1));
    }
    csv
}
