//! Minimal HTTP/1.1 front end over `tokio::net`.
//!
//! One request per connection; every response is JSON and closes the
//! connection.

use crate::error::{DashboardError, Result};
use crate::service::{ApiResponse, DashboardService};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;
/// Whole-request read budget; idle clients get a 408 and are dropped
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Accept connections forever, one task per connection
pub async fn serve(listener: TcpListener, service: Arc<DashboardService>) -> Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "New connection");
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &service).await {
                warn!(%addr, error = %e, "Connection failed");
            }
        });
    }
}

pub async fn handle_connection<S>(mut stream: S, service: &DashboardService) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(request)) => {
            let response = handle_request(service, &request).await;
            info!(method = %request.method, path = %request.path, status = response.status, "Request handled");
            response
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Bad request");
            ApiResponse::error(400, e.to_string())
        }
        Err(_) => {
            warn!(timeout_secs = READ_TIMEOUT.as_secs(), "Request read timed out");
            ApiResponse::error(408, "Request Timeout")
        }
    };

    stream.write_all(create_response(&response).as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read the head, then exactly `Content-Length` body bytes
pub async fn read_request<S>(stream: &mut S) -> Result<HttpRequest>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(DashboardError::Parse("request head too large".to_string()));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(DashboardError::Parse("connection closed before end of headers".to_string()));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
    let mut request = parse_head(&head)?;

    let content_length = request
        .headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(DashboardError::Parse("request body too large".to_string()));
    }

    let mut body = buffer[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);
    request.body = String::from_utf8_lossy(&body).to_string();

    Ok(request)
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse the request line and headers. The path loses its query string and
/// any trailing slash.
pub fn parse_head(head: &str) -> Result<HttpRequest> {
    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| DashboardError::Parse("empty request".to_string()))?;

    let mut parts = request_line.split_whitespace();
    let (method, raw_path) = match (parts.next(), parts.next()) {
        (Some(m), Some(p)) => (m.to_string(), p),
        _ => return Err(DashboardError::Parse(format!("malformed request line: {:?}", request_line))),
    };

    let path = raw_path.split('?').next().unwrap_or("").trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path }.to_string();

    let headers = lines
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    Ok(HttpRequest {
        method,
        path,
        headers,
        body: String::new(),
    })
}

pub async fn handle_request(service: &DashboardService, request: &HttpRequest) -> ApiResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => ApiResponse::ok(serde_json::json!({})),
        ("GET", "/api/health") => service.health(),
        ("GET", "/api/data") => service.data().await,
        ("POST", "/api/update") => service.update().await,
        ("GET", "/api/analysis") | ("POST", "/api/analysis") => service.analysis().await,
        ("GET", "/api/sheets") => service.sheets(),
        ("POST", "/api/chat") => match serde_json::from_str::<serde_json::Value>(&request.body) {
            Ok(json) => service.chat(&json).await,
            Err(_) => ApiResponse::error(400, "Corpo JSON inválido"),
        },
        (_, "/api/health" | "/api/data" | "/api/update" | "/api/analysis" | "/api/sheets" | "/api/chat") => {
            ApiResponse::error(405, "Method Not Allowed")
        }
        _ => ApiResponse::error(404, "Not Found"),
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        _ => "Internal Server Error",
    }
}

pub fn create_response(response: &ApiResponse) -> String {
    let body = serde_json::to_string(&response.body)
        .unwrap_or_else(|_| r#"{"error":"Failed to serialize response"}"#.to_string());
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json; charset=utf-8\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        status_text(response.status),
        body.len(),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::ConversationalResponder;
    use crate::cache::SheetCache;
    use crate::ingestion::SheetSource;
    use crate::record::SheetCollection;
    use async_trait::async_trait;

    struct Nothing;

    #[async_trait]
    impl SheetSource for Nothing {
        async fn fetch_all(&self) -> Option<SheetCollection> {
            None
        }
    }

    fn service() -> DashboardService {
        DashboardService::new(Arc::new(SheetCache::new(Arc::new(Nothing))), ConversationalResponder::offline())
    }

    fn request(method: &str, path: &str, body: &str) -> HttpRequest {
        HttpRequest {
            method: method.to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_head_strips_query_and_slash() {
        let req = parse_head("GET /api/data/?x=1 HTTP/1.1\r\nHost: a\r\nContent-Length: 12").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/api/data");
        assert_eq!(req.headers.get("content-length").map(String::as_str), Some("12"));

        assert_eq!(parse_head("GET / HTTP/1.1").unwrap().path, "/");
        assert!(parse_head("GARBAGE").is_err());
    }

    #[tokio::test]
    async fn test_routing() {
        let svc = service();
        assert_eq!(handle_request(&svc, &request("GET", "/api/health", "")).await.status, 200);
        assert_eq!(handle_request(&svc, &request("GET", "/nope", "")).await.status, 404);
        assert_eq!(handle_request(&svc, &request("DELETE", "/api/data", "")).await.status, 405);
        assert_eq!(handle_request(&svc, &request("POST", "/api/chat", "not json")).await.status, 400);

        let chat = handle_request(&svc, &request("POST", "/api/chat", r#"{"message":"oi"}"#)).await;
        assert_eq!(chat.status, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_client_times_out() {
        let svc = service();
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        // Client connects and never sends a byte
        let started = tokio::time::Instant::now();
        handle_connection(server, &svc).await.unwrap();
        assert!(started.elapsed() >= READ_TIMEOUT);

        let mut text = String::new();
        client.read_to_string(&mut text).await.unwrap();
        assert!(text.starts_with("HTTP/1.1 408 Request Timeout"));
    }

    #[tokio::test]
    async fn test_connection_answers_complete_request() {
        let svc = service();
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        client
            .write_all(b"POST /api/chat HTTP/1.1\r\nContent-Length: 16\r\n\r\n{\"message\":\"oi\"}")
            .await
            .unwrap();

        handle_connection(server, &svc).await.unwrap();

        let mut text = String::new();
        client.read_to_string(&mut text).await.unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn test_response_framing() {
        let text = create_response(&ApiResponse::error(404, "Não encontrado"));
        let (head, body) = text.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 404 Not Found"));
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
    }
}
