//! Just enough HTTP/1.1 for the two counter endpoints: one request per
//! connection, JSON responses, `Connection: close`.

use crate::error::{CounterError, Result};
use crate::routes;
use crate::storage::ViewStorage;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const MAX_HEAD_BYTES: usize = 8 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(s) => s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub content_length: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        // plain structs of integers and strings always serialize
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self { status, body }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            reason_phrase(self.status),
            self.body.len()
        );
        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Parse a request head. Returns `Ok(None)` until the blank line that ends
/// the head has arrived; on success also returns the head length in bytes.
pub fn parse_head(buf: &[u8]) -> Result<Option<(Request, usize)>> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&buf[..end])
        .map_err(|_| CounterError::BadRequest("request head is not utf-8".into()))?;

    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| CounterError::BadRequest("empty request".into()))?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(CounterError::BadRequest(format!(
            "malformed request line {request_line:?}"
        )));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(CounterError::BadRequest(format!("unsupported version {version}")));
    }

    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| CounterError::BadRequest("invalid content-length".into()))?;
        }
    }

    let path = target.split(['?', '#']).next().unwrap_or(target).to_string();
    Ok(Some((
        Request {
            method: Method::parse(method),
            path,
            content_length,
        },
        end + 4,
    )))
}

/// Accept connections until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, store: Arc<dyn ViewStorage>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!("accept failed: {}", e);
                        continue;
                    }
                };
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, store).await {
                        log::debug!("connection from {} ended: {}", peer, e);
                    }
                });
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, store: Arc<dyn ViewStorage>) -> std::io::Result<()> {
    let started = Instant::now();
    let response = match read_request(&mut stream).await {
        Ok(Some(req)) => {
            let label = format!("{} {}", req.method.as_str(), req.path);
            let resp = tokio::task::spawn_blocking(move || routes::route(&req, store.as_ref()))
                .await
                .unwrap_or_else(|e| routes::internal_error(&e.to_string()));
            log::info!("{} -> {} ({:?})", label, resp.status, started.elapsed());
            resp
        }
        Ok(None) => return Ok(()),
        Err(RequestError::TooLarge) => routes::too_large(),
        Err(RequestError::Bad(e)) => {
            log::info!("rejected request: {}", e);
            routes::bad_request(&e.to_string())
        }
        Err(RequestError::Io(e)) => return Err(e),
    };
    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

enum RequestError {
    TooLarge,
    Bad(CounterError),
    Io(std::io::Error),
}

impl From<std::io::Error> for RequestError {
    fn from(e: std::io::Error) -> Self {
        RequestError::Io(e)
    }
}

async fn read_request(stream: &mut TcpStream) -> std::result::Result<Option<Request>, RequestError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let (req, head_len) = loop {
        let n = read_with_timeout(stream, &mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(RequestError::Bad(CounterError::BadRequest(
                "connection closed mid-request".into(),
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
        match parse_head(&buf) {
            Ok(Some(parsed)) => break parsed,
            Ok(None) if buf.len() > MAX_HEAD_BYTES => return Err(RequestError::TooLarge),
            Ok(None) => {}
            Err(e) => return Err(RequestError::Bad(e)),
        }
    };

    if req.content_length > MAX_BODY_BYTES {
        return Err(RequestError::TooLarge);
    }
    // the counter endpoints ignore bodies, but drain them so the peer sees a clean close
    let mut remaining = req.content_length.saturating_sub(buf.len() - head_len);
    while remaining > 0 {
        let n = read_with_timeout(stream, &mut chunk).await?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }
    Ok(Some(req))
}

async fn read_with_timeout(stream: &mut TcpStream, chunk: &mut [u8]) -> std::io::Result<usize> {
    match tokio::time::timeout(READ_TIMEOUT, stream.read(chunk)).await {
        Ok(r) => r,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "client sent nothing in time",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_is_incomplete_until_blank_line() {
        assert!(parse_head(b"GET /api/views HTTP/1.1\r\nHost: x\r\n").unwrap().is_none());
    }

    #[test]
    fn parses_method_path_and_length() {
        let raw = b"POST /api/views/increment?src=home HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\n\r\n{}";
        let (req, head_len) = parse_head(raw).unwrap().unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/api/views/increment");
        assert_eq!(req.content_length, 2);
        assert_eq!(&raw[head_len..], b"{}");
    }

    #[test]
    fn rejects_garbage_request_line() {
        assert!(matches!(
            parse_head(b"hello\r\n\r\n"),
            Err(CounterError::BadRequest(_))
        ));
        assert!(matches!(
            parse_head(b"GET / SMTP/2\r\n\r\n"),
            Err(CounterError::BadRequest(_))
        ));
    }

    #[test]
    fn response_carries_json_headers() {
        let resp = Response::json(200, &crate::schema::ViewsResponse { views: 7 });
        let text = String::from_utf8(resp.to_bytes()).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"views\":7}"));
    }
}
