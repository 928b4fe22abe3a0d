//! Minimal HTTP/1.1 front end for the badge.
//!
//! Routes:
//!   GET /api/langs, GET /langs   → SVG badge (`theme`, `header` query params)
//!   GET /favicon.ico, .png       → 204
//!   anything else                → 404 JSON
//!
//! HEAD is answered like GET without the body. One request per connection;
//! the connection is closed after the response. A client that has not sent a
//! full request head within `READ_TIMEOUT` gets a 408.

use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::service::{LanguageSource, Service};
use crate::svg::{DEFAULT_THEME, Renderer};

pub const DEFAULT_HEADER: &str = "Languages";
const MAX_HEAD_BYTES: usize = 8 * 1024;
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target as sent, used for logging.
    pub target: String,
    pub path: String,
    query: Vec<(String, String)>,
}

impl Request {
    /// Parses the request line of an HTTP/1.x head. Headers are ignored.
    pub fn parse(head: &str) -> Option<Self> {
        let line = head.lines().next()?;
        let mut parts = line.split_whitespace();
        let method = parts.next()?;
        let target = parts.next()?;
        let version = parts.next()?;
        if !version.starts_with("HTTP/1.") || !target.starts_with('/') {
            return None;
        }

        // Percent-decoding and `+` handling come from the URL parser.
        let url = Url::parse(&format!("http://localhost{target}")).ok()?;
        Some(Self {
            method: method.to_string(),
            target: target.to_string(),
            path: url.path().to_string(),
            query: url.query_pairs().into_owned().collect(),
        })
    }

    /// First value of a query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn svg(body: String) -> Self {
        Self {
            status: 200,
            content_type: "image/svg+xml",
            body,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: "text/plain; charset=utf-8",
            body: String::new(),
        }
    }

    pub fn not_found() -> Self {
        let body = json!({
            "error": {
                "code": 404,
                "message": "Not Found",
                "details": "This API endpoint does not exist.",
            }
        });
        Self {
            status: 404,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }

    /// Status line and headers, as sent for a HEAD request.
    pub fn head_bytes(&self) -> Vec<u8> {
        // 204 carries neither a body nor its headers.
        if self.status == 204 {
            return format!("HTTP/1.1 204 {}\r\nConnection: close\r\n\r\n", self.reason())
                .into_bytes();
        }
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
        )
        .into_bytes()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// Dispatches one parsed request.
pub async fn route<S, R>(service: &Service<S, R>, req: &Request) -> Response
where
    S: LanguageSource + Sync,
    R: Renderer + Sync,
{
    match (req.method.as_str(), req.path.as_str()) {
        ("GET" | "HEAD", "/favicon.ico" | "/favicon.png") => Response::no_content(),
        ("GET" | "HEAD", "/api/langs" | "/langs") => language_badge(service, req).await,
        (_, "/favicon.ico" | "/favicon.png" | "/api/langs" | "/langs") => {
            Response::text(405, "Method Not Allowed")
        }
        _ => Response::not_found(),
    }
}

async fn language_badge<S, R>(service: &Service<S, R>, req: &Request) -> Response
where
    S: LanguageSource + Sync,
    R: Renderer + Sync,
{
    let theme = req.param("theme").unwrap_or(DEFAULT_THEME);
    let header = req.param("header").unwrap_or(DEFAULT_HEADER);

    let stats = match service.language_stats().await {
        Ok(stats) => stats,
        Err(e) => {
            crate::error!("failed to fetch stats for request {}: {e}", req.target);
            return Response::text(500, "Error fetching stats");
        }
    };

    match service.render(theme, header, &stats) {
        Ok(svg) => Response::svg(svg),
        Err(e) => {
            crate::error!("failed to generate SVG for request {}: {e}", req.target);
            Response::text(500, "Error generating SVG")
        }
    }
}

async fn read_head<T: AsyncRead + Unpin>(stream: &mut T) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await.context("Failed to read request")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if buf.len() > MAX_HEAD_BYTES {
            anyhow::bail!("request head exceeds {MAX_HEAD_BYTES} bytes");
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads one request from `stream`, answers it and closes the write side.
pub async fn handle_connection<T, S, R>(stream: T, service: &Service<S, R>) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: LanguageSource + Sync,
    R: Renderer + Sync,
{
    handle_connection_within(stream, service, READ_TIMEOUT).await
}

async fn handle_connection_within<T, S, R>(
    mut stream: T,
    service: &Service<S, R>,
    read_timeout: Duration,
) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: LanguageSource + Sync,
    R: Renderer + Sync,
{
    let head = match tokio::time::timeout(read_timeout, read_head(&mut stream)).await {
        Ok(head) => Some(head?),
        Err(_) => {
            crate::warn!("no request head after {read_timeout:?}, closing connection");
            None
        }
    };

    let (response, with_body) = match head.as_deref().map(Request::parse) {
        Some(Some(req)) => {
            let response = route(service, &req).await;
            crate::info!("{} {} -> {}", req.method, req.target, response.status);
            (response, req.method != "HEAD")
        }
        Some(None) => (Response::text(400, "Bad Request"), true),
        None => (Response::text(408, "Request Timeout"), true),
    };

    let bytes = if with_body {
        response.to_bytes()
    } else {
        response.head_bytes()
    };
    stream
        .write_all(&bytes)
        .await
        .context("Failed to write response")?;
    stream.shutdown().await.context("Failed to close connection")?;
    Ok(())
}

/// Accepts connections forever; each is answered on its own task.
pub async fn run<S, R>(listener: TcpListener, service: Arc<Service<S, R>>) -> Result<()>
where
    S: LanguageSource + Send + Sync + 'static,
    R: Renderer + Send + Sync + 'static,
{
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                crate::warn!("failed to accept connection: {e}");
                continue;
            }
        };

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &service).await {
                crate::warn!("connection from {peer} failed: {e:#}");
            }
        });
    }
}

pub async fn serve<S, R>(addr: &str, service: Arc<Service<S, R>>) -> Result<()>
where
    S: LanguageSource + Send + Sync + 'static,
    R: Renderer + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    crate::info!("listening on http://{}", listener.local_addr()?);
    run(listener, service).await
}
