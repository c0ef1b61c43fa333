//! Framing of the HTTP-like exchange carried over a pairing link
//!
//! ```text
//! GET /fdroid/repo/index.jar HTTP/1.1\r\n
//! Host: AA:BB:CC:DD:EE:FF\r\n
//! \r\n
//! ```
//!
//! answered by a status line, headers, a blank line and, for `GET`, exactly
//! `Content-Length` bytes of body.

use fetchr_errors::{Error, NetworkError};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const PROTOCOL: &str = "HTTP/1.1";

const MAX_LINE_LEN: u64 = 8 * 1024;
const MAX_HEADERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request sent to the paired device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
}

impl Request {
    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    #[must_use]
    pub fn head(target: impl Into<String>) -> Self {
        Self::new(Method::Head, target)
    }

    fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Serialize the request head and flush it
    ///
    /// # Errors
    ///
    /// Returns any write error from the link.
    pub async fn write_to<W: AsyncWrite + Unpin + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut head = format!("{} {} {PROTOCOL}\r\n", self.method, self.target);
        push_headers(&mut head, &self.headers);
        writer.write_all(head.as_bytes()).await?;
        writer.flush().await
    }
}

/// Status line and headers of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    #[must_use]
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Declared body length; `None` when absent or unparseable
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")
            .and_then(|value| value.trim().parse().ok())
    }

    /// Serialize the response head and flush it
    ///
    /// # Errors
    ///
    /// Returns any write error from the link.
    pub async fn write_to<W: AsyncWrite + Unpin + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut head = format!("{PROTOCOL} {} {}\r\n", self.status, self.reason);
        push_headers(&mut head, &self.headers);
        writer.write_all(head.as_bytes()).await?;
        writer.flush().await
    }
}

/// Read a request head, as the serving side of a link does
///
/// # Errors
///
/// Returns `NetworkError::ProtocolViolation` for malformed or oversized heads
/// and an I/O error if the link fails.
pub async fn read_request<R: AsyncBufRead + Unpin + ?Sized>(reader: &mut R) -> Result<Request, Error> {
    let line = expect_line(reader).await?;
    let mut parts = line.splitn(3, ' ');
    let method = match parts.next() {
        Some("GET") => Method::Get,
        Some("HEAD") => Method::Head,
        other => return Err(violation(format!("unsupported method {other:?}"))),
    };
    let target = parts
        .next()
        .filter(|target| !target.is_empty())
        .ok_or_else(|| violation("request line without target"))?;
    if parts.next() != Some(PROTOCOL) {
        return Err(violation(format!("unsupported request line {line:?}")));
    }

    let mut request = Request::new(method, target);
    request.headers = read_headers(reader).await?;
    Ok(request)
}

/// Read a response head from the link
///
/// # Errors
///
/// Returns `NetworkError::ProtocolViolation` for malformed or oversized heads
/// and an I/O error if the link fails.
pub async fn read_response_head<R: AsyncBufRead + Unpin + ?Sized>(
    reader: &mut R,
) -> Result<ResponseHead, Error> {
    let line = expect_line(reader).await?;
    let mut parts = line.splitn(3, ' ');
    if parts.next() != Some(PROTOCOL) {
        return Err(violation(format!("unsupported status line {line:?}")));
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| violation(format!("invalid status in {line:?}")))?;
    let reason = parts.next().unwrap_or_default();

    let mut head = ResponseHead::new(status, reason);
    head.headers = read_headers(reader).await?;
    Ok(head)
}

async fn read_headers<R: AsyncBufRead + Unpin + ?Sized>(
    reader: &mut R,
) -> Result<Vec<(String, String)>, Error> {
    let mut headers = Vec::new();
    loop {
        let line = expect_line(reader).await?;
        if line.is_empty() {
            return Ok(headers);
        }
        if headers.len() == MAX_HEADERS {
            return Err(violation("too many headers"));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| violation(format!("malformed header {line:?}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
}

/// One CRLF or LF terminated line, without the terminator
async fn expect_line<R: AsyncBufRead + Unpin + ?Sized>(reader: &mut R) -> Result<String, Error> {
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return Err(violation("link closed before the head was complete"));
    }
    if buf.last() != Some(&b'\n') {
        return Err(if read as u64 == MAX_LINE_LEN {
            violation("head line too long")
        } else {
            violation("link closed mid-line")
        });
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| violation("head is not valid UTF-8"))
}

fn push_headers(head: &mut String, headers: &[(String, String)]) {
    for (name, value) in headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn violation(message: impl Into<String>) -> Error {
    NetworkError::ProtocolViolation {
        message: message.into(),
    }
    .into()
}
