//! Protocol codec
//!
//! Server side of HTTP/1.x over blocking streams: requests are read,
//! responses written. Also the `application/x-www-form-urlencoded` decoder.
//!
//! ## Message Layout
//! ```text
//! ┌──────────────────────────────┐
//! │ start line             CRLF │  request line or status line
//! ├──────────────────────────────┤
//! │ Name: value            CRLF │  zero or more header fields
//! │ ...                         │
//! ├──────────────────────────────┤
//! │                        CRLF │  end of headers
//! ├──────────────────────────────┤
//! │ body                        │  Content-Length bytes, or chunked
//! └──────────────────────────────┘
//! ```

use std::io::{BufRead, Read, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, SnapError};
use super::{HttpRequest, HttpResponse, Method, Version};

/// Maximum size of a start line plus headers (1 MB)
pub const MAX_HEADER_BYTES: usize = 1 << 20;

/// Maximum body size (10 MB)
pub const MAX_BODY_SIZE: usize = 10 << 20;

// =============================================================================
// Request Decoding
// =============================================================================

/// Read one request from a stream
///
/// Returns `Ok(None)` if the stream ends cleanly before a new request starts.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<HttpRequest>> {
    let mut budget = MAX_HEADER_BYTES;

    // Tolerate stray blank lines between pipelined requests
    let request_line = loop {
        match read_line(reader, &mut budget)? {
            None => return Ok(None),
            Some(line) if line.is_empty() => continue,
            Some(line) => break line,
        }
    };

    let (method, target, version) = parse_request_line(&request_line)?;
    let headers = read_headers(reader, &mut budget)?;
    let body = read_body(reader, &headers)?;

    let mut request = HttpRequest::new(method, &target);
    request.version = version;
    request.headers = headers;
    request.body = body;

    Ok(Some(request))
}

fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(SnapError::Protocol(format!("malformed request line: {:?}", line)));
    }

    let version = parse_version(parts[2])?;
    let target = parts[1];
    if !target.starts_with('/') {
        return Err(SnapError::Protocol(format!("unsupported request target: {:?}", target)));
    }

    Ok((Method::parse(parts[0]), target.to_string(), version))
}

fn parse_version(token: &str) -> Result<Version> {
    match token {
        "HTTP/1.1" => Ok(Version::Http11),
        "HTTP/1.0" => Ok(Version::Http10),
        other => Err(SnapError::Protocol(format!("unsupported HTTP version: {:?}", other))),
    }
}

// =============================================================================
// Response Encoding
// =============================================================================

/// Encode a response to bytes
///
/// `Content-Length` is always sent; `Connection: close` only when the
/// connection will not be reused.
pub fn encode_response(response: &HttpResponse, keep_alive: bool) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\n",
        response.status.code(),
        response.status.reason()
    );

    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    if !keep_alive {
        head.push_str("Connection: close\r\n");
    }
    head.push_str("\r\n");

    let mut message = Vec::with_capacity(head.len() + response.body.len());
    message.extend_from_slice(head.as_bytes());
    message.extend_from_slice(&response.body);
    message
}

/// Write a response to a stream
pub fn write_response<W: Write>(
    writer: &mut W,
    response: &HttpResponse,
    keep_alive: bool,
) -> Result<()> {
    writer.write_all(&encode_response(response, keep_alive))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Header/Body Parsing
// =============================================================================

/// Read one CRLF- or LF-terminated line, charging it against `budget`.
///
/// Returns `Ok(None)` on EOF before any byte of the line.
fn read_line<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let n = reader.by_ref().take(*budget as u64).read_until(b'\n', &mut buf)?;

    if n == 0 {
        if *budget == 0 {
            return Err(header_too_large());
        }
        return Ok(None);
    }
    *budget -= n;

    if buf.last() != Some(&b'\n') {
        if *budget == 0 {
            return Err(header_too_large());
        }
        return Err(SnapError::Protocol("stream ended inside a line".to_string()));
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| SnapError::Protocol("line is not valid UTF-8".to_string()))
}

fn header_too_large() -> SnapError {
    SnapError::Protocol(format!("header section exceeds {} bytes", MAX_HEADER_BYTES))
}

fn read_headers<R: BufRead>(reader: &mut R, budget: &mut usize) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();

    loop {
        let line = read_line(reader, budget)?
            .ok_or_else(|| SnapError::Protocol("connection closed inside headers".to_string()))?;
        if line.is_empty() {
            return Ok(headers);
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| SnapError::Protocol(format!("malformed header: {:?}", line)))?;
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(SnapError::Protocol(format!("malformed header name: {:?}", name)));
        }

        headers.push((name.to_string(), value.trim().to_string()));
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn read_body<R: BufRead>(reader: &mut R, headers: &[(String, String)]) -> Result<Bytes> {
    if let Some(encoding) = header_value(headers, "Transfer-Encoding") {
        if encoding.eq_ignore_ascii_case("chunked") {
            return read_chunked(reader);
        }
        return Err(SnapError::Protocol(format!(
            "unsupported transfer encoding: {:?}",
            encoding
        )));
    }

    match header_value(headers, "Content-Length") {
        Some(value) => {
            let len = parse_content_length(value)?;
            if len > MAX_BODY_SIZE {
                return Err(body_too_large(len));
            }

            let mut body = vec![0u8; len];
            reader.read_exact(&mut body)?;
            Ok(Bytes::from(body))
        }
        None => Ok(Bytes::new()),
    }
}

/// Digits only: `usize::from_str` would also accept a leading `+`
fn parse_content_length(value: &str) -> Result<usize> {
    let invalid = || SnapError::Protocol(format!("invalid Content-Length: {:?}", value));

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn read_chunked<R: BufRead>(reader: &mut R) -> Result<Bytes> {
    let mut budget = MAX_HEADER_BYTES;
    let mut body = BytesMut::new();

    loop {
        let line = read_line(reader, &mut budget)?
            .ok_or_else(|| SnapError::Protocol("stream ended inside chunked body".to_string()))?;
        let size_field = line.split(';').next().unwrap_or("").trim();
        let invalid = || SnapError::Protocol(format!("invalid chunk size: {:?}", size_field));
        if size_field.is_empty() || !size_field.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let size = usize::from_str_radix(size_field, 16).map_err(|_| invalid())?;

        if size == 0 {
            // Trailer fields are read and dropped
            read_headers(reader, &mut budget)?;
            return Ok(body.freeze());
        }

        let start = body.len();
        let end = match start.checked_add(size) {
            Some(end) if end <= MAX_BODY_SIZE => end,
            _ => return Err(body_too_large(size)),
        };

        body.resize(end, 0);
        reader.read_exact(&mut body[start..])?;

        match read_line(reader, &mut budget)? {
            Some(terminator) if terminator.is_empty() => {}
            _ => return Err(SnapError::Protocol("chunk not terminated by CRLF".to_string())),
        }
    }
}

fn body_too_large(len: usize) -> SnapError {
    SnapError::Protocol(format!("body too large: at least {} bytes (max {})", len, MAX_BODY_SIZE))
}

// =============================================================================
// Form Decoding
// =============================================================================

/// Parse `a=1&b=2` into pairs, in order.
///
/// Segments containing `;` or an invalid escape are skipped; a segment
/// without `=` has an empty value.
pub fn parse_urlencoded(encoded: &str) -> Vec<(String, String)> {
    encoded
        .split('&')
        .filter(|segment| !segment.is_empty() && !segment.contains(';'))
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            Some((percent_decode(key)?, percent_decode(value)?))
        })
        .collect()
}

/// Decode one form component: `+` is a space, `%XX` a byte.
///
/// Returns `None` for a truncated or non-hex escape, or non-UTF-8 output.
pub fn percent_decode(component: &str) -> Option<String> {
    let bytes = component.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => {
                let hi = hex_value(*bytes.get(i + 1)?)?;
                let lo = hex_value(*bytes.get(i + 2)?)?;
                out.push(hi << 4 | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
