//! Raw HTTP request parsing.
//!
//! One `RequestContext` is built per connection from the request line,
//! headers and body, then discarded once the response is written. Input
//! sizes are bounded: reading unbounded headers or bodies from an
//! untrusted socket is a cheap way to exhaust memory.

use std::collections::BTreeMap;
use std::io::Read;

use thiserror::Error;

/// Maximum accepted size of the request line plus headers.
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Maximum accepted body size.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Errors raised before a request can be routed.
///
/// These are protocol-framing failures; they are answered with a plain
/// 400, never with an in-page fragment, because no pipeline ran.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Malformed request line")]
    MalformedRequestLine,

    #[error("Request headers exceed {MAX_HEADER_BYTES} bytes")]
    HeadersTooLarge,

    #[error("Request body exceeds {MAX_BODY_BYTES} bytes")]
    BodyTooLarge,

    #[error("Invalid Content-Length header")]
    InvalidContentLength,

    #[error("Connection error: {0}")]
    Io(#[from] std::io::Error),
}

/// The inbound method, path and raw body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl RequestContext {
    /// Path with any query string stripped.
    #[must_use]
    pub fn route_path(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

/// Read and frame one request from a connection.
///
/// # Errors
/// Returns `RequestError` when the framing is malformed, oversized or
/// the connection fails mid-read.
pub fn read_request<R: Read>(stream: &mut R) -> Result<RequestContext, RequestError> {
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    // Accumulate until the blank line that ends the header section.
    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(RequestError::HeadersTooLarge);
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(RequestError::MalformedRequestLine);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let header_text = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");

    let request_line = lines.next().ok_or(RequestError::MalformedRequestLine)?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or(RequestError::MalformedRequestLine)?
        .to_string();
    let path = parts
        .next()
        .ok_or(RequestError::MalformedRequestLine)?
        .to_string();
    if !path.starts_with('/') {
        return Err(RequestError::MalformedRequestLine);
    }

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength)
        })
        .transpose()?
        .unwrap_or(0);

    if content_length > MAX_BODY_BYTES {
        return Err(RequestError::BodyTooLarge);
    }

    // Whatever followed the blank line already belongs to the body.
    let mut body: Vec<u8> = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(RequestContext { method, path, body })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Decode a URL-form-encoded body into field pairs.
///
/// Decoding is lenient: malformed pairs are skipped and the first
/// occurrence of a repeated field wins. Missing fields surface later as
/// typed encoder errors, which is where the schema is known.
#[must_use]
pub fn parse_form(body: &[u8]) -> BTreeMap<String, String> {
    let text = String::from_utf8_lossy(body);
    let mut fields = BTreeMap::new();

    for pair in text.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let key = percent_decode(key);
        if key.is_empty() || fields.contains_key(&key) {
            continue;
        }
        fields.insert(key, percent_decode(value));
    }

    fields
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match hex_pair(bytes.get(i + 1).copied(), bytes.get(i + 2).copied()) {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'%');
                    i += 1;
                }
            },
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(high: Option<u8>, low: Option<u8>) -> Option<u8> {
    let high = (high? as char).to_digit(16)?;
    let low = (low? as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}
