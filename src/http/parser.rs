use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::StatusCode;

/// Largest accepted request or response head (start line plus headers).
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Largest request body a peer may declare.
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidStatusLine,
    InvalidHeader,
    InvalidContentLength,
    TooLarge,
    Incomplete,
}

/// Status line and headers of a response; the body is read separately.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: String,
    pub status: StatusCode,
    pub headers: Headers,
}

impl ResponseHead {
    /// The declared body length, if any.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        self.headers
            .get("Content-Length")
            .map(|v| v.trim().parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
            .transpose()
    }
}

/// Parses one request from the front of `buf`.
///
/// Returns the request together with the number of bytes it occupied, or
/// [`ParseError::Incomplete`] when more input is needed.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let skipped = leading_empty_lines(buf);
    let buf = &buf[skipped..];

    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEAD_SIZE => return Err(ParseError::TooLarge),
        None => return Err(ParseError::Incomplete),
    };
    if headers_end > MAX_HEAD_SIZE {
        return Err(ParseError::TooLarge);
    }
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    let headers = parse_headers(lines)?;

    // Body
    let content_length = headers
        .get("Content-Length")
        .map(|v| v.trim().parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
        .transpose()?
        .unwrap_or(0);

    if content_length > MAX_BODY_SIZE {
        return Err(ParseError::TooLarge);
    }

    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let body = body_bytes[..content_length].to_vec();

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
    };

    let total_consumed = skipped + headers_end + 4 + content_length;
    Ok((request, total_consumed))
}

/// Parses a status line and headers from the front of `buf`.
///
/// Returns the head and the number of bytes consumed up to and including the
/// blank line; whatever follows belongs to the body.
pub fn parse_response_head(buf: &[u8]) -> Result<(ResponseHead, usize), ParseError> {
    let skipped = leading_empty_lines(buf);
    let buf = &buf[skipped..];

    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() > MAX_HEAD_SIZE => return Err(ParseError::TooLarge),
        None => return Err(ParseError::Incomplete),
    };

    let head_str = std::str::from_utf8(&buf[..headers_end])
        .map_err(|_| ParseError::InvalidStatusLine)?;
    let mut lines = head_str.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidStatusLine);
    }
    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .filter(|c| (100..1000).contains(c))
        .ok_or(ParseError::InvalidStatusLine)?;

    let headers = parse_headers(lines)?;

    let head = ResponseHead {
        version: version.to_string(),
        status: StatusCode::from_u16(code),
        headers,
    };
    Ok((head, skipped + headers_end + 4))
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Headers, ParseError> {
    let mut headers = Headers::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::InvalidHeader);
        }

        headers.append(key, value.trim());
    }

    Ok(headers)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

// Peers may send stray CRLFs between messages.
fn leading_empty_lines(buf: &[u8]) -> usize {
    let mut n = 0;
    while buf[n..].starts_with(b"\r\n") {
        n += 2;
    }
    n
}
