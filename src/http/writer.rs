use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ResponseError;
use crate::http::headers::Headers;
use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Written verbatim when a request cannot be decoded.
pub const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Length: 15\r\n\
Connection: close\r\n\
\r\n\
400 Bad Request";

/// Serializes a status line, the headers and the blank separator line.
pub fn serialize_head(status: StatusCode, headers: &Headers) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    headers.write_to(&mut buf);

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes the fixed 400 response straight to a raw stream.
pub async fn write_bad_request<W>(stream: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(BAD_REQUEST).await?;
    stream.flush().await
}

/// Framing state of a response in progress. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Headers may still change.
    HeaderPending,
    /// Status line and headers are on the wire; `content_length` bytes of
    /// body are owed.
    HeaderSent { content_length: usize },
    /// The body went out.
    Finished,
}

/// Emits a single response under a declare-length-then-write-exact-bytes
/// contract.
///
/// A `Content-Length` must be known before the status line goes out, and the
/// body write must match it exactly. Chunked encoding is not supported, so a
/// response that cannot state its length up front cannot be sent.
pub struct ResponseWriter<'a> {
    stream: &'a mut (dyn AsyncWrite + Unpin + Send),
    headers: Headers,
    state: WriterState,
    status: Option<StatusCode>,
    line_terminated: bool,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(stream: &'a mut (dyn AsyncWrite + Unpin + Send)) -> Self {
        Self {
            stream,
            headers: Headers::new(),
            state: WriterState::HeaderPending,
            status: None,
            line_terminated: false,
        }
    }

    /// Appends CRLF after the body. The terminator is not counted in
    /// `Content-Length`.
    pub fn line_terminated(mut self, enabled: bool) -> Self {
        self.line_terminated = enabled;
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// The status that was sent, once headers are out.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn is_header_sent(&self) -> bool {
        self.state != WriterState::HeaderPending
    }

    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ResponseError> {
        if self.is_header_sent() {
            return Err(ResponseError::HeaderAlreadySent);
        }
        self.headers.set(name, value);
        Ok(())
    }

    /// Sends the status line and headers.
    ///
    /// Fails without writing anything if `Content-Length` is missing or
    /// unparsable.
    pub async fn write_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        if self.is_header_sent() {
            return Err(ResponseError::HeaderAlreadySent);
        }

        let declared = self
            .headers
            .get("Content-Length")
            .ok_or(ResponseError::MissingContentLength)?;
        let content_length = declared
            .trim()
            .parse::<usize>()
            .map_err(|_| ResponseError::InvalidContentLength(declared.to_string()))?;

        let head = serialize_head(status, &self.headers);
        self.stream.write_all(&head).await?;
        self.stream.flush().await?;

        self.status = Some(status);
        self.state = WriterState::HeaderSent { content_length };
        Ok(())
    }

    /// Writes the whole body.
    ///
    /// When headers are still pending, `Content-Length` is set to
    /// `body.len()` and a `200 OK` status goes out first.
    pub async fn write(&mut self, body: &[u8]) -> Result<usize, ResponseError> {
        if self.state == WriterState::HeaderPending {
            self.headers.set("Content-Length", body.len().to_string());
            self.write_status(StatusCode::Ok).await?;
        }

        match self.state {
            WriterState::HeaderSent { content_length } if content_length != body.len() => {
                Err(ResponseError::LengthMismatch {
                    declared: content_length,
                    actual: body.len(),
                })
            }
            WriterState::HeaderSent { .. } => self.write_body(body).await,
            WriterState::Finished => Err(ResponseError::BodyAlreadyWritten),
            WriterState::HeaderPending => unreachable!("status was just written"),
        }
    }

    /// Sends a complete response: its headers are merged over the pending
    /// ones, then status and body are written.
    pub async fn send(&mut self, response: Response) -> Result<(), ResponseError> {
        if self.is_header_sent() {
            return Err(ResponseError::HeaderAlreadySent);
        }
        for (name, value) in response.headers.iter() {
            self.headers.set(name, value);
        }
        self.write_status(response.status).await?;
        self.write(&response.body).await?;
        Ok(())
    }

    /// Completes a response the handler left unfinished.
    ///
    /// A response nobody touched becomes an empty `200 OK`. A response whose
    /// headers went out but whose body never did is a framing error.
    pub async fn finish(&mut self) -> Result<(), ResponseError> {
        match self.state {
            WriterState::HeaderPending => {
                self.headers.set("Content-Length", "0");
                self.write_status(StatusCode::Ok).await?;
                self.state = WriterState::Finished;
                Ok(())
            }
            WriterState::HeaderSent { content_length: 0 } => {
                self.state = WriterState::Finished;
                Ok(())
            }
            WriterState::HeaderSent { content_length } => Err(ResponseError::LengthMismatch {
                declared: content_length,
                actual: 0,
            }),
            WriterState::Finished => Ok(()),
        }
    }

    async fn write_body(&mut self, body: &[u8]) -> Result<usize, ResponseError> {
        self.stream.write_all(body).await?;
        if self.line_terminated {
            self.stream.write_all(b"\r\n").await?;
        }
        self.stream.flush().await?;
        self.state = WriterState::Finished;
        Ok(body.len())
    }
}
