use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::ResponseError;
use crate::http::handler::SharedHandler;
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{write_bad_request, ResponseWriter};

/// One accepted connection and the loop that serves it.
///
/// Requests are strictly serialized: the next one is not decoded until the
/// current response has been written.
pub struct Connection<S> {
    stream: S,
    buffer: Vec<u8>,
    state: ConnectionState,
    handler: SharedHandler,
    line_terminated: bool,
}

pub enum ConnectionState {
    Reading,
    Dispatching(Request),
    Closed,
}

/// What a read attempt produced.
enum ReadOutcome {
    Request(Request),
    /// Peer closed the connection between requests.
    Eof,
    Malformed(ParseError),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, handler: SharedHandler) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(4096),
            state: ConnectionState::Reading,
            handler,
            line_terminated: false,
        }
    }

    /// Terminate every body with CRLF. See [`ResponseWriter::line_terminated`].
    pub fn line_terminated(mut self, enabled: bool) -> Self {
        self.line_terminated = enabled;
        self
    }

    /// Serves requests until the peer leaves, asks to close, or sends
    /// something undecodable.
    ///
    /// Errors are transport failures; they end this connection only.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        ReadOutcome::Request(req) => ConnectionState::Dispatching(req),
                        ReadOutcome::Eof => ConnectionState::Closed,
                        ReadOutcome::Malformed(e) => {
                            debug!(error = ?e, "Malformed request, answering 400");
                            write_bad_request(&mut self.stream).await?;
                            ConnectionState::Closed
                        }
                    };
                }

                ConnectionState::Dispatching(req) => {
                    let keep_alive = req.keep_alive();
                    self.dispatch(&req, keep_alive).await?;

                    self.state = if keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    };
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        self.stream.shutdown().await.ok();
        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.drain(..consumed);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data
                }

                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            let mut temp = [0u8; 4096];
            let n = self.stream.read(&mut temp).await?;

            if n == 0 {
                // A request cut off mid-way is malformed; an idle close is not.
                if self.buffer.iter().all(|b| matches!(b, b'\r' | b'\n')) {
                    return Ok(ReadOutcome::Eof);
                }
                return Ok(ReadOutcome::Malformed(ParseError::Incomplete));
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }

    async fn dispatch(&mut self, req: &Request, keep_alive: bool) -> anyhow::Result<()> {
        let mut writer = ResponseWriter::new(&mut self.stream).line_terminated(self.line_terminated);
        if !keep_alive {
            writer.set_header("Connection", "close")?;
        } else if req.version == "HTTP/1.0" {
            // 1.0 peers only stay open when told so.
            writer.set_header("Connection", "keep-alive")?;
        }

        let result = self.handler.serve(req, &mut writer).await;

        match result {
            Ok(()) => {
                if let Err(e) = writer.finish().await {
                    return Self::contain(e, req);
                }
            }
            Err(e) => {
                if let Some(ResponseError::Io(_)) = e.downcast_ref::<ResponseError>() {
                    return Err(e);
                }
                warn!(path = %req.path, error = %e, "Handler failed");

                if !writer.is_header_sent() {
                    writer.send(Response::internal_error()).await?;
                }
            }
        }

        debug!(
            method = ?req.method,
            path = %req.path,
            status = writer.status().map(|s| s.as_u16()),
            "Request served"
        );
        Ok(())
    }

    // Framing errors stay local to their response; I/O errors end the connection.
    fn contain(e: ResponseError, req: &Request) -> anyhow::Result<()> {
        match e {
            ResponseError::Io(e) => Err(e.into()),
            e => {
                warn!(path = %req.path, error = %e, "Response framing error");
                Ok(())
            }
        }
    }
}
