use std::io;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::ClientError;
use crate::http::parser::{parse_response_head, ParseError, MAX_BODY_SIZE};
use crate::http::response::Response;

/// Default buffer size for reads
const BUFFER_SIZE: usize = 8192;

/// One outbound connection to a host.
///
/// Bytes read past the end of a response stay in the buffer for the next one.
pub struct ServerConn {
    stream: TcpStream,
    buffer: BytesMut,
    reusable: bool,
}

impl ServerConn {
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(BUFFER_SIZE),
            reusable: true,
        })
    }

    /// Whether another request may be sent on this connection.
    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    /// Writes a serialized request and reads the full response to it.
    ///
    /// Bodies larger than [`MAX_BODY_SIZE`] are refused.
    ///
    /// `expect_body` is false for requests whose responses never carry a body
    /// (HEAD).
    pub async fn exchange(
        &mut self,
        request: &[u8],
        expect_body: bool,
    ) -> Result<Response, ClientError> {
        let result = self.try_exchange(request, expect_body).await;
        if result.is_err() {
            self.reusable = false;
        }
        result
    }

    async fn try_exchange(
        &mut self,
        request: &[u8],
        expect_body: bool,
    ) -> Result<Response, ClientError> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;

        let (head, consumed) = loop {
            match parse_response_head(&self.buffer) {
                Ok(parsed) => break parsed,
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(ClientError::Decode(e)),
            }
            self.fill().await?;
        };
        self.buffer.advance(consumed);

        let content_length = head.content_length().map_err(ClientError::Decode)?;
        let body = if !expect_body || head.status.is_bodyless() {
            Vec::new()
        } else if let Some(len) = content_length {
            if len > MAX_BODY_SIZE {
                return Err(ClientError::Decode(ParseError::TooLarge));
            }
            while self.buffer.len() < len {
                self.fill().await?;
            }
            self.buffer.split_to(len).to_vec()
        } else {
            // No length: the body runs until the server closes.
            self.reusable = false;
            while self.stream.read_buf(&mut self.buffer).await? != 0 {
                if self.buffer.len() > MAX_BODY_SIZE {
                    return Err(ClientError::Decode(ParseError::TooLarge));
                }
            }
            self.buffer.split().to_vec()
        };

        if head.headers.has_token("Connection", "close") {
            self.reusable = false;
        }

        Ok(Response {
            status: head.status,
            headers: head.headers,
            body,
        })
    }

    async fn fill(&mut self) -> Result<(), ClientError> {
        let n = self.stream.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(())
    }

    /// Sends FIN and drops the socket.
    pub async fn close(mut self) -> io::Result<()> {
        match self.stream.shutdown().await {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}
