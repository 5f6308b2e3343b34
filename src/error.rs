//! Error types for every layer of the crate.
//!
//! Registration, framing, server lifecycle and client failures each get their
//! own enum so callers can match on the exact failure without string
//! inspection.

use std::io;

use thiserror::Error;

use crate::http::parser::ParseError;

/// Errors raised while registering handlers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The path was empty.
    #[error("empty path")]
    InvalidPath,

    /// No handler was supplied.
    #[error("missing handler for {0}")]
    InvalidHandler(String),

    /// A handler is already registered for this exact path.
    #[error("handler for {0} already exists")]
    DuplicatePath(String),
}

/// Errors raised by [`ResponseWriter`](crate::http::writer::ResponseWriter).
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Headers can no longer be changed once the status line went out.
    #[error("header already sent")]
    HeaderAlreadySent,

    /// The status line was requested before a `Content-Length` was set.
    #[error("Content-Length must be set before the status line is written")]
    MissingContentLength,

    /// The `Content-Length` header does not hold a valid byte count.
    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),

    /// The body does not have the declared size.
    #[error("Content-Length mismatch (header: {declared}, actual: {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The body has already been written for this response.
    #[error("response body already written")]
    BodyAlreadyWritten,

    /// The underlying stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors raised by the connection supervisor.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The server was closed and cannot listen again.
    #[error("server closed")]
    AlreadyClosed,

    /// `serve` was called before `bind`.
    #[error("server is not listening")]
    NotListening,

    /// Binding the listening socket failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// A non-transient accept failure ended the accept loop.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// One or more sockets failed to close.
    #[error("{} error(s) while closing: {}", .0.len(), join_errors(.0))]
    Close(Vec<io::Error>),
}

/// Errors raised by the client session manager.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("url has no host: {0}")]
    MissingHost(String),

    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("malformed response: {0:?}")]
    Decode(ParseError),

    #[error("connection closed before complete response received")]
    ConnectionClosed,

    /// Every credential attempt was rejected or the provider gave up.
    #[error("authentication failed for {url} after {attempts} attempt(s)")]
    AuthenticationFailed { url: String, attempts: u32 },

    /// The credential provider itself failed.
    #[error("credential provider failed: {0}")]
    Credentials(#[source] anyhow::Error),

    #[error("{} error(s) while closing: {}", .0.len(), join_errors(.0))]
    Close(Vec<io::Error>),
}

fn join_errors(errors: &[io::Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
