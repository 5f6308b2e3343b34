//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 message layer and the per-connection
//! serve loop.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: decodes requests and response heads from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`headers`**: ordered, case-insensitive header fields
//! - **`writer`**: the length-checked response emitter
//! - **`handler`**: the trait every handler, router and gate implements
//! - **`basic`**: Basic authentication credentials
//!
//! # Connection State Machine
//!
//! Each accepted connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request decoded          (malformed → 400, Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Handler writes through ResponseWriter
//!        └──────┬───────────┘
//!               │ Response written
//!               ├─ persistent → Reading (same connection)
//!               └─ Connection: close → Closed
//! ```
//!
//! # Response State Machine
//!
//! ```text
//!   HeaderPending ──write_status / write──▶ HeaderSent ──write──▶ Finished
//! ```
//!
//! `write_status` needs a `Content-Length`; `write` must supply exactly that
//! many bytes.
//!
//! # Example
//!
//! ```no_run
//! use basichttp::http::connection::Connection;
//! use basichttp::routing::Router;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let router = Arc::new(Router::new());
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let handler = router.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, handler);
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod basic;
pub mod connection;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
