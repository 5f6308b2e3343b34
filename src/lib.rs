//! basichttp - a small HTTP/1.1 server and client.
//!
//! The server dispatches requests to exact-path handlers, optionally behind
//! Basic authentication, and frames every response with a declared
//! `Content-Length`. The client keeps one connection per host alive and
//! retries requests refused with 401 using cached or freshly supplied
//! credentials.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod routing;
pub mod server;

pub use client::Client;
pub use error::{ClientError, ResponseError, RouteError, ServerError};
pub use routing::{AuthRouter, Router};
pub use server::Server;
