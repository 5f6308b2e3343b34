//! HTTP/1.1 client with per-host persistent connections and a Basic
//! authentication retry protocol.
//!
//! - **`session`**: the [`Client`] itself: connection pool, keep-alive
//!   negotiation, authentication retries
//! - **`conn`**: one pooled connection
//! - **`request`**: outbound request and its wire encoding
//! - **`credentials`**: credential providers and the per-URL cache

pub mod conn;
pub mod credentials;
pub mod request;
pub mod session;

pub use credentials::{Challenge, CredentialCache, CredentialProvider, Prompt};
pub use request::{ClientRequest, KeepAlive};
pub use session::Client;
