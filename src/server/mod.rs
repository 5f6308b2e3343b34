//! Connection supervisor: listening socket, accept loop, live-connection
//! tracking and bulk shutdown.

pub mod listener;

pub use listener::{Server, ServerOptions};
