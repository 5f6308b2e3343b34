//! Request routing.
//!
//! - **`router`**: exact-path handler table with a built-in 404 handler
//! - **`auth`**: Basic authentication gate, usable as a decorator on any
//!   handler or through [`AuthRouter::register_gated`]

pub mod auth;
pub mod router;

pub use auth::{AuthRouter, BasicAuth, Verifier};
pub use router::{NotFound, Router};
