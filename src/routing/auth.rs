use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::RouteError;
use crate::http::basic::Credentials;
use crate::http::handler::{Handler, SharedHandler};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::routing::router::Router;

/// Decides whether a username/password pair may pass.
pub type Verifier = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Wraps a handler behind a Basic authentication check.
///
/// Missing, malformed or rejected credentials get the fixed 401 response
/// with `WWW-Authenticate: Basic`; the wrapped handler only ever runs for
/// requests whose credentials `verify` accepted.
pub struct BasicAuth<H> {
    inner: H,
    verify: Verifier,
}

impl<H> BasicAuth<H> {
    pub fn new(inner: H, verify: Verifier) -> Self {
        Self { inner, verify }
    }
}

#[async_trait]
impl<H: Handler> Handler for BasicAuth<H> {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        let credentials = match req.header("Authorization").map(Credentials::from_header) {
            Some(Ok(credentials)) => credentials,
            Some(Err(e)) => {
                debug!(path = %req.path, reason = ?e, "Rejected Authorization header");
                return challenge(w).await;
            }
            None => return challenge(w).await,
        };

        if !(self.verify)(&credentials.username, &credentials.password) {
            debug!(path = %req.path, user = %credentials.username, "Credentials refused");
            return challenge(w).await;
        }

        self.inner.serve(req, w).await
    }
}

async fn challenge(w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
    w.send(Response::unauthorized()).await?;
    Ok(())
}

/// A [`Router`] whose routes may each be gated by Basic authentication.
#[derive(Default)]
pub struct AuthRouter {
    router: Router,
}

impl AuthRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `path`, gated by `verify` when one is given.
    ///
    /// Without a verifier this is a plain [`Router::register`]. Registration
    /// errors are the same as the router's.
    pub fn register_gated(
        &mut self,
        path: impl Into<String>,
        handler: Option<SharedHandler>,
        verify: Option<Verifier>,
    ) -> Result<(), RouteError> {
        let path = path.into();
        if path.is_empty() {
            return Err(RouteError::InvalidPath);
        }
        let handler = handler.ok_or_else(|| RouteError::InvalidHandler(path.clone()))?;

        let handler: SharedHandler = match verify {
            Some(verify) => Arc::new(BasicAuth::new(handler, verify)),
            None => handler,
        };
        self.router.register(path, Some(handler))
    }

    /// Shorthand for a gated route with a closure verifier.
    pub fn route_gated<F>(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler + 'static,
        verify: F,
    ) -> Result<(), RouteError>
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.register_gated(path, Some(Arc::new(handler)), Some(Arc::new(verify)))
    }

    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: Option<SharedHandler>,
    ) -> Result<(), RouteError> {
        self.register_gated(path, handler, None)
    }

    pub fn route(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.router.route(path, handler)
    }

    pub fn dispatch(&self, path: &str) -> SharedHandler {
        self.router.dispatch(path)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl Handler for AuthRouter {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        self.router.serve(req, w).await
    }
}
