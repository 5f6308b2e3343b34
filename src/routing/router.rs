use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RouteError;
use crate::http::handler::{Handler, SharedHandler};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Answers every request with the fixed `404 page not found` response.
pub struct NotFound;

#[async_trait]
impl Handler for NotFound {
    async fn serve(&self, _req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        w.send(Response::not_found()).await?;
        Ok(())
    }
}

/// Exact-path handler table.
///
/// A path matches only if it is byte-for-byte equal to a registered one;
/// there are no wildcards, prefixes or normalisation. Everything else goes to
/// the [`NotFound`] handler.
///
/// Populate the router before handing it to a server; it is read-only once
/// requests are being served.
pub struct Router {
    routes: HashMap<String, SharedHandler>,
    not_found: SharedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            not_found: Arc::new(NotFound),
        }
    }

    /// Registers `handler` for `path`.
    ///
    /// Fails without touching the table if the path is empty, the handler is
    /// missing, or the path is already taken.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        handler: Option<SharedHandler>,
    ) -> Result<(), RouteError> {
        let path = path.into();
        if path.is_empty() {
            return Err(RouteError::InvalidPath);
        }
        let handler = handler.ok_or_else(|| RouteError::InvalidHandler(path.clone()))?;

        if self.routes.contains_key(&path) {
            return Err(RouteError::DuplicatePath(path));
        }

        tracing::debug!(path = %path, "Registered handler");
        self.routes.insert(path, handler);
        Ok(())
    }

    /// Shorthand for [`register`](Self::register) with a concrete handler.
    pub fn route(
        &mut self,
        path: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<(), RouteError> {
        self.register(path, Some(Arc::new(handler)))
    }

    /// The handler for `path`, or the not-found handler.
    pub fn dispatch(&self, path: &str) -> SharedHandler {
        self.routes
            .get(path)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.not_found))
    }

    /// The handler unregistered paths resolve to.
    pub fn not_found(&self) -> SharedHandler {
        Arc::clone(&self.not_found)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for Router {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        self.dispatch(req.route_path()).serve(req, w).await
    }
}
