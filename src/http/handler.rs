use std::sync::Arc;

use async_trait::async_trait;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// Something that answers a request by writing through a [`ResponseWriter`].
///
/// Routers and gates implement this too, so they can wrap each other and any
/// handler without the wrapped side noticing.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use basichttp::http::handler::Handler;
/// use basichttp::http::request::Request;
/// use basichttp::http::writer::ResponseWriter;
///
/// struct Hello;
///
/// #[async_trait]
/// impl Handler for Hello {
///     async fn serve(&self, _req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
///         w.set_header("Content-Type", "text/plain")?;
///         w.write(b"hi").await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()>;
}

pub type SharedHandler = Arc<dyn Handler>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        (**self).serve(req, w).await
    }
}
