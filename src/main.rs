use std::sync::Arc;

use async_trait::async_trait;
use basichttp::config::Config;
use basichttp::http::handler::Handler;
use basichttp::http::request::Request;
use basichttp::http::writer::ResponseWriter;
use basichttp::routing::AuthRouter;
use basichttp::server::{Server, ServerOptions};

const HOME_PAGE: &str = "<!DOCTYPE html>\n<html><body><h1>hi</h1></body></html>\n";

struct Page(&'static str);

#[async_trait]
impl Handler for Page {
    async fn serve(&self, _req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        w.set_header("Content-Type", "text/html")?;
        w.write(self.0.as_bytes()).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let mut router = AuthRouter::new();
    router.route("/home", Page(HOME_PAGE))?;

    let users = Arc::new(cfg.server.users.clone());
    router.route_gated("/private", Page("private\n"), move |user, pass| {
        users.get(user).is_some_and(|expected| expected == pass)
    })?;

    let server = Server::with_options(router, ServerOptions::from(&cfg.server));

    tokio::select! {
        res = server.listen_and_serve(&cfg.server.listen_addr) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    server.close()?;
    Ok(())
}
