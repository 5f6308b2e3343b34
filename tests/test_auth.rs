//! Tests for the Basic authentication gate

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use basichttp::error::RouteError;
use basichttp::http::basic::Credentials;
use basichttp::http::handler::{Handler, SharedHandler};
use basichttp::http::request::{Method, Request, RequestBuilder};
use basichttp::http::writer::ResponseWriter;
use basichttp::routing::{AuthRouter, BasicAuth, Verifier};

/// Counts how often it ran, so tests can prove the gate held.
struct Counted {
    hits: Arc<AtomicUsize>,
}

#[async_trait]
impl Handler for Counted {
    async fn serve(&self, req: &Request, w: &mut ResponseWriter<'_>) -> anyhow::Result<()> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let body = format!("welcome {}", req.path);
        w.write(body.as_bytes()).await?;
        Ok(())
    }
}

fn alice_only() -> Verifier {
    Arc::new(|user: &str, pass: &str| user == "alice" && pass == "wonder:land")
}

fn gated_router() -> (AuthRouter, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut router = AuthRouter::new();
    router
        .register_gated(
            "/secret",
            Some(Arc::new(Counted { hits: hits.clone() })),
            Some(alice_only()),
        )
        .unwrap();
    (router, hits)
}

fn request(path: &str, authorization: Option<&str>) -> Request {
    let mut builder = RequestBuilder::new().method(Method::GET).path(path);
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.build().unwrap()
}

async fn render(handler: &dyn Handler, req: &Request) -> String {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        handler.serve(req, &mut w).await.unwrap();
    }
    String::from_utf8(out).unwrap()
}

fn assert_challenge(out: &str) {
    assert!(out.starts_with("HTTP/1.1 401 Unauthorized\r\n"), "{out}");
    assert!(out.contains("WWW-Authenticate: Basic\r\n"));
    assert!(out.contains("Content-Length: 16\r\n"));
    assert!(out.ends_with("\r\n\r\n401 Unauthorized"));
}

#[tokio::test]
async fn test_missing_authorization_is_challenged() {
    let (router, hits) = gated_router();

    let out = render(&router, &request("/secret", None)).await;

    assert_challenge(&out);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_valid_credentials_reach_handler() {
    let (router, hits) = gated_router();
    let header = Credentials::new("alice", "wonder:land").header_value();

    let out = render(&router, &request("/secret", Some(&header))).await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("welcome /secret"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_credentials_are_challenged() {
    let (router, hits) = gated_router();
    let header = Credentials::new("alice", "wrong").header_value();

    let out = render(&router, &request("/secret", Some(&header))).await;

    assert_challenge(&out);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_authorization_is_challenged() {
    let (router, hits) = gated_router();
    let no_colon = format!("Basic {}", BASE64.encode("alice"));

    for header in ["Bearer token", "Basic ###", no_colon.as_str(), "Basic"] {
        let out = render(&router, &request("/secret", Some(header))).await;
        assert_challenge(&out);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ungated_route_needs_no_credentials() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut router = AuthRouter::new();
    router
        .register_gated("/open", Some(Arc::new(Counted { hits: hits.clone() })), None)
        .unwrap();

    let out = render(&router, &request("/open", None)).await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_path_is_not_found_not_challenged() {
    let (router, _) = gated_router();

    let out = render(&router, &request("/elsewhere", None)).await;

    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn test_gate_wraps_any_handler() {
    let hits = Arc::new(AtomicUsize::new(0));
    let inner: SharedHandler = Arc::new(Counted { hits: hits.clone() });
    let gate = BasicAuth::new(inner, alice_only());

    let denied = render(&gate, &request("/x", None)).await;
    assert_challenge(&denied);

    let header = Credentials::new("alice", "wonder:land").header_value();
    let allowed = render(&gate, &request("/x", Some(&header))).await;
    assert!(allowed.ends_with("welcome /x"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_register_gated_validates_like_router() {
    let mut router = AuthRouter::new();
    let handler: SharedHandler = Arc::new(Counted {
        hits: Arc::new(AtomicUsize::new(0)),
    });

    assert_eq!(
        router.register_gated("", Some(handler.clone()), Some(alice_only())),
        Err(RouteError::InvalidPath)
    );
    assert_eq!(
        router.register_gated("/secret", None, Some(alice_only())),
        Err(RouteError::InvalidHandler("/secret".to_string()))
    );

    router
        .register_gated("/secret", Some(handler.clone()), Some(alice_only()))
        .unwrap();
    assert_eq!(
        router.register_gated("/secret", Some(handler), None),
        Err(RouteError::DuplicatePath("/secret".to_string()))
    );
}
