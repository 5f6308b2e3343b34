//! Tests for the length-checked response emitter

use basichttp::error::ResponseError;
use basichttp::http::response::{Response, StatusCode};
use basichttp::http::writer::{write_bad_request, ResponseWriter, WriterState, BAD_REQUEST};

fn text(out: &[u8]) -> String {
    String::from_utf8_lossy(out).into_owned()
}

#[tokio::test]
async fn test_implicit_status_from_first_write() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.set_header("Content-Type", "text/plain").unwrap();
        assert_eq!(w.write(b"hi").await.unwrap(), 2);
        assert_eq!(w.state(), WriterState::Finished);
        assert_eq!(w.status(), Some(StatusCode::Ok));
    }

    assert_eq!(
        text(&out),
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi"
    );
}

#[tokio::test]
async fn test_implicit_write_overrides_stale_length() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.set_header("Content-Length", "99").unwrap();
        w.write(b"abc").await.unwrap();
    }

    assert!(text(&out).contains("Content-Length: 3\r\n"));
}

#[tokio::test]
async fn test_status_requires_declared_length() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        let err = w.write_status(StatusCode::Ok).await.unwrap_err();
        assert!(matches!(err, ResponseError::MissingContentLength));
        assert_eq!(w.state(), WriterState::HeaderPending);
    }

    assert!(out.is_empty());
}

#[tokio::test]
async fn test_status_rejects_unparsable_length() {
    let mut out = Vec::new();
    let mut w = ResponseWriter::new(&mut out);
    w.set_header("Content-Length", "two").unwrap();

    let err = w.write_status(StatusCode::Ok).await.unwrap_err();
    assert!(matches!(err, ResponseError::InvalidContentLength(v) if v == "two"));
}

#[tokio::test]
async fn test_length_mismatch_writes_no_body() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.set_header("Content-Length", "5").unwrap();
        w.write_status(StatusCode::Ok).await.unwrap();

        let err = w.write(b"hi").await.unwrap_err();
        assert!(matches!(
            err,
            ResponseError::LengthMismatch { declared: 5, actual: 2 }
        ));
        assert_eq!(w.state(), WriterState::HeaderSent { content_length: 5 });
    }

    // Only the head reached the stream.
    assert_eq!(text(&out), "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n");
}

#[tokio::test]
async fn test_header_transition_happens_once() {
    let mut out = Vec::new();
    let mut w = ResponseWriter::new(&mut out);
    w.set_header("Content-Length", "0").unwrap();
    w.write_status(StatusCode::NoContent).await.unwrap();

    assert!(matches!(
        w.write_status(StatusCode::Ok).await,
        Err(ResponseError::HeaderAlreadySent)
    ));
    assert!(matches!(
        w.set_header("X-Late", "1"),
        Err(ResponseError::HeaderAlreadySent)
    ));
}

#[tokio::test]
async fn test_second_body_write_is_rejected() {
    let mut out = Vec::new();
    let mut w = ResponseWriter::new(&mut out);
    w.write(b"once").await.unwrap();

    assert!(matches!(
        w.write(b"once").await,
        Err(ResponseError::BodyAlreadyWritten)
    ));
}

#[tokio::test]
async fn test_explicit_status_then_exact_body() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.set_header("Content-Length", "9").unwrap();
        w.write_status(StatusCode::NotFound).await.unwrap();
        w.write(b"not here!").await.unwrap();
    }

    assert_eq!(
        text(&out),
        "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot here!"
    );
}

#[tokio::test]
async fn test_line_terminated_body_not_counted() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out).line_terminated(true);
        w.write(b"hi").await.unwrap();
    }

    assert!(text(&out).ends_with("Content-Length: 2\r\n\r\nhi\r\n"));
}

#[tokio::test]
async fn test_send_merges_headers_over_pending() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.set_header("Connection", "close").unwrap();
        w.send(Response::unauthorized()).await.unwrap();
    }

    let s = text(&out);
    assert!(s.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
    assert!(s.contains("Connection: close\r\n"));
    assert!(s.contains("WWW-Authenticate: Basic\r\n"));
    assert!(s.contains("Content-Length: 16\r\n"));
    assert!(s.ends_with("\r\n\r\n401 Unauthorized"));
}

#[tokio::test]
async fn test_finish_untouched_response_is_empty_ok() {
    let mut out = Vec::new();
    {
        let mut w = ResponseWriter::new(&mut out);
        w.finish().await.unwrap();
        assert_eq!(w.state(), WriterState::Finished);
    }

    assert_eq!(text(&out), "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[tokio::test]
async fn test_finish_reports_missing_body() {
    let mut out = Vec::new();
    let mut w = ResponseWriter::new(&mut out);
    w.set_header("Content-Length", "4").unwrap();
    w.write_status(StatusCode::Ok).await.unwrap();

    assert!(matches!(
        w.finish().await,
        Err(ResponseError::LengthMismatch { declared: 4, actual: 0 })
    ));
}

#[tokio::test]
async fn test_bad_request_is_correctly_framed() {
    let mut out = Vec::new();
    write_bad_request(&mut out).await.unwrap();

    assert_eq!(out, BAD_REQUEST);
    let s = text(&out);
    let (head, body) = s.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 400 Bad Request"));
    assert!(head.contains("Content-Length: 15"));
    assert!(head.contains("Connection: close"));
    assert_eq!(body, "400 Bad Request");
}
