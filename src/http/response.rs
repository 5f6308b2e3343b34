use crate::http::headers::Headers;

/// Plain-text content type used by the built-in responses.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP status codes.
///
/// The common codes have their own variant; anything else a peer sends is
/// carried in [`StatusCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 304 Not Modified
    NotModified,
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
    /// 502 Bad Gateway
    BadGateway,
    /// 503 Service Unavailable
    ServiceUnavailable,
    /// Any other code
    Other(u16),
}

impl StatusCode {
    /// Maps a numeric code to its variant.
    ///
    /// # Example
    ///
    /// ```
    /// # use basichttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(401), StatusCode::Unauthorized);
    /// assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            304 => StatusCode::NotModified,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            500 => StatusCode::InternalServerError,
            502 => StatusCode::BadGateway,
            503 => StatusCode::ServiceUnavailable,
            other => StatusCode::Other(other),
        }
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use basichttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::NotModified => 304,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use basichttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::Unauthorized.reason_phrase(), "Unauthorized");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::Other(_) => "Unknown",
        }
    }

    /// Whether a response with this status never carries a body.
    pub fn is_bodyless(&self) -> bool {
        let code = self.as_u16();
        (100..200).contains(&code) || code == 204 || code == 304
    }
}

/// A complete HTTP response.
///
/// Handlers can hand one to
/// [`ResponseWriter::send`](crate::http::writer::ResponseWriter::send); the
/// client returns one per exchange.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use basichttp::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.header("Content-Length"), Some("2"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        if !self.headers.contains("Content-Length") {
            self.headers.set("Content-Length", self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// The fixed `404 page not found` response.
    pub fn not_found() -> Self {
        Self::text(StatusCode::NotFound, "404 page not found")
    }

    /// The fixed `401 Unauthorized` response, carrying the Basic challenge.
    pub fn unauthorized() -> Self {
        let mut response = Self::text(StatusCode::Unauthorized, "401 Unauthorized");
        response.headers.set("WWW-Authenticate", "Basic");
        response
    }

    /// The fixed `500 Internal Server Error` response.
    pub fn internal_error() -> Self {
        Self::text(StatusCode::InternalServerError, "500 Internal Server Error")
    }

    fn text(status: StatusCode, body: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", TEXT_PLAIN)
            .body(body.as_bytes().to_vec())
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }
}
