use url::Url;

use crate::error::ClientError;
use crate::http::headers::Headers;
use crate::http::request::Method;

/// Headers the client always writes itself.
const MANAGED_HEADERS: [&str; 3] = ["Host", "Connection", "Keep-Alive"];

/// Keep-alive negotiation settings.
///
/// `timeout` and `max` are only advertised when keep-alive is on and they
/// are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub enabled: bool,
    pub timeout: u32,
    pub max: u32,
}

impl Default for KeepAlive {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: 0,
            max: 0,
        }
    }
}

impl KeepAlive {
    /// Value of the advisory `Keep-Alive` header, if any.
    pub fn header_value(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        match (self.timeout, self.max) {
            (0, 0) => None,
            (t, 0) => Some(format!("timeout={}", t)),
            (0, m) => Some(format!("max={}", m)),
            (t, m) => Some(format!("timeout={}, max={}", t, m)),
        }
    }
}

/// An outbound request.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl ClientRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: &str) -> Result<Self, ClientError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// `host:port` of the target, used both to dial and as the pool key.
    pub fn host_key(&self) -> Result<String, ClientError> {
        if self.url.scheme() != "http" {
            return Err(ClientError::UnsupportedScheme(self.url.scheme().to_string()));
        }
        let host = self
            .url
            .host_str()
            .ok_or_else(|| ClientError::MissingHost(self.url.to_string()))?;
        let port = self.url.port_or_known_default().unwrap_or(80);
        Ok(format!("{}:{}", host, port))
    }

    /// Value of the `Host` header: the port is only included when explicit.
    pub fn host_header(&self) -> Option<String> {
        let host = self.url.host_str()?;
        Some(match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// The request target: path plus query.
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// Serializes the request as it goes on the wire.
    pub fn encode(&self, keep_alive: &KeepAlive) -> Vec<u8> {
        let mut buffer = Vec::new();

        // Request line
        buffer.extend_from_slice(
            format!("{} {} HTTP/1.1\r\n", self.method.as_str(), self.target()).as_bytes(),
        );

        let mut headers = Headers::new();
        if let Some(host) = self.host_header() {
            headers.set("Host", host);
        }
        for (key, value) in self.headers.iter() {
            if !MANAGED_HEADERS.iter().any(|m| m.eq_ignore_ascii_case(key)) {
                headers.append(key, value);
            }
        }
        if !self.body.is_empty() && !headers.contains("Content-Length") {
            headers.set("Content-Length", self.body.len().to_string());
        }

        if keep_alive.enabled {
            headers.set("Connection", "keep-alive");
            if let Some(value) = keep_alive.header_value() {
                headers.set("Keep-Alive", value);
            }
        } else {
            headers.set("Connection", "close");
        }

        headers.write_to(&mut buffer);

        // End of headers
        buffer.extend_from_slice(b"\r\n");

        buffer.extend_from_slice(&self.body);
        buffer
    }
}
