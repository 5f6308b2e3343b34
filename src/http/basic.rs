//! Basic authentication credentials.
//!
//! `Authorization: Basic <base64(user:pass)>` on the way out, and the strict
//! inverse on the way in: anything that is not exactly a Basic scheme with a
//! base64 payload holding a colon is rejected.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

const SCHEME: &str = "Basic";

/// A username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Why an `Authorization` header was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicAuthError {
    /// The header is not of the Basic scheme.
    WrongScheme,
    /// The payload is not valid base64.
    InvalidEncoding,
    /// The decoded payload is not UTF-8 or has no colon.
    MalformedPayload,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The `user:pass` secret that gets encoded on the wire.
    pub fn secret(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }

    /// Splits a `user:pass` secret on its first colon.
    pub fn from_secret(secret: &str) -> Option<Self> {
        secret
            .split_once(':')
            .map(|(user, pass)| Self::new(user, pass))
    }

    /// The full `Authorization` header value.
    ///
    /// ```
    /// # use basichttp::http::basic::Credentials;
    /// let creds = Credentials::new("Aladdin", "open sesame");
    /// assert_eq!(creds.header_value(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    /// ```
    pub fn header_value(&self) -> String {
        format!("{} {}", SCHEME, BASE64.encode(self.secret()))
    }

    /// Decodes an `Authorization` header value.
    ///
    /// The scheme name is matched case-insensitively. The password is
    /// everything after the first colon, so it may itself contain colons.
    pub fn from_header(value: &str) -> Result<Self, BasicAuthError> {
        let value = value.trim();
        let (scheme, payload) = value
            .split_once(' ')
            .ok_or(BasicAuthError::WrongScheme)?;

        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(BasicAuthError::WrongScheme);
        }

        let decoded = BASE64
            .decode(payload.trim())
            .map_err(|_| BasicAuthError::InvalidEncoding)?;
        let secret = String::from_utf8(decoded).map_err(|_| BasicAuthError::MalformedPayload)?;

        Self::from_secret(&secret).ok_or(BasicAuthError::MalformedPayload)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
