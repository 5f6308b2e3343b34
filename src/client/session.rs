use std::collections::HashMap;
use std::io;

use tracing::{debug, info, warn};

use crate::client::conn::ServerConn;
use crate::client::credentials::{Challenge, CredentialCache, CredentialProvider, Prompt};
use crate::client::request::{ClientRequest, KeepAlive};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::request::Method;
use crate::http::response::{Response, StatusCode};

/// Default number of credential attempts after a 401.
pub const DEFAULT_AUTH_ATTEMPTS: u32 = 3;

/// HTTP/1.1 client with one persistent connection per host.
///
/// Requests are sent one at a time; each call owns the connection until the
/// full response has been read. A 401 on a request that carried no
/// credentials starts the authentication retry protocol:
///
/// 1. credentials cached for the exact URL are tried once, and evicted if
///    they are refused;
/// 2. the [`CredentialProvider`] is then asked up to `auth_attempts` times;
///    the first credentials that get a non-401 answer are cached.
///
/// The client is meant for a single caller. Wrap it in a mutex to share it.
pub struct Client {
    keep_alive: KeepAlive,
    auth_attempts: u32,
    servers: HashMap<String, ServerConn>,
    credentials: CredentialCache,
    provider: Box<dyn CredentialProvider>,
}

impl Client {
    /// A client that prompts on the terminal for credentials.
    pub fn new() -> Self {
        Self::with_credential_provider(Prompt::stdio())
    }

    pub fn with_credential_provider(provider: impl CredentialProvider + 'static) -> Self {
        Self {
            keep_alive: KeepAlive::default(),
            auth_attempts: DEFAULT_AUTH_ATTEMPTS,
            servers: HashMap::new(),
            credentials: CredentialCache::default(),
            provider: Box::new(provider),
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        let mut client = Self::new();
        client.apply_config(cfg);
        client
    }

    pub fn apply_config(&mut self, cfg: &ClientConfig) {
        self.set_keep_alive(cfg.keep_alive, cfg.keep_alive_timeout, cfg.keep_alive_max);
        self.set_auth_attempts(cfg.auth_attempts);
    }

    /// Turns keep-alive on or off. `timeout` and `max` are advisory values
    /// sent in the `Keep-Alive` header; 0 leaves one out. They are ignored
    /// when keep-alive is off.
    pub fn set_keep_alive(&mut self, enabled: bool, timeout: u32, max: u32) {
        self.keep_alive = if enabled {
            KeepAlive { enabled, timeout, max }
        } else {
            KeepAlive { enabled, ..self.keep_alive }
        };
    }

    pub fn keep_alive(&self) -> KeepAlive {
        self.keep_alive
    }

    pub fn set_auth_attempts(&mut self, attempts: u32) {
        self.auth_attempts = attempts;
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    /// Number of pooled connections.
    pub fn connection_count(&self) -> usize {
        self.servers.len()
    }

    /// Whether a pooled connection to `host:port` exists.
    pub fn is_connected(&self, host_key: &str) -> bool {
        self.servers.contains_key(host_key)
    }

    pub async fn get(&mut self, url: &str) -> Result<Response, ClientError> {
        self.execute(ClientRequest::get(url)?).await
    }

    /// Sends `req` and returns the final response, running the
    /// authentication retry protocol on a 401.
    pub async fn execute(&mut self, req: ClientRequest) -> Result<Response, ClientError> {
        let response = self.round_trip(&req).await?;

        if response.status == StatusCode::Unauthorized && !req.headers.contains("Authorization") {
            return self.authenticate(req).await;
        }
        Ok(response)
    }

    async fn authenticate(&mut self, mut req: ClientRequest) -> Result<Response, ClientError> {
        if let Some(cached) = self.credentials.get(&req.url).cloned() {
            debug!(url = %req.url, "Retrying with cached credentials");
            req.headers.set("Authorization", cached.header_value());

            let response = self.round_trip(&req).await?;
            if response.status != StatusCode::Unauthorized {
                return Ok(response);
            }

            warn!(url = %req.url, "Cached credentials rejected, evicting");
            self.credentials.remove(&req.url);
        }

        for attempt in 1..=self.auth_attempts {
            let challenge = Challenge {
                url: &req.url,
                attempt,
                max_attempts: self.auth_attempts,
            };
            let credentials = match self
                .provider
                .credentials(&challenge)
                .await
                .map_err(ClientError::Credentials)?
            {
                Some(credentials) => credentials,
                None => {
                    info!(url = %req.url, attempt, "Credential provider declined");
                    return Err(ClientError::AuthenticationFailed {
                        url: req.url.to_string(),
                        attempts: attempt - 1,
                    });
                }
            };

            req.headers.set("Authorization", credentials.header_value());
            let response = self.round_trip(&req).await?;

            if response.status != StatusCode::Unauthorized {
                debug!(url = %req.url, attempt, "Authenticated, caching credentials");
                self.credentials.insert(&req.url, credentials);
                return Ok(response);
            }
            warn!(url = %req.url, attempt, max = self.auth_attempts, "Credentials rejected");
        }

        Err(ClientError::AuthenticationFailed {
            url: req.url.to_string(),
            attempts: self.auth_attempts,
        })
    }

    /// One request/response exchange on the pooled connection for the host.
    async fn round_trip(&mut self, req: &ClientRequest) -> Result<Response, ClientError> {
        let host = req.host_key()?;
        let bytes = req.encode(&self.keep_alive);

        let mut conn = match self.servers.remove(&host) {
            Some(conn) => {
                debug!(host = %host, "Reusing connection");
                conn
            }
            None => {
                info!(host = %host, "Dialing");
                ServerConn::connect(&host).await?
            }
        };

        let result = conn.exchange(&bytes, req.method != Method::HEAD).await;

        if self.keep_alive.enabled && conn.is_reusable() {
            self.servers.insert(host, conn);
        } else {
            debug!(host = %host, "Closing connection");
            if let Err(e) = conn.close().await {
                warn!(host = %host, error = %e, "Failed to close connection");
            }
        }

        if let Ok(response) = &result {
            debug!(
                method = req.method.as_str(),
                url = %req.url,
                status = response.status.as_u16(),
                "Response received"
            );
        }
        result
    }

    /// Closes every pooled connection, collecting all failures.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        let mut errors: Vec<io::Error> = Vec::new();
        for (host, conn) in self.servers.drain() {
            debug!(host = %host, "Closing connection");
            if let Err(e) = conn.close().await {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Close(errors))
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
