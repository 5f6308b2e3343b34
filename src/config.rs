use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// Env var naming a YAML config file.
pub const CONFIG_ENV: &str = "BASICHTTP_CONFIG";

/// Env var overriding `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Terminate every response body with CRLF.
    pub line_terminated_bodies: bool,
    /// Username to password, checked by the demo's gated route.
    pub users: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub keep_alive: bool,
    /// Advertised in `Keep-Alive: timeout=`; 0 leaves it out.
    pub keep_alive_timeout: u32,
    /// Advertised in `Keep-Alive: max=`; 0 leaves it out.
    pub keep_alive_max: u32,
    /// Interactive credential attempts after a 401.
    pub auth_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            line_terminated_bodies: false,
            users: HashMap::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            keep_alive_timeout: 0,
            keep_alive_max: 0,
            auth_attempts: 3,
        }
    }
}

impl Config {
    /// Loads the file named by `BASICHTTP_CONFIG` (if set), then applies the
    /// `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        // An empty document means all defaults.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}
