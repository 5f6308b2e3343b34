use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use url::Url;

use crate::http::basic::Credentials;

/// Context handed to a [`CredentialProvider`] after a 401.
#[derive(Debug, Clone, Copy)]
pub struct Challenge<'a> {
    pub url: &'a Url,
    /// 1-based attempt number.
    pub attempt: u32,
    pub max_attempts: u32,
}

/// Supplies credentials for the authentication retry protocol.
///
/// Returning `Ok(None)` declines, which ends the retries.
#[async_trait]
pub trait CredentialProvider: Send {
    async fn credentials(
        &mut self,
        challenge: &Challenge<'_>,
    ) -> anyhow::Result<Option<Credentials>>;
}

/// Asks for a username and password line by line.
///
/// [`Prompt::stdio`] is the interactive terminal prompt.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Prompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Prints `label` and reads one line. `None` on end of input.
    async fn ask(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        self.output.write_all(label.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[async_trait]
impl<R, W> CredentialProvider for Prompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn credentials(
        &mut self,
        challenge: &Challenge<'_>,
    ) -> anyhow::Result<Option<Credentials>> {
        let banner = format!(
            "Authentication required for {} (attempt {}/{})\n",
            challenge.url, challenge.attempt, challenge.max_attempts
        );
        self.output.write_all(banner.as_bytes()).await?;

        let Some(username) = self.ask("Username: ").await? else {
            return Ok(None);
        };
        let Some(password) = self.ask("Password: ").await? else {
            return Ok(None);
        };
        Ok(Some(Credentials::new(username, password)))
    }
}

/// Credentials that worked, keyed by the exact request URL.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: HashMap<String, Credentials>,
}

impl CredentialCache {
    pub fn get(&self, url: &Url) -> Option<&Credentials> {
        self.entries.get(url.as_str())
    }

    pub fn insert(&mut self, url: &Url, credentials: Credentials) {
        self.entries.insert(url.as_str().to_string(), credentials);
    }

    pub fn remove(&mut self, url: &Url) -> Option<Credentials> {
        self.entries.remove(url.as_str())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries.contains_key(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prompt_reads_username_then_password() {
        let url = Url::parse("http://localhost/secret").unwrap();
        let mut out = Vec::new();
        let mut prompt = Prompt::new(&b"alice\r\nwonder:land\n"[..], &mut out);

        let challenge = Challenge { url: &url, attempt: 1, max_attempts: 3 };
        let creds = prompt.credentials(&challenge).await.unwrap().unwrap();

        assert_eq!(creds, Credentials::new("alice", "wonder:land"));
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Username: "));
        assert!(printed.contains("Password: "));
    }

    #[tokio::test]
    async fn prompt_declines_on_end_of_input() {
        let url = Url::parse("http://localhost/secret").unwrap();
        let mut prompt = Prompt::new(&b"alice\n"[..], Vec::new());

        let challenge = Challenge { url: &url, attempt: 1, max_attempts: 3 };
        assert!(prompt.credentials(&challenge).await.unwrap().is_none());
    }
}
