// ABOUTME: Configuration options for the scraper including Options and ClientBuilder.
// ABOUTME: ClientBuilder provides a fluent API for constructing Client instances with custom settings.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::Client;
use crate::error::ScrapeError;
use crate::extractors::profile::ProfileRegistry;
use crate::resource::{Fetcher, HttpFetcher};

/// Default pause between consecutive fetches.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-like User-Agent sent unless overridden.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Static request headers sent with every fetch.
///
/// Accept-Encoding is left to the HTTP client, which advertises and decodes
/// gzip, brotli and deflate itself.
pub fn default_headers() -> HashMap<String, String> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Configuration options for a scraping client.
#[derive(Debug, Clone)]
pub struct Options {
    /// Pause observed between consecutive fetches of a batch.
    pub delay: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: HashMap<String, String>,
    pub http_client: Option<reqwest::Client>,
    pub registry: Option<ProfileRegistry>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: default_headers(),
            http_client: None,
            registry: None,
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the pause between consecutive fetches.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.opts.delay = delay;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Add or replace a header sent with every request.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Use a custom HTTP client. Its own timeout and User-Agent settings apply.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Set a custom profile registry instead of the built-in profiles.
    pub fn registry(mut self, reg: ProfileRegistry) -> Self {
        self.opts.registry = Some(reg);
        self
    }

    /// Build a Client that fetches over HTTP.
    pub fn build(self) -> Result<Client<HttpFetcher>, ScrapeError> {
        let fetcher = HttpFetcher::new(&self.opts)?;
        Client::new(self.opts, fetcher)
    }

    /// Build a Client around a caller-supplied fetch collaborator.
    pub fn build_with_fetcher<F: Fetcher>(self, fetcher: F) -> Result<Client<F>, ScrapeError> {
        Client::new(self.opts, fetcher)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_polite_browser_profile() {
        let opts = Options::default();
        assert_eq!(opts.delay, Duration::from_secs(2));
        assert_eq!(opts.timeout, Duration::from_secs(30));
        assert!(opts.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(
            opts.headers.get("Accept-Language").map(String::as_str),
            Some("en-US,en;q=0.5")
        );
        assert!(opts.registry.is_none());
    }

    #[test]
    fn builder_overrides_headers() {
        let builder = ClientBuilder::new()
            .delay(Duration::ZERO)
            .header("Accept-Language", "de-DE")
            .header("X-Trace", "1");
        assert_eq!(builder.opts.delay, Duration::ZERO);
        assert_eq!(builder.opts.headers["Accept-Language"], "de-DE");
        assert_eq!(builder.opts.headers["X-Trace"], "1");
        assert_eq!(builder.opts.headers.len(), default_headers().len() + 1);
    }
}
