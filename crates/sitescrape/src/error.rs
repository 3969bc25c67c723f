// ABOUTME: Error types for the scraping pipeline including ErrorCode enum and ScrapeError struct.
// ABOUTME: Provides categorized errors with convenience constructors and boolean helpers.

use std::fmt;

/// Error codes representing different categories of scrape failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUrl,
    Fetch,
    Timeout,
    Parse,
    Config,
    Cancelled,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidUrl => "invalid URL",
            ErrorCode::Fetch => "fetch error",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Parse => "parse error",
            ErrorCode::Config => "configuration error",
            ErrorCode::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// The error type shared by fetching, parsing and profile loading.
///
/// Only `Config` errors escape a batch run; every other code is converted
/// into a failure outcome for the target that produced it.
#[derive(Debug, thiserror::Error)]
pub struct ScrapeError {
    pub code: ErrorCode,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sitescrape: {}", self.op)?;
        if !self.url.is_empty() {
            write!(f, " {}", self.url)?;
        }
        write!(f, ": {}", self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrapeError {
    fn with_code(
        code: ErrorCode,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            code,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::InvalidUrl, url, op, source)
    }

    /// Create a Fetch error.
    pub fn fetch(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Fetch, url, op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Timeout, url, op, source)
    }

    /// Create a Parse error.
    pub fn parse(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::with_code(ErrorCode::Parse, url, op, source)
    }

    /// Create a Config error. Config errors are not tied to a target URL.
    pub fn config(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::with_code(ErrorCode::Config, String::new(), op, source)
    }

    /// Create a Cancelled error for a target that was never started.
    pub fn cancelled(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::with_code(
            ErrorCode::Cancelled,
            url,
            op,
            Some(anyhow::anyhow!("batch cancelled before this target ran")),
        )
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }

    /// Returns true if this is a Fetch error.
    pub fn is_fetch(&self) -> bool {
        self.code == ErrorCode::Fetch
    }

    /// Returns true if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        self.code == ErrorCode::Parse
    }

    /// Returns true if this is an InvalidUrl error.
    pub fn is_invalid_url(&self) -> bool {
        self.code == ErrorCode::InvalidUrl
    }

    /// Returns true if this is a Config error.
    pub fn is_config(&self) -> bool {
        self.code == ErrorCode::Config
    }

    /// Returns true if this is a Cancelled error.
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_url_code_and_source() {
        let err = ScrapeError::fetch(
            "https://example.com",
            "Fetch",
            Some(anyhow::anyhow!("HTTP status 503")),
        );
        assert_eq!(
            err.to_string(),
            "sitescrape: Fetch https://example.com: fetch error: HTTP status 503"
        );
        assert!(err.is_fetch());
        assert!(!err.is_parse());
    }

    #[test]
    fn config_error_omits_url() {
        let err = ScrapeError::config("LoadProfiles", Some(anyhow::anyhow!("empty chain")));
        assert_eq!(
            err.to_string(),
            "sitescrape: LoadProfiles: configuration error: empty chain"
        );
        assert!(err.is_config());
    }

    #[test]
    fn cancelled_error_carries_reason() {
        let err = ScrapeError::cancelled("https://example.com", "Run");
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("batch cancelled"));
    }
}
