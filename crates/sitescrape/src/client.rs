// ABOUTME: The main Client that dispatches pages to site profiles and aggregates batch results.
// ABOUTME: Provides scrape(), scrape_html(), probe() and the sequential, cancellable run() over labelled targets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::extractors::extract_profile;
use crate::extractors::loader::load_builtin_registry;
use crate::extractors::profile::ProfileRegistry;
use crate::options::{ClientBuilder, Options};
use crate::probe::{self, PageProbe};
use crate::resource::{parse_document, parse_html, validate_url, Fetcher, HttpFetcher};
use crate::result::{ExtractedRecord, Report, ScrapeOutcome};

/// A labelled URL to scrape. Labels key the batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub label: String,
    pub url: String,
}

impl Target {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.url)
    }
}

/// Parses `label=url`, or a bare URL which then doubles as its own label.
///
/// Only an `=` before the scheme separator splits the label off, so query
/// strings in bare URLs survive.
impl FromStr for Target {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (label, url) = match s.split_once('=') {
            Some((label, url)) if !label.contains("://") => (label.trim(), url.trim()),
            _ => (s, s),
        };
        if label.is_empty() || url.is_empty() {
            return Err(ScrapeError::invalid_url(
                s,
                "ParseTarget",
                Some(anyhow::anyhow!("expected LABEL=URL or URL")),
            ));
        }
        Ok(Target::new(label, url))
    }
}

/// The four demonstration targets, one per built-in profile.
pub fn default_targets() -> Vec<Target> {
    vec![
        Target::new(
            "GeeksforGeeks",
            "https://www.geeksforgeeks.org/python-programming-language/",
        ),
        Target::new(
            "Stack Overflow",
            "https://stackoverflow.com/questions/tagged/python",
        ),
        Target::new("GitHub", "https://github.com/python/cpython"),
        Target::new("News Site", "https://httpbin.org/html"),
    ]
}

/// The scraping client.
///
/// Holds an immutable fetch collaborator and profile registry for its whole
/// lifetime. Generic over the fetcher so batches can run against canned pages.
pub struct Client<F: Fetcher = HttpFetcher> {
    opts: Options,
    fetcher: F,
    registry: ProfileRegistry,
}

impl Client<HttpFetcher> {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<F: Fetcher> Client<F> {
    /// Create a client from options and a fetcher.
    ///
    /// Falls back to the built-in profiles when `opts.registry` is unset.
    pub fn new(opts: Options, fetcher: F) -> Result<Self, ScrapeError> {
        let registry = match opts.registry.clone() {
            Some(registry) => registry,
            None => load_builtin_registry()?,
        };
        Ok(Self {
            opts,
            fetcher,
            registry,
        })
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Pause observed between consecutive fetches of a batch.
    pub fn delay(&self) -> Duration {
        self.opts.delay
    }

    /// Fetch one URL and extract it with the profile its URL selects.
    ///
    /// Relative links are resolved against the post-redirect URL.
    pub async fn scrape(&self, url: &str) -> Result<ExtractedRecord, ScrapeError> {
        validate_url(url)?;
        let fetched = self.fetcher.fetch(url).await?;
        let base_url = if fetched.final_url.is_empty() {
            url
        } else {
            fetched.final_url.as_str()
        };
        let doc = parse_document(&fetched)?;
        Ok(self.extract_record(&doc, url, base_url))
    }

    /// Extract already-downloaded HTML as if it had been fetched from `url`.
    pub fn scrape_html(&self, html: &str, url: &str) -> Result<ExtractedRecord, ScrapeError> {
        let doc = parse_html(html, url)?;
        Ok(self.extract_record(&doc, url, url))
    }

    /// Fetch one URL and summarize the page without running a profile.
    pub async fn probe(&self, url: &str) -> Result<PageProbe, ScrapeError> {
        validate_url(url)?;
        probe::probe(&self.fetcher, url).await
    }

    fn extract_record(&self, doc: &Html, url: &str, base_url: &str) -> ExtractedRecord {
        let profile = self.registry.select(url);
        debug!(url, profile = %profile.name, "dispatching to profile");
        let fields = extract_profile(doc, profile, base_url);
        ExtractedRecord {
            url: url.to_string(),
            profile: profile.name.clone(),
            fields,
            timestamp: Utc::now(),
        }
    }

    /// Waits out the politeness delay, returning early once `cancel` fires.
    async fn pause(&self, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.opts.delay) => {}
        }
    }

    /// Probe every target in order, with the same delay and cancellation
    /// rules as [`Client::run_with_cancellation`].
    ///
    /// Returns one entry per distinct label in input order. Targets not
    /// probed because of cancellation carry a `Cancelled` error.
    pub async fn probe_all(
        &self,
        targets: &[Target],
        cancel: &CancellationToken,
    ) -> Vec<(Target, Result<PageProbe, ScrapeError>)> {
        let mut results: Vec<(Target, Result<PageProbe, ScrapeError>)> = Vec::new();
        let mut started = false;

        for target in targets {
            if results.iter().any(|(t, _)| t.label == target.label) {
                warn!(label = %target.label, url = %target.url, "duplicate label, keeping first probe");
                continue;
            }

            if started {
                self.pause(cancel).await;
            }

            let result = if cancel.is_cancelled() {
                Err(ScrapeError::cancelled(&target.url, "Probe"))
            } else {
                started = true;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ScrapeError::cancelled(&target.url, "Probe")),
                    result = self.probe(&target.url) => result,
                }
            };
            results.push((target.clone(), result));
        }
        results
    }

    /// Scrape every target in order and collect one outcome per label.
    pub async fn run(&self, targets: &[Target]) -> Report {
        self.run_with_cancellation(targets, &CancellationToken::new())
            .await
    }

    /// Like [`Client::run`], stopping early when `cancel` fires.
    ///
    /// Targets run strictly one at a time with the configured delay between
    /// them. A failing target is recorded and the batch continues. Once
    /// cancelled, the in-flight target and every target not yet started are
    /// recorded as cancelled failures, so the report always holds one entry
    /// per distinct label. Repeated labels keep their first outcome.
    pub async fn run_with_cancellation(
        &self,
        targets: &[Target],
        cancel: &CancellationToken,
    ) -> Report {
        let mut report = Report::new();
        let total = targets.len();
        let mut started = false;

        for (i, target) in targets.iter().enumerate() {
            if report.contains(&target.label) {
                warn!(label = %target.label, url = %target.url, "duplicate label, keeping first outcome");
                continue;
            }

            if started {
                self.pause(cancel).await;
            }

            if cancel.is_cancelled() {
                let err = ScrapeError::cancelled(&target.url, "Run");
                report.record(&target.label, ScrapeOutcome::failure(&target.label, &target.url, &err));
                continue;
            }

            started = true;
            info!(label = %target.label, url = %target.url, "scraping target {}/{}", i + 1, total);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ScrapeError::cancelled(&target.url, "Run")),
                result = self.scrape(&target.url) => result,
            };

            let outcome = match result {
                Ok(record) => {
                    info!(
                        label = %target.label,
                        profile = %record.profile,
                        fields = record.populated_fields(),
                        "scraped"
                    );
                    ScrapeOutcome::Success(record)
                }
                Err(err) => {
                    warn!(label = %target.label, error = %err, "target failed");
                    ScrapeOutcome::failure(&target.label, &target.url, &err)
                }
            };
            report.record(&target.label, outcome);
        }

        info!(
            succeeded = report.successes(),
            failed = report.failures(),
            "batch finished"
        );
        report
    }
}
