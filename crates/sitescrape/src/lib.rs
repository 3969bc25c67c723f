// ABOUTME: Main library entry point for the sitescrape site-adaptive scraping pipeline.
// ABOUTME: Re-exports the public API: Client, ClientBuilder, Target, Report, ScrapeError and the profile types.

//! Sitescrape - site-adaptive extraction of structured records from HTML pages.
//!
//! Each URL is dispatched to a site profile by substring match. A profile is
//! an ordered list of field specs, and every field resolves through an
//! ordered cascade of CSS selectors where the first match wins. Batches run
//! sequentially with a politeness delay, and every target ends up in the
//! report as either a record or a failure.
//!
//! # Example
//!
//! ```no_run
//! use sitescrape::{default_targets, Client, ScrapeError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ScrapeError> {
//!     let client = Client::builder().build()?;
//!     let report = client.run(&default_targets()).await;
//!     println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod extractors;
pub mod options;
pub mod probe;
pub mod resource;
pub mod result;

pub use crate::client::{default_targets, Client, Target};
pub use crate::error::{ErrorCode, ScrapeError};
pub use crate::extractors::loader::{
    load_builtin_registry, load_registry_from_path, load_registry_from_str,
};
pub use crate::extractors::profile::{
    ExtractMode, FieldSpec, ProfileRegistry, SelectorSpec, SiteProfile,
};
pub use crate::options::{ClientBuilder, Options};
pub use crate::probe::PageProbe;
pub use crate::resource::{FetchResult, Fetcher, HttpFetcher};
pub use crate::result::{
    CodeBlockRecord, ExtractedRecord, FieldMap, FieldValue, LinkRecord, Report, ScrapeOutcome,
};
