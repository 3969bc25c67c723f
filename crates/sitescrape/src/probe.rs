// ABOUTME: Page probe that checks a URL is reachable and summarizes what the page contains.
// ABOUTME: Reports status, body size, title and paragraph/link/image counts without running any profile.

use scraper::Html;
use serde::Serialize;

use crate::error::ScrapeError;
use crate::extractors::cascade::{node_text, select_nodes};
use crate::resource::{FetchResult, Fetcher};

/// Placeholder title reported when a page has no usable `<title>`.
pub const NO_TITLE: &str = "No title found";

/// Summary of a single fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageProbe {
    pub url: String,
    pub status: u16,
    /// Raw body size in bytes.
    pub content_length: usize,
    pub title: String,
    pub paragraphs: usize,
    pub links: usize,
    pub images: usize,
}

/// Fetches `url` and summarizes the page.
///
/// Error pages are summarized like any other page, so `status` reports what
/// the server answered. Only transport and URL failures are errors.
pub async fn probe<F: Fetcher>(fetcher: &F, url: &str) -> Result<PageProbe, ScrapeError> {
    let fetched = fetcher.fetch_any_status(url).await?;
    Ok(summarize(&fetched))
}

/// Summarizes an already-fetched page. An empty body yields zero counts.
pub fn summarize(fetched: &FetchResult) -> PageProbe {
    let doc = Html::parse_document(&fetched.text());
    PageProbe {
        url: fetched.url.clone(),
        status: fetched.status,
        content_length: fetched.body.len(),
        title: page_title(&doc),
        paragraphs: count(&doc, "p"),
        links: count(&doc, "a"),
        images: count(&doc, "img"),
    }
}

fn page_title(doc: &Html) -> String {
    select_nodes(doc.root_element(), "title")
        .into_iter()
        .next()
        .map(node_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

fn count(doc: &Html, tag: &str) -> usize {
    select_nodes(doc.root_element(), tag).len()
}
