// ABOUTME: Pre-compiled CSS selector cache shared by every field extractor.
// ABOUTME: Profiles reuse the same handful of selectors across targets, so each is parsed once.

//! Selector caching for repeated DOM queries.
//!
//! Every selector string that appears in a site profile is compiled once and
//! kept for the life of the process. Invalid selectors are cached too (as
//! `None`) so a bad entry in a chain is skipped cheaply on every document.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use scraper::Selector;

static SELECTOR_CACHE: Lazy<RwLock<HashMap<String, Option<Selector>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Gets or compiles a CSS selector, caching the result.
///
/// Returns `None` if the selector does not parse.
pub fn get_or_compile(css: &str) -> Option<Selector> {
    {
        let cache = SELECTOR_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(css) {
            return cached.clone();
        }
    }

    let compiled = Selector::parse(css).ok();
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(|e| e.into_inner());
    // another thread may have inserted while we were compiling
    if let Some(cached) = cache.get(css) {
        return cached.clone();
    }
    cache.insert(css.to_string(), compiled.clone());
    compiled
}

/// Compiles a batch of selectors into the cache, returning the ones that failed.
///
/// Called when a profile registry is loaded so that invalid selectors are
/// reported as configuration errors instead of silently never matching.
pub fn precompile_selectors<I, S>(selectors: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut invalid = Vec::new();
    let mut cache = SELECTOR_CACHE.write().unwrap_or_else(|e| e.into_inner());
    for css in selectors {
        let css = css.as_ref();
        let compiled = cache
            .entry(css.to_string())
            .or_insert_with(|| Selector::parse(css).ok());
        if compiled.is_none() {
            invalid.push(css.to_string());
        }
    }
    invalid
}
