// ABOUTME: Site-adaptive extraction: selector cascades, field extractors, dedup and site profiles.
// ABOUTME: Everything here is pure over a parsed document; no I/O happens in this module.

//! Extraction module.
//!
//! Submodules:
//! - `cascade`: first-match selector chain resolution.
//! - `compiled`: process-wide cache of compiled selectors.
//! - `dedup`: order-preserving link deduplication.
//! - `fields`: per-mode field extractors.
//! - `loader`: profile registry loading from JSON.
//! - `profile`: site profile models and URL dispatch.

pub mod cascade;
pub mod compiled;
pub mod dedup;
pub mod fields;
pub mod loader;
pub mod profile;

use scraper::Html;

use crate::extractors::fields::{extract_fields, ExtractContext};
use crate::extractors::profile::SiteProfile;
use crate::result::FieldMap;

/// Extracts all fields of `profile` from a parsed page.
pub fn extract_profile(doc: &Html, profile: &SiteProfile, page_url: &str) -> FieldMap {
    let ctx = ExtractContext::new(page_url);
    extract_fields(doc.root_element(), &profile.fields, &ctx)
}
