// ABOUTME: Site profile data models and the priority-ordered profile registry.
// ABOUTME: Defines selector chains, extraction modes and post-processing per field, plus URL dispatch.

//! Site profiles for per-site field extraction.
//!
//! A [`SiteProfile`] names a class of target page, says which URLs it applies
//! to, and lists the [`FieldSpec`]s to extract. The [`ProfileRegistry`] holds
//! the profiles in declared priority order together with a default profile
//! used when no matcher accepts a URL.

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::extractors::compiled::precompile_selectors;

/// Specifies how to select content from the DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    /// A CSS selector whose matches are read as text, e.g. "h1.entry-title"
    Css(String),
    /// A CSS selector with attribute extraction, e.g. ["h3 a", "href"]
    CssAttr(Vec<String>),
}

impl Default for SelectorSpec {
    fn default() -> Self {
        SelectorSpec::Css(String::new())
    }
}

impl SelectorSpec {
    /// Splits the entry into its CSS selector and optional attribute name.
    ///
    /// A single-element `CssAttr` is treated as plain text extraction.
    pub fn parts(&self) -> (&str, Option<&str>) {
        match self {
            SelectorSpec::Css(css) => (css.as_str(), None),
            SelectorSpec::CssAttr(parts) => match parts.as_slice() {
                [css, attr, ..] => (css.as_str(), Some(attr.as_str())),
                [css] => (css.as_str(), None),
                [] => ("", None),
            },
        }
    }

    /// The CSS selector part of the entry.
    pub fn css(&self) -> &str {
        self.parts().0
    }
}

/// How the matched nodes of a field are turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// First matched node, trimmed text.
    #[default]
    SingleText,
    /// First matched container, its `p` descendants joined by blank lines.
    JoinedParagraphs,
    /// Every matched node as a trimmed string.
    ListOfStrings,
    /// Every matched anchor as a `{title, url}` record.
    ListOfLinks,
    /// Every matched code node as an `{index, language, code}` record.
    CodeBlocks,
    /// Every matched node as a nested record built from `fields`.
    ListOfRecords,
    /// Matched texts classified into a key/value map by `keywords`.
    Keywords,
}

/// Size bounds applied after filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostProcess {
    /// Per-item character cap; longer items are cut and get the truncation marker.
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Maximum number of list items, applied after dedup.
    #[serde(default)]
    pub max_items: Option<usize>,
}

/// Per-item qualification rules for list fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Items must be strictly longer than this many characters.
    #[serde(default)]
    pub min_length: Option<usize>,
    /// Items must be strictly shorter than this many characters.
    #[serde(default)]
    pub max_text_length: Option<usize>,
    /// Items must contain this substring.
    #[serde(default)]
    pub contains: Option<String>,
    /// Links must have an href containing this substring.
    #[serde(default)]
    pub href_contains: Option<String>,
    /// Links must have an absolute http(s) href.
    #[serde(default)]
    pub absolute_only: bool,
}

/// Maps texts containing `contains` (case-insensitive) to `key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub contains: String,
    pub key: String,
}

/// Configuration for extracting a single named field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Output key of the field
    pub name: String,
    /// Selector chain, tried in order; first match wins
    pub selectors: Vec<SelectorSpec>,
    #[serde(default)]
    pub mode: ExtractMode,
    #[serde(flatten)]
    pub post: PostProcess,
    #[serde(flatten)]
    pub filter: ItemFilter,
    /// Resolve link URLs (or a single attribute value) against the page URL
    #[serde(default)]
    pub resolve_urls: bool,
    /// Drop links whose URL was already seen
    #[serde(default)]
    pub dedupe: bool,
    /// Classification rules for `Keywords` mode
    #[serde(default)]
    pub keywords: Vec<KeywordRule>,
    /// Nested fields for `ListOfRecords` mode, resolved inside each matched node
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Creates a field with the given name, mode and CSS selector chain.
    pub fn new<I, S>(name: impl Into<String>, mode: ExtractMode, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            mode,
            selectors: selectors
                .into_iter()
                .map(|s| SelectorSpec::Css(s.into()))
                .collect(),
            ..Default::default()
        }
    }

    fn validate(&self, profile: &str, errors: &mut Vec<String>) {
        let path = format!("{}.{}", profile, self.name);
        if self.name.trim().is_empty() {
            errors.push(format!("{}: field name is empty", profile));
        }
        if self.selectors.is_empty() {
            errors.push(format!("{}: selector chain is empty", path));
        }
        for spec in &self.selectors {
            if let SelectorSpec::CssAttr(parts) = spec {
                if parts.is_empty() || parts.len() > 2 {
                    errors.push(format!(
                        "{}: attribute selector must be [css, attr], got {} parts",
                        path,
                        parts.len()
                    ));
                }
            }
        }
        let invalid = precompile_selectors(self.selectors.iter().map(SelectorSpec::css));
        for css in invalid {
            errors.push(format!("{}: invalid selector {:?}", path, css));
        }
        match self.mode {
            ExtractMode::ListOfRecords if self.fields.is_empty() => {
                errors.push(format!("{}: list_of_records needs nested fields", path));
            }
            ExtractMode::Keywords if self.keywords.is_empty() => {
                errors.push(format!("{}: keywords mode needs keyword rules", path));
            }
            _ => {}
        }
        for nested in &self.fields {
            nested.validate(&path, errors);
        }
    }
}

/// Keys written next to the extracted fields of every record; top-level
/// fields may not reuse them. Nested record fields are not affected.
pub const RESERVED_FIELD_NAMES: &[&str] = &["url", "profile", "timestamp"];

/// The field-extraction rules for one recognized class of page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// URL substrings selecting this profile; empty means never matched directly
    #[serde(default)]
    pub matches: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

impl SiteProfile {
    /// Returns true if the URL contains any of the profile's match substrings.
    pub fn matches_url(&self, url: &str) -> bool {
        self.matches
            .iter()
            .any(|needle| !needle.is_empty() && url.contains(needle.as_str()))
    }

    /// Checks the invariants every profile must hold before it is used.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("profile name is empty".to_string());
        }
        if self.fields.is_empty() {
            errors.push(format!("{}: profile has no fields", self.name));
        }
        for field in &self.fields {
            if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
                errors.push(format!(
                    "{}: field name {:?} is reserved for record metadata",
                    self.name, field.name
                ));
            }
            field.validate(&self.name, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScrapeError::config(
                "ValidateProfile",
                Some(anyhow::anyhow!(errors.join("; "))),
            ))
        }
    }
}

/// Registry mapping URLs to site profiles in declared priority order.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<SiteProfile>,
    fallback: SiteProfile,
}

impl ProfileRegistry {
    /// Creates a registry with only a default profile.
    pub fn new(fallback: SiteProfile) -> Result<Self, ScrapeError> {
        fallback.validate()?;
        Ok(Self {
            profiles: Vec::new(),
            fallback,
        })
    }

    /// Registers a profile at the lowest priority.
    pub fn register(&mut self, profile: SiteProfile) -> Result<(), ScrapeError> {
        profile.validate()?;
        self.profiles.push(profile);
        Ok(())
    }

    /// Returns the first profile whose matcher accepts the URL.
    pub fn find(&self, url: &str) -> Option<&SiteProfile> {
        self.profiles.iter().find(|p| p.matches_url(url))
    }

    /// Returns the matching profile, or the default profile when none matches.
    pub fn select(&self, url: &str) -> &SiteProfile {
        self.find(url).unwrap_or(&self.fallback)
    }

    /// Looks up a profile (including the default) by name.
    pub fn get(&self, name: &str) -> Option<&SiteProfile> {
        self.profiles
            .iter()
            .chain(std::iter::once(&self.fallback))
            .find(|p| p.name == name)
    }

    /// The registered profiles in priority order, excluding the default.
    pub fn profiles(&self) -> &[SiteProfile] {
        &self.profiles
    }

    /// The default profile.
    pub fn fallback(&self) -> &SiteProfile {
        &self.fallback
    }

    /// Returns the number of registered profiles, excluding the default.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if only the default profile is present.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
