// ABOUTME: Extracted record, field value, outcome and report types produced by the pipeline.
// ABOUTME: Serializes the report as {label: {url, profile, ...fields, timestamp}} or {label: {url, error}}.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ErrorCode, ScrapeError};

/// Timestamp layout used in serialized records.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A link extracted from an anchor element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub title: String,
    pub url: String,
}

impl LinkRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A code snippet extracted from a `pre`/`code` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockRecord {
    /// Position among all candidate code nodes, including ones filtered out.
    pub index: usize,
    /// First class token of the node, or "unknown". Not a reliable language tag.
    pub language: String,
    pub code: String,
}

/// The value of one extracted field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Strings(Vec<String>),
    Links(Vec<LinkRecord>),
    Code(Vec<CodeBlockRecord>),
    Records(Vec<FieldMap>),
    Map(BTreeMap<String, String>),
}

impl FieldValue {
    /// Returns true for an empty string, list or map.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Strings(v) => v.is_empty(),
            FieldValue::Links(v) => v.is_empty(),
            FieldValue::Code(v) => v.is_empty(),
            FieldValue::Records(v) => v.is_empty(),
            FieldValue::Map(m) => m.is_empty(),
        }
    }

    /// Number of items for list values, 1 for non-empty text, 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Text(s) => usize::from(!s.is_empty()),
            FieldValue::Strings(v) => v.len(),
            FieldValue::Links(v) => v.len(),
            FieldValue::Code(v) => v.len(),
            FieldValue::Records(v) => v.len(),
            FieldValue::Map(m) => m.len(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            FieldValue::Strings(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_links(&self) -> Option<&[LinkRecord]> {
        match self {
            FieldValue::Links(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&[CodeBlockRecord]> {
        match self {
            FieldValue::Code(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[FieldMap]> {
        match self {
            FieldValue::Records(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Field name to value mapping that keeps profile declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, replacing an earlier value under the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The structured output of scraping one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub url: String,
    /// Name of the site profile that produced the fields.
    pub profile: String,
    pub fields: FieldMap,
    pub timestamp: DateTime<Utc>,
}

impl ExtractedRecord {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Convenience accessor for text fields; empty when absent or not text.
    pub fn text(&self, name: &str) -> &str {
        self.field(name).and_then(FieldValue::as_text).unwrap_or("")
    }

    /// Number of fields that produced a non-empty value.
    pub fn populated_fields(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_empty()).count()
    }
}

impl Serialize for ExtractedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 3))?;
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("profile", &self.profile)?;
        for (k, v) in self.fields.iter() {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry(
            "timestamp",
            &self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        )?;
        map.end()
    }
}

/// The per-target result of a scrape attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success(ExtractedRecord),
    Failure {
        label: String,
        url: String,
        code: ErrorCode,
        error: String,
    },
}

impl ScrapeOutcome {
    /// Builds a failure outcome from the error that ended a target.
    pub fn failure(label: impl Into<String>, url: impl Into<String>, err: &ScrapeError) -> Self {
        ScrapeOutcome::Failure {
            label: label.into(),
            url: url.into(),
            code: err.code,
            error: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn record(&self) -> Option<&ExtractedRecord> {
        match self {
            ScrapeOutcome::Success(record) => Some(record),
            ScrapeOutcome::Failure { .. } => None,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ScrapeOutcome::Success(record) => &record.url,
            ScrapeOutcome::Failure { url, .. } => url,
        }
    }
}

impl Serialize for ScrapeOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScrapeOutcome::Success(record) => record.serialize(serializer),
            ScrapeOutcome::Failure { url, error, .. } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("url", url)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Append-only mapping from site label to outcome, in run order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    entries: Vec<(String, ScrapeOutcome)>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome under `label`.
    ///
    /// Entries are never overwritten: a second outcome for an existing label
    /// is rejected and `false` is returned.
    pub fn record(&mut self, label: impl Into<String>, outcome: ScrapeOutcome) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.entries.push((label, outcome));
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == label)
    }

    pub fn get(&self, label: &str) -> Option<&ScrapeOutcome> {
        self.entries
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScrapeOutcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.entries.len() - self.successes()
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, outcome) in &self.entries {
            map.serialize_entry(label, outcome)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record() -> ExtractedRecord {
        let mut fields = FieldMap::new();
        fields.insert("title", FieldValue::Text("Example".to_string()));
        fields.insert(
            "related_articles",
            FieldValue::Links(vec![LinkRecord::new("Intro", "https://example.org/a")]),
        );
        fields.insert("code_blocks", FieldValue::Code(vec![]));
        ExtractedRecord {
            url: "https://example.org/post".to_string(),
            profile: "technical-article".to_string(),
            fields,
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 12, 30, 5).unwrap(),
        }
    }

    #[test]
    fn record_serializes_fields_between_url_and_timestamp() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "https://example.org/post",
                "profile": "technical-article",
                "title": "Example",
                "related_articles": [{"title": "Intro", "url": "https://example.org/a"}],
                "code_blocks": [],
                "timestamp": "2024-06-15 12:30:05"
            })
        );
        let text = serde_json::to_string(&record()).unwrap();
        assert!(text.starts_with("{\"url\":"));
        assert!(text.ends_with("\"timestamp\":\"2024-06-15 12:30:05\"}"));
    }

    #[test]
    fn populated_fields_ignores_empty_values() {
        let rec = record();
        assert_eq!(rec.populated_fields(), 2);
        assert_eq!(rec.text("title"), "Example");
        assert_eq!(rec.text("missing"), "");
    }

    #[test]
    fn report_never_overwrites_a_label() {
        let mut report = Report::new();
        assert!(report.record("Site", ScrapeOutcome::Success(record())));
        let err = ScrapeError::fetch("https://example.org", "Fetch", None);
        assert!(!report.record("Site", ScrapeOutcome::failure("Site", "https://example.org", &err)));
        assert_eq!(report.len(), 1);
        assert!(report.get("Site").is_some_and(ScrapeOutcome::is_success));
    }

    #[test]
    fn report_serializes_failures_with_error() {
        let mut report = Report::new();
        let err = ScrapeError::fetch(
            "https://down.example",
            "Fetch",
            Some(anyhow::anyhow!("HTTP status 500")),
        );
        report.record("Down", ScrapeOutcome::failure("Down", "https://down.example", &err));
        report.record("Up", ScrapeOutcome::Success(record()));

        assert_eq!(report.successes(), 1);
        assert_eq!(report.failures(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["Down"],
            json!({
                "url": "https://down.example",
                "error": "sitescrape: Fetch https://down.example: fetch error: HTTP status 500"
            })
        );
        assert_eq!(value["Up"]["title"], json!("Example"));
    }

    #[test]
    fn field_map_insert_replaces_in_place() {
        let mut map = FieldMap::new();
        map.insert("a", FieldValue::Text("1".into()));
        map.insert("b", FieldValue::Strings(vec![]));
        map.insert("a", FieldValue::Text("2".into()));
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&FieldValue::Text("2".into())));
    }
}
