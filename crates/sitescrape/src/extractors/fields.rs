// ABOUTME: Field extractors turning cascade resolutions into field values, one per extraction mode.
// ABOUTME: Applies item filters, URL resolution, dedup, truncation and list caps in that order.

//! Field extraction.
//!
//! Every [`FieldSpec`] is resolved with the selector cascade and then
//! post-processed according to its [`ExtractMode`]:
//!
//! - single-node modes accept the first node whose trimmed text is non-empty;
//! - list modes accept the first selector that yields at least one
//!   qualifying item, then dedupe (when asked) and cap.
//!
//! A field never fails. A chain that does not resolve yields the empty
//! value of its mode and the remaining fields are unaffected.

use std::collections::BTreeMap;

use scraper::ElementRef;
use url::Url;

use crate::extractors::cascade::{node_text, node_value, resolve_text, resolve_with, select_nodes};
use crate::extractors::dedup::{dedupe_by_key, dedupe_links};
use crate::extractors::profile::{ExtractMode, FieldSpec, ItemFilter};
use crate::result::{CodeBlockRecord, FieldMap, FieldValue, LinkRecord};

/// Suffix appended to values cut down to their maximum length.
pub const TRUNCATION_MARKER: &str = "...";

/// Language tag for code nodes without a class attribute.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Page-level inputs shared by every field of one extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    /// Base for resolving relative link URLs.
    pub base_url: Option<Url>,
}

impl ExtractContext {
    pub fn new(page_url: &str) -> Self {
        Self {
            base_url: Url::parse(page_url).ok(),
        }
    }

    fn resolve_url(&self, href: &str) -> String {
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }
}

/// Extracts every field of `specs` inside `scope`, in declaration order.
pub fn extract_fields(scope: ElementRef<'_>, specs: &[FieldSpec], ctx: &ExtractContext) -> FieldMap {
    let mut fields = FieldMap::new();
    for spec in specs {
        let value = extract_field(scope, spec, ctx);
        tracing::debug!(field = %spec.name, mode = ?spec.mode, items = value.len(), "extracted field");
        fields.insert(spec.name.clone(), value);
    }
    fields
}

/// Extracts one field, falling back to the empty value of its mode.
pub fn extract_field(scope: ElementRef<'_>, spec: &FieldSpec, ctx: &ExtractContext) -> FieldValue {
    match spec.mode {
        ExtractMode::SingleText => FieldValue::Text(
            extract_single_text(scope, spec)
                .map(|text| {
                    if spec.resolve_urls {
                        ctx.resolve_url(&text)
                    } else {
                        truncate(text, spec.post.max_length)
                    }
                })
                .unwrap_or_default(),
        ),
        ExtractMode::JoinedParagraphs => {
            FieldValue::Text(extract_joined_paragraphs(scope, spec).unwrap_or_default())
        }
        ExtractMode::ListOfStrings => FieldValue::Strings(extract_strings(scope, spec)),
        ExtractMode::ListOfLinks => FieldValue::Links(extract_links(scope, spec, ctx)),
        ExtractMode::CodeBlocks => FieldValue::Code(extract_code_blocks(scope, spec)),
        ExtractMode::ListOfRecords => FieldValue::Records(extract_records(scope, spec, ctx)),
        ExtractMode::Keywords => FieldValue::Map(extract_keywords(scope, spec)),
    }
}

/// First node of the first selector whose trimmed text or attribute is non-empty.
pub fn extract_single_text(scope: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
    resolve_text(scope, &spec.selectors)
}

/// Paragraph text of the first non-empty container, joined with blank lines.
pub fn extract_joined_paragraphs(scope: ElementRef<'_>, spec: &FieldSpec) -> Option<String> {
    resolve_with(scope, &spec.selectors, |_, nodes| {
        let container = nodes[0];
        if node_text(container).is_empty() {
            return None;
        }
        Some(joined_paragraphs(container))
    })
}

fn joined_paragraphs(container: ElementRef<'_>) -> String {
    select_nodes(container, "p")
        .into_iter()
        .map(node_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Trimmed texts of the first selector with a qualifying item.
pub fn extract_strings(scope: ElementRef<'_>, spec: &FieldSpec) -> Vec<String> {
    let items = resolve_with(scope, &spec.selectors, |selector, nodes| {
        let attr = selector.parts().1;
        let items: Vec<String> = nodes
            .into_iter()
            .map(|node| node_value(node, attr))
            .filter(|text| qualifies(text, &spec.filter))
            .collect();
        non_empty(items)
    })
    .unwrap_or_default();

    let items = if spec.dedupe {
        dedupe_by_key(items, |s| s.clone())
    } else {
        items
    };
    cap(items, spec.post.max_items)
        .into_iter()
        .map(|text| truncate(text, spec.post.max_length))
        .collect()
}

/// Anchor records of the first selector with a qualifying link.
///
/// The href comes from the selector's attribute (default `href`). Filters
/// look at the raw href; URL resolution happens afterwards.
pub fn extract_links(scope: ElementRef<'_>, spec: &FieldSpec, ctx: &ExtractContext) -> Vec<LinkRecord> {
    let links = resolve_with(scope, &spec.selectors, |selector, nodes| {
        let attr = selector.parts().1.unwrap_or("href");
        let links: Vec<LinkRecord> = nodes
            .into_iter()
            .filter_map(|node| {
                let href = node_value(node, Some(attr));
                let title = node_text(node);
                if href.is_empty()
                    || !qualifies(&title, &spec.filter)
                    || !href_qualifies(&href, &spec.filter)
                {
                    return None;
                }
                let url = if spec.resolve_urls {
                    ctx.resolve_url(&href)
                } else {
                    href
                };
                Some(LinkRecord {
                    title: truncate(title, spec.post.max_length),
                    url,
                })
            })
            .collect();
        non_empty(links)
    })
    .unwrap_or_default();

    let links = if spec.dedupe { dedupe_links(links) } else { links };
    cap(links, spec.post.max_items)
}

/// Code snippet records of the first selector with a qualifying block.
///
/// `index` is the node's position among all matched nodes, so filtered
/// blocks leave gaps. The language is the first token of the node's class
/// attribute: a best-effort heuristic that may yield non-language classes.
pub fn extract_code_blocks(scope: ElementRef<'_>, spec: &FieldSpec) -> Vec<CodeBlockRecord> {
    let blocks = resolve_with(scope, &spec.selectors, |_, nodes| {
        let blocks: Vec<CodeBlockRecord> = nodes
            .into_iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let code = node_text(node);
                if !qualifies(&code, &spec.filter) {
                    return None;
                }
                Some(CodeBlockRecord {
                    index,
                    language: code_language(node),
                    code: truncate(code, spec.post.max_length),
                })
            })
            .collect();
        non_empty(blocks)
    })
    .unwrap_or_default();

    cap(blocks, spec.post.max_items)
}

/// First class token of a node, or [`UNKNOWN_LANGUAGE`].
pub fn code_language(node: ElementRef<'_>) -> String {
    node.value()
        .attr("class")
        .and_then(|class| class.split_whitespace().next())
        .unwrap_or(UNKNOWN_LANGUAGE)
        .to_string()
}

/// Nested records: each matched node becomes the scope for `spec.fields`.
///
/// Records without a single populated field are dropped before the cap.
pub fn extract_records(scope: ElementRef<'_>, spec: &FieldSpec, ctx: &ExtractContext) -> Vec<FieldMap> {
    let records = resolve_with(scope, &spec.selectors, |_, nodes| {
        let records: Vec<FieldMap> = nodes
            .into_iter()
            .map(|node| extract_fields(node, &spec.fields, ctx))
            .filter(|record| record.iter().any(|(_, value)| !value.is_empty()))
            .collect();
        non_empty(records)
    })
    .unwrap_or_default();

    cap(records, spec.post.max_items)
}

/// Classifies matched texts by keyword into a key/value map.
///
/// Each text is assigned to the first rule whose keyword it contains
/// (case-insensitive). When several texts map to one key the last wins.
pub fn extract_keywords(scope: ElementRef<'_>, spec: &FieldSpec) -> BTreeMap<String, String> {
    resolve_with(scope, &spec.selectors, |selector, nodes| {
        let attr = selector.parts().1;
        let mut map = BTreeMap::new();
        for node in nodes {
            let text = node_value(node, attr);
            if !qualifies(&text, &spec.filter) {
                continue;
            }
            let lower = text.to_lowercase();
            if let Some(rule) = spec
                .keywords
                .iter()
                .find(|rule| lower.contains(&rule.contains.to_lowercase()))
            {
                map.insert(rule.key.clone(), truncate(text, spec.post.max_length));
            }
        }
        (!map.is_empty()).then_some(map)
    })
    .unwrap_or_default()
}

/// Cuts `text` to `max` characters and appends [`TRUNCATION_MARKER`] when longer.
pub fn truncate(text: String, max: Option<usize>) -> String {
    match max {
        Some(max) if text.chars().count() > max => {
            let mut cut: String = text.chars().take(max).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        _ => text,
    }
}

/// Keeps at most `max` items.
pub fn cap<T>(mut items: Vec<T>, max: Option<usize>) -> Vec<T> {
    if let Some(max) = max {
        items.truncate(max);
    }
    items
}

/// Text-level filter: non-empty, length bounds (exclusive) and substring.
fn qualifies(text: &str, filter: &ItemFilter) -> bool {
    if text.is_empty() {
        return false;
    }
    let len = text.chars().count();
    if filter.min_length.is_some_and(|min| len <= min) {
        return false;
    }
    if filter.max_text_length.is_some_and(|max| len >= max) {
        return false;
    }
    match &filter.contains {
        Some(needle) => text.contains(needle.as_str()),
        None => true,
    }
}

fn href_qualifies(href: &str, filter: &ItemFilter) -> bool {
    if filter.absolute_only && !href.starts_with("http") {
        return false;
    }
    match &filter.href_contains {
        Some(needle) => href.contains(needle.as_str()),
        None => true,
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}
