// ABOUTME: Selector cascade resolver: tries an ordered selector chain and keeps the first match.
// ABOUTME: Supports CSS selectors with text or attribute extraction, scoped to any element.

//! Selector cascade resolution.
//!
//! Key behaviors:
//! - Selectors are tried strictly in order; the first selector whose result
//!   is accepted wins and later selectors are never queried.
//! - Results from different selectors are never merged.
//! - Invalid selectors match nothing.
//! - Resolution is scoped: passing an element instead of the document root
//!   restricts matches to that element's descendants.

use scraper::ElementRef;

use crate::extractors::compiled::get_or_compile;
use crate::extractors::profile::SelectorSpec;

/// The winning selector of a cascade and the nodes it matched.
#[derive(Debug, Clone)]
pub struct Resolution<'a, 's> {
    /// Position of the winning selector in the chain.
    pub index: usize,
    pub selector: &'s SelectorSpec,
    pub nodes: Vec<ElementRef<'a>>,
}

/// Trimmed text content of an element (all descendant text nodes, concatenated).
pub fn node_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Trimmed attribute value when `attr` is given, trimmed text otherwise.
pub fn node_value(el: ElementRef<'_>, attr: Option<&str>) -> String {
    match attr {
        Some(name) => el
            .value()
            .attr(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        None => node_text(el),
    }
}

/// Descendants of `scope` matching `css`, in document order.
pub fn select_nodes<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match get_or_compile(css) {
        Some(selector) => scope.select(&selector).collect(),
        None => Vec::new(),
    }
}

/// Resolves a chain to the first selector that matches at least one node.
pub fn resolve<'a, 's>(
    scope: ElementRef<'a>,
    chain: &'s [SelectorSpec],
) -> Option<Resolution<'a, 's>> {
    chain.iter().enumerate().find_map(|(index, selector)| {
        let nodes = select_nodes(scope, selector.css());
        if nodes.is_empty() {
            None
        } else {
            Some(Resolution {
                index,
                selector,
                nodes,
            })
        }
    })
}

/// Resolves a chain for a single-node field.
///
/// Looks at the first node of each selector's result and accepts it only
/// when its trimmed text (or attribute value) is non-empty.
pub fn resolve_text(scope: ElementRef<'_>, chain: &[SelectorSpec]) -> Option<String> {
    resolve_with(scope, chain, |selector, nodes| {
        let value = node_value(nodes[0], selector.parts().1);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

/// Resolves a chain with a field-specific acceptance step.
///
/// For each selector with a non-empty match, `accept` turns the matched
/// nodes into a value; the first `Some` ends the cascade. `accept` is never
/// called with an empty node list.
pub fn resolve_with<'a, T, F>(scope: ElementRef<'a>, chain: &[SelectorSpec], mut accept: F) -> Option<T>
where
    F: FnMut(&SelectorSpec, Vec<ElementRef<'a>>) -> Option<T>,
{
    for selector in chain {
        let nodes = select_nodes(scope, selector.css());
        if nodes.is_empty() {
            continue;
        }
        if let Some(value) = accept(selector, nodes) {
            return Some(value);
        }
    }
    None
}
