// ABOUTME: Order-preserving deduplication for extracted link and string lists.
// ABOUTME: Keeps the first occurrence of each key; applied before list caps.

use std::collections::HashSet;
use std::hash::Hash;

use crate::result::LinkRecord;

/// Removes later links whose `url` was already seen (exact, case-sensitive).
pub fn dedupe_links(links: Vec<LinkRecord>) -> Vec<LinkRecord> {
    dedupe_by_key(links, |link| link.url.clone())
}

/// Stable filter keeping the first item for each distinct key.
pub fn dedupe_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links(pairs: &[(&str, &str)]) -> Vec<LinkRecord> {
        pairs.iter().map(|(t, u)| LinkRecord::new(*t, *u)).collect()
    }

    #[test]
    fn keeps_first_occurrence() {
        let input = links(&[("a", "u1"), ("b", "u2"), ("c", "u1")]);
        assert_eq!(dedupe_links(input), links(&[("a", "u1"), ("b", "u2")]));
    }

    #[test]
    fn is_idempotent() {
        let input = links(&[("a", "u1"), ("b", "u2"), ("c", "u1"), ("d", "u3"), ("e", "u2")]);
        let once = dedupe_links(input);
        let twice = dedupe_links(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once, links(&[("a", "u1"), ("b", "u2"), ("d", "u3")]));
    }

    #[test]
    fn url_comparison_is_case_sensitive() {
        let input = links(&[("a", "https://x.org/A"), ("b", "https://x.org/a")]);
        assert_eq!(dedupe_links(input.clone()), input);
    }

    #[test]
    fn titles_do_not_affect_identity() {
        let input = links(&[("same", "u1"), ("same", "u2")]);
        assert_eq!(dedupe_links(input.clone()).len(), 2);
    }

    #[test]
    fn dedupe_strings_by_value() {
        let input = vec!["x".to_string(), "y".to_string(), "x".to_string()];
        assert_eq!(dedupe_by_key(input, |s| s.clone()), vec!["x", "y"]);
    }

    #[test]
    fn empty_input() {
        assert!(dedupe_links(Vec::new()).is_empty());
    }
}
