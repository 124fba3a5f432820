//! Wiki-link extraction
//!
//! Pages reference each other with `[[Label]]`. A bare label points at
//! `/pages/Label`; a label already under the page root is kept as-is after
//! collapsing extra leading slashes.

use std::collections::HashSet;

use crate::models::PAGE_ROOT;

/// An outgoing link found in a page body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub target_path: String,
    pub display: String,
}

const OPEN: &str = "[[";
const CLOSE: &str = "]]";

/// Collect the distinct outgoing links in `body`, in order of first appearance
pub fn extract_links(body: &str) -> Vec<ExtractedLink> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut rest = body;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        let label = &after_open[..end];

        // `[[a [[b]]` should yield `b`, so restart just past the opening bracket
        if label.contains(['[', ']', '\n']) {
            rest = &rest[start + 1..];
            continue;
        }
        rest = &after_open[end + CLOSE.len()..];

        if label.trim().is_empty() || !seen.insert(label) {
            continue;
        }
        links.push(ExtractedLink {
            target_path: normalize_target(label),
            display: label.to_string(),
        });
    }

    links
}

/// Map a link label onto the page root
pub fn normalize_target(label: &str) -> String {
    let label = label.trim();
    let root = PAGE_ROOT.trim_start_matches('/');
    let stripped = label.trim_start_matches('/');
    if stripped.starts_with(root) {
        format!("/{}", stripped)
    } else {
        format!("{}{}", PAGE_ROOT, label)
    }
}
