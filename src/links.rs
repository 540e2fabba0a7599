//! HTTP(S) URL discovery in free text.
//!
//! Pattern-only: a scheme followed by a run of characters other than
//! whitespace and `<>"{}|\^`[]`. Nothing is validated, resolved, or
//! deduplicated; order is first-seen.

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).expect("valid link regex"));

/// Returns every URL-shaped substring of `text`, in document order.
pub fn harvest_links(text: &str) -> Vec<String> {
    LINK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
