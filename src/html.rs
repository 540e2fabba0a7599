//! HTML → readable plain text.
//!
//! Two passes: `scraper` parses the document and detaches every subtree
//! matching a skip selector, then `html2text` renders what is left. Lines
//! are not wrapped. Link targets are listed as numbered references after
//! the text.

use scraper::{Html, Selector};
use std::io::Cursor;

/// Never readable text.
const ALWAYS_SKIP: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Page chrome removed from fetched link content.
pub const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav",
    "footer",
    "aside",
    "[role='navigation']",
    ".navigation",
    ".nav",
    ".menu",
    ".sidebar",
    ".advertisement",
    ".ads",
];

/// Wide enough that html2text never wraps a line.
const RENDER_WIDTH: usize = 10_000;

/// Converts `html` to text, dropping [`ALWAYS_SKIP`] elements and anything
/// matching `skip_selectors`. Selectors that fail to parse are ignored.
pub fn html_to_text(html: &str, skip_selectors: &[&str]) -> String {
    let mut document = Html::parse_document(html);
    strip_subtrees(&mut document, skip_selectors);
    let cleaned = document.html();

    let rendered = html2text::from_read(Cursor::new(cleaned.as_bytes()), RENDER_WIDTH)
        .unwrap_or_else(|_| document.root_element().text().collect::<String>());
    tidy(&rendered)
}

/// Like [`html_to_text`] with [`BOILERPLATE_SELECTORS`] applied.
pub fn html_to_text_without_boilerplate(html: &str) -> String {
    html_to_text(html, BOILERPLATE_SELECTORS)
}

fn strip_subtrees(document: &mut Html, skip_selectors: &[&str]) {
    let selectors: Vec<Selector> = ALWAYS_SKIP
        .iter()
        .chain(skip_selectors.iter())
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    let ids: Vec<_> = selectors
        .iter()
        .flat_map(|s| document.select(s).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Trailing spaces off, at most one blank line in a row, outer blank lines trimmed.
fn tidy(rendered: &str) -> String {
    let mut out = String::with_capacity(rendered.len());
    let mut blank_run = 0;
    for line in rendered.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
