//! Combined-document assembly.
//!
//! Order is fixed: base text, then the uploaded file block, then one block
//! per contributing link in harvested order. Each appended block is
//! preceded by a provenance marker naming its origin.

use crate::models::LinkFetchResult;

pub const FILE_MARKER: &str = "--- UPLOADED FILE CONTENT ---";

pub fn link_marker(url: &str) -> String {
    format!("--- CONTENT FROM {} ---", url)
}

/// The document handed to the oracle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedText {
    text: String,
    linked_blocks: usize,
}

impl CombinedText {
    pub fn new(base_text: &str) -> Self {
        Self {
            text: base_text.to_string(),
            linked_blocks: 0,
        }
    }

    pub fn push_file(&mut self, file_text: &str) {
        self.push_block(FILE_MARKER, file_text);
    }

    /// Appends a link block if the fetch contributed; returns whether it did.
    pub fn push_link(&mut self, result: &LinkFetchResult) -> bool {
        if !result.contributes() {
            return false;
        }
        self.push_block(&link_marker(&result.url), &result.text);
        self.linked_blocks += 1;
        true
    }

    fn push_block(&mut self, marker: &str, body: &str) {
        self.text.push_str("\n\n");
        self.text.push_str(marker);
        self.text.push('\n');
        self.text.push_str(body);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Number of link blocks appended.
    pub fn linked_blocks(&self) -> usize {
        self.linked_blocks
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Builds the combined document from all inputs at once.
pub fn combine(
    base_text: &str,
    file_text: Option<&str>,
    links: &[LinkFetchResult],
) -> CombinedText {
    let mut combined = CombinedText::new(base_text);
    if let Some(file_text) = file_text {
        combined.push_file(file_text);
    }
    for result in links {
        combined.push_link(result);
    }
    combined
}
