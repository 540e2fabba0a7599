//! Core data models used throughout Quote Harness.
//!
//! These types represent the input document, the per-link fetch outcomes,
//! the oracle's extraction result, and the response/record projections that
//! leave the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the bytes of an uploaded file live.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// Already buffered (multipart upload).
    Bytes(Vec<u8>),
    /// On disk (CLI input); read only after validation passes.
    Path(PathBuf),
}

/// An uploaded file as declared by the client.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub file_name: Option<String>,
    /// Declared media type, e.g. `application/pdf`.
    pub media_type: String,
    /// Declared size in bytes.
    pub size: u64,
    pub source: FileSource,
}

impl FileRef {
    pub fn from_bytes(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            media_type: media_type.into(),
            size: bytes.len() as u64,
            source: FileSource::Bytes(bytes),
        }
    }
}

/// One request's raw input: pasted text plus an optional upload.
#[derive(Debug, Clone, Default)]
pub struct InputDocument {
    pub source_text: String,
    pub uploaded_file: Option<FileRef>,
}

impl InputDocument {
    pub fn text(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            uploaded_file: None,
        }
    }
}

/// Outcome of fetching one harvested link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFetchResult {
    pub url: String,
    pub text: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

impl LinkFetchResult {
    pub fn success(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            succeeded: true,
            error_message: None,
        }
    }

    pub fn failure(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            succeeded: false,
            error_message: Some(message.into()),
        }
    }

    /// Whether this result adds a block to the combined text.
    pub fn contributes(&self) -> bool {
        self.succeeded && !self.text.trim().is_empty()
    }
}

/// A link that did not contribute content, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkError {
    pub url: String,
    pub message: String,
}

/// How the oracle derived the guestroom total when none was stated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationBreakdown {
    pub room_rate: Option<f64>,
    pub rooms_per_night: Option<f64>,
    pub number_of_nights: Option<f64>,
    pub calculated_total: Option<f64>,
}

/// Structured values returned by the oracle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub guestroom_total: Option<f64>,
    pub meeting_room_total: Option<f64>,
    pub food_beverage_total: Option<f64>,
    /// Self-reported certainty in `[0, 1]`.
    pub confidence: Option<f64>,
    pub ai_notes: Option<String>,
    pub calculation_breakdown: Option<CalculationBreakdown>,
}

/// JSON body returned to the caller on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub extraction: ExtractionResult,
    pub total_quote: Option<f64>,
    /// RFC 3339 UTC timestamp.
    pub processed_at: String,
    pub has_linked_content: bool,
    pub linked_content_fetched: usize,
    pub linked_content_errors: Vec<LinkError>,
    pub content_length: usize,
}

/// Row written to the persistence sink.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRecord {
    pub id: String,
    /// Combined text, truncated to the configured character limit.
    pub raw_content: String,
    pub content_sha256: String,
    pub total_quote: Option<f64>,
    pub guestroom_total: Option<f64>,
    pub meeting_room_total: Option<f64>,
    pub food_beverage_total: Option<f64>,
    pub confidence: Option<f64>,
    pub ai_notes: Option<String>,
    pub has_linked_content: bool,
    pub linked_content_fetched: i64,
    /// JSON array of [`LinkError`].
    pub linked_content_errors: String,
    pub content_length: i64,
    pub processed_at: String,
    /// JSON object (or `null`) of [`CalculationBreakdown`].
    pub calculation_breakdown: String,
}
