//! Error taxonomy for quote processing.
//!
//! One enum covers every failure a request can hit. Two variants never reach
//! the caller: [`QuoteError::LinkFetchFailed`] is folded into a
//! [`LinkFetchResult`](crate::models::LinkFetchResult) and
//! [`QuoteError::PersistenceFailed`] is logged and dropped by the pipeline.
//!
//! | Variant | HTTP |
//! |---------|------|
//! | `UnsupportedMediaType`, `PayloadTooLarge`, `NoContentProvided` | 400 |
//! | `ExtractionFailed`, oracle errors, `InternalError` | 500 |

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    /// Declared media type of the upload is not accepted.
    #[error("File type not supported. Please upload PDF, HTML, or text files.")]
    UnsupportedMediaType { media_type: String },

    /// Upload exceeds the configured size limit.
    #[error("File too large. Please upload files smaller than {limit_mib}MB.")]
    PayloadTooLarge { size: u64, limit_mib: u64 },

    /// The decoder could not turn the upload into text (corrupt PDF, unreadable file).
    #[error("Failed to extract text from uploaded file")]
    ExtractionFailed { detail: String },

    /// Neither pasted text nor file text contained anything but whitespace.
    #[error("No content provided. Please paste email text or upload a file.")]
    NoContentProvided,

    /// A single linked page could not be used.
    #[error("{url}: {message}")]
    LinkFetchFailed { url: String, message: String },

    /// Oracle output was not a JSON object.
    #[error("AI returned invalid JSON response")]
    MalformedOracleResponse { raw: String },

    /// Oracle output lacked one of the three required totals.
    #[error("AI response missing required fields")]
    IncompleteOracleResponse { missing: Vec<&'static str> },

    /// The oracle service failed, timed out, or is not configured.
    #[error("AI service temporarily unavailable")]
    OracleUnavailable { detail: String },

    #[error("Failed to persist quote record: {detail}")]
    PersistenceFailed { detail: String },

    #[error("Failed to parse quote")]
    InternalError { detail: String },
}

impl QuoteError {
    pub fn internal(detail: impl Into<String>) -> Self {
        QuoteError::InternalError {
            detail: detail.into(),
        }
    }

    /// True for errors caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QuoteError::UnsupportedMediaType { .. }
                | QuoteError::PayloadTooLarge { .. }
                | QuoteError::NoContentProvided
        )
    }

    pub fn status(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Diagnostic text for non-production responses.
    ///
    /// Only server-side failures carry one.
    pub fn details(&self) -> Option<String> {
        match self {
            QuoteError::MalformedOracleResponse { raw } => Some(raw.clone()),
            QuoteError::IncompleteOracleResponse { missing } => {
                Some(format!("missing: {}", missing.join(", ")))
            }
            QuoteError::OracleUnavailable { detail }
            | QuoteError::ExtractionFailed { detail }
            | QuoteError::PersistenceFailed { detail }
            | QuoteError::InternalError { detail } => Some(detail.clone()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for QuoteError {
    fn from(err: anyhow::Error) -> Self {
        QuoteError::internal(format!("{:#}", err))
    }
}
