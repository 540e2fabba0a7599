//! Uploaded-file text extraction (PDF, HTML, plain text).
//!
//! Validation runs against the *declared* media type and size before any
//! byte is read, so a rejected upload never touches the decoder. Decoding
//! PDF and HTML is CPU-bound and runs on the blocking pool.

use tracing::debug;

use crate::error::QuoteError;
use crate::html::html_to_text;
use crate::models::{FileRef, FileSource};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_HTML: &str = "text/html";
pub const MIME_TEXT: &str = "text/plain";
/// Generic upload type; sniffed for a PDF header.
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

pub const ALLOWED_MEDIA_TYPES: &[&str] = &[MIME_PDF, MIME_HTML, MIME_TEXT, MIME_OCTET_STREAM];

const PDF_MAGIC: &[u8] = b"%PDF-";

/// `"Text/HTML; charset=utf-8"` → `"text/html"`.
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Checks the declared type and size of an upload.
pub fn validate_file(file: &FileRef, max_bytes: u64) -> Result<(), QuoteError> {
    let media_type = normalize_media_type(&file.media_type);
    if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(QuoteError::UnsupportedMediaType { media_type });
    }

    if file.size > max_bytes {
        return Err(QuoteError::PayloadTooLarge {
            size: file.size,
            limit_mib: max_bytes / (1024 * 1024),
        });
    }

    Ok(())
}

/// Validates `file`, reads it, and returns its plain text.
pub async fn extract_file_text(file: &FileRef, max_bytes: u64) -> Result<String, QuoteError> {
    validate_file(file, max_bytes)?;

    let bytes = match &file.source {
        FileSource::Bytes(bytes) => bytes.clone(),
        FileSource::Path(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|e| QuoteError::ExtractionFailed {
                    detail: format!("{}: {}", path.display(), e),
                })?
        }
    };

    // Declared size may lie; enforce the limit on what was actually read.
    if bytes.len() as u64 > max_bytes {
        return Err(QuoteError::PayloadTooLarge {
            size: bytes.len() as u64,
            limit_mib: max_bytes / (1024 * 1024),
        });
    }

    let media_type = normalize_media_type(&file.media_type);
    debug!(media_type = %media_type, bytes = bytes.len(), "extracting uploaded file");

    // pdf-extract can panic on malformed input; a panicked task is a decode failure.
    tokio::task::spawn_blocking(move || extract_text(&bytes, &media_type))
        .await
        .map_err(|e| {
            if e.is_panic() {
                QuoteError::ExtractionFailed {
                    detail: "decoder panicked on malformed input".to_string(),
                }
            } else {
                QuoteError::internal(format!("extraction task failed: {}", e))
            }
        })?
}

/// Decodes `bytes` according to an already-validated media type.
pub fn extract_text(bytes: &[u8], media_type: &str) -> Result<String, QuoteError> {
    match media_type {
        MIME_PDF => extract_pdf(bytes),
        MIME_HTML => Ok(html_to_text(&String::from_utf8_lossy(bytes), &[])),
        MIME_OCTET_STREAM if bytes.starts_with(PDF_MAGIC) => extract_pdf(bytes),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, QuoteError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| QuoteError::ExtractionFailed {
        detail: format!("PDF extraction failed: {}", e),
    })
}
