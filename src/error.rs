//! Error types for the edgequake-docvision library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocVisionError`]: **Fatal** for a document (or for the whole run when
//!   raised at startup): missing credentials, unreadable input, rendering that
//!   produced no pages, a missing or failing LibreOffice. Returned as
//!   `Err(DocVisionError)` from [`crate::Converter`] methods. In directory
//!   mode the fan-out records it against the file and moves on.
//!
//! * [`UnitError`]: **Non-fatal**: one page or slide could not be extracted
//!   (bad status, timeout, malformed body). Stored inside
//!   [`crate::output::ExtractedUnit`]; the unit is kept in the document with a
//!   placeholder so ordering and page count never change.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docvision library.
#[derive(Debug, Error)]
pub enum DocVisionError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A credential file or variable is absent.
    #[error("Missing credential '{name}'.\n{hint}")]
    MissingCredential { name: String, hint: String },

    /// A credential was found but is empty after trimming.
    #[error("Credential '{name}' is empty")]
    EmptyCredential { name: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The path exists but is not a regular file.
    #[error("Not a file: '{path}'")]
    NotAFile { path: PathBuf },

    /// Directory mode was requested for a path that is not a directory.
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// Input exceeds the configured size ceiling.
    #[error("File too large: '{path}' is {size_mb:.1}MB (max {max_mb:.0}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: f64,
        max_mb: f64,
    },

    /// Extension is not one of the supported document types.
    #[error("Unsupported file type '{extension}' for '{path}'\nSupported types: .pdf, .pptx, .ppt, .odp")]
    UnsupportedFileType { path: PathBuf, extension: String },

    /// The file has a `.pdf` extension but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Rendering succeeded but yielded zero pages.
    #[error("No pages extracted from '{path}'")]
    NoPages { path: PathBuf },

    /// PDF header/trailer/xref is corrupt or the document is encrypted.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Presentation converter errors ─────────────────────────────────────
    /// LibreOffice is required for presentations but could not be located.
    #[error("LibreOffice is required for presentation conversion.\nInstall from: https://www.libreoffice.org/download/")]
    ConverterNotFound,

    /// LibreOffice exited with a non-zero status.
    #[error("LibreOffice failed on '{path}': {stderr}")]
    ConverterFailed { path: PathBuf, stderr: String },

    /// LibreOffice did not finish within the configured bound.
    #[error("LibreOffice timed out after {secs}s on '{path}'")]
    ConverterTimeout { path: PathBuf, secs: u64 },

    /// LibreOffice exited cleanly but no PDF appeared in the output directory.
    #[error("LibreOffice produced no PDF for '{path}'")]
    ConverterNoOutput { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operator interrupted the run.
    #[error("Cancelled by user")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::pipeline::pace::Cancelled> for DocVisionError {
    fn from(_: crate::pipeline::pace::Cancelled) -> Self {
        DocVisionError::Cancelled
    }
}

/// A non-fatal error for a single page or slide.
///
/// Stored alongside [`crate::output::ExtractedUnit`] when extraction fails.
/// The document keeps the unit, with placeholder text in its place.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// The endpoint answered with a non-2xx status.
    #[error("endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (DNS, TLS, reset).
    #[error("request failed: {0}")]
    Transport(String),

    /// No response within the configured request timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The body was not JSON, or matched a known shape without its text field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The model answered with no text at all.
    #[error("empty response from endpoint")]
    EmptyResponse,

    /// The page image could not be encoded.
    #[error("image encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = DocVisionError::FileTooLarge {
            path: PathBuf::from("deck.pptx"),
            size_mb: 150.25,
            max_mb: 100.0,
        };
        let msg = e.to_string();
        assert!(msg.contains("150.2MB") || msg.contains("150.3MB"), "got: {msg}");
        assert!(msg.contains("max 100MB"), "got: {msg}");
    }

    #[test]
    fn unsupported_type_lists_supported() {
        let e = DocVisionError::UnsupportedFileType {
            path: PathBuf::from("notes.docx"),
            extension: ".docx".into(),
        };
        assert!(e.to_string().contains(".pptx"));
    }

    #[test]
    fn http_unit_error_display() {
        let e = UnitError::Http {
            status: 503,
            body: "overloaded".into(),
        };
        assert!(e.to_string().contains("503"));
        assert!(e.to_string().contains("overloaded"));
    }

    #[test]
    fn cancelled_converts() {
        let e: DocVisionError = crate::pipeline::pace::Cancelled.into();
        assert!(matches!(e, DocVisionError::Cancelled));
    }
}
