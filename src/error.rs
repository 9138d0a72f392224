//! Error types for the edgequake-examcat library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExamCatError`]: **Fatal**: the workflow cannot proceed (a prompt file
//!   is missing, the generation service rejected the request, the config
//!   file is malformed). Returned as `Err(ExamCatError)` from every
//!   [`crate::categorize::CategorizationPipeline`] workflow.
//!
//! * [`ExtractionError`]: **Non-fatal**: one document could not be read
//!   through its text layer or through OCR. The extractor logs it and
//!   substitutes empty text, so one bad paper never aborts the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-examcat library.
#[derive(Debug, Error)]
pub enum ExamCatError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A prompt template, refined prompt or papers directory does not exist.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading an input failed for a reason other than absence or permissions.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input exists but cannot be used (e.g. papers path is a file).
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The generation service returned a non-success response or could
    /// not be reached. Never downgraded to empty text.
    ///
    /// `status` carries the HTTP status when the service answered at all.
    #[error("Generation failed: {message}")]
    GenerationFailed {
        status: Option<u16>,
        message: String,
    },

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The settings file exists but could not be parsed.
    #[error("Config file '{path}' is invalid: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    /// The default settings file could not be written.
    #[error("Failed to write config file '{path}': {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output or refined-prompt file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExamCatError {
    /// Map an I/O error on `path` to the matching input error variant.
    pub fn from_read(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => ExamCatError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => ExamCatError::PermissionDenied { path },
            _ => ExamCatError::ReadFailed { path, source: err },
        }
    }

    /// True for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExamCatError::NotFound { .. })
    }
}

/// A non-fatal error while extracting text from one document.
///
/// Logged by [`crate::pipeline::extract::DocumentTextExtractor`] and
/// replaced with empty text; never returned from a workflow.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// The pdfium shared library could not be loaded.
    #[error("PDFium library unavailable: {0}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.")]
    PdfiumUnavailable(String),

    /// The document could not be opened or parsed.
    #[error("Cannot open '{path}': {detail}")]
    Open { path: PathBuf, detail: String },

    /// The text layer of one page could not be read.
    #[error("Page {page}: text layer unreadable: {detail}")]
    PageText { page: usize, detail: String },

    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    Rasterisation { page: usize, detail: String },

    /// The OCR executable could not be started.
    #[error("OCR tool '{tool}' could not be started: {detail}")]
    OcrToolUnavailable { tool: String, detail: String },

    /// The OCR tool ran but failed on a page.
    #[error("Page {page}: OCR failed: {detail}")]
    Ocr { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failed_display_with_status() {
        let e = ExamCatError::GenerationFailed {
            status: Some(503),
            message: "overloaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("overloaded"), "got: {msg}");
        assert!(matches!(e, ExamCatError::GenerationFailed { status: Some(503), .. }));
    }

    #[test]
    fn generation_failed_display_without_status() {
        let e = ExamCatError::GenerationFailed {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "Generation failed: connection refused");
    }

    #[test]
    fn from_read_maps_kinds() {
        let nf = ExamCatError::from_read(
            "a.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(nf.is_not_found());

        let denied = ExamCatError::from_read(
            "a.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert!(matches!(denied, ExamCatError::PermissionDenied { .. }));

        let other = ExamCatError::from_read("a.md", std::io::Error::other("disk on fire"));
        assert!(matches!(other, ExamCatError::ReadFailed { .. }));
    }

    #[test]
    fn ocr_error_display() {
        let e = ExtractionError::Ocr {
            page: 3,
            detail: "bad image".into(),
        };
        assert!(e.to_string().contains("Page 3"));
    }
}
