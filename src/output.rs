//! Data model shared across the pipeline, plus the atomic output writer.

use crate::error::ExamCatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One named unit of source material given to the model.
///
/// Names are for display only; duplicates are not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub name: String,
    pub content: String,
}

impl ContextDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Text returned by a generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
}

/// How a document's text was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// The embedded text layer was long enough.
    TextLayer,
    /// Pages were rasterised and recognised.
    Ocr { pages: usize },
    /// Neither path produced anything; text is empty.
    Failed,
    /// Not a PDF: the file was read as text.
    Raw,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::TextLayer => f.write_str("text layer"),
            ExtractionMethod::Ocr { pages } => write!(f, "ocr, {pages} pages"),
            ExtractionMethod::Failed => f.write_str("failed"),
            ExtractionMethod::Raw => f.write_str("raw"),
        }
    }
}

/// Detailed result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
}

impl Extraction {
    pub fn failed() -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::Failed,
        }
    }
}

/// Which workflow produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Full,
    Single,
    Feeding,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Full => "full",
            Workflow::Single => "single",
            Workflow::Feeding => "feeding",
        }
    }
}

/// Counters and timings for one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStats {
    /// Context documents assembled (syllabus included).
    pub documents: usize,
    /// Documents whose text came from OCR.
    pub ocr_documents: usize,
    /// Documents that ended up with empty text.
    pub empty_documents: usize,
    /// Generation calls made.
    pub generation_calls: usize,
    pub extraction_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl WorkflowStats {
    pub(crate) fn record(&mut self, extraction: &Extraction) {
        self.documents += 1;
        if matches!(extraction.method, ExtractionMethod::Ocr { .. }) {
            self.ocr_documents += 1;
        }
        if extraction.text.trim().is_empty() {
            self.empty_documents += 1;
        }
    }
}

/// What a workflow returns once its output is on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub workflow: Workflow,
    /// The categorised (or single-prompt) result file.
    pub output_path: PathBuf,
    /// The refined prompt written by the full workflow, or read by feeding.
    pub refined_prompt_path: Option<PathBuf>,
    pub stats: WorkflowStats,
}

/// Write `content` to `path` atomically, creating parent directories.
///
/// Writes to a sibling temp file, then renames over the target, so an
/// interrupted run never leaves a half-written output behind.
pub async fn write_atomic(path: &Path, content: &str) -> Result<(), ExamCatError> {
    let write_err = |e| ExamCatError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, content).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("chem_categorized_questions.md");

        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("out").join("chem_categorized_questions.md.tmp").exists());
    }

    #[test]
    fn stats_record_counts_methods() {
        let mut stats = WorkflowStats::default();
        stats.record(&Extraction {
            text: "abc".into(),
            method: ExtractionMethod::TextLayer,
        });
        stats.record(&Extraction {
            text: "--- Page 1 ---\nx\n\n".into(),
            method: ExtractionMethod::Ocr { pages: 1 },
        });
        stats.record(&Extraction::failed());
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.ocr_documents, 1);
        assert_eq!(stats.empty_documents, 1);
    }

    #[test]
    fn extraction_method_serialises_tagged() {
        let json = serde_json::to_string(&ExtractionMethod::Ocr { pages: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"ocr","pages":3}"#);
    }
}
