//! # edgequake-examcat
//!
//! Categorise exam questions against a syllabus with a language model.
//!
//! Question papers and the syllabus are turned into plain text (the PDF text
//! layer when it has enough content, OCR otherwise), handed to a model as
//! named context documents, and run through a two-stage prompt chain: a
//! general first pass, a meta pass that writes a subject-specific "refined"
//! prompt, and a final pass with that refined prompt. The refined prompt is
//! saved so later runs can reuse it ("feeding").
//!
//! ## Pipeline Overview
//!
//! ```text
//! syllabus.pdf + papers/*.pdf
//!  │
//!  ├─ 1. Extract   text layer via pdfium; ≤ 100 chars → rasterise + tesseract
//!  ├─ 2. General   general-prompt.md        over [syllabus, papers…]
//!  ├─ 3. Refine    prompt-for-prompt.md     over [syllabus.md, output.md]
//!  ├─ 4. Save      {subject}-refinedmax.md  (prompt directory)
//!  ├─ 5. Final     refined prompt (re-read) over [syllabus, papers…]
//!  └─ 6. Output    {subject}_categorized_questions.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_examcat::{CategorizationPipeline, CategorizerConfig, Settings};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(Path::new("examcat.toml"))?;
//!     let config = CategorizerConfig::default();
//!     let pipeline = CategorizationPipeline::from_settings(&settings, &config)?;
//!
//!     let output = pipeline
//!         .run_full(Path::new("papers"), Path::new("syllabus.pdf"), "Chemistry")
//!         .await?;
//!     println!("{}", output.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `examcat` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Generation backends
//!
//! `API.provider = "http"` (the default) posts to `{API.endpoint}/generate`
//! with `API.api_key` as a bearer token. Any other name (`openai`,
//! `anthropic`, `gemini`, `ollama`, …) is created through edgequake-llm,
//! which reads the provider's own key from the environment. `auto` lets
//! edgequake-llm pick from whatever keys are set.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod categorize;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use categorize::{build_extractor, build_gateway, CategorizationPipeline};
pub use config::{CategorizerConfig, CategorizerConfigBuilder};
pub use error::{ExamCatError, ExtractionError};
pub use output::{
    ContextDocument, Extraction, ExtractionMethod, GenerationResult, Workflow, WorkflowOutput,
    WorkflowStats,
};
pub use pipeline::extract::{DocumentTextExtractor, OcrEngine, PageRasterizer, TextLayer};
pub use pipeline::http::HttpGateway;
pub use pipeline::llm::{Generator, LlmGateway};
pub use pipeline::store::PromptStore;
pub use progress::{NoopProgressCallback, ProgressCallback, WorkflowProgressCallback};
pub use settings::{Settings, SettingsStatus};
