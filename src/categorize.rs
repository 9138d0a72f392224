//! The three categorisation workflows.
//!
//! Every workflow is a chain of sequential generation calls fed by text
//! extracted from the syllabus and the question papers:
//!
//! * **full**: general prompt over everything, meta prompt over
//!   `{syllabus, first output}` to obtain a refined prompt, save it, then run
//!   the refined prompt (re-read from disk) over everything again.
//! * **single**: one prompt file over an explicit list of context files.
//! * **feeding**: reuse a refined prompt saved by an earlier full run,
//!   prefixed with the feeding instruction.
//!
//! Extraction never fails: a missing or unreadable document becomes empty
//! text. A missing prompt, a missing papers directory or a failed generation
//! call aborts the workflow before anything further is written.

use crate::config::CategorizerConfig;
use crate::error::ExamCatError;
use crate::output::{
    write_atomic, ContextDocument, Extraction, ExtractionMethod, Workflow, WorkflowOutput,
    WorkflowStats,
};
use crate::pipeline::extract::DocumentTextExtractor;
use crate::pipeline::http::HttpGateway;
use crate::pipeline::llm::{resolve_provider, Generator, LlmGateway};
use crate::pipeline::ocr::TesseractCli;
use crate::pipeline::pdfium::PdfiumBackend;
use crate::pipeline::store::PromptStore;
use crate::progress::ProgressCallback;
use crate::prompts::{
    categorized_output_file, feeding_prompt, FEEDING_PROMPT_FILE, GENERAL_PROMPT_FILE,
    META_OUTPUT_DOC_NAME, META_PROMPT_FILE, META_SYLLABUS_DOC_NAME, SYLLABUS_DOC_NAME,
};
use crate::settings::Settings;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates extraction, prompt loading, generation and output.
#[derive(Clone)]
pub struct CategorizationPipeline {
    extractor: DocumentTextExtractor,
    store: PromptStore,
    gateway: Arc<dyn Generator>,
    output_dir: PathBuf,
    concurrency: usize,
    progress: Option<ProgressCallback>,
}

/// Counters accumulated while a workflow runs.
struct Run {
    stats: WorkflowStats,
    start: Instant,
}

impl Run {
    fn new() -> Self {
        Self {
            stats: WorkflowStats::default(),
            start: Instant::now(),
        }
    }

    fn finish(
        mut self,
        workflow: Workflow,
        output_path: PathBuf,
        refined_prompt_path: Option<PathBuf>,
    ) -> WorkflowOutput {
        self.stats.total_duration_ms = self.start.elapsed().as_millis() as u64;
        WorkflowOutput {
            workflow,
            output_path,
            refined_prompt_path,
            stats: self.stats,
        }
    }
}

impl CategorizationPipeline {
    pub fn new(
        extractor: DocumentTextExtractor,
        store: PromptStore,
        gateway: Arc<dyn Generator>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            store,
            gateway,
            output_dir: output_dir.into(),
            concurrency: CategorizerConfig::default().concurrency,
            progress: None,
        }
    }

    /// Number of question papers extracted at once (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Wire up pdfium, tesseract and the configured generation backend.
    pub fn from_settings(
        settings: &Settings,
        config: &CategorizerConfig,
    ) -> Result<Self, ExamCatError> {
        let gateway = build_gateway(settings, config)?;
        let mut pipeline = Self::new(
            build_extractor(settings, config),
            PromptStore::new(&settings.paths.base_dir),
            gateway,
            &settings.paths.output_dir,
        )
        .with_concurrency(config.concurrency);
        pipeline.progress = config.progress_callback.clone();
        Ok(pipeline)
    }

    pub fn store(&self) -> &PromptStore {
        &self.store
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    // ── Workflows ────────────────────────────────────────────────────────

    /// Two-stage refinement over a syllabus and a directory of papers.
    ///
    /// Writes `{subject}-refinedmax.md` to the prompt directory and
    /// `{subject}_categorized_questions.md` to the output directory.
    pub async fn run_full(
        &self,
        papers_dir: &Path,
        syllabus: &Path,
        subject: &str,
    ) -> Result<WorkflowOutput, ExamCatError> {
        let mut run = Run::new();
        info!("Starting full workflow for '{}'", subject);
        if let Some(ref cb) = self.progress {
            cb.on_workflow_start(Workflow::Full.as_str(), 7);
        }

        self.step("extract syllabus");
        let extract_start = Instant::now();
        let syllabus_text = self.read_source(syllabus, &mut run).await;

        self.step("extract papers");
        let papers = list_papers(papers_dir).await?;
        info!("Found {} question papers in {}", papers.len(), papers_dir.display());
        let paper_docs = self.read_papers(&papers, &mut run).await;
        run.stats.extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

        let mut context = Vec::with_capacity(paper_docs.len() + 1);
        context.push(ContextDocument::new(SYLLABUS_DOC_NAME, syllabus_text.clone()));
        context.extend(paper_docs);

        let general_prompt = self.store.load(GENERAL_PROMPT_FILE).await?;
        let meta_prompt = self.store.load(META_PROMPT_FILE).await?;

        let general = self
            .generate("generate general", &general_prompt, &context, &mut run)
            .await?;

        let meta_context = [
            ContextDocument::new(META_SYLLABUS_DOC_NAME, syllabus_text),
            ContextDocument::new(META_OUTPUT_DOC_NAME, general),
        ];
        let refined = self
            .generate("generate refined prompt", &meta_prompt, &meta_context, &mut run)
            .await?;

        self.step("save refined prompt");
        let refined_path = self.store.save(&refined, subject).await?;
        info!("Refined prompt saved to {}", refined_path.display());
        self.saved(&refined_path);

        // The final call runs whatever is on disk now, not the in-memory text.
        let refined_prompt = self.store.load_by_path(&refined_path).await?;
        let categorized = self
            .generate("generate final", &refined_prompt, &context, &mut run)
            .await?;

        self.step("save output");
        let output_path = self.output_dir.join(categorized_output_file(subject));
        self.write_output(&output_path, &categorized).await?;

        Ok(run.finish(Workflow::Full, output_path, Some(refined_path)))
    }

    /// Run one prompt file over the given context files.
    ///
    /// Output goes to `result_{prompt stem}.md`; only the last extension is
    /// stripped, so `geo.v2.md` becomes `result_geo.v2.md`.
    pub async fn run_single(
        &self,
        prompt_path: &Path,
        contexts: &[PathBuf],
    ) -> Result<WorkflowOutput, ExamCatError> {
        let mut run = Run::new();
        info!("Starting single workflow with {}", prompt_path.display());
        if let Some(ref cb) = self.progress {
            cb.on_workflow_start(Workflow::Single.as_str(), 4);
        }

        self.step("load prompt");
        let prompt = self.store.load_by_path(prompt_path).await?;
        let stem = prompt_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| ExamCatError::InvalidInput {
                path: prompt_path.to_path_buf(),
                reason: "prompt path has no file name".into(),
            })?;

        self.step("load context");
        let extract_start = Instant::now();
        let context = self.read_contexts(contexts, &mut run).await;
        run.stats.extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

        let result = self.generate("generate", &prompt, &context, &mut run).await?;

        self.step("save output");
        let output_path = self.output_dir.join(format!("result_{stem}.md"));
        self.write_output(&output_path, &result).await?;

        Ok(run.finish(Workflow::Single, output_path, None))
    }

    /// Reuse the refined prompt saved for `subject` by an earlier full run.
    ///
    /// # Errors
    /// `NotFound` with zero generation calls when `{subject}-refinedmax.md`
    /// does not exist.
    pub async fn run_feeding(
        &self,
        subject: &str,
        syllabus: &Path,
        contexts: &[PathBuf],
    ) -> Result<WorkflowOutput, ExamCatError> {
        let mut run = Run::new();
        info!("Starting feeding workflow for '{}'", subject);
        if let Some(ref cb) = self.progress {
            cb.on_workflow_start(Workflow::Feeding.as_str(), 6);
        }

        self.step("check refined prompt");
        let refined_path = self.store.refined_prompt_path(subject);
        if !self.store.has_refined_prompt(subject).await {
            return Err(ExamCatError::NotFound { path: refined_path });
        }

        self.step("extract syllabus");
        let extract_start = Instant::now();
        let syllabus_text = self.read_source(syllabus, &mut run).await;
        let mut context = vec![ContextDocument::new(display_name(syllabus), syllabus_text)];

        self.step("load context");
        context.extend(self.read_contexts(contexts, &mut run).await);
        run.stats.extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

        self.step("load feeding instruction");
        let instruction = self.store.load(FEEDING_PROMPT_FILE).await?;
        let refined = self.store.load_by_path(&refined_path).await?;
        let prompt = feeding_prompt(&instruction, &refined);

        let categorized = self.generate("generate", &prompt, &context, &mut run).await?;

        self.step("save output");
        let output_path = self.output_dir.join(categorized_output_file(subject));
        self.write_output(&output_path, &categorized).await?;

        Ok(run.finish(Workflow::Feeding, output_path, Some(refined_path)))
    }

    // ── Steps ────────────────────────────────────────────────────────────

    fn step(&self, step: &str) {
        info!("Step: {}", step);
        if let Some(ref cb) = self.progress {
            cb.on_step_start(step);
        }
    }

    fn saved(&self, path: &Path) {
        if let Some(ref cb) = self.progress {
            cb.on_artifact_saved(path);
        }
    }

    async fn generate(
        &self,
        step: &str,
        prompt: &str,
        documents: &[ContextDocument],
        run: &mut Run,
    ) -> Result<String, ExamCatError> {
        self.step(step);
        let start = Instant::now();
        let result = self.gateway.generate(prompt, documents).await?;
        let elapsed = start.elapsed();

        run.stats.generation_calls += 1;
        run.stats.generation_duration_ms += elapsed.as_millis() as u64;
        debug!(
            "{}: {} context documents → {} bytes in {:?}",
            step,
            documents.len(),
            result.text.len(),
            elapsed
        );

        if let Some(ref cb) = self.progress {
            cb.on_generation_complete(step, result.text.len());
        }
        Ok(result.text)
    }

    async fn write_output(&self, path: &Path, content: &str) -> Result<(), ExamCatError> {
        write_atomic(path, content).await?;
        info!("Output saved to {}", path.display());
        self.saved(path);
        if let Some(ref cb) = self.progress {
            cb.on_workflow_complete(path);
        }
        Ok(())
    }

    /// Read the text of one named input: PDFs are extracted, anything else
    /// is read as (lossy) UTF-8. Unreadable inputs become empty text.
    async fn read_source(&self, path: &Path, run: &mut Run) -> String {
        let extraction = self.load_source(path).await;
        run.stats.record(&extraction);
        extraction.text
    }

    async fn load_source(&self, path: &Path) -> Extraction {
        let extraction = if is_pdf(path) {
            self.extractor.extract_detailed(path).await
        } else {
            match tokio::fs::read(path).await {
                Ok(bytes) => Extraction {
                    text: String::from_utf8_lossy(&bytes).into_owned(),
                    method: ExtractionMethod::Raw,
                },
                Err(e) => {
                    warn!("Error reading {}: {}", path.display(), e);
                    Extraction::failed()
                }
            }
        };

        debug!(
            "{}: {} bytes ({})",
            path.display(),
            extraction.text.len(),
            extraction.method
        );
        if let Some(ref cb) = self.progress {
            cb.on_document_extracted(&display_name(path), extraction.text.len(), &extraction.method);
        }
        extraction
    }

    /// Extract papers with bounded concurrency; output order equals input order.
    async fn read_papers(&self, papers: &[PathBuf], run: &mut Run) -> Vec<ContextDocument> {
        let extractions: Vec<Extraction> =
            stream::iter(papers.iter().map(|path| self.load_source(path)))
                .buffered(self.concurrency)
                .collect()
                .await;

        papers
            .iter()
            .zip(extractions)
            .map(|(path, extraction)| {
                run.stats.record(&extraction);
                ContextDocument::new(display_name(path), extraction.text)
            })
            .collect()
    }

    async fn read_contexts(&self, contexts: &[PathBuf], run: &mut Run) -> Vec<ContextDocument> {
        let mut documents = Vec::with_capacity(contexts.len());
        for path in contexts {
            let text = self.read_source(path, run).await;
            documents.push(ContextDocument::new(display_name(path), text));
        }
        documents
    }
}

/// Build the extractor from the settings file and runtime knobs.
pub fn build_extractor(settings: &Settings, config: &CategorizerConfig) -> DocumentTextExtractor {
    let backend = Arc::new(PdfiumBackend::new(config.max_rendered_pixels));
    let ocr = Arc::new(TesseractCli::new(
        settings.tesseract.path.clone(),
        settings.tesseract.language.clone(),
    ));
    DocumentTextExtractor::new(backend.clone(), backend, ocr)
}

/// Pick the generation backend.
///
/// `"http"` (the settings default) talks to `API.endpoint` with
/// `API.api_key`; any other name goes through edgequake-llm, which reads
/// its own API key from the environment.
pub fn build_gateway(
    settings: &Settings,
    config: &CategorizerConfig,
) -> Result<Arc<dyn Generator>, ExamCatError> {
    let provider_name = config
        .provider_name
        .as_deref()
        .unwrap_or(settings.api.provider.as_str());

    if config.provider.is_none() && provider_name == "http" {
        if settings.has_placeholder_key() {
            return Err(ExamCatError::ProviderNotConfigured {
                provider: "http".into(),
                hint: "Set API.api_key in the config file.".into(),
            });
        }
        let gateway = HttpGateway::new(
            &settings.api.endpoint,
            &settings.api.api_key,
            config.api_timeout_secs,
        )?;
        debug!("Using HTTP gateway at {}", gateway.url());
        return Ok(Arc::new(gateway));
    }

    let model = config.model.as_deref().or(settings.api.model.as_deref());
    let provider = resolve_provider(config, provider_name, model)?;
    debug!("Using edgequake-llm provider '{}'", provider_name);
    Ok(Arc::new(LlmGateway::new(provider, config)))
}

/// Every `*.pdf` (any case) directly inside `dir`, sorted by file name.
async fn list_papers(dir: &Path) -> Result<Vec<PathBuf>, ExamCatError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| ExamCatError::from_read(dir, e))?;

    let mut papers = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ExamCatError::from_read(dir, e))?
    {
        let path = entry.path();
        if !is_pdf(&path) {
            continue;
        }
        if tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            papers.push(path);
        }
    }

    papers.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(papers)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
