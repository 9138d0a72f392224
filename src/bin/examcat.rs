//! CLI binary for edgequake-examcat.
//!
//! A thin shim over the library crate: loads (or creates) the settings
//! file, maps flags to `CategorizerConfig`, runs one workflow and prints
//! where the result went.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edgequake_examcat::settings::DEFAULT_SETTINGS_FILE;
use edgequake_examcat::{
    build_extractor, CategorizationPipeline, CategorizerConfig, ExtractionMethod,
    ProgressCallback, Settings, SettingsStatus, WorkflowOutput, WorkflowProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one step bar plus a log line per document,
/// generation call and saved file.
struct CliProgressCallback {
    bar: ProgressBar,
    steps_started: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            steps_started: AtomicUsize::new(0),
        })
    }

    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl WorkflowProgressCallback for CliProgressCallback {
    fn on_workflow_start(&self, workflow: &str, total_steps: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:30.green/238}] {pos}/{len}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_steps as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(workflow.to_string());
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting {workflow} workflow"))
        ));
    }

    fn on_step_start(&self, step: &str) {
        if self.steps_started.fetch_add(1, Ordering::SeqCst) > 0 {
            self.bar.inc(1);
        }
        self.bar.set_message(step.to_string());
    }

    fn on_document_extracted(&self, name: &str, text_len: usize, method: &ExtractionMethod) {
        if text_len == 0 {
            self.bar
                .println(format!("  {} {:<32}  {}", red("✗"), name, red("no text")));
        } else {
            self.bar.println(format!(
                "  {} {:<32}  {}  {}",
                green("✓"),
                name,
                dim(&format!("{text_len:>7} chars")),
                dim(&method.to_string()),
            ));
        }
    }

    fn on_generation_complete(&self, step: &str, text_len: usize) {
        self.bar.println(format!(
            "  {} {:<32}  {}",
            green("✓"),
            step,
            dim(&format!("{text_len:>7} chars")),
        ));
    }

    fn on_artifact_saved(&self, path: &Path) {
        self.bar
            .println(format!("  {} {}", cyan("→"), path.display()));
    }

    fn on_workflow_complete(&self, _output_path: &Path) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Two-stage refinement over every paper in a directory
  examcat full --papers papers/ --syllabus syllabus.pdf --subject Chemistry

  # Run one prompt against a few files
  examcat single --prompt prompts/geo.v2.md --context 2019.pdf --context notes.md

  # Reuse the refined prompt saved by an earlier full run
  examcat feeding --subject Chemistry --syllabus syllabus.pdf --context 2024.pdf

  # Show what the extractor sees in a PDF (no model needed)
  examcat extract scanned-paper.pdf

CONFIG FILE (examcat.toml, created on first run):
  [API]
  api_key  = "..."            bearer token for the http provider
  provider = "http"           or openai, anthropic, gemini, ollama, auto
  endpoint = "https://..."    http provider only
  model    = "gpt-4.1-mini"   edgequake-llm providers only

  [Paths]
  base_dir   = "..."          prompt templates and refined prompts
  output_dir = "..."          categorised results

  [Tesseract]
  path     = "tesseract"
  language = "eng"

PROMPT FILES (in Paths.base_dir):
  general-prompt.md               first pass
  prompt-for-prompt.md            meta prompt producing the refined prompt
  feeding-refinedmax-prompt.md    instruction used by `feeding`
  {subject}-refinedmax.md         written by `full`

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (provider = openai / auto)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider used when provider = auto
  EDGEQUAKE_MODEL         Model ID
  PDFIUM_LIB_PATH         Path to libpdfium
  RUST_LOG                Log filter, e.g. edgequake_examcat=debug
"#;

/// Categorise exam questions against a syllabus with a language model.
#[derive(Parser, Debug)]
#[command(
    name = "examcat",
    version,
    about = "Categorise exam questions against a syllabus with a language model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file. Created with placeholder values if missing.
    #[arg(long, global = true, env = "EXAMCAT_CONFIG", default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Generation backend: http, openai, anthropic, gemini, ollama, auto.
    /// Overrides API.provider.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Model ID for edgequake-llm providers. Overrides API.model.
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Number of question papers extracted at once.
    #[arg(short, long, global = true, env = "EXAMCAT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Per-generation-call timeout in seconds.
    #[arg(long, global = true, env = "EXAMCAT_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Print the workflow result (or extraction) as JSON.
    #[arg(long, global = true, env = "EXAMCAT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, global = true, env = "EXAMCAT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "EXAMCAT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "EXAMCAT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// General pass, prompt refinement, final pass.
    Full {
        /// Directory of question-paper PDFs.
        #[arg(long)]
        papers: PathBuf,
        /// Syllabus PDF.
        #[arg(long)]
        syllabus: PathBuf,
        /// Subject name, used for the refined prompt and output file names.
        #[arg(long)]
        subject: String,
    },
    /// Run one prompt file against explicit context files.
    Single {
        /// Prompt file.
        #[arg(long)]
        prompt: PathBuf,
        /// Context file (PDFs are extracted, anything else is read as text).
        #[arg(long, required = true, num_args = 1..)]
        context: Vec<PathBuf>,
    },
    /// Reuse a refined prompt saved by `full`.
    Feeding {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        syllabus: PathBuf,
        #[arg(long, required = true, num_args = 1..)]
        context: Vec<PathBuf>,
    },
    /// Print the text extracted from one PDF.
    Extract {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    let is_workflow = !matches!(cli.command, Command::Extract { .. });
    let show_progress = is_workflow && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Settings ─────────────────────────────────────────────────────────
    let (settings, status) = Settings::load_or_create(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    if status == SettingsStatus::Created {
        eprintln!(
            "{} Created default config at {}.\n  Please update it with your API key and directories, then run again.",
            cyan("◆"),
            bold(&cli.config.display().to_string())
        );
        return Ok(());
    }

    // ── Extract-only mode ────────────────────────────────────────────────
    if let Command::Extract { ref path } = cli.command {
        return run_extract(&cli, &settings, path).await;
    }

    // ── Build config and pipeline ────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn WorkflowProgressCallback>),
    )?;

    let pipeline = CategorizationPipeline::from_settings(&settings, &config)
        .context("Failed to set up the generation backend")?;

    // ── Run workflow ─────────────────────────────────────────────────────
    let result = match cli.command {
        Command::Full {
            ref papers,
            ref syllabus,
            ref subject,
        } => pipeline
            .run_full(papers, syllabus, subject)
            .await
            .context("Full workflow failed"),
        Command::Single {
            ref prompt,
            ref context,
        } => pipeline
            .run_single(prompt, context)
            .await
            .context("Single workflow failed"),
        Command::Feeding {
            ref subject,
            ref syllabus,
            ref context,
        } => pipeline
            .run_feeding(subject, syllabus, context)
            .await
            .context("Feeding workflow failed"),
        Command::Extract { .. } => Err(anyhow::anyhow!("extract does not run a workflow")),
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            return Err(e);
        }
    };

    report(&cli, &output)
}

/// Map CLI args to `CategorizerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CategorizerConfig> {
    let mut builder = CategorizerConfig::builder()
        .concurrency(cli.concurrency)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn report(cli: &Cli, output: &WorkflowOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} documents ({} via OCR, {} empty)  {} generation calls  {}ms",
            if stats.empty_documents == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.documents,
            stats.ocr_documents,
            stats.empty_documents,
            stats.generation_calls,
            stats.total_duration_ms,
        );
        if let Some(ref refined) = output.refined_prompt_path {
            eprintln!("   refined prompt  {}", dim(&refined.display().to_string()));
        }
    }
    println!("{}", output.output_path.display());
    Ok(())
}

async fn run_extract(cli: &Cli, settings: &Settings, path: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    anyhow::ensure!(meta.is_file(), "{} is not a file", path.display());

    let config = build_config(cli, None)?;
    let extraction = build_extractor(settings, &config)
        .extract_detailed(path)
        .await;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&extraction).context("Failed to serialise extraction")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(extraction.text.as_bytes())
        .context("Failed to write to stdout")?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {} chars  ({})",
            if extraction.text.trim().is_empty() {
                red("✗")
            } else {
                green("✓")
            },
            path.display(),
            extraction.text.chars().count(),
            extraction.method,
        );
    }
    Ok(())
}
