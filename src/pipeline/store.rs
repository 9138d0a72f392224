//! Prompt templates on disk.
//!
//! The store is a plain directory: templates are read by name, refined
//! prompts are written as `{subject}-refinedmax.md`. There is no caching
//! and no locking; one writer per subject is assumed.

use crate::error::ExamCatError;
use crate::output::write_atomic;
use crate::prompts::refined_prompt_file;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads prompt templates from, and writes refined prompts to, one directory.
#[derive(Debug, Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the template `name` from the store directory.
    ///
    /// # Errors
    /// `NotFound` if the file does not exist.
    pub async fn load(&self, name: &str) -> Result<String, ExamCatError> {
        self.load_by_path(&self.dir.join(name)).await
    }

    /// Read any file, e.g. a refined prompt or a prompt given on the CLI.
    pub async fn load_by_path(&self, path: &Path) -> Result<String, ExamCatError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExamCatError::from_read(path, e))?;
        debug!("Loaded prompt {} ({} bytes)", path.display(), text.len());
        Ok(text)
    }

    /// Path of the refined prompt for `subject` (subject is lowercased).
    pub fn refined_prompt_path(&self, subject: &str) -> PathBuf {
        self.dir.join(refined_prompt_file(subject))
    }

    /// Whether a refined prompt for `subject` has been saved.
    pub async fn has_refined_prompt(&self, subject: &str) -> bool {
        tokio::fs::try_exists(self.refined_prompt_path(subject))
            .await
            .unwrap_or(false)
    }

    /// Write `content` as the refined prompt for `subject`, replacing any
    /// previous one, and return the path written.
    pub async fn save(&self, content: &str, subject: &str) -> Result<PathBuf, ExamCatError> {
        let path = self.refined_prompt_path(subject);
        write_atomic(&path, content).await?;
        debug!("Saved refined prompt {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }
}
