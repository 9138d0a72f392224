//! On-disk settings: API credentials, prompt/output directories, OCR tool.
//!
//! The settings file is TOML with three sections:
//!
//! ```toml
//! [API]
//! api_key  = "YOUR_API_KEY_HERE"
//! provider = "http"                                   # or openai, anthropic, ollama, …
//! endpoint = "https://notebooklm.googleapis.com/v1"   # used by the http provider
//! # model  = "gpt-4.1-mini"
//!
//! [Paths]
//! base_dir   = "/home/me/exams"          # prompt templates live here
//! output_dir = "/home/me/exams/output"
//!
//! [Tesseract]
//! path     = "tesseract"
//! language = "eng"
//! ```
//!
//! A missing file is not an error: [`Settings::load_or_create`] writes a
//! default one, reloads it, and reports [`SettingsStatus::Created`] so the
//! caller can ask the user to fill in real credentials.

use crate::error::ExamCatError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "examcat.toml";

/// Placeholder written into a freshly created settings file.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Default endpoint of the HTTP generation service.
pub const DEFAULT_ENDPOINT: &str = "https://notebooklm.googleapis.com/v1";

/// Whether [`Settings::load_or_create`] found a file or had to write one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsStatus {
    /// An existing file was read.
    Loaded,
    /// No file existed; defaults were written and reloaded.
    Created,
}

/// The full settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "API")]
    pub api: ApiSettings,
    #[serde(rename = "Paths")]
    pub paths: PathSettings,
    #[serde(rename = "Tesseract", default)]
    pub tesseract: TesseractSettings,
}

/// `[API]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// `[Paths]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding the prompt templates and refined prompts.
    pub base_dir: PathBuf,
    /// Directory receiving categorised outputs.
    pub output_dir: PathBuf,
}

/// `[Tesseract]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TesseractSettings {
    /// Path to the `tesseract` executable, or a bare name resolved via `PATH`.
    #[serde(default = "default_tesseract_path")]
    pub path: PathBuf,
    /// Tesseract language code(s), e.g. "eng" or "eng+fra".
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TesseractSettings {
    fn default() -> Self {
        Self {
            path: default_tesseract_path(),
            language: default_language(),
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_language() -> String {
    "eng".to_string()
}

impl Settings {
    /// Default settings rooted at `base_dir`.
    pub fn default_for(base_dir: &Path) -> Self {
        Self {
            api: ApiSettings {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                provider: default_provider(),
                endpoint: default_endpoint(),
                model: None,
            },
            paths: PathSettings {
                base_dir: base_dir.to_path_buf(),
                output_dir: base_dir.join("output"),
            },
            tesseract: TesseractSettings::default(),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ExamCatError> {
        toml::from_str(text).map_err(|e| ExamCatError::ConfigParse {
            path: origin.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Read an existing settings file.
    pub fn load(path: &Path) -> Result<Self, ExamCatError> {
        let text = std::fs::read_to_string(path).map_err(|e| ExamCatError::from_read(path, e))?;
        let settings = Self::from_toml(&text, path)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `path`, synthesising a default file first if it does not exist.
    ///
    /// Defaults are rooted at the current working directory. The file is
    /// always re-read after being written so the returned value is exactly
    /// what the user will see when editing it.
    pub fn load_or_create(path: &Path) -> Result<(Self, SettingsStatus), ExamCatError> {
        if path.exists() {
            return Ok((Self::load(path)?, SettingsStatus::Loaded));
        }

        let cwd = std::env::current_dir().map_err(|e| ExamCatError::Internal(e.to_string()))?;
        Self::default_for(&cwd).write(path)?;
        info!("Created default config at {}", path.display());

        Ok((Self::load(path)?, SettingsStatus::Created))
    }

    /// Serialise and write the settings to `path`.
    pub fn write(&self, path: &Path) -> Result<(), ExamCatError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| ExamCatError::Internal(format!("settings serialisation: {e}")))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExamCatError::ConfigWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, text).map_err(|e| ExamCatError::ConfigWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// True while the API key is still the placeholder.
    pub fn has_placeholder_key(&self) -> bool {
        self.api.api_key.trim().is_empty() || self.api.api_key == PLACEHOLDER_API_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_writes_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("examcat.toml");

        let (first, status) = Settings::load_or_create(&path).unwrap();
        assert_eq!(status, SettingsStatus::Created);
        assert!(path.exists());
        assert!(first.has_placeholder_key());
        assert_eq!(first.paths.output_dir, first.paths.base_dir.join("output"));

        let (second, status) = Settings::load_or_create(&path).unwrap();
        assert_eq!(status, SettingsStatus::Loaded);
        assert_eq!(first, second);
    }

    #[test]
    fn parses_minimal_file_with_defaults() {
        let text = r#"
[API]
api_key = "sk-real"

[Paths]
base_dir = "/srv/exams"
output_dir = "/srv/exams/out"
"#;
        let s = Settings::from_toml(text, Path::new("examcat.toml")).unwrap();
        assert_eq!(s.api.api_key, "sk-real");
        assert_eq!(s.api.provider, "http");
        assert_eq!(s.api.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(s.tesseract.path, PathBuf::from("tesseract"));
        assert_eq!(s.tesseract.language, "eng");
        assert!(!s.has_placeholder_key());
    }

    #[test]
    fn parses_full_file() {
        let text = r#"
[API]
api_key = "k"
provider = "openai"
model = "gpt-4.1-mini"

[Paths]
base_dir = "prompts"
output_dir = "out"

[Tesseract]
path = "/usr/local/bin/tesseract"
language = "eng+fra"
"#;
        let s = Settings::from_toml(text, Path::new("x.toml")).unwrap();
        assert_eq!(s.api.provider, "openai");
        assert_eq!(s.api.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(s.tesseract.language, "eng+fra");
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let err = Settings::from_toml("[API]\napi_key = \"k\"\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ExamCatError::ConfigParse { .. }));
    }
}
