//! Runtime configuration for the categorisation workflows.
//!
//! [`CategorizerConfig`] holds every knob that is not part of the on-disk
//! [`crate::settings::Settings`] file: model choice, sampling parameters,
//! timeouts, extraction concurrency and the progress callback. Build it with
//! [`CategorizerConfig::builder()`] so callers only set what they care about.

use crate::error::ExamCatError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for a categorisation run.
///
/// # Example
/// ```rust
/// use edgequake_examcat::CategorizerConfig;
///
/// let config = CategorizerConfig::builder()
///     .model("gpt-4.1-mini")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct CategorizerConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini". Overrides `API.model`.
    pub model: Option<String>,

    /// Provider name ("http", "openai", "anthropic", "ollama", …).
    /// Overrides `API.provider` from the settings file.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over every name.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per generation call. Default: 8192.
    ///
    /// The final call emits every question of every paper.
    pub max_tokens: usize,

    /// Per-generation-call timeout in seconds. Default: 300.
    pub api_timeout_secs: u64,

    /// How many question papers are extracted at once. Default: 4.
    ///
    /// Only extraction fans out; generation calls are always sequential.
    pub concurrency: usize,

    /// Longest edge, in pixels, of a page rasterised for OCR. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            api_timeout_secs: 300,
            concurrency: 4,
            max_rendered_pixels: 2000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CategorizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategorizerConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn WorkflowProgressCallback>"),
            )
            .finish()
    }
}

impl CategorizerConfig {
    /// Create a new builder for `CategorizerConfig`.
    pub fn builder() -> CategorizerConfigBuilder {
        CategorizerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CategorizerConfig`].
#[derive(Debug)]
pub struct CategorizerConfigBuilder {
    config: CategorizerConfig,
}

impl CategorizerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CategorizerConfig, ExamCatError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ExamCatError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExamCatError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CategorizerConfig::default();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.max_tokens, 8192);
        assert_eq!(c.api_timeout_secs, 300);
        assert!(c.provider.is_none());
    }

    #[test]
    fn builder_clamps() {
        let c = CategorizerConfig::builder()
            .concurrency(0)
            .temperature(9.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = CategorizerConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, ExamCatError::InvalidConfig(_)));
    }

    #[test]
    fn debug_hides_provider() {
        let c = CategorizerConfig::builder().model("gpt-4.1").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("gpt-4.1"));
    }
}
