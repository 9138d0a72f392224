//! The generation seam and its edgequake-llm implementation.
//!
//! Every workflow talks to the model through [`Generator`]. The request
//! shape is the same for every backend: one system message holding
//! [`crate::prompts::CONTEXT_INSTRUCTION`] plus all context documents, then
//! the prompt as a separate user turn.
//!
//! Transport and provider errors surface as
//! [`ExamCatError::GenerationFailed`], never as empty text. No retries.

use crate::config::CategorizerConfig;
use crate::error::ExamCatError;
use crate::output::{ContextDocument, GenerationResult};
use crate::prompts::build_context_preamble;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Sends a prompt plus ordered context documents to a generation service.
pub trait Generator: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        documents: &'a [ContextDocument],
    ) -> BoxFuture<'a, Result<GenerationResult, ExamCatError>>;
}

/// [`Generator`] backed by any edgequake-llm chat provider.
pub struct LlmGateway {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &CategorizerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

/// Build `CompletionOptions` from the categoriser config.
fn build_options(config: &CategorizerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// The two-message request shared by every chat backend.
pub fn build_messages(prompt: &str, documents: &[ContextDocument]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(build_context_preamble(documents)),
        ChatMessage::user(prompt),
    ]
}

impl Generator for LlmGateway {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        documents: &'a [ContextDocument],
    ) -> BoxFuture<'a, Result<GenerationResult, ExamCatError>> {
        Box::pin(async move {
            let start = Instant::now();
            let messages = build_messages(prompt, documents);

            let response =
                call_with_timeout(self.timeout, self.provider.chat(&messages, Some(&self.options)))
                    .await?;

            debug!(
                "{} input tokens, {} output tokens, {:?}",
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok(GenerationResult {
                text: response.content,
            })
        })
    }
}

/// Await one provider call, mapping a timeout or provider error to
/// [`ExamCatError::GenerationFailed`].
async fn call_with_timeout<T, E, F>(timeout: Duration, call: F) -> Result<T, ExamCatError>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ExamCatError::GenerationFailed {
            status: None,
            message: format!("timed out after {:?}", timeout),
        })?
        .map_err(|e| ExamCatError::GenerationFailed {
            status: None,
            message: e.to_string(),
        })
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExamCatError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExamCatError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the chat provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`name` other than `"auto"`): created through
///    [`ProviderFactory::create_llm_provider`], which reads the matching
///    API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment provider** (`EDGEQUAKE_LLM_PROVIDER`), with `model` or
///    else `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, with `model` or
///    [`DEFAULT_MODEL`].
/// 5. **Full auto-detection** (`ProviderFactory::from_env`), which picks its
///    own model.
pub fn resolve_provider(
    config: &CategorizerConfig,
    name: &str,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, ExamCatError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if name != "auto" {
        return create_provider(name, model.unwrap_or(DEFAULT_MODEL));
    }

    let env = |key: &str| std::env::var(key).ok();
    if let Some((prov, model)) = auto_choice(
        model,
        env("EDGEQUAKE_LLM_PROVIDER").as_deref(),
        env("EDGEQUAKE_MODEL").as_deref(),
        env("OPENAI_API_KEY").as_deref(),
    ) {
        return create_provider(&prov, &model);
    }

    if let Some(model) = model {
        warn!("Model '{}' ignored: no provider named, auto-detecting", model);
    }
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExamCatError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or name a provider in [API] provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Provider and model for `"auto"`, or `None` to fall through to full
/// auto-detection. Empty variables count as unset.
fn auto_choice(
    model: Option<&str>,
    env_provider: Option<&str>,
    env_model: Option<&str>,
    openai_key: Option<&str>,
) -> Option<(String, String)> {
    fn set(v: Option<&str>) -> Option<&str> {
        v.filter(|s| !s.is_empty())
    }

    if let Some(prov) = set(env_provider) {
        if let Some(model) = set(model).or(set(env_model)) {
            return Some((prov.to_string(), model.to_string()));
        }
    }
    if set(openai_key).is_some() {
        let model = set(model).unwrap_or(DEFAULT_MODEL);
        return Some(("openai".to_string(), model.to_string()));
    }
    None
}
