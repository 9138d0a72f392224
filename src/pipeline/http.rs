//! Bearer-token HTTP generation endpoint.
//!
//! `POST {endpoint}/generate` with
//!
//! ```json
//! {
//!   "prompt": "...",
//!   "system": "Use the following source material ...\n\nSource: syllabus.pdf\n...",
//!   "context_documents": [{ "name": "syllabus.pdf", "content": "..." }]
//! }
//! ```
//!
//! A 2xx response carries the generated text in `text`; a missing field is
//! the empty string. Anything else is a [`ExamCatError::GenerationFailed`].

use crate::error::ExamCatError;
use crate::output::{ContextDocument, GenerationResult};
use crate::pipeline::llm::Generator;
use crate::prompts::build_context_preamble;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    system: String,
    context_documents: &'a [ContextDocument],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: Option<String>,
}

/// [`Generator`] talking to the HTTP `/generate` endpoint.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(endpoint: &str, api_key: &str, timeout_secs: u64) -> Result<Self, ExamCatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExamCatError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/generate", endpoint.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(
        &self,
        prompt: &str,
        documents: &[ContextDocument],
    ) -> Result<GenerationResult, ExamCatError> {
        let body = GenerateRequest {
            prompt,
            system: build_context_preamble(documents),
            context_documents: documents,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExamCatError::GenerationFailed {
                status: None,
                message: if e.is_timeout() {
                    format!("request to {} timed out", self.url)
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ExamCatError::GenerationFailed {
                status: Some(status.as_u16()),
                message: format!("API request failed with status {}: {}", status.as_u16(), detail),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| ExamCatError::GenerationFailed {
                    status: Some(status.as_u16()),
                    message: format!("undecodable response body: {e}"),
                })?;

        let text = parsed.text.unwrap_or_default();
        debug!("{} returned {} bytes", self.url, text.len());
        Ok(GenerationResult { text })
    }
}

impl Generator for HttpGateway {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        documents: &'a [ContextDocument],
    ) -> BoxFuture<'a, Result<GenerationResult, ExamCatError>> {
        Box::pin(self.post(prompt, documents))
    }
}
