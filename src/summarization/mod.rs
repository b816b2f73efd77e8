//! Turning the extracted source bundle into markdown notes via a hosted completion API.
//!
//! The OpenAI-compatible client issues a single chat-completion request per call; there are
//! no retries. [`NotesSummarizer`] wraps the client with the prompt template and the checks
//! that distinguish configuration problems from upstream failures.

mod prompt;

pub use prompt::PromptTemplate;

use crate::config::CompletionSettings;
use crate::error::NotesError;
use crate::extract::SourceBundle;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the completion transport.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Provider could not be reached.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider did not answer within the configured timeout.
    #[error("Completion request timed out: {0}")]
    Timeout(String),
    /// Provider returned an error response.
    #[error("Failed to generate notes: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// System-role instruction.
    pub system: String,
    /// User-role message, including the source text.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue one completion request and return the raw message content (possibly empty).
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError>;
}

/// Build the completion client for the configured credential, or `None` when no key is set.
pub fn build_completion_client(
    settings: &CompletionSettings,
) -> Result<Option<Box<dyn CompletionClient>>, CompletionClientError> {
    let Some(api_key) = settings.api_key.clone() else {
        tracing::warn!("OPENAI_API_KEY not set; note requests will fail until it is configured");
        return Ok(None);
    };
    let client = OpenAiCompletionClient::new(settings.base_url.clone(), api_key, settings.timeout)?;
    Ok(Some(Box::new(client)))
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompletionClient {
    /// Construct a client with an explicit request timeout.
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, CompletionClientError> {
        let http = Client::builder()
            .user_agent("lecture-notes/completion")
            .timeout(timeout)
            .build()
            .map_err(|error| {
                CompletionClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError> {
        let payload = json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    CompletionClientError::Timeout(format!("{} did not respond: {error}", self.base_url))
                } else {
                    CompletionClientError::ProviderUnavailable(format!(
                        "failed to reach {}: {error}",
                        self.base_url
                    ))
                }
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CompletionClientError::ProviderUnavailable(format!(
                "endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionClientError::GenerationFailed(format!(
                "provider returned {status}: {body}"
            )));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|error| {
            if error.is_timeout() {
                CompletionClientError::Timeout(format!("response body stalled: {error}"))
            } else {
                CompletionClientError::InvalidResponse(format!(
                    "failed to decode completion response: {error}"
                ))
            }
        })?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Produces the notes markdown for a source bundle.
pub struct NotesSummarizer {
    client: Option<Box<dyn CompletionClient>>,
    prompt: PromptTemplate,
    model: String,
    temperature: f32,
}

impl NotesSummarizer {
    /// Assemble a summarizer; a `None` client means no credential was configured.
    pub fn new(
        client: Option<Box<dyn CompletionClient>>,
        prompt: PromptTemplate,
        settings: &CompletionSettings,
    ) -> Self {
        Self {
            client,
            prompt,
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    /// Issue exactly one completion request and return the trimmed markdown.
    pub async fn summarize(&self, bundle: &SourceBundle) -> Result<String, NotesError> {
        let client = self.client.as_ref().ok_or(NotesError::MissingCredential)?;
        let source_text = bundle.render();
        tracing::info!(
            model = %self.model,
            files = bundle.documents.len(),
            source_chars = source_text.chars().count(),
            "Requesting notes from completion service"
        );

        let content = client
            .complete(CompletionRequest {
                model: self.model.clone(),
                system: self.prompt.system.clone(),
                user: self.prompt.user_message(&source_text),
                temperature: self.temperature,
            })
            .await?;

        let notes = content.trim();
        if notes.is_empty() {
            return Err(NotesError::EmptyNotes);
        }
        tracing::info!(notes_chars = notes.chars().count(), "Received notes");
        Ok(notes.to_string())
    }
}
