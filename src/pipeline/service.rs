//! Notes service coordinating extraction, the completion call, rendering, and packaging.

use crate::{
    config::Config,
    error::NotesError,
    extract::{ExtractorRegistry, SourceBundle},
    ingress::{UploadLimits, UploadedFile},
    package::build_archive,
    render::render,
    summarization::{CompletionClientError, NotesSummarizer, build_completion_client},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

/// Turns a set of uploads into the notes archive.
///
/// Holds only immutable state (extractor table, summarizer with its HTTP client, limits), so one
/// instance is built at startup and shared across requests through an `Arc`. Stages run strictly
/// in order; CPU-bound work is moved onto the blocking pool.
pub struct NotesService {
    registry: Arc<ExtractorRegistry>,
    summarizer: NotesSummarizer,
    limits: UploadLimits,
    shared_secret: Option<String>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// Run the full pipeline and return the ZIP archive bytes.
    async fn make_notes(&self, files: Vec<UploadedFile>) -> Result<Vec<u8>, NotesError>;

    /// Ceilings applied while reading uploads.
    fn limits(&self) -> UploadLimits;

    /// Shared secret expected in `X-Backend-Secret`, if one is configured.
    fn shared_secret(&self) -> Option<&str>;
}

impl NotesService {
    /// Assemble the service from explicit parts.
    pub fn new(
        registry: ExtractorRegistry,
        summarizer: NotesSummarizer,
        limits: UploadLimits,
        shared_secret: Option<String>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            summarizer,
            limits,
            shared_secret,
        }
    }

    /// Build the service with the default extractors and the configured completion client.
    pub fn from_config(config: &Config) -> Result<Self, CompletionClientError> {
        let client = build_completion_client(&config.completion)?;
        tracing::info!(
            model = %config.completion.model,
            base_url = %config.completion.base_url,
            max_files = config.limits.max_files,
            secret_required = config.shared_secret.is_some(),
            "Initializing notes service"
        );
        let summarizer = NotesSummarizer::new(client, config.prompt.clone(), &config.completion);
        Ok(Self::new(
            ExtractorRegistry::with_defaults(),
            summarizer,
            config.limits,
            config.shared_secret.clone(),
        ))
    }

    async fn extract(&self, files: Vec<UploadedFile>) -> Result<SourceBundle, NotesError> {
        let registry = Arc::clone(&self.registry);
        let bundle = task::spawn_blocking(move || registry.extract_all(&files))
            .await
            .map_err(|error| NotesError::Worker(format!("extraction task failed: {error}")))??;
        Ok(bundle)
    }

    async fn render_archive(&self, notes: String) -> Result<Vec<u8>, NotesError> {
        task::spawn_blocking(move || -> Result<Vec<u8>, NotesError> {
            let artifacts = render(&notes)?;
            Ok(build_archive(&artifacts)?)
        })
        .await
        .map_err(|error| NotesError::Worker(format!("render task failed: {error}")))?
    }
}

#[async_trait]
impl NotesApi for NotesService {
    async fn make_notes(&self, files: Vec<UploadedFile>) -> Result<Vec<u8>, NotesError> {
        if files.is_empty() {
            return Err(NotesError::NoFiles);
        }
        let started = Instant::now();
        let file_count = files.len();

        let bundle = self.extract(files).await?;
        tracing::info!(files = file_count, "Extracted source text");

        let notes = self.summarizer.summarize(&bundle).await?;

        let archive = self.render_archive(notes).await?;
        tracing::info!(
            files = file_count,
            archive_bytes = archive.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Notes archive ready"
        );
        Ok(archive)
    }

    fn limits(&self) -> UploadLimits {
        self.limits
    }

    fn shared_secret(&self) -> Option<&str> {
        self.shared_secret.as_deref()
    }
}
