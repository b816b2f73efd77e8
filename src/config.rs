use crate::ingress::UploadLimits;
use crate::summarization::PromptTemplate;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_FILES: usize = 10;
const DEFAULT_MAX_MB_PER_FILE: u64 = 25;
const DEFAULT_MAX_TOTAL_MB: u64 = 50;
const DEFAULT_LOG_FILE: &str = "logs/lecture-notes.log";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// A prompt override file could not be read.
    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        /// Path taken from the environment.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration for the notes service.
///
/// Built once at process start and handed to the components that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings for the hosted chat-completion API.
    pub completion: CompletionSettings,
    /// Upload ceilings enforced at ingress.
    pub limits: UploadLimits,
    /// Optional shared secret expected in the `X-Backend-Secret` header.
    pub shared_secret: Option<String>,
    /// Instructions sent alongside the extracted source text.
    pub prompt: PromptTemplate,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Destination of the file log layer (`NOTES_LOG_FILE`).
    pub log_file: PathBuf,
}

/// Connection and sampling settings for the completion service.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// API credential; requests fail with a configuration error when absent.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier passed through verbatim.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on a single completion round trip.
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment (after `.env`, when present).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let max_mb_per_file: u64 = vars.parsed("MAX_MB_PER_FILE", DEFAULT_MAX_MB_PER_FILE)?;
        let max_total_mb: u64 = vars.parsed("MAX_TOTAL_MB", DEFAULT_MAX_TOTAL_MB)?;
        let max_files: usize = vars.parsed("MAX_FILES", DEFAULT_MAX_FILES)?;
        if max_files == 0 {
            return Err(ConfigError::InvalidValue("MAX_FILES".into()));
        }

        let mut prompt = PromptTemplate::default();
        if let Some(path) = vars.optional("NOTES_SYSTEM_PROMPT_FILE") {
            prompt.system = read_prompt(path)?;
        }
        if let Some(path) = vars.optional("NOTES_USER_PROMPT_FILE") {
            prompt.user = read_prompt(path)?;
        }

        Ok(Self {
            completion: CompletionSettings {
                api_key: vars.optional("OPENAI_API_KEY"),
                base_url: vars
                    .optional("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: vars
                    .optional("MODEL")
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature: vars.parsed("NOTES_TEMPERATURE", DEFAULT_TEMPERATURE)?,
                timeout: Duration::from_secs(
                    vars.parsed("COMPLETION_TIMEOUT_SECS", DEFAULT_COMPLETION_TIMEOUT_SECS)?,
                ),
            },
            limits: UploadLimits::from_megabytes(max_files, max_mb_per_file, max_total_mb),
            shared_secret: vars.optional("BACKEND_SHARED_SECRET"),
            prompt,
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            log_file: vars
                .optional("NOTES_LOG_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

fn read_prompt(path: String) -> Result<String, ConfigError> {
    let path = PathBuf::from(path);
    std::fs::read_to_string(&path).map_err(|source| ConfigError::PromptFile { path, source })
}
