use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_OCR_COMMAND: &str = "tesseract";
const DEFAULT_PDF_RENDER_COMMAND: &str = "pdftoppm";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ToS Decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Language-model backend used for analysis and Q&A.
    pub backend_provider: BackendProvider,
    /// API key for the Gemini API (required when the provider is `gemini`).
    pub gemini_api_key: Option<String>,
    /// Gemini model identifier.
    pub gemini_model: String,
    /// Optional override for the Gemini API base URL.
    pub gemini_base_url: Option<String>,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// Ollama model identifier.
    pub ollama_model: String,
    /// Maximum characters per chunk.
    pub chunk_max_chars: usize,
    /// Characters copied from the previous chunk into the next one.
    pub chunk_overlap_chars: usize,
    /// Minimum number of risk items every completed analysis reports.
    pub min_risk_count: usize,
    /// OCR executable invoked for image documents.
    pub ocr_command: String,
    /// PDF text layers shorter than this are treated as scans and OCR'd page by page.
    pub ocr_min_chars: usize,
    /// Poppler-compatible renderer that turns PDF pages into PNG images for OCR.
    pub pdf_render_command: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported language-model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Hosted Google Gemini API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_provider = match load_env_optional("BACKEND_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("BACKEND_PROVIDER".to_string()))?,
            None => BackendProvider::Gemini,
        };
        let gemini_api_key = load_env_optional("GEMINI_API_KEY");
        if backend_provider == BackendProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".to_string()));
        }

        Ok(Self {
            backend_provider,
            gemini_api_key,
            gemini_model: load_env_optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: load_env_optional("GEMINI_BASE_URL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            ollama_model: load_env_optional("OLLAMA_MODEL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            chunk_max_chars: load_parsed("CHUNK_MAX_CHARS")?.unwrap_or(3000),
            chunk_overlap_chars: load_parsed("CHUNK_OVERLAP_CHARS")?.unwrap_or(200),
            min_risk_count: load_parsed("MIN_RISK_COUNT")?.unwrap_or(3),
            ocr_command: load_env_optional("OCR_COMMAND")
                .unwrap_or_else(|| DEFAULT_OCR_COMMAND.to_string()),
            ocr_min_chars: load_parsed("OCR_MIN_CHARS")?.unwrap_or(100),
            pdf_render_command: load_env_optional("PDF_RENDER_COMMAND")
                .unwrap_or_else(|| DEFAULT_PDF_RENDER_COMMAND.to_string()),
            server_port: load_parsed("SERVER_PORT")?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for BackendProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    try_init_config().expect("Failed to load config from environment");
}

/// Fallible variant of [`init_config`] for callers that report errors themselves.
///
/// Returns the already installed configuration when called more than once.
pub fn try_init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        backend_provider = ?config.backend_provider,
        chunk_max_chars = config.chunk_max_chars,
        chunk_overlap_chars = config.chunk_overlap_chars,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_provider_parses_case_insensitively() {
        assert_eq!("Gemini".parse(), Ok(BackendProvider::Gemini));
        assert_eq!(" OLLAMA ".parse(), Ok(BackendProvider::Ollama));
        assert_eq!("openai".parse::<BackendProvider>(), Err(()));
    }
}
