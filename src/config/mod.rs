//! Environment-driven configuration
//!
//! All paths and service settings travel inside [`AppConfig`]; components
//! receive them at construction instead of reading process-wide globals.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not found in environment variables")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Settings for the OpenAI-compatible chat-completion service.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;

        Ok(Self {
            api_key,
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            temperature: parse_var("OPENAI_TEMPERATURE", 0.7)?,
            max_tokens: parse_var("OPENAI_MAX_TOKENS", 2000)?,
        })
    }
}

/// Top-level configuration assembled once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_port: u16,
    pub tenants_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub vector_dir: PathBuf,
    pub completion: CompletionConfig,
    /// OpenAI-compatible embeddings endpoint. Absent means the local
    /// deterministic embedder is used.
    pub embeddings_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_port: parse_var("API_PORT", 8080)?,
            tenants_dir: path_var("TENANTS_DIR", "./tenants"),
            upload_dir: path_var("UPLOAD_DIR", "./uploads"),
            vector_dir: path_var("VECTOR_DIR", "./vector_data"),
            completion: CompletionConfig::from_env()?,
            embeddings_url: env::var("EMBEDDINGS_URL").ok(),
        })
    }
}

fn path_var(var: &str, default: &str) -> PathBuf {
    env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value }),
        Err(_) => Ok(default),
    }
}
