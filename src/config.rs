use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub api_base: Option<String>,
}

// Keep the credential out of the startup log line
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub json: bool,
}

pub const DEFAULT_CACHE_CAPACITY: usize = 100;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider = var("LLM_PROVIDER", "google").to_lowercase();
        let (key_var, default_model) = match provider.as_str() {
            "google" => ("GOOGLE_API_KEY", "gemini-1.5-pro"),
            "openai" => ("OPENAI_API_KEY", "gpt-4o"),
            other => bail!("Unsupported LLM_PROVIDER: {}", other),
        };
        let api_key = match lookup(key_var) {
            Some(key) if !key.trim().is_empty() => key,
            _ => bail!(
                "{} is not set. Please add it to the .env file to run the application.",
                key_var
            ),
        };

        Ok(Self {
            server: ServerConfig {
                port: parse_var(&lookup, "PORT", 8000)?,
                host: var("HOST", "0.0.0.0"),
                cors_allowed_origins: var("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            },
            llm: LLMConfig {
                provider,
                api_key,
                model: var("LLM_MODEL", default_model),
                temperature: parse_var(&lookup, "LLM_TEMPERATURE", 0.2)?,
                max_tokens: parse_var(&lookup, "LLM_MAX_TOKENS", 4096)?,
                max_retries: parse_var(&lookup, "LLM_MAX_RETRIES", 3)?,
                api_base: lookup("LLM_API_BASE").filter(|s| !s.is_empty()),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from(var("DATA_DIR", "data")),
            },
            cache: CacheConfig {
                capacity: parse_var(&lookup, "RESULT_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            },
            logging: LoggingConfig {
                log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()).map(PathBuf::from),
                json: var("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            },
        })
    }

    /// Convenience for tests and tooling
    pub fn from_map(vars: &HashMap<&str, &str>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
