use std::path::PathBuf;
use std::time::Duration;

use crate::model_client::{ModelClientOptions, ModelProtocol};

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// SQLite database holding project config and shadow notes
    pub database_url: String,
    /// Optional TOML catalog upserted into `project_llm_config` at startup
    pub project_catalog: Option<PathBuf>,
    /// Wire protocol spoken by every inference endpoint
    pub model_protocol: ModelProtocol,
    /// Total time allowed for one completion
    pub model_timeout: Duration,
    pub model_connect_timeout: Duration,
    pub model_temperature: f64,
    pub model_max_tokens: Option<u32>,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// How long shutdown waits for queued shadow notes before abandoning them
    pub shutdown_drain_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let model_protocol = ModelProtocol::from_env(&env_str("MODEL_PROTOCOL", "openai"))?;
        let model_max_tokens = match std::env::var("MODEL_MAX_TOKENS") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse::<u32>().map_err(|e| {
                anyhow::anyhow!("Failed to parse env var MODEL_MAX_TOKENS={raw}: {e}")
            })?),
            _ => None,
        };

        Ok(Self {
            bind: env_str("DISPATCH_BIND", "127.0.0.1"),
            port: env_parse("DISPATCH_PORT", 8000)?,
            database_url: env_str("DISPATCH_DATABASE_URL", "sqlite:./data/dispatch.db"),
            project_catalog: std::env::var("DISPATCH_PROJECT_CATALOG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            model_protocol,
            model_timeout: Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", 120)?),
            model_connect_timeout: Duration::from_secs(env_parse(
                "MODEL_CONNECT_TIMEOUT_SECS",
                10,
            )?),
            model_temperature: env_parse("MODEL_TEMPERATURE", 0.2)?,
            model_max_tokens,
            cors_origins: env_csv(
                "DISPATCH_CORS_ORIGINS",
                &["http://localhost:3000", "http://127.0.0.1:3000"],
            ),
            shutdown_drain_timeout: Duration::from_secs(env_parse(
                "DISPATCH_SHUTDOWN_DRAIN_SECS",
                30,
            )?),
        })
    }

    pub fn model_client_options(&self) -> ModelClientOptions {
        ModelClientOptions {
            protocol: self.model_protocol,
            timeout: self.model_timeout,
            connect_timeout: self.model_connect_timeout,
            temperature: self.model_temperature,
            max_tokens: self.model_max_tokens,
        }
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_csv(key: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect(),
        Err(_) => default.iter().map(|s| (*s).to_string()).collect(),
    }
}
