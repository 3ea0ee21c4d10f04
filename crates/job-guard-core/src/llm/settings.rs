use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Noop,
    OpenAi,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "noop" => Ok(Self::Noop),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unsupported LLM provider `{other}` (expected noop, openai or ollama)"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Noop => "noop",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        })
    }
}

/// Optional LLM values read from a configuration file. Environment variables win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LlmFileConfig {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// Configuration required to build an LLM client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
}

impl LlmSettings {
    const PROVIDER_ENV: &'static str = "JOB_GUARD_LLM_PROVIDER";
    const API_KEY_ENV: &'static str = "JOB_GUARD_LLM_API_KEY";
    const ENDPOINT_ENV: &'static str = "JOB_GUARD_LLM_ENDPOINT";
    const MODEL_ENV: &'static str = "JOB_GUARD_LLM_MODEL";
    const TIMEOUT_ENV: &'static str = "JOB_GUARD_LLM_TIMEOUT_SECS";
    const RETRIES_ENV: &'static str = "JOB_GUARD_LLM_MAX_RETRIES";

    /// Environment variables layered over values from a config file.
    ///
    /// * `JOB_GUARD_LLM_PROVIDER`: `noop`, `openai` or `ollama` (default: `ollama`).
    /// * `JOB_GUARD_LLM_API_KEY`: API key, required for `openai`.
    /// * `JOB_GUARD_LLM_ENDPOINT`: optional custom base URL.
    /// * `JOB_GUARD_LLM_MODEL`, `JOB_GUARD_LLM_TIMEOUT_SECS`, `JOB_GUARD_LLM_MAX_RETRIES`.
    pub fn from_env_and_file(file: &LlmFileConfig) -> Result<Self> {
        Self::layered(std::env::vars().collect(), file)
    }

    fn layered(mut vars: HashMap<String, String>, file: &LlmFileConfig) -> Result<Self> {
        let defaults = [
            (Self::PROVIDER_ENV, file.provider.clone()),
            (Self::API_KEY_ENV, file.api_key.clone()),
            (Self::ENDPOINT_ENV, file.endpoint.clone()),
            (Self::MODEL_ENV, file.model.clone()),
            (Self::TIMEOUT_ENV, file.timeout_secs.map(|v| v.to_string())),
            (Self::RETRIES_ENV, file.max_retries.map(|v| v.to_string())),
        ];
        for (key, value) in defaults {
            if let Some(value) = value {
                vars.entry(key.to_string()).or_insert(value);
            }
        }
        Self::from_map(&vars)
    }

    fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        let non_empty = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider = match non_empty(Self::PROVIDER_ENV) {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .with_context(|| format!("invalid {}", Self::PROVIDER_ENV))?,
            None => ProviderKind::Ollama,
        };
        let api_key = match provider {
            ProviderKind::OpenAi => non_empty(Self::API_KEY_ENV).with_context(|| {
                format!(
                    "environment variable {} must be set for the openai provider",
                    Self::API_KEY_ENV
                )
            })?,
            ProviderKind::Noop | ProviderKind::Ollama => {
                non_empty(Self::API_KEY_ENV).unwrap_or_default()
            }
        };
        let timeout_secs = non_empty(Self::TIMEOUT_ENV).and_then(|v| v.parse::<u64>().ok());
        let max_retries = non_empty(Self::RETRIES_ENV)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(2);

        Ok(Self {
            provider,
            api_key,
            endpoint: non_empty(Self::ENDPOINT_ENV),
            model: non_empty(Self::MODEL_ENV),
            timeout_secs,
            max_retries,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(60))
    }
}
