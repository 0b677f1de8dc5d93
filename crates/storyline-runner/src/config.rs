//! Configuration types for the runner binary.
//!
//! Backend credentials and file locations come from environment variables.
//! Engine tuning (window sizes, cadences, bounds) lives in the YAML engine
//! config loaded by `storyline-core`; host preferences live in the settings
//! JSON (see [`crate::settings`]).

use std::path::PathBuf;

use crate::error::RunnerError;

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Generation backend.
    pub backend: LlmBackendConfig,
    /// Engine config YAML. Missing file means defaults.
    pub engine_config: PathBuf,
    /// Optional host settings JSON.
    pub settings: Option<PathBuf>,
    /// Chat transcript JSON to extract.
    pub transcript: PathBuf,
    /// Event journal (JSON lines).
    pub journal: PathBuf,
    /// Optional directory of template overrides.
    pub templates_dir: Option<PathBuf>,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in `STORYLINE_BACKEND`.
    pub fn parse(name: &str) -> Result<Self, RunnerError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `STORYLINE_BACKEND` -- backend type (`openai`, `anthropic`, ...)
    /// - `STORYLINE_API_URL` -- API base URL
    /// - `STORYLINE_API_KEY` -- API key
    /// - `STORYLINE_MODEL` -- model name
    /// - `STORYLINE_TRANSCRIPT` -- transcript JSON path
    ///
    /// Optional variables:
    /// - `STORYLINE_CONFIG` -- engine config YAML (default `storyline-config.yaml`)
    /// - `STORYLINE_SETTINGS` -- host settings JSON
    /// - `STORYLINE_JOURNAL` -- event journal (default `storyline-journal.jsonl`)
    /// - `STORYLINE_TEMPLATES_DIR` -- template override directory
    pub fn from_env() -> Result<Self, RunnerError> {
        let backend = load_backend_config("STORYLINE")?;
        let transcript = PathBuf::from(env_var("STORYLINE_TRANSCRIPT")?);

        let engine_config = std::env::var("STORYLINE_CONFIG")
            .unwrap_or_else(|_| "storyline-config.yaml".to_owned())
            .into();
        let journal = std::env::var("STORYLINE_JOURNAL")
            .unwrap_or_else(|_| "storyline-journal.jsonl".to_owned())
            .into();
        let settings = std::env::var("STORYLINE_SETTINGS").ok().map(PathBuf::from);
        let templates_dir = std::env::var("STORYLINE_TEMPLATES_DIR")
            .ok()
            .map(PathBuf::from);

        Ok(Self {
            backend,
            engine_config,
            settings,
            transcript,
            journal,
            templates_dir,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}

/// Load an LLM backend config from a set of prefixed environment variables.
fn load_backend_config(prefix: &str) -> Result<LlmBackendConfig, RunnerError> {
    let backend_type = BackendType::parse(&env_var(&format!("{prefix}_BACKEND"))?)?;
    let api_url = env_var(&format!("{prefix}_API_URL"))?;
    let api_key = env_var(&format!("{prefix}_API_KEY"))?;
    let model = env_var(&format!("{prefix}_MODEL"))?;

    Ok(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parsing() {
        assert_eq!(BackendType::parse("OpenAI").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse("ollama").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::parse(" claude ").ok(), Some(BackendType::Anthropic));
        assert!(matches!(
            BackendType::parse("gemini"),
            Err(RunnerError::Config(_))
        ));
    }
}
