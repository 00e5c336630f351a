use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Upstream wire protocol a model can be served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Responses,
    ChatCompletions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Absent means both endpoints are supported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<Endpoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<f64>,
}

fn default_port() -> u16 {
    4333
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream: UpstreamConfig::default(),
            models: HashMap::new(),
            rate_limit: None,
        }
    }
}

impl GatewayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to defaults.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Resolve the API key from the configured environment variable
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.upstream.api_key_env).map_err(|_| {
            GatewayError::config(format!(
                "Environment variable '{}' not set. Set it with your upstream API key.",
                self.upstream.api_key_env
            ))
        })
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("responses-gateway.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs_path() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("responses-gateway")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(
                PathBuf::from(xdg)
                    .join("responses-gateway")
                    .join("config.toml"),
            );
        }
        if let Some(home) = dirs_path() {
            paths.push(
                home.join(".config")
                    .join("responses-gateway")
                    .join("config.toml"),
            );
        }
    }

    // Home directory fallback
    if let Some(home) = dirs_path() {
        paths.push(home.join(".responses-gateway.toml"));
    }

    paths
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000

[upstream]
base_url = "https://llm.internal/v1"
api_key_env = "LLM_KEY"

[models."gpt-4o"]
max_output_tokens = 4096

[models."legacy-chat"]
endpoints = ["chat_completions"]

[rate_limit]
requests_per_second = 5.0
"#
        )
        .unwrap();

        let config = GatewayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.upstream.base_url, "https://llm.internal/v1");
        assert_eq!(config.upstream.timeout_secs, 300);
        assert_eq!(config.models["gpt-4o"].max_output_tokens, Some(4096));
        assert_eq!(config.models["gpt-4o"].endpoints, None);
        assert_eq!(
            config.models["legacy-chat"].endpoints,
            Some(vec![Endpoint::ChatCompletions])
        );
        assert_eq!(
            config.rate_limit.map(|r| r.requests_per_second),
            Some(5.0)
        );
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = GatewayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 4333);
        assert_eq!(config.upstream.base_url, "https://api.openai.com/v1");
        assert_eq!(config.upstream.api_key_env, "OPENAI_API_KEY");
        assert!(config.models.is_empty());
        assert!(config.rate_limit.is_none());
    }

    #[test]
    fn test_unknown_endpoint_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "[models.m]\nendpoints = [\"completions\"]").unwrap();
        assert!(GatewayConfig::load(f.path()).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config: GatewayConfig =
            toml::from_str(include_str!("../responses-gateway.example.toml")).unwrap();
        assert_eq!(
            config.models["legacy-chat"].endpoints,
            Some(vec![Endpoint::ChatCompletions])
        );
        assert_eq!(config.rate_limit.and_then(|r| r.burst), Some(20.0));
    }

    #[test]
    fn test_missing_explicit_path_errors() {
        let result = GatewayConfig::find_and_load(Some(Path::new("/nonexistent/gw.toml")));
        assert!(matches!(result, Err(GatewayError::Config { .. })));
    }
}
