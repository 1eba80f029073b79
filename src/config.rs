//! Configuration module - Environment-based configuration
//!
//! Only the binary entry point calls [`Config::from_env`]. Every component
//! below it receives the struct (or one of its parts) explicitly.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::scanner::ScannerConfig;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_N8N_API_URL: &str = "https://your-n8n-instance.com/api/v1";

/// Model tiers picked by requirement complexity.
#[derive(Debug, Clone)]
pub struct ModelTiers {
    pub complex: String,
    pub standard: String,
    pub simple: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self {
            complex: "claude-3-opus-20240229".to_string(),
            standard: "claude-3-sonnet-20241022".to_string(),
            simple: "claude-3-haiku-20240307".to_string(),
        }
    }
}

/// LLM API settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_url: String,
    pub api_version: String,
    pub models: ModelTiers,
    pub max_tokens: u32,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub temperature: f64,
    pub correction_temperature: f64,
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            models: ModelTiers::default(),
            max_tokens: 8192,
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
            temperature: 0.2,
            correction_temperature: 0.1,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Repository layout and n8n instance used by the id registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub n8n_api_url: String,
    pub workflows_dir: PathBuf,
    pub projects_dir: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            n8n_api_url: DEFAULT_N8N_API_URL.to_string(),
            workflows_dir: PathBuf::from("workflows"),
            projects_dir: PathBuf::from("projects"),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub llm: LlmSettings,
    pub registry: RegistryConfig,
    pub scanner: ScannerConfig,

    /// File that receives GitHub Actions step outputs.
    pub github_output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut llm = LlmSettings {
            api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            api_url: env::var("ANTHROPIC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            api_version: env::var("ANTHROPIC_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            ..LlmSettings::default()
        };
        if let Ok(model) = env::var("ANTHROPIC_MODEL") {
            llm.models.standard = model;
        }

        let registry = RegistryConfig {
            n8n_api_url: env::var("N8N_API_URL").unwrap_or_else(|_| DEFAULT_N8N_API_URL.to_string()),
            workflows_dir: env::var("WORKFLOWS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("workflows")),
            projects_dir: env::var("PROJECTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("projects")),
        };

        let mut scanner = ScannerConfig::default();
        if let Ok(state_file) = env::var("WORKFLOW_SYNC_STATE") {
            scanner.state_file = PathBuf::from(state_file);
        }

        Self {
            llm,
            registry,
            scanner,
            github_output: env::var("GITHUB_OUTPUT").ok().map(PathBuf::from),
        }
    }

    /// Fail early when an LLM command runs without an API key.
    pub fn require_api_key(&self) -> crate::Result<&str> {
        if self.llm.api_key.is_empty() {
            return Err(crate::Error::MissingConfig("ANTHROPIC_API_KEY"));
        }
        Ok(&self.llm.api_key)
    }
}
