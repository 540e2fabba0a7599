use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/quotes.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            environment: default_environment(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_environment() -> String {
    "production".to_string()
}

impl ServerConfig {
    /// Whether 500 responses may carry a `details` field.
    pub fn expose_error_details(&self) -> bool {
        self.environment == "development"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_links")]
    pub max_links: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_links: default_max_links(),
            timeout_secs: default_fetch_timeout_secs(),
            min_content_chars: default_min_content_chars(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_max_links() -> usize {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_min_content_chars() -> usize {
    100
}
fn default_max_body_bytes() -> u64 {
    5 * 1024 * 1024
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_oracle_timeout_secs(),
            base_url: default_base_url(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_oracle_timeout_secs() -> u64 {
    60
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_raw_content_limit")]
    pub raw_content_limit: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            raw_content_limit: default_raw_content_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_raw_content_limit() -> usize {
    50_000
}

impl Config {
    /// All-defaults config for commands that can run without a file.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        apply_env_overrides(&mut config);
        config
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(env) = std::env::var("QH_ENV") {
        let env = env.trim();
        if !env.is_empty() {
            config.server.environment = env.to_string();
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

pub fn validate(config: &Config) -> Result<()> {
    match config.server.environment.as_str() {
        "production" | "development" => {}
        other => anyhow::bail!(
            "Unknown server.environment: '{}'. Must be production or development.",
            other
        ),
    }

    if config.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be > 0");
    }

    // Validate fetch
    if config.fetch.max_links == 0 {
        anyhow::bail!("fetch.max_links must be >= 1");
    }
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be >= 1");
    }

    // Validate oracle
    if config.oracle.timeout_secs == 0 {
        anyhow::bail!("oracle.timeout_secs must be >= 1");
    }
    if config.oracle.max_tokens == 0 {
        anyhow::bail!("oracle.max_tokens must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.oracle.temperature) {
        anyhow::bail!("oracle.temperature must be in [0.0, 2.0]");
    }

    match config.oracle.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown oracle provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
