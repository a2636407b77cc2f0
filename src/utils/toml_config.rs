//! TOML configuration for molecule-insight
//!
//! Every section is optional; missing fields fall back to the defaults below.
//! A minimal `molecule-insight.toml` only needs an `[llm]` section, and even
//! that defaults to a local Ollama.

use crate::analysis::InvokerConfig;
use crate::cache::{CacheConfig, Params};
use crate::llm::Provider;
use crate::types::AppError;
use crate::workers::STANDARD_WORKERS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Root configuration loaded from `molecule-insight.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    /// Per-worker overrides keyed by worker name
    #[serde(default)]
    pub workers: WorkersConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Cache Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Share one computation between concurrent identical cache misses
    #[serde(default = "default_true")]
    pub single_flight: bool,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_ttl_hours() -> u64 {
    168
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_hours: default_ttl_hours(),
            enabled: true,
            single_flight: true,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            dir: self.dir.clone(),
            ttl: self.ttl(),
            enabled: self.enabled,
        }
    }
}

// ============= Scheduler Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Permits in the worker pool shared by all requests
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_worker_timeout")]
    pub worker_timeout_secs: u64,

    /// Run `prune_expired` in the background at this interval
    #[serde(default)]
    pub prune_interval_secs: Option<u64>,
}

fn default_max_workers() -> usize {
    6
}

fn default_worker_timeout() -> u64 {
    120
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            worker_timeout_secs: default_worker_timeout(),
            prune_interval_secs: None,
        }
    }
}

impl SchedulerConfig {
    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LlmConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
    OpenAI {
        /// Environment variable containing the API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        /// Any OpenAI-compatible endpoint
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f32,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            temperature: default_temperature(),
        }
    }
}

impl LlmConfig {
    /// Resolve into a [`Provider`], reading the API key from the environment
    pub fn to_provider(&self) -> Result<Provider, ConfigError> {
        match self {
            LlmConfig::Ollama {
                base_url,
                model,
                temperature,
            } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.clone(),
                temperature: *temperature,
            }),
            LlmConfig::OpenAI {
                api_key_env,
                api_base,
                model,
                temperature,
            } => {
                let api_key = std::env::var(api_key_env)
                    .map_err(|_| ConfigError::MissingEnvVar(api_key_env.clone()))?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.clone(),
                    temperature: *temperature,
                })
            }
        }
    }
}

// ============= Source Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Environment variable holding the NewsAPI key
    #[serde(default = "default_news_key_env")]
    pub news_api_key_env: String,

    /// Environment variable holding the UN Comtrade subscription key
    #[serde(default = "default_comtrade_key_env")]
    pub comtrade_api_key_env: String,

    #[serde(default = "default_clinical_trials_url")]
    pub clinical_trials_url: String,

    #[serde(default = "default_fda_url")]
    pub fda_url: String,

    #[serde(default = "default_scholar_url")]
    pub scholar_url: String,

    #[serde(default = "default_patents_url")]
    pub patents_url: String,

    #[serde(default = "default_comtrade_url")]
    pub comtrade_url: String,

    #[serde(default = "default_news_url")]
    pub news_url: String,
}

fn default_http_timeout() -> u64 {
    30
}

fn default_news_key_env() -> String {
    "NEWS_API_KEY".to_string()
}

fn default_comtrade_key_env() -> String {
    "COMTRADE_API_KEY".to_string()
}

fn default_clinical_trials_url() -> String {
    "https://clinicaltrials.gov/api/v2".to_string()
}

fn default_fda_url() -> String {
    "https://api.fda.gov".to_string()
}

fn default_scholar_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_patents_url() -> String {
    "https://api.patentsview.org".to_string()
}

fn default_comtrade_url() -> String {
    "https://comtrade.un.org/api".to_string()
}

fn default_news_url() -> String {
    "https://newsapi.org/v2".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            news_api_key_env: default_news_key_env(),
            comtrade_api_key_env: default_comtrade_key_env(),
            clinical_trials_url: default_clinical_trials_url(),
            fda_url: default_fda_url(),
            scholar_url: default_scholar_url(),
            patents_url: default_patents_url(),
            comtrade_url: default_comtrade_url(),
            news_url: default_news_url(),
        }
    }
}

// ============= Worker Configuration =============

/// `[workers.<name>]` tables keyed by worker name
pub type WorkersConfig = BTreeMap<String, WorkerSettings>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Merged over the worker's default arguments
    #[serde(default)]
    pub args: Params,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            args: Params::new(),
        }
    }
}

// ============= Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Unknown worker '{0}' in [workers]")]
    UnknownWorker(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_workers == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.max_workers must be at least 1".to_string(),
            ));
        }
        if self.scheduler.worker_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.worker_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_hours must be at least 1".to_string(),
            ));
        }
        if self.scheduler.prune_interval_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "scheduler.prune_interval_secs must be at least 1".to_string(),
            ));
        }

        if let Some(name) = self
            .workers
            .keys()
            .find(|name| !STANDARD_WORKERS.contains(&name.as_str()))
        {
            return Err(ConfigError::UnknownWorker(name.clone()));
        }

        if let LlmConfig::OpenAI { api_key_env, .. } = &self.llm {
            self.validate_env_var(api_key_env)?;
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Pool, timeout and single-flight settings for the worker invoker
    pub fn invoker_config(&self) -> InvokerConfig {
        InvokerConfig {
            max_workers: self.scheduler.max_workers,
            worker_timeout: self.scheduler.worker_timeout(),
            single_flight: self.cache.single_flight,
        }
    }

    /// `host:port` the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============= Configuration Manager =============

/// Configuration shared by the server components.
///
/// Loaded once at startup; the cache, the worker pool and the registry are
/// built from this snapshot and keep it for the life of the process.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<AppConfig>,
}

impl ConfigManager {
    /// Load and validate the config at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = AppConfig::load(path)?;
        info!("Loaded configuration from {:?}", path);

        Ok(Self::from_config(config))
    }

    /// Wrap an already built config
    pub fn from_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_config() -> String {
        r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[cache]
dir = "/tmp/molecule-cache"
ttl_hours = 24
single_flight = false

[scheduler]
max_workers = 3
worker_timeout_secs = 45
prune_interval_secs = 600

[llm]
type = "ollama"
base_url = "http://ollama:11434"
model = "qwen2.5"

[sources]
http_timeout_secs = 10
news_url = "http://localhost:9999/v2"

[workers.exim]
args = { hs_code = "300420" }

[workers.web_intel]
enabled = false
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config = AppConfig::from_toml(&create_test_config()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.cache.ttl(), Duration::from_secs(24 * 3600));
        assert!(config.cache.enabled);
        assert!(!config.cache.single_flight);
        assert_eq!(config.scheduler.max_workers, 3);
        assert_eq!(config.scheduler.worker_timeout(), Duration::from_secs(45));
        assert_eq!(config.scheduler.prune_interval_secs, Some(600));
        let invoker = config.invoker_config();
        assert_eq!(invoker.max_workers, 3);
        assert!(!invoker.single_flight);
        assert_eq!(config.sources.http_timeout_secs, 10);
        assert_eq!(config.sources.news_url, "http://localhost:9999/v2");
        assert_eq!(config.sources.fda_url, "https://api.fda.gov");
        assert_eq!(config.workers["exim"].args["hs_code"], "300420");
        assert!(config.workers["exim"].enabled);
        assert!(!config.workers["web_intel"].enabled);

        match config.llm {
            LlmConfig::Ollama {
                base_url,
                model,
                temperature,
            } => {
                assert_eq!(base_url, "http://ollama:11434");
                assert_eq!(model, "qwen2.5");
                assert!((temperature - 0.3).abs() < f32::EPSILON);
            }
            other => panic!("expected ollama config, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.cache.dir, PathBuf::from("./cache"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(7 * 24 * 3600));
        assert!(config.cache.single_flight);
        assert_eq!(config.scheduler.max_workers, 6);
        assert_eq!(config.scheduler.worker_timeout_secs, 120);
        assert!(config.scheduler.prune_interval_secs.is_none());
        assert_eq!(config.sources.news_api_key_env, "NEWS_API_KEY");
        assert!(config.workers.is_empty());
        assert!(matches!(config.llm, LlmConfig::Ollama { .. }));
    }

    #[test]
    fn test_to_cache_config() {
        let settings = CacheSettings {
            dir: PathBuf::from("/var/cache/mi"),
            ttl_hours: 2,
            enabled: false,
            single_flight: true,
        };
        let cache = settings.to_cache_config();
        assert_eq!(cache.dir, PathBuf::from("/var/cache/mi"));
        assert_eq!(cache.ttl, Duration::from_secs(7200));
        assert!(!cache.enabled);
    }

    #[test]
    fn test_zero_pool_rejected() {
        let err = AppConfig::from_toml("[scheduler]\nmax_workers = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let err = AppConfig::from_toml("[cache]\nttl_hours = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_unknown_worker_rejected() {
        let err = AppConfig::from_toml("[workers.astrology]\nenabled = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownWorker(ref name) if name == "astrology"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = AppConfig::from_toml("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_openai_requires_key_env() {
        let toml = r#"
[llm]
type = "openai"
api_key_env = "MOLECULE_INSIGHT_TEST_KEY_THAT_IS_NEVER_SET"
"#;
        let err = AppConfig::from_toml(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::MissingEnvVar(ref var) if var == "MOLECULE_INSIGHT_TEST_KEY_THAT_IS_NEVER_SET")
        );
    }

    #[test]
    fn test_openai_provider_reads_key() {
        std::env::set_var("MOLECULE_INSIGHT_TEST_OPENAI_KEY", "sk-test");
        let toml = r#"
[llm]
type = "openai"
api_key_env = "MOLECULE_INSIGHT_TEST_OPENAI_KEY"
api_base = "https://generativelanguage.googleapis.com/v1beta/openai"
model = "gemini-2.0-flash"
temperature = 0.5
"#;
        let config = AppConfig::from_toml(toml).unwrap();
        match config.llm.to_provider().unwrap() {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                ..
            } => {
                assert_eq!(api_key, "sk-test");
                assert!(api_base.contains("googleapis"));
                assert_eq!(model, "gemini-2.0-flash");
            }
            other => panic!("expected openai provider, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load("/definitely/not/here/molecule-insight.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_manager_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 8100").unwrap();

        let manager = ConfigManager::new(file.path()).unwrap();
        assert_eq!(manager.config().server.port, 8100);
        assert_eq!(manager.clone().config().server.port, 8100);
    }

    #[test]
    fn test_manager_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scheduler]\nmax_workers = 0").unwrap();

        let err = ConfigManager::new(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
