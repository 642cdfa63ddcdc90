use serde::{Deserialize, Serialize};

use super::workspace::{AgentSpec, ToolSpec};

/// Main configuration structure for PrometheiA
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Transient-failure retry policy shared by all model profiles
    #[serde(default)]
    pub retry: RetryConfig,

    /// Upstream chat-completions endpoint
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// The three named model profiles
    #[serde(default)]
    pub models: ModelsConfig,

    /// Strategy pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Agents and tools registered at startup
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Interval between SSE keep-alive comments
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,

    /// How long an initiated streaming session waits to be read
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_true() -> bool {
    true
}

const fn default_heartbeat_interval_ms() -> u64 {
    15_000
}

const fn default_session_ttl_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_cors: true,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".prometheia/prometheia.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file output: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Requests per second allowed
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst size for token bucket
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

const fn default_requests_per_second() -> u32 {
    10
}

const fn default_burst_size() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts, first call included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Lower bound on any computed delay
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    /// Upper bound on any computed delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_min_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to `GROQ_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    /// Configured key, or the conventional environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("GROQ_API_KEY").ok().filter(|key| !key.is_empty()))
    }
}

/// One upstream configuration: which model, how it samples, how it retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelProfile {
    /// Profile name used in logs (`fast`, `quality`, `structured`)
    pub name: String,

    /// Upstream model identifier
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Overrides the global retry policy for this profile
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl ModelProfile {
    pub fn new(name: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            temperature,
            max_tokens: None,
            retry: None,
        }
    }

    /// The retry policy that applies to calls made with this profile.
    pub fn effective_retry<'a>(&'a self, global: &'a RetryConfig) -> &'a RetryConfig {
        self.retry.as_ref().unwrap_or(global)
    }
}

/// The three named profiles selected per pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelsConfig {
    /// Lightweight extraction: digest and intent
    #[serde(default = "default_fast_profile")]
    pub fast: ModelProfile,

    /// User-facing prose
    #[serde(default = "default_quality_profile")]
    pub quality: ModelProfile,

    /// Parseable records: strategy selection and reasoning steps
    #[serde(default = "default_structured_profile")]
    pub structured: ModelProfile,
}

fn default_fast_profile() -> ModelProfile {
    ModelProfile::new("fast", "llama-3.1-8b-instant", 0.2)
}

fn default_quality_profile() -> ModelProfile {
    ModelProfile::new("quality", "llama-3.1-70b-versatile", 0.2)
}

fn default_structured_profile() -> ModelProfile {
    ModelProfile::new("structured", "llama3-groq-70b-8192-tool-use-preview", 0.05)
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_profile(),
            quality: default_quality_profile(),
            structured: default_structured_profile(),
        }
    }
}

/// Strategy pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Attempts allowed for structured-output repair
    #[serde(default = "default_reparse_attempts")]
    pub reparse_attempts: u32,

    /// Replace the built-in prompt templates with a YAML file
    #[serde(default)]
    pub templates_path: Option<String>,
}

const fn default_reparse_attempts() -> u32 {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reparse_attempts: default_reparse_attempts(),
            templates_path: None,
        }
    }
}

/// Agents and tools to register when the server starts.
///
/// Entries are matched by name, so restarting with an edited list updates
/// the stored rows instead of duplicating them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub agents: Vec<AgentSpec>,

    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}
