use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "mpec.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root of the bulletin archive; pages live at `<base_url>/K24/K24A12.html`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Flat text list of potentially hazardous asteroids
    #[serde(default)]
    pub pha_list_path: Option<PathBuf>,

    /// JSON map of station code -> observatory metadata
    #[serde(default)]
    pub observatory_path: Option<PathBuf>,

    /// Changed station aggregates are written here
    #[serde(default = "default_aggregate_dir")]
    pub aggregate_dir: PathBuf,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Attempt `k` waits `k * retry_delay_ms` before retrying
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between consecutive bulletin requests
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Highest bulletin number tried in one half-month
    #[serde(default = "default_max_sequence")]
    pub max_sequence: u32,

    /// Consecutive transient failures that end a half-month walk
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/mpec.db")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://www.minorplanetcenter.net/mpec".to_string()
}

fn default_aggregate_dir() -> PathBuf {
    PathBuf::from("data/stations")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    200
}

fn default_max_sequence() -> u32 {
    mpec_common::designation::MAX_PACKED_COUNT
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_user_agent() -> String {
    "Mozilla/5.0 mpec-ingest/0.1".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            max_sequence: default_max_sequence(),
            max_consecutive_failures: default_max_consecutive_failures(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            base_url: default_base_url(),
            pha_list_path: None,
            observatory_path: None,
            aggregate_dir: default_aggregate_dir(),
            fetch: FetchConfig::default(),
        }
    }
}

impl IngestConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: IngestConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when the file does not exist.
    ///
    /// Returns whether the file was found so the caller can log it once logging is up.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<(Self, bool)> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::default(), false));
        }
        Ok((Self::from_file(path)?, true))
    }
}
