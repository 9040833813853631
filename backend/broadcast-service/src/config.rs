/// Configuration management for broadcast-service
///
/// Loaded once at startup from environment variables (an optional `.env` is
/// read first) and immutable afterwards.
use resilience::CallPolicy;
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub provider: ProviderConfig,
    pub policy: PolicyConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub json_logs: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

/// External provider settings (`PROVIDER_*`)
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub token_secret: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Ingest endpoint handed out when the provider omits one or is unreachable
    #[serde(default = "default_ingest_url")]
    pub ingest_url: String,
    /// Playback URL template; `{playback_id}` is substituted
    #[serde(default = "default_playback_url_template")]
    pub playback_url_template: String,
    /// HMAC-SHA256 secret for inbound webhook signatures; unchecked when unset
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl ProviderConfig {
    pub fn has_credentials(&self) -> bool {
        matches!(
            (&self.token_id, &self.token_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(
            Duration::from_millis(self.request_timeout_ms),
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }

    pub fn playback_url_for(&self, playback_id: &str) -> String {
        self.playback_url_template
            .replace("{playback_id}", playback_id)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            token_id: None,
            token_secret: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            ingest_url: default_ingest_url(),
            playback_url_template: default_playback_url_template(),
            webhook_secret: None,
        }
    }
}

/// Lifecycle policy knobs (`BROADCAST_*`)
#[derive(Clone, Debug, Deserialize)]
pub struct PolicyConfig {
    /// Sessions shorter than this produce no recording
    #[serde(default = "default_min_recording_duration_secs")]
    pub min_recording_duration_secs: i64,
    /// A `ready` recording must be at least this long
    #[serde(default = "default_min_asset_duration_secs")]
    pub min_asset_duration_secs: f64,
    /// Recent unfinished recordings scanned by the title heuristic
    #[serde(default = "default_heuristic_window")]
    pub heuristic_window: i64,
    #[serde(default = "default_status_timeout_ms")]
    pub status_timeout_ms: u64,
    /// Unfinished recordings older than this are failed by the sweep; unset disables it
    #[serde(default)]
    pub stuck_recording_timeout_secs: Option<i64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_recording_duration_secs: default_min_recording_duration_secs(),
            min_asset_duration_secs: default_min_asset_duration_secs(),
            heuristic_window: default_heuristic_window(),
            status_timeout_ms: default_status_timeout_ms(),
            stuck_recording_timeout_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8095
}
fn default_max_connections() -> u32 {
    10
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_provider_base_url() -> String {
    "https://api.video-provider.example/v1".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    200
}
fn default_ingest_url() -> String {
    "rtmps://ingest.video-provider.example:443/app".to_string()
}
fn default_playback_url_template() -> String {
    "https://stream.video-provider.example/{playback_id}.m3u8".to_string()
}
fn default_min_recording_duration_secs() -> i64 {
    60
}
fn default_min_asset_duration_secs() -> f64 {
    1.0
}
fn default_heuristic_window() -> i64 {
    20
}
fn default_status_timeout_ms() -> u64 {
    1500
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        Ok(Config {
            app: envy::prefixed("APP_").from_env()?,
            database: envy::prefixed("DATABASE_").from_env()?,
            redis: envy::prefixed("REDIS_").from_env()?,
            provider: envy::prefixed("PROVIDER_").from_env()?,
            policy: envy::prefixed("BROADCAST_").from_env()?,
        })
    }
}
