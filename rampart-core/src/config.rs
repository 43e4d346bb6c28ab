use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampartConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub self_ip: SelfIpConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub digest: DigestConfig,
}

/// Which file to tail for block events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

/// Abuse-report API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API credential sent in the `Api-Key` header.
    #[serde(default)]
    pub api_key: String,
    /// Minimum seconds between two reports for the same source address.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Durable store for the per-source cooldown map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_file")]
    pub file: PathBuf,
}

/// Self-address discovery. Each URL must echo the caller's address as a
/// plain-text body (one address per endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfIpConfig {
    #[serde(default = "default_echo_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

/// Webhook notification delivery, disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    /// Host label shown in notification titles.
    #[serde(default = "default_server_id")]
    pub server_id: String,
}

/// Daily per-hour report digest, disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub enabled: bool,
}

// ── Defaults ──────────────────────────────────────────────────

fn default_log_file() -> PathBuf { "/var/log/ufw.log".into() }
fn default_endpoint() -> String { "https://api.spamverify.com/v1/ip/report".into() }
fn default_cooldown() -> u64 { 21_600 }
fn default_timeout() -> u64 { 30 }
fn default_cache_file() -> PathBuf { "data/reported-ips.txt".into() }
fn default_echo_urls() -> Vec<String> {
    vec![
        "https://api.ipify.org".into(),
        "https://api64.ipify.org".into(),
    ]
}
fn default_refresh_interval() -> u64 { 3_600 }
fn default_server_id() -> String { "default".into() }

// ── Impls ─────────────────────────────────────────────────────

impl Default for RampartConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            report: ReportConfig::default(),
            cache: CacheConfig::default(),
            self_ip: SelfIpConfig::default(),
            webhook: WebhookConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { log_file: default_log_file() }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            cooldown_secs: default_cooldown(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { file: default_cache_file() }
    }
}

impl Default for SelfIpConfig {
    fn default() -> Self {
        Self {
            urls: default_echo_urls(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            server_id: default_server_id(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl RampartConfig {
    /// Load configuration from YAML file + env overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config: RampartConfig = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("RAMPART_").split("__"))
            .extract()?;
        Ok(config)
    }
}
