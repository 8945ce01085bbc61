// --- File: crates/slotkeeper_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/slotkeeper.db, loaded via SLOTKEEPER__DATABASE__URL
}

// --- Business Hours Config ---
/// Opening hours of the business. Read once at startup and never reloaded.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BusinessConfig {
    /// IANA time zone name, e.g. "Europe/Zurich".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// First bookable hour of the day (local time).
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    /// Hour at which the last appointment must have ended (local time).
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    /// Distance between candidate slot start times.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: i64,
    /// Weekday names ("Mon", "Tuesday", ...). Empty means open every day.
    #[serde(default)]
    pub working_days: Vec<String>,
}

fn default_timezone() -> String {
    "Europe/Zurich".to_string()
}
fn default_open_hour() -> u32 {
    9
}
fn default_close_hour() -> u32 {
    18
}
fn default_scan_interval() -> i64 {
    60
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            scan_interval_minutes: default_scan_interval(),
            working_days: Vec::new(),
        }
    }
}

// --- Service Catalog ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    /// Duration in minutes for this service.
    pub duration_minutes: i64,
    /// Price in the smallest currency unit (e.g., cents).
    pub price: i64,
    pub currency: Option<String>,
}

// --- Outbound Transport Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    8_000
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// --- FreeBusy Cache Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Maximum age of a cached busy set in seconds. 0 keeps entries until invalidated.
    #[serde(default)]
    pub ttl_secs: u64,
    /// Upper bound on cached windows; the oldest fetch is evicted first.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_max_entries() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 0,
            max_entries: default_cache_max_entries(),
        }
    }
}

// --- Reminder Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReminderConfig {
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: i64,
}

fn default_tick_interval_secs() -> u64 {
    600
}
fn default_horizon_hours() -> i64 {
    73
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            horizon_hours: default_horizon_hours(),
        }
    }
}

// --- Google Calendar Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub key_path: Option<String>,    // Service account JSON key
    pub calendar_id: Option<String>, // Mandatory
    pub base_url: Option<String>,    // Defaults to the public Calendar v3 endpoint
}

// --- Telegram Config ---
// bot_token is usually "secret_from_env" and read from TELEGRAM_BOT_TOKEN.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: Option<String>,
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,
    #[serde(default)]
    pub use_telegram: bool,

    #[serde(default)]
    pub business: BusinessConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}
