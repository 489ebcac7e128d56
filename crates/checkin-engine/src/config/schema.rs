use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(alias = "playwright")]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub selectors: SelectorRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub base_url: String,
    pub storage_state_path: PathBuf,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Pause after each browser action, for watching a headed run.
    #[serde(default)]
    pub slow_mo_ms: u64,
    /// Bound for navigation, element waits, page reads and response collection.
    #[serde(default = "default_timeout_ms", alias = "launch_timeout_ms")]
    pub timeout_ms: u64,
    /// A landing URL containing this means the session was rejected.
    #[serde(default = "default_login_redirect")]
    pub login_redirect_contains: String,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Extra wait when no check-in button is configured.
    #[serde(default = "default_auto_flow_wait_ms")]
    pub auto_flow_wait_ms: u64,
}

fn default_headless() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_login_redirect() -> String {
    "github.com/login".to_string()
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_auto_flow_wait_ms() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Slot name to trigger time. Descriptive only.
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            slots: BTreeMap::new(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Singapore".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            max_rows: default_max_rows(),
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("data/history.csv")
}

fn default_max_rows() -> usize {
    2000
}

/// Keyword and selector heuristics used to read the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRules {
    #[serde(default)]
    pub dom: DomRules,
    #[serde(default)]
    pub api: ApiRules,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRules {
    /// Present only when the session is gone.
    #[serde(default, alias = "login_with_github")]
    pub login_marker: Option<String>,
    #[serde(default)]
    pub checkin_button: Option<String>,
    #[serde(default)]
    pub success_keywords: Vec<String>,
    #[serde(default)]
    pub already_keywords: Vec<String>,
    #[serde(default)]
    pub failure_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRules {
    #[serde(default, alias = "checkin_path_contains")]
    pub checkin_url_contains: Option<String>,
    #[serde(default)]
    pub success_keys: Vec<String>,
    #[serde(default)]
    pub already_keywords: Vec<String>,
}
