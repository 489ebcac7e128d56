use super::schema::AppConfig;
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration file is invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./config.toml
    /// 2. <config dir>/auto-checkin/config.toml
    pub async fn load_default() -> Result<AppConfig, ConfigError> {
        let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("auto-checkin").join(DEFAULT_CONFIG_FILE);
            if user_config.exists() {
                return Self::load_from(&user_config).await;
            }
        }

        Err(ConfigError::NotFound(local_config))
    }

    pub async fn load_from(path: &Path) -> Result<AppConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base_dir)
    }

    /// Parse TOML text, resolving relative paths against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<AppConfig, ConfigError> {
        let mut config: AppConfig = toml::from_str(content)?;

        config.browser.storage_state_path =
            resolve_path(&config.browser.storage_state_path, base_dir);
        config.history.csv_path = resolve_path(&config.history.csv_path, base_dir);

        let dom = &mut config.selectors.dom;
        dom.login_marker = non_blank(dom.login_marker.take());
        dom.checkin_button = non_blank(dom.checkin_button.take());
        drop_blank(&mut dom.success_keywords);
        drop_blank(&mut dom.already_keywords);
        drop_blank(&mut dom.failure_keywords);
        let api = &mut config.selectors.api;
        api.checkin_url_contains = non_blank(api.checkin_url_contains.take());
        drop_blank(&mut api.success_keys);
        drop_blank(&mut api.already_keywords);

        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.browser.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("browser.base_url must not be empty".into()));
    }
    if config.history.max_rows == 0 {
        return Err(ConfigError::Invalid(
            "history.max_rows must be at least 1".into(),
        ));
    }
    if config.schedule.timezone.parse::<Tz>().is_err() {
        return Err(ConfigError::Invalid(format!(
            "schedule.timezone is not a known IANA zone: {}",
            config.schedule.timezone
        )));
    }
    Ok(())
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A blank keyword is contained in every text, so it is removed up front.
fn drop_blank(keywords: &mut Vec<String>) {
    keywords.retain(|k| !k.trim().is_empty());
}
