use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use chrono::TimeDelta;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "authoring.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub database_url: String,
    pub api_token: Option<String>,
    pub request_timeout_seconds: u64,
    pub draft_ttl_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000/api".into(),
            database_url: "sqlite://./data/authoring.db".into(),
            api_token: None,
            request_timeout_seconds: 60,
            draft_ttl_days: client_core::DEFAULT_DRAFT_TTL_DAYS,
        }
    }
}

impl Settings {
    pub fn draft_ttl(&self) -> anyhow::Result<TimeDelta> {
        let days = self.draft_ttl_days;
        if days <= 0 {
            bail!("draft_ttl_days must be positive, got {days}");
        }
        TimeDelta::try_days(days)
            .with_context(|| format!("draft_ttl_days {days} is out of range"))
    }

    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        if self.request_timeout_seconds == 0 {
            bail!("request_timeout_seconds must be positive");
        }
        Ok(Duration::from_secs(self.request_timeout_seconds))
    }
}

/// Defaults, then the flat config file, then environment overrides.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        return;
    };

    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_token").and_then(toml::Value::as_str) {
        settings.api_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg
        .get("request_timeout_seconds")
        .and_then(toml::Value::as_integer)
        .and_then(|v| u64::try_from(v).ok())
    {
        settings.request_timeout_seconds = v;
    }
    if let Some(v) = file_cfg
        .get("draft_ttl_days")
        .and_then(toml::Value::as_integer)
    {
        settings.draft_ttl_days = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("AUTHORING_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("AUTHORING_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("AUTHORING_API_TOKEN") {
        settings.api_token = Some(v).filter(|token| !token.trim().is_empty());
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_seconds = parsed;
        }
    }
    if let Some(v) = var("APP__DRAFT_TTL_DAYS") {
        if let Ok(parsed) = v.parse::<i64>() {
            settings.draft_ttl_days = parsed;
        }
    }
}

pub fn validate_api_base_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid api base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api base url '{raw}' must use http or https");
    }
    Ok(url)
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    if let Some(path) = sqlite_path(&database_url) {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory '{}' for database url '{database_url}'",
                    parent.display()
                )
            })?;
        }
    }
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_letter(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        if has_drive_letter(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url.replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn sqlite_path(database_url: &str) -> Option<&Path> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
