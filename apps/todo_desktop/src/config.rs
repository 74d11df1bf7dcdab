use std::{collections::HashMap, fs, path::Path};

use client_core::{HostedConfig, DEFAULT_TABLE};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: String,
    pub service_api_key: String,
    pub table: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:54321".into(),
            service_api_key: String::new(),
            table: DEFAULT_TABLE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("service_url is not set")]
    MissingServiceUrl,
    #[error("service_api_key is not set (set TODO_SERVICE_API_KEY or add it to the config file)")]
    MissingApiKey,
    #[error("table is not set")]
    MissingTable,
    #[error("service_url must start with http:// or https://, got '{0}'")]
    UnsupportedScheme(String),
    #[error("service_url is not a valid URL: {0}")]
    InvalidUrl(String),
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let service_url = self.service_url.trim();
        if service_url.is_empty() {
            return Err(ConfigError::MissingServiceUrl);
        }
        if !(service_url.starts_with("http://") || service_url.starts_with("https://")) {
            return Err(ConfigError::UnsupportedScheme(service_url.to_string()));
        }
        if self.service_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::MissingTable);
        }
        Ok(())
    }

    pub fn hosted_config(&self) -> Result<HostedConfig, ConfigError> {
        self.validate()?;
        HostedConfig::new(
            &self.service_url,
            self.service_api_key.trim(),
            self.table.trim(),
        )
        .map_err(|err| ConfigError::InvalidUrl(err.to_string()))
    }
}

pub fn load_settings(path: &Path) -> Settings {
    load_settings_from(path, |name| std::env::var(name).ok())
}

/// Defaults, then the flat `key = "value"` file at `path`, then environment
/// overrides (`APP__*` wins over `TODO_*`).
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("service_url") {
                    settings.service_url = v.clone();
                }
                if let Some(v) = file_cfg.get("service_api_key") {
                    settings.service_api_key = v.clone();
                }
                if let Some(v) = file_cfg.get("table") {
                    settings.table = v.clone();
                }
                info!(path = %path.display(), "loaded config file");
            }
            Err(err) => warn!(path = %path.display(), "ignoring malformed config file: {err}"),
        },
        Err(err) => debug!(path = %path.display(), "no config file: {err}"),
    }

    let overrides: [(&str, fn(&mut Settings, String)); 6] = [
        ("TODO_SERVICE_URL", |s, v| s.service_url = v),
        ("APP__SERVICE_URL", |s, v| s.service_url = v),
        ("TODO_SERVICE_API_KEY", |s, v| s.service_api_key = v),
        ("APP__SERVICE_API_KEY", |s, v| s.service_api_key = v),
        ("TODO_TABLE", |s, v| s.table = v),
        ("APP__TABLE", |s, v| s.table = v),
    ];
    for (name, apply) in overrides {
        if let Some(value) = env(name) {
            apply(&mut settings, value);
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
