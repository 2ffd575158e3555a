use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default)]
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Thresholds {
    #[serde(default = "default_cpu_load")]
    pub cpu_load: u64,
    #[serde(default = "default_memory_usage_percent")]
    pub memory_usage_percent: u64,
    #[serde(default = "default_disk_usage_percent")]
    pub disk_usage_percent: u64,
    #[serde(default = "default_network_usage_percent")]
    pub network_usage_percent: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_consecutive_errors: default_max_consecutive_errors(),
            timeout_ms: default_timeout_ms(),
            interval_ms: default_interval_ms(),
            buffer_size: default_buffer_size(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_load: default_cpu_load(),
            memory_usage_percent: default_memory_usage_percent(),
            disk_usage_percent: default_disk_usage_percent(),
            network_usage_percent: default_network_usage_percent(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Validation("поле url обязательно".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "url '{}' должен начинаться с http:// или https://",
                self.url
            )));
        }
        if self.max_consecutive_errors < 1 {
            return Err(ConfigError::Validation(
                "max_consecutive_errors должно быть >= 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "timeout_ms должен быть > 0".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "interval_ms должен быть > 0".to_string(),
            ));
        }
        if !(1..=3).contains(&self.buffer_size) {
            return Err(ConfigError::Validation(
                "buffer_size должно быть в диапазоне 1..3".to_string(),
            ));
        }

        validate_thresholds(&self.thresholds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(t: &Thresholds) -> Result<(), ConfigError> {
    let fields = [
        ("cpu_load", t.cpu_load),
        ("memory_usage_percent", t.memory_usage_percent),
        ("disk_usage_percent", t.disk_usage_percent),
        ("network_usage_percent", t.network_usage_percent),
    ];
    for (name, value) in fields {
        if value > 100 {
            return Err(ConfigError::Validation(format!(
                "thresholds.{name} должно быть в диапазоне 0..100"
            )));
        }
    }
    Ok(())
}

fn default_url() -> String {
    "http://srv.msk01.gigacorp.local/_stats".to_string()
}

const fn default_max_consecutive_errors() -> u32 {
    3
}

const fn default_timeout_ms() -> u64 {
    5000
}

const fn default_interval_ms() -> u64 {
    500
}

const fn default_buffer_size() -> usize {
    3
}

const fn default_cpu_load() -> u64 {
    30
}

const fn default_memory_usage_percent() -> u64 {
    80
}

const fn default_disk_usage_percent() -> u64 {
    90
}

const fn default_network_usage_percent() -> u64 {
    90
}
