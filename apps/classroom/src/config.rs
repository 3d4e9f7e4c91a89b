use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use shared::domain::Role;
use tracing::warn;

pub const CONFIG_FILE: &str = "classroom.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub role: Role,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080/api".into(),
            role: Role::Student,
            page_size: 10,
            debounce_ms: 500,
            request_timeout_secs: client_core::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Every key is optional; absent keys keep the default.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    role: Option<String>,
    page_size: Option<u32>,
    debounce_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings(config_path: Option<&Path>) -> Settings {
    load_settings_from(
        config_path.unwrap_or(Path::new(CONFIG_FILE)),
        |key| std::env::var(key).ok(),
    )
}

/// Defaults, then the toml file, then environment variables. Unparseable
/// values are logged and skipped.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring invalid config file"),
        }
    }

    if let Some(v) = env("CLASSROOM_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__ROLE") {
        set_parsed(&mut settings.role, "APP__ROLE", &v);
    }
    if let Some(v) = env("APP__PAGE_SIZE") {
        set_parsed(&mut settings.page_size, "APP__PAGE_SIZE", &v);
    }
    if let Some(v) = env("APP__DEBOUNCE_MS") {
        set_parsed(&mut settings.debounce_ms, "APP__DEBOUNCE_MS", &v);
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        set_parsed(
            &mut settings.request_timeout_secs,
            "APP__REQUEST_TIMEOUT_SECS",
            &v,
        );
    }

    settings.page_size = settings.page_size.max(1);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.role {
        set_parsed(&mut settings.role, "role", &v);
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.debounce_ms {
        settings.debounce_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
}

fn set_parsed<T>(slot: &mut T, key: &str, raw: &str)
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => *slot = value,
        Err(err) => warn!(key, value = raw, error = %err, "ignoring invalid setting"),
    }
}
