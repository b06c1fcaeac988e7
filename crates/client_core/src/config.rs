use std::{env, fs, time::Duration};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            poll_interval_ms: 2000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

/// Defaults, overridden by `scandesk.toml` in the working directory,
/// overridden by environment variables (`SCANDESK_*` or `APP__*`).
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("scandesk.toml") {
        apply_file_settings(&mut settings, &raw);
    }

    apply_env_overrides(&mut settings, |key| env::var(key).ok());
    settings
}

fn apply_file_settings(settings: &mut Settings, raw: &str) {
    match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => {
            if let Some(v) = file_cfg.server_url {
                settings.server_url = v;
            }
            if let Some(v) = file_cfg.poll_interval_ms {
                settings.poll_interval_ms = v;
            }
            if let Some(v) = file_cfg.request_timeout_ms {
                settings.request_timeout_ms = v;
            }
        }
        Err(err) => warn!("ignoring unparseable scandesk.toml: {err}"),
    }
}

fn apply_env_overrides(settings: &mut Settings, get: impl Fn(&str) -> Option<String>) {
    for key in ["SCANDESK_SERVER_URL", "APP__SERVER_URL"] {
        if let Some(v) = get(key) {
            settings.server_url = v;
        }
    }

    for key in ["SCANDESK_POLL_INTERVAL_MS", "APP__POLL_INTERVAL_MS"] {
        if let Some(v) = get(key) {
            match v.parse::<u64>() {
                Ok(parsed) => settings.poll_interval_ms = parsed,
                Err(err) => warn!("ignoring invalid {key}={v}: {err}"),
            }
        }
    }

    for key in ["SCANDESK_REQUEST_TIMEOUT_MS", "APP__REQUEST_TIMEOUT_MS"] {
        if let Some(v) = get(key) {
            match v.parse::<u64>() {
                Ok(parsed) => settings.request_timeout_ms = parsed,
                Err(err) => warn!("ignoring invalid {key}={v}: {err}"),
            }
        }
    }
}
