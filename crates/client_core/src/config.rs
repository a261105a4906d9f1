use std::{fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::scheduler::PollingIntervals;

pub const CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
    pub intervals: PollingIntervals,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            token_path: PathBuf::from("./data/session.token"),
            request_timeout: Duration::from_secs(10),
            intervals: PollingIntervals::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    token_path: Option<String>,
    request_timeout_secs: Option<u64>,
    messages_interval_ms: Option<u64>,
    users_interval_ms: Option<u64>,
    heartbeat_interval_ms: Option<u64>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        settings.apply_toml(&raw);
    }
    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

impl Settings {
    pub fn apply_toml(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(
                    file = CONFIG_FILE,
                    error = %err,
                    "config: ignoring unreadable settings file"
                );
                return;
            }
        };

        if let Some(v) = file_cfg.server_url.filter(|v| !v.trim().is_empty()) {
            self.server_url = v.trim().to_string();
        }
        if let Some(v) = file_cfg.token_path.filter(|v| !v.trim().is_empty()) {
            self.token_path = PathBuf::from(v.trim());
        }
        if let Some(v) = file_cfg.request_timeout_secs.filter(|v| *v > 0) {
            self.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file_cfg.messages_interval_ms.filter(|v| *v > 0) {
            self.intervals.messages = Duration::from_millis(v);
        }
        if let Some(v) = file_cfg.users_interval_ms.filter(|v| *v > 0) {
            self.intervals.users = Duration::from_millis(v);
        }
        if let Some(v) = file_cfg.heartbeat_interval_ms.filter(|v| *v > 0) {
            self.intervals.heartbeat = Duration::from_millis(v);
        }
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("CHAT_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("APP__SERVER_URL") {
            self.server_url = v;
        }

        if let Some(v) = lookup("APP__TOKEN_PATH") {
            self.token_path = PathBuf::from(v);
        }

        if let Some(secs) = positive_number(&lookup, "APP__REQUEST_TIMEOUT_SECS") {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = positive_number(&lookup, "APP__MESSAGES_INTERVAL_MS") {
            self.intervals.messages = Duration::from_millis(ms);
        }
        if let Some(ms) = positive_number(&lookup, "APP__USERS_INTERVAL_MS") {
            self.intervals.users = Duration::from_millis(ms);
        }
        if let Some(ms) = positive_number(&lookup, "APP__HEARTBEAT_INTERVAL_MS") {
            self.intervals.heartbeat = Duration::from_millis(ms);
        }
    }
}

fn positive_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Some(parsed),
        _ => {
            warn!(key, value = %raw, "config: ignoring non-positive or malformed number");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
