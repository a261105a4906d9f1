use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::default();
    assert_eq!(settings.server_url, "http://127.0.0.1:8000");
    assert_eq!(settings.token_path, PathBuf::from("./data/session.token"));
    assert_eq!(settings.request_timeout, Duration::from_secs(10));
    assert_eq!(settings.intervals.messages, Duration::from_millis(3000));
    assert_eq!(settings.intervals.users, Duration::from_millis(5000));
    assert_eq!(settings.intervals.heartbeat, Duration::from_millis(30000));
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    settings.apply_toml(
        r#"
server_url = "https://chat.example.org"
token_path = "/tmp/chat.token"
request_timeout_secs = 4
messages_interval_ms = 1500
heartbeat_interval_ms = 60000
"#,
    );

    assert_eq!(settings.server_url, "https://chat.example.org");
    assert_eq!(settings.token_path, PathBuf::from("/tmp/chat.token"));
    assert_eq!(settings.request_timeout, Duration::from_secs(4));
    assert_eq!(settings.intervals.messages, Duration::from_millis(1500));
    assert_eq!(settings.intervals.users, Duration::from_millis(5000));
    assert_eq!(settings.intervals.heartbeat, Duration::from_secs(60));
}

#[test]
fn blank_and_zero_file_values_are_ignored() {
    let mut settings = Settings::default();
    settings.apply_toml(
        r#"
server_url = "   "
users_interval_ms = 0
"#,
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn unreadable_file_leaves_settings_alone() {
    let mut settings = Settings::default();
    settings.apply_toml("server_url = [not toml");
    assert_eq!(settings, Settings::default());
}

#[test]
fn env_overrides_file() {
    let mut settings = Settings::default();
    settings.apply_toml(r#"server_url = "https://from-file""#);
    settings.apply_env(env(&[
        ("CHAT_SERVER_URL", "https://legacy"),
        ("APP__TOKEN_PATH", "/var/lib/chat/token"),
        ("APP__USERS_INTERVAL_MS", "2500"),
    ]));

    assert_eq!(settings.server_url, "https://legacy");
    assert_eq!(settings.token_path, PathBuf::from("/var/lib/chat/token"));
    assert_eq!(settings.intervals.users, Duration::from_millis(2500));
}

#[test]
fn app_prefixed_url_wins_over_legacy_name() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("CHAT_SERVER_URL", "https://legacy"),
        ("APP__SERVER_URL", "https://primary"),
    ]));
    assert_eq!(settings.server_url, "https://primary");
}

#[test]
fn malformed_env_numbers_are_ignored() {
    let mut settings = Settings::default();
    settings.apply_env(env(&[
        ("APP__REQUEST_TIMEOUT_SECS", "soon"),
        ("APP__MESSAGES_INTERVAL_MS", "0"),
        ("APP__HEARTBEAT_INTERVAL_MS", "-5"),
    ]));
    assert_eq!(settings, Settings::default());
}
