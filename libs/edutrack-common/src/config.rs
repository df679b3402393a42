// Client configuration, read from the environment with local defaults

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_JUDGE0_URL: &str = "https://judge0-ce.p.rapidapi.com";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the classroom backend
    pub api_url: String,
    /// Base URL of the remote code executor
    pub judge0_url: String,
    pub judge0_api_key: Option<String>,
    pub judge0_host: Option<String>,
    /// Email automation webhook; notifications are skipped when unset
    pub email_webhook_url: Option<String>,
    pub session_file: PathBuf,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            judge0_url: DEFAULT_JUDGE0_URL.to_string(),
            judge0_api_key: None,
            judge0_host: None,
            email_webhook_url: None,
            session_file: default_session_file(std::env::var("HOME").ok()),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let poll_interval_ms = match get("EDUTRACK_POLL_INTERVAL_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    tracing::warn!(value = %raw, "Ignoring invalid EDUTRACK_POLL_INTERVAL_MS");
                    DEFAULT_POLL_INTERVAL_MS
                }
            },
            None => DEFAULT_POLL_INTERVAL_MS,
        };

        Self {
            api_url: get("EDUTRACK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            judge0_url: get("JUDGE0_URL").unwrap_or_else(|| DEFAULT_JUDGE0_URL.to_string()),
            judge0_api_key: get("JUDGE0_API_KEY"),
            judge0_host: get("JUDGE0_HOST"),
            email_webhook_url: get("EDUTRACK_EMAIL_WEBHOOK"),
            session_file: get("EDUTRACK_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| default_session_file(lookup("HOME"))),
            poll_interval_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_session_file(home: Option<String>) -> PathBuf {
    home.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".edutrack")
        .join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/home/ada")]));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.judge0_url, DEFAULT_JUDGE0_URL);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.email_webhook_url, None);
        assert_eq!(
            config.session_file,
            PathBuf::from("/home/ada/.edutrack/session.json")
        );
    }

    #[test]
    fn test_overrides_from_env() {
        let config = Config::from_lookup(lookup_from(&[
            ("EDUTRACK_API_URL", "https://api.example.edu"),
            ("JUDGE0_API_KEY", "secret"),
            ("EDUTRACK_SESSION_FILE", "/tmp/s.json"),
            ("EDUTRACK_POLL_INTERVAL_MS", "250"),
            ("EDUTRACK_EMAIL_WEBHOOK", "  "),
        ]));
        assert_eq!(config.api_url, "https://api.example.edu");
        assert_eq!(config.judge0_api_key.as_deref(), Some("secret"));
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.email_webhook_url, None);
    }

    #[test]
    fn test_invalid_poll_interval_falls_back() {
        let config = Config::from_lookup(lookup_from(&[("EDUTRACK_POLL_INTERVAL_MS", "0")]));
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }
}
