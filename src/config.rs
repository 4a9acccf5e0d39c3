use anyhow::{anyhow, Context};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_LOG_USER: &str = "App Web";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the spreadsheet proxy. `None` runs local-only.
    pub endpoint_url: Option<Url>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Connectivity assumed until the shell reports otherwise.
    pub start_online: bool,
    /// `user` field of audit log records.
    pub log_user: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            start_online: true,
            log_user: DEFAULT_LOG_USER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = non_empty(get("BILHETES_ENDPOINT_URL")) {
            let url = Url::parse(&raw)
                .with_context(|| format!("BILHETES_ENDPOINT_URL is not a valid URL: {raw}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(anyhow!("BILHETES_ENDPOINT_URL must be http(s): {raw}"));
            }
            cfg.endpoint_url = Some(url);
        }
        if let Some(raw) = non_empty(get("BILHETES_POLL_INTERVAL_SECS")) {
            cfg.poll_interval = parse_secs("BILHETES_POLL_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = non_empty(get("BILHETES_REQUEST_TIMEOUT_SECS")) {
            cfg.request_timeout = parse_secs("BILHETES_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = non_empty(get("BILHETES_START_ONLINE")) {
            cfg.start_online = parse_bool("BILHETES_START_ONLINE", &raw)?;
        }
        if let Some(raw) = non_empty(get("BILHETES_LOG_USER")) {
            cfg.log_user = raw;
        }
        Ok(cfg)
    }

    pub fn remote_configured(&self) -> bool {
        self.endpoint_url.is_some()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_secs(name: &str, raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .parse()
        .with_context(|| format!("{name} must be a whole number of seconds, got {raw:?}"))?;
    if secs == 0 {
        return Err(anyhow!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(name: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{name} must be a boolean, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = Config::from_vars(vars(&[])).expect("config");
        assert!(cfg.endpoint_url.is_none());
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert!(cfg.start_online);
        assert_eq!(cfg.log_user, "App Web");
    }

    #[test]
    fn reads_all_overrides() {
        let cfg = Config::from_vars(vars(&[
            ("BILHETES_ENDPOINT_URL", "https://script.example.com/macros/s/abc/exec"),
            ("BILHETES_POLL_INTERVAL_SECS", "5"),
            ("BILHETES_REQUEST_TIMEOUT_SECS", "2"),
            ("BILHETES_START_ONLINE", "no"),
            ("BILHETES_LOG_USER", "Secretaria"),
        ]))
        .expect("config");
        assert_eq!(
            cfg.endpoint_url.as_ref().map(|u| u.as_str()),
            Some("https://script.example.com/macros/s/abc/exec")
        );
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
        assert!(!cfg.start_online);
        assert_eq!(cfg.log_user, "Secretaria");
    }

    #[test]
    fn blank_endpoint_means_local_only() {
        let cfg = Config::from_vars(vars(&[("BILHETES_ENDPOINT_URL", "  ")])).expect("config");
        assert!(!cfg.remote_configured());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_vars(vars(&[("BILHETES_POLL_INTERVAL_SECS", "0")])).is_err());
        assert!(Config::from_vars(vars(&[("BILHETES_POLL_INTERVAL_SECS", "soon")])).is_err());
        assert!(Config::from_vars(vars(&[("BILHETES_ENDPOINT_URL", "not a url")])).is_err());
        assert!(Config::from_vars(vars(&[("BILHETES_ENDPOINT_URL", "ftp://x.example")])).is_err());
        assert!(Config::from_vars(vars(&[("BILHETES_START_ONLINE", "maybe")])).is_err());
    }
}
