//! HTTP client for the spreadsheet proxy.
//!
//! The proxy exposes three actions selected by the `action` query parameter:
//! `getTurmas` (GET, full roster), `saveTurmas` (POST, full roster) and
//! `logPedido` (POST, one audit record).

use crate::config::Config;
use crate::model::{normalize_ids, Group};
use reqwest::{header, Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("remote reported failure: {0}")]
    Rejected(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    success: bool,
    #[serde(default)]
    groups: Option<Vec<Group>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PushBody<'a> {
    groups: Vec<&'a Group>,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogBody<'a> {
    group: &'a str,
    student: &'a str,
    ticket_count: u32,
    user: &'a str,
}

#[derive(Clone)]
pub struct RemoteClient {
    http: Client,
    base: Url,
    log_user: String,
}

impl RemoteClient {
    pub fn new(base: Url, cfg: &Config) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(cfg.request_timeout).build()?;
        Ok(Self {
            http,
            base,
            log_user: cfg.log_user.clone(),
        })
    }

    /// Builds a client when an endpoint is configured.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Option<Self>> {
        cfg.endpoint_url
            .clone()
            .map(|base| Self::new(base, cfg))
            .transpose()
    }

    fn action_url(&self, action: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("action", action);
        url
    }

    fn request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Fetches the full roster, bypassing intermediate caches.
    pub async fn pull(&self) -> Result<Vec<Group>, RemoteError> {
        let mut url = self.action_url("getTurmas");
        let buster = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        url.query_pairs_mut().append_pair("t", &buster.to_string());

        let resp = self
            .http
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header("X-Request-Id", Self::request_id())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status()));
        }
        let body = resp.text().await?;
        let parsed: PullResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(e.to_string()))?;
        if !parsed.success {
            return Err(RemoteError::Rejected(
                parsed.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let groups = parsed
            .groups
            .ok_or_else(|| RemoteError::Malformed("missing groups".to_string()))?;
        Ok(normalize_ids(groups))
    }

    /// Sends the full roster. `Ok(false)` means the proxy answered but did not
    /// acknowledge the write.
    pub async fn push<'a>(
        &self,
        groups: impl IntoIterator<Item = &'a Group>,
    ) -> Result<bool, RemoteError> {
        let body = PushBody {
            groups: groups.into_iter().collect(),
        };
        let resp = self
            .http
            .post(self.action_url("saveTurmas"))
            .header("X-Request-Id", Self::request_id())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status()));
        }
        let body = resp.text().await?;
        let parsed: PushResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(e.to_string()))?;
        Ok(parsed.success)
    }

    /// Appends an audit record. Never fails; problems are only logged.
    pub async fn log_change(&self, group_name: &str, student_name: &str, ticket_count: u32) {
        let body = LogBody {
            group: group_name,
            student: student_name,
            ticket_count,
            user: &self.log_user,
        };
        let sent = self
            .http
            .post(self.action_url("logPedido"))
            .header("X-Request-Id", Self::request_id())
            .json(&body)
            .send()
            .await;
        match sent {
            Ok(resp) if resp.status().is_success() => {
                log::debug!("logged change for {student_name} ({group_name}) = {ticket_count}");
            }
            Ok(resp) => log::warn!("audit log rejected with HTTP {}", resp.status()),
            Err(e) => log::warn!("audit log failed: {e}"),
        }
    }
}
