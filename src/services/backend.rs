//! HR backend client for the attendance endpoints

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    clock::Activity,
    errors::{ClockError, ClockResult},
};

/// `GET session-status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub is_active: bool,
    #[serde(default)]
    pub session_start_time: Option<String>,
    #[serde(default)]
    pub time_zone_label: String,
    /// Free-text punch state some deployments send instead of relying on `isActive`
    #[serde(default)]
    pub punch_state: Option<String>,
}

impl SessionStatus {
    /// A recognized punch-state label wins over the boolean flag
    pub fn activity(&self) -> Activity {
        match self.punch_state.as_deref() {
            Some(label) => Activity::from_label(label).unwrap_or_else(|| {
                warn!("Unknown punch state {:?}, using isActive={}", label, self.is_active);
                Activity::from(self.is_active)
            }),
            None => Activity::from(self.is_active),
        }
    }
}

/// `GET accumulated-duration(date)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedDuration {
    #[serde(default)]
    pub total_duration: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub last_session_start: Option<String>,
    #[serde(default)]
    pub last_session_end: Option<String>,
}

/// Request/response contract of the HR backend
#[async_trait]
pub trait AttendanceBackend: Send + Sync + 'static {
    async fn session_status(&self) -> ClockResult<SessionStatus>;
    async fn accumulated_duration(&self, date: NaiveDate) -> ClockResult<AccumulatedDuration>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub status_path: String,
    pub duration_path: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            status_path: "/attendance/session-status".to_string(),
            duration_path: "/attendance/accumulated-duration".to_string(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// reqwest implementation of [`AttendanceBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> ClockResult<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| ClockError::Backend(format!("invalid backend url {}: {}", config.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(Self::default_headers(config.token.as_deref())?)
            .build()?;

        Ok(Self { config, client })
    }

    fn default_headers(token: Option<&str>) -> ClockResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClockError::Backend(format!("invalid auth header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    #[instrument(name = "backend_get_json", skip(self, query))]
    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> ClockResult<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).query(query).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| ClockError::Backend(format!("response parse failed url={}: {}", url, e)));
                }
                // Client errors (bad token, bad request) do not get better on retry
                Ok(resp) if resp.status().is_client_error() => {
                    return Err(ClockError::Backend(format!("request rejected status={} url={}", resp.status(), url)));
                }
                Ok(resp) => {
                    if attempt >= self.config.retry.max_attempts {
                        return Err(ClockError::Backend(format!("request failed status={} url={}", resp.status(), url)));
                    }
                    debug!("Attempt {} got status {}, retrying", attempt, resp.status());
                }
                Err(e) => {
                    if attempt >= self.config.retry.max_attempts {
                        return Err(ClockError::Backend(format!("request failed url={}: {}", url, e)));
                    }
                    debug!("Attempt {} failed: {}, retrying", attempt, e);
                }
            }
            tokio::time::sleep(Duration::from_millis(
                self.config.retry.base_backoff_ms.saturating_mul(attempt as u64),
            ))
            .await;
        }
    }
}

#[async_trait]
impl AttendanceBackend for HttpBackend {
    async fn session_status(&self) -> ClockResult<SessionStatus> {
        self.get_json(&self.config.url(&self.config.status_path), &[]).await
    }

    async fn accumulated_duration(&self, date: NaiveDate) -> ClockResult<AccumulatedDuration> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        self.get_json(&self.config.url(&self.config.duration_path), &query).await
    }
}
