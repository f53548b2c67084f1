//! Typed client for the KidsGuard backend API

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::{
    DangerLevel, DigestSummary, JobList, MonitorJob, Preset, RelayEvents, SafetyCheckResult,
    StartMonitorResponse, ValidationResponse, WebhookEvent, WebhookSiteToken,
};
use crate::io::{HttpClient, HttpResponse, LineStream};
use crate::KidsGuardError;

/// Issues requests against the backend and decodes its JSON envelopes
pub struct BackendClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BackendClient {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::debug!("Created BackendClient for {}", base_url);
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn validate_stream(&self, stream_url: &str) -> crate::Result<ValidationResponse> {
        let response = self
            .http
            .post_json(
                &self.url("/api/validate-stream"),
                &json!({ "stream_url": stream_url }),
            )
            .await?;
        decode(&response)
    }

    pub async fn presets(&self) -> crate::Result<Vec<Preset>> {
        let response = self.http.get(&self.url("/api/presets")).await?;
        decode(&response)
    }

    pub async fn check(
        &self,
        stream_url: &str,
        condition: &str,
    ) -> crate::Result<SafetyCheckResult> {
        let response = self
            .http
            .post_json(
                &self.url("/api/check"),
                &json!({ "stream_url": stream_url, "condition": condition }),
            )
            .await?;
        decode(&response)
    }

    pub async fn start_monitor(
        &self,
        stream_url: &str,
        condition: &str,
        webhook_url: Option<&str>,
    ) -> crate::Result<StartMonitorResponse> {
        let mut body = json!({ "stream_url": stream_url, "condition": condition });
        if let Some(webhook_url) = webhook_url {
            body["webhook_url"] = json!(webhook_url);
        }
        let response = self
            .http
            .post_json(&self.url("/api/monitor/start"), &body)
            .await?;
        decode(&response)
    }

    pub async fn stop_monitor(&self, job_id: &str) -> crate::Result<()> {
        let response = self
            .http
            .post_json(&self.url("/api/monitor/stop"), &json!({ "job_id": job_id }))
            .await?;
        decode::<serde_json::Value>(&response)?;
        Ok(())
    }

    pub async fn list_jobs(&self) -> crate::Result<JobList> {
        let response = self.http.get(&self.url("/api/monitor/jobs")).await?;
        decode(&response)
    }

    /// Detail URL of one job, with the id encoded as a single path segment
    pub fn job_url(&self, job_id: &str) -> crate::Result<String> {
        let mut url = reqwest::Url::parse(&self.url("/api/monitor/job"))
            .map_err(|e| KidsGuardError::Config(format!("Invalid backend URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| KidsGuardError::Config("Backend URL cannot have a path".to_string()))?
            .push(job_id);
        Ok(url.to_string())
    }

    pub async fn job(&self, job_id: &str) -> crate::Result<MonitorJob> {
        let url = self.job_url(job_id)?;
        let response = self.http.get(&url).await?;
        decode(&response)
    }

    pub async fn alerts(&self, level: Option<DangerLevel>) -> crate::Result<Vec<SafetyCheckResult>> {
        let url = match level {
            Some(level) => self.url(&format!("/api/alerts?level={}", level)),
            None => self.url("/api/alerts"),
        };
        let response = self.http.get(&url).await?;
        decode(&response)
    }

    /// Location of the backend-served alert download
    pub fn export_url(&self) -> String {
        self.url("/api/alerts/export")
    }

    /// Download the exported alert history as served by the backend
    pub async fn export_alerts(&self) -> crate::Result<String> {
        let response = self.http.get(&self.export_url()).await?;
        if response.status >= 400 {
            return Err(KidsGuardError::Http(format!(
                "export returned status {}",
                response.status
            )));
        }
        Ok(response.body)
    }

    pub async fn clear_alerts(&self) -> crate::Result<()> {
        let response = self
            .http
            .post_json(&self.url("/api/alerts/clear"), &json!({}))
            .await?;
        decode::<serde_json::Value>(&response)?;
        Ok(())
    }

    pub async fn relay_token(&self) -> crate::Result<WebhookSiteToken> {
        let response = self.http.get(&self.url("/api/webhook-site/token")).await?;
        decode(&response)
    }

    pub async fn create_relay_token(&self) -> crate::Result<WebhookSiteToken> {
        let response = self
            .http
            .post_json(&self.url("/api/webhook-site/create"), &json!({}))
            .await?;
        decode(&response)
    }

    pub async fn relay_events(&self) -> crate::Result<RelayEvents> {
        let response = self.http.get(&self.url("/api/webhook-site/events")).await?;
        decode(&response)
    }

    pub async fn webhook_events(&self) -> crate::Result<Vec<WebhookEvent>> {
        let response = self.http.get(&self.url("/api/webhook/events")).await?;
        decode(&response)
    }

    pub fn digest_url(&self, stream_url: &str) -> crate::Result<String> {
        let url = reqwest::Url::parse_with_params(
            &self.url("/api/digest/start-sse"),
            &[("stream_url", stream_url)],
        )
        .map_err(|e| KidsGuardError::Config(format!("Invalid backend URL: {}", e)))?;
        Ok(url.to_string())
    }

    pub async fn open_digest(&self, stream_url: &str) -> crate::Result<LineStream> {
        let url = self.digest_url(stream_url)?;
        self.http.open_stream(&url).await
    }

    pub async fn digest_summaries(&self) -> crate::Result<Vec<DigestSummary>> {
        let response = self.http.get(&self.url("/api/digest/summaries")).await?;
        decode(&response)
    }
}

/// Decode a backend response, turning an `{"error": ...}` envelope into
/// [`KidsGuardError::Api`] regardless of the HTTP status
pub fn decode<T: DeserializeOwned>(response: &HttpResponse) -> crate::Result<T> {
    let value: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
        KidsGuardError::Http(format!(
            "status {} with unreadable body: {}",
            response.status, e
        ))
    })?;

    if let Some(error) = value.as_object().and_then(|o| o.get("error")) {
        if !error.is_null() {
            let message = match error.as_str() {
                Some(s) => s.to_string(),
                None => error.to_string(),
            };
            return Err(KidsGuardError::Api(message));
        }
    }

    Ok(serde_json::from_value(value)?)
}
