//! Wire types for the KidsGuard backend
//!
//! These mirror the JSON bodies served by the backend. Missing fields fall
//! back to defaults so that older backends and partial payloads still decode.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity assigned by the backend's AI evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DangerLevel {
    Safe,
    Medium,
    High,
    /// Anything else the backend sends, e.g. `info` for job status events
    #[default]
    #[serde(other)]
    Info,
}

impl DangerLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DangerLevel::Safe => "safe",
            DangerLevel::Medium => "medium",
            DangerLevel::High => "high",
            DangerLevel::Info => "info",
        }
    }
}

impl fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DangerLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(DangerLevel::Safe),
            "medium" => Ok(DangerLevel::Medium),
            "high" => Ok(DangerLevel::High),
            "info" => Ok(DangerLevel::Info),
            other => Err(format!("unknown danger level '{}'", other)),
        }
    }
}

/// Response of `POST /api/validate-stream`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
}

/// A one-click safety condition from `GET /api/presets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub condition: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    /// Suggested severity; the backend also uses `check` for general presets
    #[serde(default)]
    pub danger_level: Option<String>,
}

/// Outcome of a single safety check, also the shape of an alert history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub danger_level: DangerLevel,
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub stream_url: Option<String>,
    /// `webhook` for records that arrived through a monitoring job
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub frame_b64: Option<String>,
}

/// Response of `POST /api/monitor/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMonitorResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Lifecycle state of a backend monitoring job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Stopped,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Stopped => write!(f, "stopped"),
            JobStatus::Other => write!(f, "other"),
        }
    }
}

/// Aggregate counters of a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(default)]
    pub checks_performed: u64,
    #[serde(default)]
    pub triggers_fired: u64,
}

/// Cached view of a backend monitoring job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorJob {
    pub job_id: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub details: JobDetails,
}

impl MonitorJob {
    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// First eight characters of the job id, as shown in the jobs table
    pub fn short_id(&self) -> &str {
        match self.job_id.char_indices().nth(8) {
            Some((idx, _)) => &self.job_id[..idx],
            None => &self.job_id,
        }
    }
}

/// Response of `GET /api/monitor/jobs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<MonitorJob>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Relay endpoint identifier mirrored from the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSiteToken {
    pub uuid: String,
    pub url: String,
    #[serde(default)]
    pub view_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One event received through the webhook relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub id: String,
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub danger_level: DangerLevel,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub frame_url: Option<String>,
    #[serde(default)]
    pub frame_b64: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub checks_performed: u64,
    #[serde(default)]
    pub triggers_fired: u64,
}

impl RelayEvent {
    /// Image source for the captured frame, if the event carries one
    pub fn frame_src(&self) -> Option<String> {
        if let Some(url) = self.frame_url.as_deref().filter(|u| !u.is_empty()) {
            return Some(url.to_string());
        }
        self.frame_b64
            .as_deref()
            .filter(|b| !b.is_empty())
            .map(|b| format!("data:image/jpeg;base64,{}", b))
    }

    /// Text shown for the event: explanation, else summary, else status/reason
    pub fn headline(&self) -> String {
        if !self.explanation.is_empty() {
            return self.explanation.clone();
        }
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.is_empty()) {
            return summary.to_string();
        }
        match (self.status.as_deref(), self.reason.as_deref()) {
            (Some(status), Some(reason)) if !reason.is_empty() => {
                format!("{}: {}", status, reason)
            }
            (Some(status), _) => status.to_string(),
            _ => self.event_type.clone(),
        }
    }
}

/// Response of `GET /api/webhook-site/events`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayEvents {
    #[serde(default)]
    pub events: Vec<RelayEvent>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Payload of a generic webhook event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventData {
    #[serde(default)]
    pub triggered: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// One entry of `GET /api/webhook/events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: WebhookEventData,
}

impl WebhookEvent {
    pub const WATCH_TRIGGERED: &'static str = "watch_triggered";

    /// Key used to remember that this event was already shown
    pub fn dedup_key(&self) -> String {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => format!(
                "{}@{}",
                self.event_type,
                self.timestamp.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// A past digest summary kept by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestSummary {
    #[serde(default)]
    pub timestamp: String,
    pub summary: String,
    #[serde(default)]
    pub stream_url: String,
}
