//! Session state shared by every dashboard component
//!
//! One `DashboardState` lives for the whole session. It holds the data the
//! components work on (stream session, history, jobs, dedup sets) next to the
//! rendered [`Page`], and is mutated only through the methods below so that
//! data and view never drift apart.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::api::{MonitorJob, Preset, SafetyCheckResult, WebhookSiteToken};
use crate::digest::DigestPhase;
use crate::ledger::DedupSet;
use crate::render;
use crate::toast::ToastTray;

/// Most history records kept in memory
pub const HISTORY_LIMIT: usize = 200;

/// The stream the user validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSession {
    pub url: Option<String>,
    pub valid: bool,
    pub last_latency_ms: Option<u64>,
}

impl StreamSession {
    /// The current stream URL, only if it passed validation
    pub fn validated_url(&self) -> Option<&str> {
        if self.valid {
            self.url.as_deref()
        } else {
            None
        }
    }
}

/// Rendered page regions
#[derive(Debug, Clone)]
pub struct Page {
    pub stream_status: String,
    pub preview: String,
    pub latest_result: String,
    pub history: String,
    pub jobs: String,
    pub job_banner: String,
    pub stop_all_enabled: bool,
    pub events: String,
    pub events_placeholder: bool,
    pub digest_log: Vec<String>,
    pub digest_phase: DigestPhase,
    pub toasts: ToastTray,
}

impl Page {
    pub fn new(max_toasts: usize) -> Self {
        Self {
            stream_status: String::new(),
            preview: String::new(),
            latest_result: String::new(),
            history: render::render_history(&[]),
            jobs: render::render_jobs(&[]),
            job_banner: String::new(),
            stop_all_enabled: false,
            events: render::render_events_placeholder(),
            events_placeholder: true,
            digest_log: Vec::new(),
            digest_phase: DigestPhase::Idle,
            toasts: ToastTray::new(max_toasts),
        }
    }
}

/// Serializable copy of the page served to the local dashboard
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub stream_status: String,
    pub preview: String,
    pub latest_result: String,
    pub check_count: u64,
    pub history: String,
    pub jobs: String,
    pub job_banner: String,
    pub stop_all_enabled: bool,
    pub events: String,
    pub digest_log: String,
    pub digest_phase: DigestPhase,
    pub toasts: String,
    pub monitoring: bool,
}

/// Session state shared by the components, pollers and dashboard
#[derive(Debug)]
pub struct DashboardState {
    pub stream: StreamSession,
    pub token: Option<WebhookSiteToken>,
    pub presets: Vec<Preset>,
    pub check_count: u64,
    pub history: Vec<SafetyCheckResult>,
    pub jobs: Vec<MonitorJob>,
    pub monitoring: bool,
    pub relay_seen: DedupSet,
    pub relay_alerted: DedupSet,
    pub webhook_shown: DedupSet,
    pub digest_generation: u64,
    pub page: Page,
}

impl DashboardState {
    pub fn new(max_toasts: usize) -> Self {
        Self {
            stream: StreamSession::default(),
            token: None,
            presets: Vec::new(),
            check_count: 0,
            history: Vec::new(),
            jobs: Vec::new(),
            monitoring: false,
            relay_seen: DedupSet::new(),
            relay_alerted: DedupSet::new(),
            webhook_shown: DedupSet::new(),
            digest_generation: 0,
            page: Page::new(max_toasts),
        }
    }

    /// Replace the history list and its table
    pub fn set_history(&mut self, records: Vec<SafetyCheckResult>) {
        self.history = records;
        self.history.truncate(HISTORY_LIMIT);
        self.page.history = render::render_history(&self.history);
    }

    /// Put one new result at the front of the history
    pub fn prepend_history(&mut self, record: SafetyCheckResult) {
        self.history.insert(0, record);
        self.history.truncate(HISTORY_LIMIT);
        self.page.history = render::render_history(&self.history);
    }

    /// Empty the history and show the empty-state placeholder
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.page.history = render::render_history(&[]);
    }

    /// Replace the cached job list; stop-all is enabled iff a job is running
    pub fn set_jobs(&mut self, jobs: Vec<MonitorJob>) {
        self.page.stop_all_enabled = jobs.iter().any(MonitorJob::is_running);
        self.page.jobs = render::render_jobs(&jobs);
        self.jobs = jobs;
    }

    /// Forget which relay events were rendered and show the placeholder.
    /// Alert markers are kept, so nothing is alerted twice.
    pub fn reset_events(&mut self) {
        self.relay_seen.clear();
        self.page.events = render::render_events_placeholder();
        self.page.events_placeholder = true;
    }

    pub fn snapshot(&self, now: Instant) -> PageSnapshot {
        PageSnapshot {
            stream_status: self.page.stream_status.clone(),
            preview: self.page.preview.clone(),
            latest_result: self.page.latest_result.clone(),
            check_count: self.check_count,
            history: self.page.history.clone(),
            jobs: self.page.jobs.clone(),
            job_banner: self.page.job_banner.clone(),
            stop_all_enabled: self.page.stop_all_enabled,
            events: self.page.events.clone(),
            digest_log: self.page.digest_log.join("\n"),
            digest_phase: self.page.digest_phase,
            toasts: self.page.toasts.render(now),
            monitoring: self.monitoring,
        }
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<DashboardState>>;

pub fn new_state_handle(max_toasts: usize) -> StateHandle {
    Arc::new(RwLock::new(DashboardState::new(max_toasts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DangerLevel, JobDetails, JobStatus};

    fn record(id: &str) -> SafetyCheckResult {
        SafetyCheckResult {
            id: Some(id.to_string()),
            condition: format!("condition {}", id),
            danger_level: DangerLevel::Safe,
            triggered: false,
            explanation: String::new(),
            latency_ms: 10,
            timestamp: String::new(),
            stream_url: None,
            source: None,
            frame_b64: None,
        }
    }

    fn job(id: &str, status: JobStatus) -> MonitorJob {
        MonitorJob {
            job_id: id.to_string(),
            status,
            job_type: "live-monitor".to_string(),
            details: JobDetails::default(),
        }
    }

    #[test]
    fn new_state_starts_with_placeholders() {
        let state = DashboardState::new(5);
        assert!(state.page.history.contains(render::HISTORY_EMPTY));
        assert!(state.page.events_placeholder);
        assert!(!state.page.stop_all_enabled);
        assert_eq!(state.page.digest_phase, DigestPhase::Idle);
    }

    #[test]
    fn validated_url_requires_valid_flag() {
        let mut stream = StreamSession {
            url: Some("https://twitch.tv/kids".to_string()),
            valid: false,
            last_latency_ms: None,
        };
        assert_eq!(stream.validated_url(), None);
        stream.valid = true;
        assert_eq!(stream.validated_url(), Some("https://twitch.tv/kids"));
    }

    #[test]
    fn prepend_puts_newest_first() {
        let mut state = DashboardState::new(5);
        state.prepend_history(record("a"));
        state.prepend_history(record("b"));
        assert_eq!(state.history[0].id.as_deref(), Some("b"));
        assert_eq!(state.history[1].id.as_deref(), Some("a"));
        assert!(!state.page.history.contains(render::HISTORY_EMPTY));
    }

    #[test]
    fn history_respects_limit() {
        let mut state = DashboardState::new(5);
        for i in 0..(HISTORY_LIMIT + 5) {
            state.prepend_history(record(&i.to_string()));
        }
        assert_eq!(state.history.len(), HISTORY_LIMIT);
        assert_eq!(
            state.history[0].id.as_deref(),
            Some((HISTORY_LIMIT + 4).to_string().as_str())
        );
    }

    #[test]
    fn clear_then_load_replaces_placeholder() {
        let mut state = DashboardState::new(5);
        state.prepend_history(record("a"));
        state.clear_history();
        assert!(state.history.is_empty());
        assert!(state.page.history.contains(render::HISTORY_EMPTY));

        state.set_history(vec![record("b")]);
        assert!(!state.page.history.contains(render::HISTORY_EMPTY));
        assert!(state.page.history.contains("condition b"));
    }

    #[test]
    fn stop_all_enabled_tracks_running_jobs() {
        let mut state = DashboardState::new(5);
        state.set_jobs(vec![job("j1", JobStatus::Stopped), job("j2", JobStatus::Running)]);
        assert!(state.page.stop_all_enabled);

        state.set_jobs(vec![job("j1", JobStatus::Stopped)]);
        assert!(!state.page.stop_all_enabled);
    }

    #[test]
    fn reset_events_keeps_alert_markers() {
        let mut state = DashboardState::new(5);
        state.relay_seen.insert("e1");
        state.relay_alerted.insert("e1");
        state.page.events_placeholder = false;

        state.reset_events();

        assert!(state.relay_seen.is_empty());
        assert!(state.relay_alerted.contains("e1"));
        assert!(state.page.events_placeholder);
    }
}
