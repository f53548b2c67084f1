//! Transient on-screen messages with auto-dismiss deadlines

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::api::{DangerLevel, SafetyCheckResult};
use crate::render::escape_html;

/// Visual tier of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
    /// High-visibility danger alert
    Alert,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToastLevel::Info => write!(f, "info"),
            ToastLevel::Success => write!(f, "success"),
            ToastLevel::Warning => write!(f, "warning"),
            ToastLevel::Error => write!(f, "error"),
            ToastLevel::Alert => write!(f, "alert"),
        }
    }
}

/// A message to show to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl Toast {
    pub fn new(level: ToastLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        let duration = match level {
            ToastLevel::Info | ToastLevel::Success => Duration::from_secs(4),
            ToastLevel::Warning => Duration::from_secs(5),
            ToastLevel::Error => Duration::from_secs(6),
            ToastLevel::Alert => Duration::from_secs(10),
        };
        Self {
            level,
            title: title.into(),
            message: message.into(),
            duration,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Success, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, title, message)
    }

    pub fn alert(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Alert, title, message)
    }

    /// Severity-tiered toast for a completed safety check
    pub fn for_check(result: &SafetyCheckResult) -> Self {
        match result.danger_level {
            DangerLevel::High => Self::alert("DANGER DETECTED", result.explanation.clone()),
            DangerLevel::Medium => Self::warning("Caution", result.explanation.clone()),
            DangerLevel::Safe | DangerLevel::Info => {
                let message = if result.explanation.is_empty() {
                    "No danger detected".to_string()
                } else {
                    result.explanation.clone()
                };
                Self::success("All clear", message)
            }
        }
    }

    pub fn render(&self) -> String {
        let (color, bg) = match self.level {
            ToastLevel::Info => ("#0c5460", "#d1ecf1"),
            ToastLevel::Success => ("#155724", "#d4edda"),
            ToastLevel::Warning => ("#856404", "#fff3cd"),
            ToastLevel::Error => ("#721c24", "#f8d7da"),
            ToastLevel::Alert => ("#ffffff", "#dc3545"),
        };
        format!(
            r#"<div class="toast toast-{}" style="padding: 0.75rem; margin-bottom: 0.5rem; border-radius: 0.25rem; color: {}; background-color: {};"><strong>{}</strong> {}</div>"#,
            self.level,
            color,
            bg,
            escape_html(&self.title),
            escape_html(&self.message)
        )
    }
}

#[derive(Debug, Clone)]
struct ToastEntry {
    toast: Toast,
    expires_at: Instant,
}

/// Bounded list of visible toasts
#[derive(Debug, Clone)]
pub struct ToastTray {
    entries: VecDeque<ToastEntry>,
    max_visible: usize,
}

impl Default for ToastTray {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ToastTray {
    pub fn new(max_visible: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_visible),
            max_visible: max_visible.max(1),
        }
    }

    /// Show a toast; the oldest one is dropped when the tray is full
    pub fn push(&mut self, toast: Toast, now: Instant) {
        self.prune(now);
        if self.entries.len() >= self.max_visible {
            self.entries.pop_front();
        }
        let expires_at = now + toast.duration;
        self.entries.push_back(ToastEntry { toast, expires_at });
    }

    /// Dismiss every toast whose deadline has passed
    pub fn prune(&mut self, now: Instant) {
        self.entries.retain(|e| e.expires_at > now);
    }

    pub fn active(&self, now: Instant) -> Vec<Toast> {
        self.entries
            .iter()
            .filter(|e| e.expires_at > now)
            .map(|e| e.toast.clone())
            .collect()
    }

    pub fn render(&self, now: Instant) -> String {
        self.active(now).iter().map(Toast::render).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
