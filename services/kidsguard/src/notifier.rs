//! Notifier trait for surfacing toasts

use std::sync::Arc;

use async_trait::async_trait;

use crate::state::StateHandle;
use crate::toast::{Toast, ToastLevel};

/// Trait for showing a toast somewhere the user will see it
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "console")
    fn type_name(&self) -> &str;

    /// Show a toast
    async fn notify(&self, toast: &Toast);
}

/// Prints toasts to the terminal
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn type_name(&self) -> &str {
        "console"
    }

    async fn notify(&self, toast: &Toast) {
        let tag = match toast.level {
            ToastLevel::Info => "[info]",
            ToastLevel::Success => "[ok]",
            ToastLevel::Warning => "[warn]",
            ToastLevel::Error => "[error]",
            ToastLevel::Alert => "[ALERT]",
        };
        if toast.message.is_empty() {
            println!("{} {}", tag, toast.title);
        } else {
            println!("{} {}: {}", tag, toast.title, toast.message);
        }
    }
}

/// Places toasts in the page's toast tray
#[derive(Debug)]
pub struct TrayNotifier {
    state: StateHandle,
}

impl TrayNotifier {
    pub fn new(state: StateHandle) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Notifier for TrayNotifier {
    fn type_name(&self) -> &str {
        "tray"
    }

    async fn notify(&self, toast: &Toast) {
        let now = tokio::time::Instant::now();
        self.state.write().await.page.toasts.push(toast.clone(), now);
    }
}

/// Forwards every toast to each inner notifier in order
#[derive(Debug, Default)]
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    fn type_name(&self) -> &str {
        "fanout"
    }

    async fn notify(&self, toast: &Toast) {
        tracing::debug!("Toast [{}] {}", toast.level, toast.title);
        for notifier in &self.notifiers {
            notifier.notify(toast).await;
        }
    }
}
