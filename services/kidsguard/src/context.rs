//! Handles every component works through

use std::sync::Arc;

use crate::backend::BackendClient;
use crate::config::PreviewConfig;
use crate::notifier::Notifier;
use crate::state::StateHandle;
use crate::toast::Toast;

/// Backend client, session state and notifier of one dashboard session
#[derive(Debug, Clone)]
pub struct Context {
    pub backend: Arc<BackendClient>,
    pub state: StateHandle,
    pub notifier: Arc<dyn Notifier>,
    pub preview: PreviewConfig,
}

impl Context {
    pub fn new(
        backend: Arc<BackendClient>,
        state: StateHandle,
        notifier: Arc<dyn Notifier>,
        preview: PreviewConfig,
    ) -> Self {
        Self {
            backend,
            state,
            notifier,
            preview,
        }
    }

    pub async fn notify(&self, toast: Toast) {
        self.notifier.notify(&toast).await;
    }

    /// Validated stream URL of the session, if any
    pub async fn stream_url(&self) -> Option<String> {
        self.state
            .read()
            .await
            .stream
            .validated_url()
            .map(str::to_string)
    }
}
