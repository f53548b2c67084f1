//! Webhook event pollers and relay token handling
//!
//! Two independent feeds report monitoring activity. The relay feed carries
//! full event records and drives the events list; the generic feed only
//! carries `watch_triggered` notices. Each feed alerts through its own dedup
//! set, so an event is alerted at most once per feed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{RelayEvent, WebhookEvent, WebhookSiteToken};
use crate::context::Context;
use crate::jobs;
use crate::poller::PollTask;
use crate::render;
use crate::toast::Toast;

/// What one relay poll changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayOutcome {
    pub rendered: bool,
    pub alerted: usize,
}

fn relay_alert(event: &RelayEvent) -> Toast {
    let condition = event.condition.as_deref().unwrap_or("Monitoring condition");
    Toast::alert(format!("ALERT: {}", condition), event.headline())
}

/// Apply one relay fetch to the session: re-render on news, alert once per id
pub async fn apply_relay_events(ctx: &Context, events: &[RelayEvent]) -> RelayOutcome {
    let (rendered, alerts) = {
        let mut state = ctx.state.write().await;

        let has_unseen = !state
            .relay_seen
            .unseen(events.iter().map(|e| e.id.as_str()))
            .is_empty();
        let rendered = !events.is_empty() && (has_unseen || state.page.events_placeholder);
        if rendered {
            state.page.events = render::render_relay_events(events);
            state.page.events_placeholder = false;
            for event in events {
                state.relay_seen.insert(&event.id);
            }
        }

        let mut alerts = Vec::new();
        for event in events.iter().filter(|e| e.triggered) {
            if state.relay_alerted.insert(&event.id) {
                alerts.push(relay_alert(event));
            }
        }
        (rendered, alerts)
    };

    let alerted = alerts.len();
    for toast in alerts {
        ctx.notify(toast).await;
    }
    if rendered || alerted > 0 {
        tracing::debug!(
            "Relay poll: {} events, rendered={}, alerted={}",
            events.len(),
            rendered,
            alerted
        );
    }
    RelayOutcome { rendered, alerted }
}

/// Apply one generic feed fetch: one toast per new `watch_triggered` event
pub async fn apply_webhook_events(ctx: &Context, events: &[WebhookEvent]) -> usize {
    let toasts: Vec<Toast> = {
        let mut state = ctx.state.write().await;
        events
            .iter()
            .filter(|e| e.event_type == WebhookEvent::WATCH_TRIGGERED)
            .filter(|e| state.webhook_shown.insert(&e.dedup_key()))
            .map(|e| {
                let title = match e.data.condition.as_deref() {
                    Some(c) if !c.is_empty() => format!("Watch triggered: {}", c),
                    _ => "Watch triggered".to_string(),
                };
                Toast::alert(title, e.data.explanation.clone())
            })
            .collect()
    };

    let count = toasts.len();
    for toast in toasts {
        ctx.notify(toast).await;
    }
    count
}

/// Fetch the relay feed once; errors are logged and swallowed
pub async fn poll_relay(ctx: &Context) -> Option<RelayOutcome> {
    match ctx.backend.relay_events().await {
        Ok(feed) => Some(apply_relay_events(ctx, &feed.events).await),
        Err(e) => {
            tracing::debug!("Relay poll failed: {}", e);
            None
        }
    }
}

/// Polls the relay feed
#[derive(Debug)]
pub struct RelayPollTask {
    ctx: Context,
}

impl RelayPollTask {
    pub fn new(ctx: Context) -> Arc<Self> {
        Arc::new(Self { ctx })
    }
}

#[async_trait]
impl PollTask for RelayPollTask {
    fn name(&self) -> &str {
        "relay"
    }

    async fn tick(&self) {
        poll_relay(&self.ctx).await;
    }
}

/// Polls the generic feed and refreshes the job list on every cycle
#[derive(Debug)]
pub struct WebhookPollTask {
    ctx: Context,
}

impl WebhookPollTask {
    pub fn new(ctx: Context) -> Arc<Self> {
        Arc::new(Self { ctx })
    }
}

#[async_trait]
impl PollTask for WebhookPollTask {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn tick(&self) {
        match self.ctx.backend.webhook_events().await {
            Ok(events) => {
                apply_webhook_events(&self.ctx, &events).await;
            }
            Err(e) => tracing::debug!("Webhook poll failed: {}", e),
        }
        if let Err(e) = jobs::refresh(&self.ctx).await {
            tracing::debug!("Job refresh from webhook poll failed: {}", e);
        }
    }
}

/// Load the existing relay token into the session
pub async fn load_token(ctx: &Context) -> crate::Result<WebhookSiteToken> {
    store_token(ctx, ctx.backend.relay_token().await, "Could not load relay token").await
}

/// Create a fresh relay token and mirror it into the session
pub async fn create_token(ctx: &Context) -> crate::Result<WebhookSiteToken> {
    let token = store_token(
        ctx,
        ctx.backend.create_relay_token().await,
        "Could not create relay token",
    )
    .await?;
    ctx.notify(Toast::success("Relay ready", token.url.clone()))
        .await;
    Ok(token)
}

async fn store_token(
    ctx: &Context,
    fetched: crate::Result<WebhookSiteToken>,
    failure_title: &str,
) -> crate::Result<WebhookSiteToken> {
    match fetched {
        Ok(token) => {
            tracing::info!("Relay token {} ({})", token.uuid, token.url);
            ctx.state.write().await.token = Some(token.clone());
            Ok(token)
        }
        Err(e) => {
            tracing::warn!("{}: {}", failure_title, e);
            ctx.notify(Toast::error(failure_title, e.to_string())).await;
            Err(e)
        }
    }
}

/// Forget rendered relay events, show the placeholder and poll once
pub async fn refresh_events(ctx: &Context) -> Option<RelayOutcome> {
    ctx.state.write().await.reset_events();
    poll_relay(ctx).await
}
