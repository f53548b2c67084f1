//! Local web dashboard serving the rendered page regions
//!
//! GET routes serve the page and its JSON snapshot. POST routes run the user
//! actions against the live session, so every change lands in the same page
//! state the pollers and the digest write to. Actions raise their own toasts;
//! the JSON reply only carries the outcome for the caller.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::api::DangerLevel;
use crate::confirm::{AssumeNo, AssumeYes, Confirm};
use crate::context::Context;
use crate::digest::DigestStreamer;
use crate::jobs::MonitorController;
use crate::{check, events, history, render, stream, KidsGuardError};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub ctx: Context,
    pub controller: Arc<MonitorController>,
    pub digest: Arc<DigestStreamer>,
}

/// Build the dashboard axum router
pub fn build_router(dashboard: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/page", get(page_handler))
        .route("/api/toasts", get(toasts_handler))
        .route("/api/validate", post(validate_handler))
        .route("/api/check", post(check_handler))
        .route("/api/history/load", post(history_load_handler))
        .route("/api/history/clear", post(history_clear_handler))
        .route("/api/monitor/start", post(monitor_start_handler))
        .route("/api/monitor/stop-all", post(stop_all_handler))
        .route("/api/monitor/cancel", post(cancel_handler))
        .route("/api/events/refresh", post(events_refresh_handler))
        .route("/api/token/create", post(token_create_handler))
        .route("/api/digest/start", post(digest_start_handler))
        .route("/api/digest/close", post(digest_close_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard)
}

/// A failed action, answered as `{"success": false, "error": ...}`
#[derive(Debug)]
struct ActionError(KidsGuardError);

impl From<KidsGuardError> for ActionError {
    fn from(value: KidsGuardError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KidsGuardError::Validation(_) => StatusCode::BAD_REQUEST,
            KidsGuardError::Cancelled(_) => StatusCode::CONFLICT,
            KidsGuardError::Api(_) | KidsGuardError::Http(_) | KidsGuardError::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
            KidsGuardError::Config(_) | KidsGuardError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "success": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ActionResult = Result<Json<Value>, ActionError>;

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    #[serde(default)]
    stream_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckRequest {
    #[serde(default)]
    condition: String,
    #[serde(default)]
    preset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryLoadRequest {
    #[serde(default)]
    level: Option<DangerLevel>,
}

#[derive(Debug, Deserialize)]
struct ConfirmRequest {
    #[serde(default)]
    confirmed: bool,
}

impl ConfirmRequest {
    fn confirmer(&self) -> &'static dyn Confirm {
        if self.confirmed {
            &AssumeYes
        } else {
            &AssumeNo
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    #[serde(default)]
    condition: String,
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    #[serde(default)]
    job_id: String,
}

async fn validate_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<ValidateRequest>,
) -> ActionResult {
    let preview = stream::validate(&dashboard.ctx, &request.stream_url).await?;
    let embed_url = preview.embed_url(&dashboard.ctx.preview.embed_parent);
    Ok(Json(json!({ "success": true, "embed_url": embed_url })))
}

async fn check_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<CheckRequest>,
) -> ActionResult {
    let result = match request.preset.as_deref().filter(|p| !p.is_empty()) {
        Some(preset) => check::run_preset(&dashboard.ctx, preset).await?,
        None => check::run_check(&dashboard.ctx, &request.condition).await?,
    };
    Ok(Json(json!({ "success": true, "result": result })))
}

async fn history_load_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<HistoryLoadRequest>,
) -> ActionResult {
    let records = history::load(&dashboard.ctx, request.level).await?;
    Ok(Json(json!({ "success": true, "count": records.len() })))
}

async fn history_clear_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<ConfirmRequest>,
) -> ActionResult {
    history::clear(&dashboard.ctx, request.confirmer()).await?;
    Ok(Json(json!({ "success": true })))
}

async fn monitor_start_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<StartRequest>,
) -> ActionResult {
    let started = dashboard.controller.start(&request.condition).await?;
    Ok(Json(json!({ "success": true, "job_id": started.job_id })))
}

async fn stop_all_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<ConfirmRequest>,
) -> ActionResult {
    let stopped = dashboard.controller.stop_all(request.confirmer()).await?;
    Ok(Json(json!({ "success": true, "stopped": stopped })))
}

async fn cancel_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<CancelRequest>,
) -> ActionResult {
    dashboard.controller.cancel(&request.job_id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn events_refresh_handler(State(dashboard): State<DashboardState>) -> Json<Value> {
    // feed errors stay silent, like every other relay poll
    match events::refresh_events(&dashboard.ctx).await {
        Some(outcome) => Json(json!({
            "success": true,
            "rendered": outcome.rendered,
            "alerted": outcome.alerted,
        })),
        None => Json(json!({ "success": true, "rendered": false, "alerted": 0 })),
    }
}

async fn token_create_handler(State(dashboard): State<DashboardState>) -> ActionResult {
    let token = events::create_token(&dashboard.ctx).await?;
    Ok(Json(json!({ "success": true, "token": token })))
}

async fn digest_start_handler(State(dashboard): State<DashboardState>) -> ActionResult {
    let generation = dashboard.digest.start().await?;
    Ok(Json(json!({ "success": true, "generation": generation })))
}

async fn digest_close_handler(State(dashboard): State<DashboardState>) -> Json<Value> {
    let closed = dashboard.digest.close().await;
    Json(json!({ "success": true, "closed": closed }))
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let (page, presets) = {
        let state = dashboard.ctx.state.read().await;
        (
            state.snapshot(Instant::now()),
            render::render_preset_buttons(&state.presets),
        )
    };
    let monitoring = if page.monitoring {
        "Monitoring active"
    } else {
        "Monitoring idle"
    };
    let stop_all_disabled = if page.stop_all_enabled { "" } else { " disabled" };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>KidsGuard</title>
    <script>
        function refreshPage() {{
            fetch('/api/page')
                .then(r => r.json())
                .then(page => {{
                    for (const region of ['stream_status', 'preview', 'latest_result', 'history',
                                          'jobs', 'job_banner', 'events', 'toasts']) {{
                        const el = document.getElementById(region);
                        if (el && el.dataset.html !== page[region]) {{
                            el.innerHTML = page[region];
                            el.dataset.html = page[region];
                        }}
                    }}
                    document.getElementById('check_count').textContent = page.check_count;
                    document.getElementById('monitoring').textContent =
                        page.monitoring ? 'Monitoring active' : 'Monitoring idle';
                    document.getElementById('stop_all').disabled = !page.stop_all_enabled;
                    const log = document.getElementById('digest_log');
                    if (log.dataset.html !== page.digest_log) {{
                        log.innerHTML = page.digest_log;
                        log.dataset.html = page.digest_log;
                        log.scrollTop = log.scrollHeight;
                    }}
                }});
        }}
        function value(id) {{
            return document.getElementById(id).value;
        }}
        function act(path, body) {{
            fetch(path, {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify(body || {{}})
            }}).then(refreshPage);
            return false;
        }}
        setInterval(refreshPage, 2000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>KidsGuard</h1>
    <div id="toasts" style="position: fixed; top: 1rem; right: 1rem; width: 320px; z-index: 10;">{toasts}</div>

    <h2>Stream</h2>
    <form onsubmit="return act('/api/validate', {{ stream_url: value('stream_url') }})">
        <input id="stream_url" type="text" placeholder="https://www.youtube.com/watch?v=..." style="width: 60%;">
        <button type="submit">Validate</button>
    </form>
    <div id="stream_status">{stream_status}</div>
    <div id="preview" style="margin-top: 0.5rem;">{preview}</div>

    <h2>Safety check</h2>
    <div id="presets" onclick="if (event.target.dataset.preset) act('/api/check', {{ preset: event.target.dataset.preset }})">{presets}</div>
    <form onsubmit="return act('/api/check', {{ condition: value('condition') }})">
        <input id="condition" type="text" placeholder="Is the child near the pool?" style="width: 60%;">
        <button type="submit">Check now</button>
    </form>
    <p>Checks run: <strong id="check_count">{check_count}</strong></p>
    <div id="latest_result">{latest_result}</div>

    <h2>Monitoring</h2>
    <form onsubmit="return act('/api/monitor/start', {{ condition: value('monitor_condition') }})">
        <input id="monitor_condition" type="text" placeholder="Alert me if..." style="width: 60%;">
        <button type="submit">Start monitoring</button>
    </form>
    <p>
        <button type="button" id="stop_all"{stop_all_disabled}
            onclick="if (confirm('Stop all running monitoring jobs?')) act('/api/monitor/stop-all', {{ confirmed: true }})">Stop all</button>
        <input id="cancel_job" type="text" placeholder="job id">
        <button type="button" onclick="act('/api/monitor/cancel', {{ job_id: value('cancel_job') }})">Cancel job</button>
    </p>
    <p id="monitoring">{monitoring}</p>
    <div id="job_banner">{job_banner}</div>
    <div id="jobs">{jobs}</div>

    <h2>Webhook events</h2>
    <p>
        <button type="button" onclick="act('/api/events/refresh')">Refresh events</button>
        <button type="button" onclick="act('/api/token/create')">New relay token</button>
    </p>
    <div id="events">{events}</div>

    <h2>Live digest</h2>
    <p>
        <button type="button" onclick="act('/api/digest/start')">Start digest</button>
        <button type="button" onclick="act('/api/digest/close')">Close digest</button>
    </p>
    <div id="digest_log" style="max-height: 240px; overflow-y: auto; font-family: monospace; font-size: 0.9em; background-color: #f8f9fa; padding: 0.5rem;">{digest_log}</div>

    <h2>Alert history</h2>
    <p>
        <select id="level">
            <option value="">All levels</option>
            <option value="high">High</option>
            <option value="medium">Medium</option>
            <option value="safe">Safe</option>
        </select>
        <button type="button" onclick="act('/api/history/load', {{ level: value('level') || null }})">Load</button>
        <button type="button" onclick="if (confirm('Clear all alert history?')) act('/api/history/clear', {{ confirmed: true }})">Clear history</button>
    </p>
    <div id="history">{history}</div>
    <script>
        const log = document.getElementById('digest_log');
        log.scrollTop = log.scrollHeight;
    </script>
</body>
</html>"#,
        toasts = page.toasts,
        stream_status = page.stream_status,
        preview = page.preview,
        presets = presets,
        check_count = page.check_count,
        latest_result = page.latest_result,
        stop_all_disabled = stop_all_disabled,
        monitoring = monitoring,
        job_banner = page.job_banner,
        jobs = page.jobs,
        events = page.events,
        digest_log = page.digest_log,
        history = page.history,
    );

    Html(html)
}

async fn page_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let page = dashboard.ctx.state.read().await.snapshot(Instant::now());
    Json(page)
}

async fn toasts_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let toasts = dashboard
        .ctx
        .state
        .read()
        .await
        .page
        .toasts
        .active(Instant::now());
    Json(toasts)
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
