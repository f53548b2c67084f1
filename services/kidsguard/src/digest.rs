//! Live digest: a server-push stream of narrative summaries
//!
//! One digest connection exists at a time. Each start bumps the session's
//! `digest_generation`; a task only writes to the page while its generation is
//! current, so a superseded connection can never append to the log. Every
//! phase change goes through [`advance`], which is also the only place that
//! writes the closing line.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::DigestSummary;
use crate::context::Context;
use crate::render::escape_html;
use crate::state::DashboardState;
use crate::toast::Toast;
use crate::KidsGuardError;

/// Why a digest connection closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The server sent a `stopped` message
    Stopped,
    /// The server sent an `error` message
    ServerError,
    TransportError,
    EndOfStream,
    /// A newer digest request replaced this one
    Superseded,
    /// Closed locally by the user
    Cancelled,
}

impl CloseReason {
    fn describe(&self) -> &'static str {
        match self {
            CloseReason::Stopped => "stopped by server",
            CloseReason::ServerError => "server reported an error",
            CloseReason::TransportError => "connection lost",
            CloseReason::EndOfStream => "stream ended",
            CloseReason::Superseded => "replaced by a new digest",
            CloseReason::Cancelled => "closed",
        }
    }
}

/// Connection lifecycle: Idle -> Connecting -> Streaming -> Closed(reason)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestPhase {
    Idle,
    Connecting,
    Streaming,
    Closed(CloseReason),
}

/// Inputs of the phase machine
#[derive(Debug, Clone, Copy)]
pub enum Trigger<'a> {
    Connect,
    Opened,
    Received(&'a DigestEvent),
    TransportError,
    EndOfStream,
    Superseded,
    Cancelled,
}

impl DigestPhase {
    pub fn is_open(&self) -> bool {
        matches!(self, DigestPhase::Connecting | DigestPhase::Streaming)
    }

    pub fn on(self, trigger: Trigger<'_>) -> DigestPhase {
        if let Trigger::Connect = trigger {
            return DigestPhase::Connecting;
        }
        if !self.is_open() {
            return self;
        }
        match trigger {
            Trigger::Connect => DigestPhase::Connecting,
            Trigger::Opened => DigestPhase::Streaming,
            Trigger::Received(DigestEvent::Message(DigestMessage::Error { .. })) => {
                DigestPhase::Closed(CloseReason::ServerError)
            }
            Trigger::Received(DigestEvent::Message(DigestMessage::Stopped { .. })) => {
                DigestPhase::Closed(CloseReason::Stopped)
            }
            Trigger::Received(_) => DigestPhase::Streaming,
            Trigger::TransportError => DigestPhase::Closed(CloseReason::TransportError),
            Trigger::EndOfStream => DigestPhase::Closed(CloseReason::EndOfStream),
            Trigger::Superseded => DigestPhase::Closed(CloseReason::Superseded),
            Trigger::Cancelled => DigestPhase::Closed(CloseReason::Cancelled),
        }
    }
}

/// JSON envelope carried on a `data:` line, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DigestMessage {
    Summary {
        #[serde(default)]
        summary: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Progress {
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Started {
        #[serde(default)]
        job_id: Option<String>,
    },
    Stopped {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// One parsed `data:` line
#[derive(Debug, Clone, PartialEq)]
pub enum DigestEvent {
    Message(DigestMessage),
    /// Non-JSON data or an unknown `type`, kept as raw text
    Unrecognized(String),
}

impl DigestEvent {
    fn kind(&self) -> &'static str {
        match self {
            DigestEvent::Message(DigestMessage::Summary { .. }) => "summary",
            DigestEvent::Message(DigestMessage::Progress { .. }) => "progress",
            DigestEvent::Message(DigestMessage::Error { .. }) => "error",
            DigestEvent::Message(DigestMessage::Started { .. }) => "started",
            DigestEvent::Message(DigestMessage::Stopped { .. }) => "stopped",
            DigestEvent::Unrecognized(_) => "raw",
        }
    }

    fn text(&self) -> String {
        match self {
            DigestEvent::Message(DigestMessage::Summary { summary, .. }) => summary.clone(),
            DigestEvent::Message(DigestMessage::Progress { message }) => message.clone(),
            DigestEvent::Message(DigestMessage::Error { message }) => {
                format!("Error: {}", message)
            }
            DigestEvent::Message(DigestMessage::Started { job_id }) => match job_id {
                Some(id) => format!("Digest started (job {})", id),
                None => "Digest started".to_string(),
            },
            DigestEvent::Message(DigestMessage::Stopped { reason }) => match reason {
                Some(reason) => format!("Digest stopped: {}", reason),
                None => "Digest stopped".to_string(),
            },
            DigestEvent::Unrecognized(raw) => raw.clone(),
        }
    }
}

/// Parse one line of the event stream; only `data:` lines carry events
pub fn parse_line(line: &str) -> Option<DigestEvent> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str::<DigestMessage>(data) {
        Ok(message) => Some(DigestEvent::Message(message)),
        Err(_) => Some(DigestEvent::Unrecognized(data.to_string())),
    }
}

/// One escaped, timestamped log line
pub fn format_line(kind: &str, text: &str, at: DateTime<Utc>) -> String {
    format!(
        r#"<div class="digest-line digest-{}"><span class="digest-time">{}</span> {}</div>"#,
        kind,
        at.format("%H:%M:%S"),
        escape_html(text)
    )
}

/// Apply `trigger` to the page if `generation` is still current.
///
/// Returns the new phase, or `None` for a stale generation. A transition from
/// an open phase into `Closed` appends the closing line.
pub fn advance(
    state: &mut DashboardState,
    generation: u64,
    trigger: Trigger<'_>,
) -> Option<DigestPhase> {
    if state.digest_generation != generation {
        return None;
    }

    let before = state.page.digest_phase;
    let after = before.on(trigger);
    state.page.digest_phase = after;

    if let Trigger::Received(event) = trigger {
        if before.is_open() {
            let text = event.text();
            tracing::info!("Digest {}: {}", event.kind(), text);
            state
                .page
                .digest_log
                .push(format_line(event.kind(), &text, Utc::now()));
        }
    }

    if before.is_open() {
        if let DigestPhase::Closed(reason) = after {
            tracing::info!("Digest #{} closed: {:?}", generation, reason);
            state.page.digest_log.push(format_line(
                "closed",
                &format!("Digest {}", reason.describe()),
                Utc::now(),
            ));
        }
    }
    Some(after)
}

struct DigestSession {
    generation: u64,
    cancel: CancellationToken,
    done: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the single digest connection of the session
pub struct DigestStreamer {
    ctx: Context,
    current: Mutex<Option<DigestSession>>,
}

impl std::fmt::Debug for DigestStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestStreamer").finish_non_exhaustive()
    }
}

impl DigestStreamer {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            current: Mutex::new(None),
        }
    }

    /// Open a digest for the validated stream, superseding any open one.
    /// Returns the generation of the new connection.
    pub async fn start(&self) -> crate::Result<u64> {
        let Some(stream_url) = self.ctx.stream_url().await else {
            self.ctx
                .notify(Toast::warning(
                    "No stream",
                    "Validate a stream URL before starting a digest",
                ))
                .await;
            return Err(KidsGuardError::Validation(
                "a validated stream URL is required".to_string(),
            ));
        };

        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.cancel.cancel();
            if let Err(e) = previous.handle.await {
                tracing::debug!("Digest #{} task ended abnormally: {}", previous.generation, e);
            }
            let mut state = self.ctx.state.write().await;
            advance(&mut state, previous.generation, Trigger::Superseded);
        }

        let generation = {
            let mut state = self.ctx.state.write().await;
            state.digest_generation += 1;
            let generation = state.digest_generation;
            advance(&mut state, generation, Trigger::Connect);
            generation
        };

        tracing::info!("Opening digest #{} for {}", generation, stream_url);
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let handle = tokio::spawn(run_digest(
            self.ctx.clone(),
            stream_url,
            generation,
            cancel.clone(),
            done.clone(),
        ));
        *current = Some(DigestSession {
            generation,
            cancel,
            done,
            handle,
        });
        Ok(generation)
    }

    /// Close the open digest, if any. Returns false when nothing was open.
    pub async fn close(&self) -> bool {
        let Some(session) = self.current.lock().await.take() else {
            return false;
        };
        session.cancel.cancel();
        if let Err(e) = session.handle.await {
            tracing::debug!("Digest #{} task ended abnormally: {}", session.generation, e);
        }
        let mut state = self.ctx.state.write().await;
        matches!(
            advance(&mut state, session.generation, Trigger::Cancelled),
            Some(DigestPhase::Closed(CloseReason::Cancelled))
        )
    }

    /// Wait until the current connection finishes on its own or is closed
    pub async fn wait(&self) {
        let done = self.current.lock().await.as_ref().map(|s| s.done.clone());
        if let Some(done) = done {
            done.cancelled().await;
        }
    }

    pub async fn phase(&self) -> DigestPhase {
        self.ctx.state.read().await.page.digest_phase
    }
}

async fn run_digest(
    ctx: Context,
    stream_url: String,
    generation: u64,
    cancel: CancellationToken,
    done: CancellationToken,
) {
    let _done = done.drop_guard();

    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = ctx.backend.open_digest(&stream_url) => opened,
    };
    let mut lines = match opened {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!("Digest #{} failed to open: {}", generation, e);
            let current = {
                let mut state = ctx.state.write().await;
                advance(&mut state, generation, Trigger::TransportError).is_some()
            };
            if current {
                ctx.notify(Toast::error("Digest failed", e.to_string())).await;
            }
            return;
        }
    };

    {
        let mut state = ctx.state.write().await;
        if advance(&mut state, generation, Trigger::Opened).is_none() {
            return;
        }
    }
    tracing::debug!("Digest #{} streaming", generation);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = lines.next() => next,
        };

        let (trigger_event, failure) = match next {
            None => (None, None),
            Some(Err(e)) => (None, Some(e)),
            Some(Ok(line)) => match parse_line(&line) {
                Some(event) => (Some(event), None),
                None => continue,
            },
        };

        let phase = {
            let mut state = ctx.state.write().await;
            let trigger = match (&trigger_event, &failure) {
                (Some(event), _) => Trigger::Received(event),
                (None, Some(_)) => Trigger::TransportError,
                (None, None) => Trigger::EndOfStream,
            };
            advance(&mut state, generation, trigger)
        };

        let Some(phase) = phase else {
            tracing::debug!("Digest #{} superseded, dropping stream", generation);
            return;
        };

        match (phase, trigger_event, failure) {
            (DigestPhase::Closed(CloseReason::ServerError), Some(event), _) => {
                ctx.notify(Toast::error("Digest error", event.text())).await;
                return;
            }
            (DigestPhase::Closed(CloseReason::TransportError), _, Some(e)) => {
                ctx.notify(Toast::error("Digest connection lost", e.to_string()))
                    .await;
                return;
            }
            (DigestPhase::Closed(_), _, _) => return,
            _ => {}
        }
    }
}

/// Past digest summaries kept by the backend
pub async fn list_summaries(ctx: &Context) -> crate::Result<Vec<DigestSummary>> {
    match ctx.backend.digest_summaries().await {
        Ok(summaries) => {
            tracing::debug!("Loaded {} digest summaries", summaries.len());
            Ok(summaries)
        }
        Err(e) => {
            tracing::warn!("Failed to load digest summaries: {}", e);
            ctx.notify(Toast::error("Could not load digests", e.to_string()))
                .await;
            Err(e)
        }
    }
}
