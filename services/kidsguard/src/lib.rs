//! KidsGuard - dashboard client for the KidsGuard child-safety backend
//!
//! Validates live streams, runs one-shot safety checks, manages monitoring
//! jobs, polls webhook event feeds and follows the live digest, keeping a
//! rendered page in shared state that the local dashboard serves.

pub mod api;
pub mod backend;
pub mod check;
pub mod config;
pub mod confirm;
pub mod context;
pub mod dashboard;
pub mod digest;
pub mod error;
pub mod events;
pub mod history;
pub mod io;
pub mod jobs;
pub mod ledger;
pub mod notifier;
pub mod poller;
pub mod render;
pub mod state;
pub mod stream;
pub mod toast;

pub use config::{load_config, Config};
pub use error::{KidsGuardError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::context::Context;
use crate::dashboard::DashboardState;
use crate::digest::DigestStreamer;
use crate::events::{RelayPollTask, WebhookPollTask};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::jobs::{JobsPollTask, MonitorController};
use crate::notifier::{ConsoleNotifier, FanoutNotifier, Notifier, TrayNotifier};
use crate::poller::Poller;

/// Assembles a [`KidsGuard`] session from configuration and optional overrides
pub struct KidsGuardBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    notifiers: Option<Vec<Arc<dyn Notifier>>>,
}

impl KidsGuardBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            notifiers: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the console notifier; the page's toast tray is always kept
    pub fn with_notifiers(mut self, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    pub async fn build(self) -> Result<KidsGuard> {
        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(self.config.backend.request_timeout)?),
        };
        let backend = Arc::new(BackendClient::new(&self.config.backend.base_url, http));
        let state = state::new_state_handle(self.config.toasts.max_visible);

        let mut notifiers: Vec<Arc<dyn Notifier>> =
            vec![Arc::new(TrayNotifier::new(Arc::clone(&state)))];
        match self.notifiers {
            Some(extra) => notifiers.extend(extra),
            None => notifiers.push(Arc::new(ConsoleNotifier)),
        }
        tracing::debug!(
            "Toasts go to: {}",
            notifiers
                .iter()
                .map(|n| n.type_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let notifier: Arc<dyn Notifier> = Arc::new(FanoutNotifier::new(notifiers));

        let ctx = Context::new(backend, state, notifier, self.config.preview.clone());

        let polling = &self.config.polling;
        let relay = Arc::new(Poller::new(
            polling.relay_interval,
            RelayPollTask::new(ctx.clone()),
        ));
        let webhook = Arc::new(Poller::new(
            polling.webhook_interval,
            WebhookPollTask::new(ctx.clone()),
        ));
        let jobs = Arc::new(Poller::new(
            polling.jobs_interval,
            JobsPollTask::new(ctx.clone()),
        ));

        let controller = Arc::new(MonitorController::new(
            ctx.clone(),
            Arc::clone(&relay),
            Arc::clone(&webhook),
        ));
        let digest = Arc::new(DigestStreamer::new(ctx.clone()));

        tracing::debug!(
            "Built KidsGuard session against {}",
            self.config.backend.base_url
        );
        Ok(KidsGuard {
            config: self.config,
            ctx,
            relay,
            webhook,
            jobs,
            controller,
            digest,
            cancel: CancellationToken::new(),
        })
    }
}

/// One dashboard session: components, pollers and the digest connection
#[derive(Debug)]
pub struct KidsGuard {
    config: Config,
    ctx: Context,
    relay: Arc<Poller>,
    webhook: Arc<Poller>,
    jobs: Arc<Poller>,
    controller: Arc<MonitorController>,
    digest: Arc<DigestStreamer>,
    cancel: CancellationToken,
}

impl KidsGuard {
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn controller(&self) -> &MonitorController {
        &self.controller
    }

    pub fn digest(&self) -> &DigestStreamer {
        &self.digest
    }

    /// Cancelling the token ends [`KidsGuard::start`]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Dashboard router whose actions drive this session
    pub fn router(&self) -> Router {
        dashboard::build_router(DashboardState {
            ctx: self.ctx.clone(),
            controller: Arc::clone(&self.controller),
            digest: Arc::clone(&self.digest),
        })
    }

    /// Validate `stream_url`, optionally start monitoring `condition`, then
    /// serve the session until cancelled
    pub async fn watch(&self, stream_url: &str, condition: Option<&str>) -> Result<()> {
        stream::validate(&self.ctx, stream_url).await?;

        if let Err(e) = check::load_presets(&self.ctx).await {
            tracing::debug!("Initial preset load failed: {}", e);
        }
        if let Err(e) = history::load(&self.ctx, None).await {
            tracing::debug!("Initial history load failed: {}", e);
        }
        if let Err(e) = events::load_token(&self.ctx).await {
            tracing::debug!("No relay token yet: {}", e);
        }
        if let Some(condition) = condition {
            self.controller.start(condition).await?;
        }

        self.start().await
    }

    /// Serve the dashboard and refresh jobs until cancelled (or ctrl-c)
    pub async fn start(&self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for ctrl-c: {}", e),
            }
        });

        if self.config.dashboard.enabled {
            self.spawn_dashboard();
        }

        match jobs::refresh(&self.ctx).await {
            Ok(jobs) => {
                self.controller.resume(&jobs).await;
            }
            Err(e) => tracing::debug!("Initial job refresh failed: {}", e),
        }
        self.jobs.start();
        tracing::info!("KidsGuard session started");

        self.cancel.cancelled().await;

        self.jobs.stop();
        self.relay.stop();
        self.webhook.stop();
        self.digest.close().await;
        tracing::info!("KidsGuard session stopped");
        Ok(())
    }

    fn spawn_dashboard(&self) {
        let dashboard_port = self.config.dashboard.port;
        let router = self.router();
        let cancel_for_dashboard = self.cancel.clone();

        tokio::spawn(async move {
            let addr = SocketAddr::from(([127, 0, 0, 1], dashboard_port));
            tracing::info!("Dashboard listening on http://{}", addr);

            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind dashboard to port {}: {}. Continuing without dashboard.",
                        dashboard_port,
                        e
                    );
                    return;
                }
            };

            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_dashboard.cancelled().await;
                })
                .await
                .ok();

            tracing::debug!("Dashboard stopped");
        });
    }
}
