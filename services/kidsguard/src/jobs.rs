//! Monitoring jobs: start, stop-all, cancel, refresh

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{MonitorJob, StartMonitorResponse};
use crate::confirm::Confirm;
use crate::context::Context;
use crate::poller::{PollTask, Poller};
use crate::render;
use crate::toast::Toast;
use crate::KidsGuardError;

/// Re-fetch the job list and re-render the jobs table
pub async fn refresh(ctx: &Context) -> crate::Result<Vec<MonitorJob>> {
    let list = ctx.backend.list_jobs().await?;
    tracing::debug!("Refreshed {} jobs", list.jobs.len());
    ctx.state.write().await.set_jobs(list.jobs.clone());
    Ok(list.jobs)
}

async fn refresh_after(ctx: &Context, action: &str) {
    if let Err(e) = refresh(ctx).await {
        tracing::debug!("Job refresh after {} failed: {}", action, e);
    }
}

/// Fetch one job by id
pub async fn detail(ctx: &Context, job_id: &str) -> crate::Result<MonitorJob> {
    match ctx.backend.job(job_id).await {
        Ok(job) => Ok(job),
        Err(e) => {
            ctx.notify(Toast::error("Could not load job", e.to_string()))
                .await;
            Err(e)
        }
    }
}

/// Refreshes the job list on a fixed period
#[derive(Debug)]
pub struct JobsPollTask {
    ctx: Context,
}

impl JobsPollTask {
    pub fn new(ctx: Context) -> Arc<Self> {
        Arc::new(Self { ctx })
    }
}

#[async_trait]
impl PollTask for JobsPollTask {
    fn name(&self) -> &str {
        "jobs"
    }

    async fn tick(&self) {
        refresh_after(&self.ctx, "tick").await;
    }
}

/// Starts and stops backend monitoring jobs together with the event pollers
#[derive(Debug)]
pub struct MonitorController {
    ctx: Context,
    relay: Arc<Poller>,
    webhook: Arc<Poller>,
}

impl MonitorController {
    pub fn new(ctx: Context, relay: Arc<Poller>, webhook: Arc<Poller>) -> Self {
        Self {
            ctx,
            relay,
            webhook,
        }
    }

    /// Start a monitoring job for `condition` on the validated stream
    pub async fn start(&self, condition: &str) -> crate::Result<StartMonitorResponse> {
        let condition = condition.trim();
        if condition.is_empty() {
            self.ctx
                .notify(Toast::warning(
                    "Missing condition",
                    "Describe what the monitor should watch for",
                ))
                .await;
            return Err(KidsGuardError::Validation(
                "condition is required".to_string(),
            ));
        }
        let Some(stream_url) = self.ctx.stream_url().await else {
            self.ctx
                .notify(Toast::warning(
                    "No stream",
                    "Validate a stream URL before starting a monitor",
                ))
                .await;
            return Err(KidsGuardError::Validation(
                "a validated stream URL is required".to_string(),
            ));
        };

        let webhook_url = self
            .ctx
            .state
            .read()
            .await
            .token
            .as_ref()
            .map(|t| t.url.clone());

        let started = match self
            .ctx
            .backend
            .start_monitor(&stream_url, condition, webhook_url.as_deref())
            .await
        {
            Ok(started) => started,
            Err(e) => {
                tracing::warn!("Failed to start monitor: {}", e);
                self.ctx
                    .notify(Toast::error("Could not start monitoring", e.to_string()))
                    .await;
                return Err(e);
            }
        };

        {
            let mut state = self.ctx.state.write().await;
            state.monitoring = true;
            state.page.job_banner = render::render_job_banner(&started.job_id);
            state.page.stop_all_enabled = true;
        }
        self.relay.start();
        self.webhook.start();

        tracing::info!("Monitoring job {} started on {}", started.job_id, stream_url);
        self.ctx
            .notify(Toast::success(
                "Monitoring started",
                format!("Job {}", started.job_id),
            ))
            .await;
        refresh_after(&self.ctx, "start").await;
        Ok(started)
    }

    /// Stop every running job after confirmation. Returns how many were stopped.
    pub async fn stop_all(&self, confirm: &dyn Confirm) -> crate::Result<usize> {
        if !confirm.confirm("Stop all running monitoring jobs?") {
            tracing::debug!("Stop-all declined");
            return Err(KidsGuardError::Cancelled("stop all jobs".to_string()));
        }

        let jobs = match self.ctx.backend.list_jobs().await {
            Ok(list) => list.jobs,
            Err(e) => {
                tracing::warn!("Failed to list jobs: {}", e);
                self.ctx
                    .notify(Toast::error("Could not list jobs", e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let mut stopped = 0;
        for job in jobs.iter().filter(|j| j.is_running()) {
            match self.ctx.backend.stop_monitor(&job.job_id).await {
                Ok(()) => {
                    tracing::info!("Stopped job {}", job.job_id);
                    stopped += 1;
                }
                Err(e) => tracing::warn!("Failed to stop job {}: {}", job.job_id, e),
            }
        }

        {
            let mut state = self.ctx.state.write().await;
            state.monitoring = false;
            state.page.job_banner.clear();
        }
        self.relay.stop();
        self.webhook.stop();

        self.ctx
            .notify(Toast::info(
                "Monitoring stopped",
                format!("Stopped {} job(s)", stopped),
            ))
            .await;
        refresh_after(&self.ctx, "stop-all").await;
        Ok(stopped)
    }

    /// Stop a single job by id
    pub async fn cancel(&self, job_id: &str) -> crate::Result<()> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            self.ctx
                .notify(Toast::warning("Missing job", "Pick a job to cancel"))
                .await;
            return Err(KidsGuardError::Validation("job id is required".to_string()));
        }

        if let Err(e) = self.ctx.backend.stop_monitor(job_id).await {
            tracing::warn!("Failed to cancel job {}: {}", job_id, e);
            self.ctx
                .notify(Toast::error("Could not cancel job", e.to_string()))
                .await;
            return Err(e);
        }

        tracing::info!("Cancelled job {}", job_id);
        self.ctx
            .notify(Toast::info("Job cancelled", job_id.to_string()))
            .await;
        refresh_after(&self.ctx, "cancel").await;
        Ok(())
    }

    /// Resume the event pollers when the backend already runs a job.
    /// Returns true if monitoring was resumed.
    pub async fn resume(&self, jobs: &[MonitorJob]) -> bool {
        let Some(running) = jobs.iter().find(|j| j.is_running()) else {
            return false;
        };
        {
            let mut state = self.ctx.state.write().await;
            state.monitoring = true;
            state.page.job_banner = render::render_job_banner(&running.job_id);
        }
        self.relay.start();
        self.webhook.start();
        tracing::info!("Resumed monitoring, job {} is running", running.job_id);
        true
    }

    pub fn pollers_running(&self) -> (bool, bool) {
        (self.relay.is_running(), self.webhook.is_running())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::backend::BackendClient;
    use crate::config::PreviewConfig;
    use crate::confirm::{AssumeNo, AssumeYes};
    use crate::events::{RelayPollTask, WebhookPollTask};
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::notifier::TrayNotifier;
    use crate::state::{new_state_handle, StreamSession};

    const JOBS: &str = r#"{"jobs": [
        {"job_id": "run-1", "status": "running", "job_type": "live-monitor"},
        {"job_id": "done-2", "status": "stopped", "job_type": "live-monitor"},
        {"job_id": "run-3", "status": "running", "job_type": "live-monitor"}
    ]}"#;

    async fn setup(mock: MockHttpClient, validated: bool) -> (Context, MonitorController) {
        let state = new_state_handle(10);
        if validated {
            state.write().await.stream = StreamSession {
                url: Some("https://twitch.tv/kids".to_string()),
                valid: true,
                last_latency_ms: None,
            };
        }
        let ctx = Context::new(
            Arc::new(BackendClient::new("http://backend", Arc::new(mock))),
            state.clone(),
            Arc::new(TrayNotifier::new(state)),
            PreviewConfig::default(),
        );
        let relay = Arc::new(Poller::new(
            Duration::from_secs(6),
            RelayPollTask::new(ctx.clone()),
        ));
        let webhook = Arc::new(Poller::new(
            Duration::from_secs(10),
            WebhookPollTask::new(ctx.clone()),
        ));
        let controller = MonitorController::new(ctx.clone(), relay, webhook);
        (ctx, controller)
    }

    fn ok(body: &'static str) -> crate::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn resume_starts_pollers_only_for_running_jobs() {
        let (ctx, controller) = setup(MockHttpClient::new(), false).await;
        let idle: crate::api::JobList = serde_json::from_str(
            r#"{"jobs": [{"job_id": "done-2", "status": "stopped"}]}"#,
        )
        .unwrap();
        assert!(!controller.resume(&idle.jobs).await);
        assert_eq!(controller.pollers_running(), (false, false));
        assert!(!ctx.state.read().await.monitoring);

        let busy: crate::api::JobList = serde_json::from_str(JOBS).unwrap();
        assert!(controller.resume(&busy.jobs).await);
        assert_eq!(controller.pollers_running(), (true, true));
        let state = ctx.state.read().await;
        assert!(state.monitoring);
        assert!(state.page.job_banner.contains("run-1"));
    }

    #[tokio::test]
    async fn start_requires_stream_and_condition() {
        let (_, controller) = setup(MockHttpClient::new(), false).await;
        let err = controller.start("Is a stranger present?").await.unwrap_err();
        assert!(matches!(err, KidsGuardError::Validation(_)));

        let (_, controller) = setup(MockHttpClient::new(), true).await;
        let err = controller.start(" ").await.unwrap_err();
        assert!(matches!(err, KidsGuardError::Validation(_)));
        assert_eq!(controller.pollers_running(), (false, false));
    }

    #[tokio::test]
    async fn start_passes_relay_url_and_activates_pollers() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| {
                url.ends_with("/api/monitor/start")
                    && body["webhook_url"] == "https://webhook.site/u-1"
                    && body["condition"] == "Is a stranger present?"
            })
            .times(1)
            .returning(|_, _| {
                Box::pin(async { ok(r#"{"job_id": "abcdef0123", "status": "running"}"#) })
            });
        mock.expect_get()
            .withf(|url| url.ends_with("/api/monitor/jobs"))
            .returning(|_| {
                Box::pin(async {
                    ok(r#"{"jobs": [{"job_id": "abcdef0123", "status": "running"}]}"#)
                })
            });
        let (ctx, controller) = setup(mock, true).await;
        ctx.state.write().await.token = Some(crate::api::WebhookSiteToken {
            uuid: "u-1".to_string(),
            url: "https://webhook.site/u-1".to_string(),
            view_url: None,
            created_at: None,
        });

        let started = controller.start("Is a stranger present?").await.unwrap();
        assert_eq!(started.job_id, "abcdef0123");
        assert_eq!(controller.pollers_running(), (true, true));

        let state = ctx.state.read().await;
        assert!(state.monitoring);
        assert!(state.page.stop_all_enabled);
        assert!(state.page.job_banner.contains("abcdef0123"));
        assert!(state.page.jobs.contains("abcdef01"));
    }

    #[tokio::test]
    async fn stop_all_stops_each_running_job_once() {
        let stopped = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockHttpClient::new();
        let mut list_calls = 0;
        mock.expect_get()
            .withf(|url| url.ends_with("/api/monitor/jobs"))
            .returning(move |_| {
                list_calls += 1;
                let body = if list_calls == 1 {
                    JOBS
                } else {
                    r#"{"jobs": [{"job_id": "run-1", "status": "stopped"}]}"#
                };
                Box::pin(async move { ok(body) })
            });
        let recorded = stopped.clone();
        mock.expect_post_json()
            .withf(|url, _| url.ends_with("/api/monitor/stop"))
            .times(2)
            .returning(move |_, body| {
                if let Some(id) = body["job_id"].as_str() {
                    recorded.lock().unwrap().push(id.to_string());
                }
                Box::pin(async { ok(r#"{"status": "stopped"}"#) })
            });
        let (ctx, controller) = setup(mock, true).await;
        ctx.state.write().await.monitoring = true;

        let count = controller.stop_all(&AssumeYes).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(*stopped.lock().unwrap(), vec!["run-1", "run-3"]);

        let state = ctx.state.read().await;
        assert!(!state.monitoring);
        assert!(!state.page.stop_all_enabled);
        assert_eq!(controller.pollers_running(), (false, false));
    }

    #[tokio::test]
    async fn declined_stop_all_does_nothing() {
        let (ctx, controller) = setup(MockHttpClient::new(), true).await;
        ctx.state.write().await.monitoring = true;

        let err = controller.stop_all(&AssumeNo).await.unwrap_err();
        assert!(matches!(err, KidsGuardError::Cancelled(_)));
        assert!(ctx.state.read().await.monitoring);
    }

    #[tokio::test]
    async fn cancel_stops_one_job_and_refreshes() {
        let mut mock = MockHttpClient::new();
        mock.expect_post_json()
            .withf(|url, body| url.ends_with("/api/monitor/stop") && body["job_id"] == "run-1")
            .times(1)
            .returning(|_, _| Box::pin(async { ok(r#"{"status": "stopped"}"#) }));
        mock.expect_get()
            .withf(|url| url.ends_with("/api/monitor/jobs"))
            .times(1)
            .returning(|_| Box::pin(async { ok(r#"{"jobs": []}"#) }));
        let (ctx, controller) = setup(mock, true).await;

        controller.cancel("run-1").await.unwrap();
        assert!(ctx
            .state
            .read()
            .await
            .page
            .jobs
            .contains(render::JOBS_EMPTY));
    }

    #[tokio::test]
    async fn detail_fetches_single_job() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("/api/monitor/job/run-1"))
            .returning(|_| {
                Box::pin(async {
                    ok(r#"{"job_id": "run-1", "status": "running",
                           "details": {"checks_performed": 4, "triggers_fired": 1}}"#)
                })
            });
        let (ctx, _) = setup(mock, true).await;

        let job = detail(&ctx, "run-1").await.unwrap();
        assert!(job.is_running());
        assert_eq!(job.details.checks_performed, 4);
    }
}
