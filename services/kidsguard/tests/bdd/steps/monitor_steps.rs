//! BDD step definitions for monitoring jobs

use cucumber::{gherkin::Step, given, then, when};
use serde_json::json;

use kidsguard::confirm::{AssumeNo, AssumeYes};
use kidsguard::KidsGuardError;

use crate::world::KidsGuardWorld;

#[given("the backend lists these jobs:")]
fn backend_lists_jobs(world: &mut KidsGuardWorld, step: &Step) {
    let table = step.table.as_ref().expect("jobs table is required");
    let jobs: Vec<serde_json::Value> = table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            json!({
                "job_id": row[0],
                "status": row[1],
                "job_type": "live-monitor",
                "details": { "checks_performed": 3, "triggers_fired": 0 },
            })
        })
        .collect();
    let total = jobs.len();
    world.backend.route(
        "GET",
        "/api/monitor/jobs",
        json!({ "jobs": jobs, "total": total }).to_string(),
    );
}

#[given("the backend accepts job control requests")]
fn backend_accepts_job_control(world: &mut KidsGuardWorld) {
    world
        .backend
        .route("POST", "/api/monitor/stop", r#"{"success": true}"#);
}

#[given(expr = "the backend starts monitoring jobs as {string}")]
fn backend_starts_jobs(world: &mut KidsGuardWorld, job_id: String) {
    world.backend.route(
        "POST",
        "/api/monitor/start",
        json!({ "job_id": job_id, "status": "running" }).to_string(),
    );
}

#[when("I stop all jobs and confirm")]
async fn stop_all_confirmed(world: &mut KidsGuardWorld) {
    let result = world.session().controller().stop_all(&AssumeYes).await;
    world.stopped = world.record(result);
}

#[when("I stop all jobs and decline")]
async fn stop_all_declined(world: &mut KidsGuardWorld) {
    let result = world.session().controller().stop_all(&AssumeNo).await;
    world.stopped = world.record(result);
}

#[when(expr = "I start monitoring {string}")]
async fn start_monitoring(world: &mut KidsGuardWorld, condition: String) {
    let result = world.session().controller().start(&condition).await;
    world.record(result);
}

#[then(expr = "{int} job(s) is/are reported stopped")]
fn jobs_reported_stopped(world: &mut KidsGuardWorld, count: usize) {
    assert_eq!(world.stopped, Some(count));
}

#[then(expr = "stop requests were sent for {string} and {string}")]
fn stop_requests_for(world: &mut KidsGuardWorld, first: String, second: String) {
    let stopped: Vec<String> = world
        .backend
        .requests_to("POST", "/api/monitor/stop")
        .into_iter()
        .filter_map(|r| r.body)
        .filter_map(|b| b["job_id"].as_str().map(str::to_string))
        .collect();
    assert_eq!(stopped, vec![first, second]);
}

#[then("the start is rejected as invalid")]
fn start_rejected(world: &mut KidsGuardWorld) {
    assert!(
        matches!(world.last_error, Some(KidsGuardError::Validation(_))),
        "last error was: {:?}",
        world.last_error
    );
}

#[then("both event pollers are running")]
fn pollers_running(world: &mut KidsGuardWorld) {
    assert_eq!(world.session().controller().pollers_running(), (true, true));
}

#[then("no event poller is running")]
fn pollers_stopped(world: &mut KidsGuardWorld) {
    assert_eq!(
        world.session().controller().pollers_running(),
        (false, false)
    );
}

#[then(expr = "the job banner names {string}")]
async fn banner_names(world: &mut KidsGuardWorld, job_id: String) {
    let state = world.session().context().state.read().await;
    assert!(state.monitoring);
    assert!(
        state.page.job_banner.contains(&job_id),
        "banner was: {}",
        state.page.job_banner
    );
}

#[then("the job banner is hidden")]
async fn banner_hidden(world: &mut KidsGuardWorld) {
    let state = world.session().context().state.read().await;
    assert!(!state.monitoring);
    assert!(state.page.job_banner.is_empty());
}
