//! BDD step definitions for the alert history

use cucumber::{gherkin::Step, given, then, when};
use serde_json::json;

use kidsguard::api::DangerLevel;
use kidsguard::confirm::{AssumeNo, AssumeYes};
use kidsguard::history;
use kidsguard::render::HISTORY_EMPTY;
use kidsguard::KidsGuardError;

use crate::world::KidsGuardWorld;

#[given("the backend stores these alerts:")]
fn backend_stores_alerts(world: &mut KidsGuardWorld, step: &Step) {
    let table = step.table.as_ref().expect("alerts table is required");
    let records: Vec<serde_json::Value> = table
        .rows
        .iter()
        .skip(1)
        .enumerate()
        .map(|(i, row)| {
            json!({
                "id": format!("a{}", i + 1),
                "condition": row[0],
                "danger_level": row[1],
                "triggered": row[2] == "yes",
                "explanation": format!("record {}", i + 1),
                "timestamp": "2024-05-01T10:00:00Z",
            })
        })
        .collect();
    world.backend.route(
        "GET",
        "/api/alerts",
        serde_json::Value::Array(records).to_string(),
    );
}

#[given("the backend accepts a history clear")]
fn backend_accepts_clear(world: &mut KidsGuardWorld) {
    world
        .backend
        .route("POST", "/api/alerts/clear", r#"{"success": true}"#);
}

#[when("I load the history")]
async fn load_history(world: &mut KidsGuardWorld) {
    let result = history::load(world.session().context(), None).await;
    world.record(result);
}

#[when(expr = "I load the history filtered to {string}")]
async fn load_filtered(world: &mut KidsGuardWorld, level: String) {
    let level: DangerLevel = level.parse().expect("known danger level");
    let result = history::load(world.session().context(), Some(level)).await;
    world.record(result);
}

#[when("I clear the history and confirm")]
async fn clear_confirmed(world: &mut KidsGuardWorld) {
    let result = history::clear(world.session().context(), &AssumeYes).await;
    world.record(result);
}

#[when("I clear the history and decline")]
async fn clear_declined(world: &mut KidsGuardWorld) {
    let result = history::clear(world.session().context(), &AssumeNo).await;
    world.record(result);
}

#[then(expr = "the history holds {int} record(s)")]
async fn history_holds(world: &mut KidsGuardWorld, count: usize) {
    let state = world.session().context().state.read().await;
    assert_eq!(state.history.len(), count);
}

#[then(expr = "every history record is {string}")]
async fn every_record_is(world: &mut KidsGuardWorld, level: String) {
    let level: DangerLevel = level.parse().expect("known danger level");
    let state = world.session().context().state.read().await;
    assert!(state.history.iter().all(|r| r.danger_level == level));
}

#[then("the history shows the empty state")]
async fn history_empty_state(world: &mut KidsGuardWorld) {
    let state = world.session().context().state.read().await;
    assert!(state.history.is_empty());
    assert!(state.page.history.contains(HISTORY_EMPTY));
}

#[then(expr = "the history table shows {string}")]
async fn history_table_shows(world: &mut KidsGuardWorld, text: String) {
    let state = world.session().context().state.read().await;
    assert!(
        state.page.history.contains(&text),
        "history region was: {}",
        state.page.history
    );
}

#[then("the operation is cancelled")]
fn operation_cancelled(world: &mut KidsGuardWorld) {
    assert!(
        matches!(world.last_error, Some(KidsGuardError::Cancelled(_))),
        "last error was: {:?}",
        world.last_error
    );
}

#[then(expr = "no {string} request reaches {string}")]
fn no_request(world: &mut KidsGuardWorld, method: String, path: String) {
    assert!(world.backend.requests_to(&method, &path).is_empty());
}
