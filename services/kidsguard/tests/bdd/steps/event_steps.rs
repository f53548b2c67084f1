//! BDD step definitions for the relay event feed

use cucumber::{given, then, when};
use serde_json::json;

use kidsguard::events;
use kidsguard::render::EVENTS_EMPTY;

use crate::world::KidsGuardWorld;

#[given(expr = "the relay feed holds a triggered event {string} for {string}")]
fn relay_feed_triggered(world: &mut KidsGuardWorld, id: String, condition: String) {
    let feed = json!({
        "events": [
            {
                "id": id,
                "type": "alert",
                "triggered": true,
                "danger_level": "high",
                "explanation": "Child is holding a knife",
                "condition": condition,
                "timestamp": "2024-05-01T10:00:00Z",
            },
            {
                "id": "quiet-1",
                "type": "check",
                "triggered": false,
                "danger_level": "safe",
                "explanation": "Child is reading",
                "timestamp": "2024-05-01T09:59:00Z",
            }
        ],
        "total": 2
    });
    world
        .backend
        .route("GET", "/api/webhook-site/events", feed.to_string());
}

#[when(expr = "the relay feed is polled {int} time(s)")]
async fn poll_relay_times(world: &mut KidsGuardWorld, times: usize) {
    for _ in 0..times {
        events::poll_relay(world.session().context()).await;
    }
}

#[when("I refresh the events list")]
async fn refresh_events_list(world: &mut KidsGuardWorld) {
    events::refresh_events(world.session().context()).await;
}

#[then(expr = "the events list shows {string}")]
async fn events_list_shows(world: &mut KidsGuardWorld, text: String) {
    let page = world.session().context().state.read().await.page.events.clone();
    assert!(page.contains(&text), "events region was: {}", page);
}

#[then("the events list shows the waiting placeholder")]
async fn events_placeholder(world: &mut KidsGuardWorld) {
    let state = world.session().context().state.read().await;
    assert!(state.page.events_placeholder);
    assert!(state.page.events.contains(EVENTS_EMPTY));
}

#[then(expr = "the relay feed was requested {int} time(s)")]
fn relay_requested(world: &mut KidsGuardWorld, times: usize) {
    assert_eq!(
        world
            .backend
            .requests_to("GET", "/api/webhook-site/events")
            .len(),
        times
    );
}

#[then("no toast is shown")]
async fn no_toasts(world: &mut KidsGuardWorld) {
    let toasts = world.toasts().await;
    assert!(toasts.is_empty(), "toasts were: {:?}", toasts);
}
