//! BDD step definitions for stream validation and preview

use cucumber::{given, then, when};

use kidsguard::stream::{self, Preview};
use kidsguard::toast::ToastLevel;

use crate::world::KidsGuardWorld;

#[given("a running dashboard session")]
async fn running_session(world: &mut KidsGuardWorld) {
    world.start_session().await;
}

#[given("the backend reports streams as live")]
fn backend_accepts(world: &mut KidsGuardWorld) {
    world.backend.route(
        "POST",
        "/api/validate-stream",
        r#"{"valid": true, "message": "Stream is live"}"#,
    );
}

#[given(expr = "the backend rejects streams with {string} and remediation {string}")]
fn backend_rejects(world: &mut KidsGuardWorld, message: String, remediation: String) {
    let body = serde_json::json!({
        "valid": false,
        "message": message,
        "remediation": remediation,
    });
    world
        .backend
        .route("POST", "/api/validate-stream", body.to_string());
}

#[when(expr = "I validate the stream {string}")]
async fn validate_stream(world: &mut KidsGuardWorld, url: String) {
    let result = stream::validate(world.session().context(), &url).await;
    world.preview = world.record(result);
}

#[then(expr = "the preview is a YouTube embed of {string}")]
async fn preview_is_youtube(world: &mut KidsGuardWorld, video_id: String) {
    assert_eq!(
        world.preview,
        Some(Preview::YouTube {
            video_id: video_id.clone()
        })
    );
    let page = world.session().context().state.read().await.page.preview.clone();
    assert!(
        page.contains(&format!("https://www.youtube.com/embed/{}", video_id)),
        "preview region was: {}",
        page
    );
}

#[then(expr = "the preview is a Twitch embed of {string} with parent {string}")]
async fn preview_is_twitch(world: &mut KidsGuardWorld, channel: String, parent: String) {
    let preview = world.preview.clone().expect("stream should have validated");
    let embed = preview
        .embed_url(&parent)
        .expect("twitch streams should embed");
    assert!(embed.contains(&format!("channel={}", channel)), "{}", embed);
    assert!(embed.contains(&format!("parent={}", parent)), "{}", embed);

    let page = world.session().context().state.read().await.page.preview.clone();
    assert!(page.contains("<iframe"), "preview region was: {}", page);
}

#[then("the preview shows a placeholder without an embedded player")]
async fn preview_placeholder(world: &mut KidsGuardWorld) {
    let preview = world.preview.clone().expect("stream should have validated");
    assert!(preview.embed_url("localhost").is_none());

    let page = world.session().context().state.read().await.page.preview.clone();
    assert!(!page.is_empty());
    assert!(!page.contains("<iframe"), "preview region was: {}", page);
}

#[then(expr = "the stream status shows {string}")]
async fn stream_status_shows(world: &mut KidsGuardWorld, text: String) {
    let status = world
        .session()
        .context()
        .state
        .read()
        .await
        .page
        .stream_status
        .clone();
    assert!(status.contains(&text), "stream status was: {}", status);
}

#[then("no stream is validated")]
async fn no_validated_stream(world: &mut KidsGuardWorld) {
    assert!(world.last_error.is_some());
    assert!(world.session().context().stream_url().await.is_none());
    let page = world.session().context().state.read().await.page.preview.clone();
    assert!(page.is_empty());
}

#[then(expr = "a/an {string} toast titled {string} is shown")]
async fn toast_shown(world: &mut KidsGuardWorld, level: String, title: String) {
    let toasts = world.toasts().await;
    assert!(
        toasts
            .iter()
            .any(|t| t.level.to_string() == level && t.title == title),
        "toasts were: {:?}",
        toasts
    );
}

#[then(expr = "{int} alert toast(s) is/are shown")]
async fn alert_toasts(world: &mut KidsGuardWorld, count: usize) {
    let alerts = world
        .toasts()
        .await
        .into_iter()
        .filter(|t| t.level == ToastLevel::Alert)
        .count();
    assert_eq!(alerts, count);
}
