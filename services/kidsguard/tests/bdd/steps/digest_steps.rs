//! BDD step definitions for the live digest

use std::time::Duration;

use cucumber::{given, then, when};

use kidsguard::digest::{CloseReason, DigestPhase};

use crate::world::KidsGuardWorld;

#[given(expr = "the digest stream sends {string}")]
fn digest_stream_sends(world: &mut KidsGuardWorld, line: String) {
    world.backend.push_stream_line(&line);
}

#[when("I run the digest to completion")]
async fn run_digest(world: &mut KidsGuardWorld) {
    let result = world.session().digest().start().await;
    world.record(result);
    tokio::time::timeout(Duration::from_secs(5), world.session().digest().wait())
        .await
        .expect("digest should finish once the stream is drained");
}

#[when("I start the digest")]
async fn start_digest(world: &mut KidsGuardWorld) {
    let result = world.session().digest().start().await;
    world.record(result);
}

#[then(expr = "the digest phase is closed because it was {string}")]
async fn digest_phase_closed(world: &mut KidsGuardWorld, reason: String) {
    let expected = match reason.as_str() {
        "stopped" => CloseReason::Stopped,
        "errored" => CloseReason::ServerError,
        "drained" => CloseReason::EndOfStream,
        other => panic!("unknown close reason {}", other),
    };
    assert_eq!(
        world.session().digest().phase().await,
        DigestPhase::Closed(expected)
    );
}

#[then("the digest is idle")]
async fn digest_idle(world: &mut KidsGuardWorld) {
    assert_eq!(world.session().digest().phase().await, DigestPhase::Idle);
}

#[then(expr = "the digest log has {int} line(s)")]
async fn digest_log_lines(world: &mut KidsGuardWorld, count: usize) {
    let state = world.session().context().state.read().await;
    assert_eq!(
        state.page.digest_log.len(),
        count,
        "digest log was: {:?}",
        state.page.digest_log
    );
}

#[then(expr = "the digest log contains {string}")]
async fn digest_log_contains(world: &mut KidsGuardWorld, text: String) {
    let state = world.session().context().state.read().await;
    assert!(
        state.page.digest_log.iter().any(|line| line.contains(&text)),
        "digest log was: {:?}",
        state.page.digest_log
    );
}

#[then("no digest connection was opened")]
fn no_digest_connection(world: &mut KidsGuardWorld) {
    assert!(world
        .backend
        .requests()
        .iter()
        .all(|r| r.method != "STREAM"));
}
