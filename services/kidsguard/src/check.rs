//! One-shot safety checks against the validated stream

use crate::api::{Preset, SafetyCheckResult};
use crate::context::Context;
use crate::history;
use crate::render;
use crate::toast::Toast;
use crate::KidsGuardError;

/// Fetch the preset list and cache it in the session
pub async fn load_presets(ctx: &Context) -> crate::Result<Vec<Preset>> {
    match ctx.backend.presets().await {
        Ok(presets) => {
            tracing::debug!("Loaded {} presets", presets.len());
            ctx.state.write().await.presets = presets.clone();
            Ok(presets)
        }
        Err(e) => {
            tracing::warn!("Failed to load presets: {}", e);
            ctx.notify(Toast::error("Could not load presets", e.to_string()))
                .await;
            Err(e)
        }
    }
}

/// Run the preset with the given id, loading presets first if needed
pub async fn run_preset(ctx: &Context, preset_id: &str) -> crate::Result<SafetyCheckResult> {
    let needs_load = ctx.state.read().await.presets.is_empty();
    if needs_load {
        load_presets(ctx).await?;
    }

    let condition = ctx
        .state
        .read()
        .await
        .presets
        .iter()
        .find(|p| p.id == preset_id)
        .map(|p| p.condition.clone());

    match condition {
        Some(condition) => run_check(ctx, &condition).await,
        None => {
            ctx.notify(Toast::warning(
                "Unknown preset",
                format!("No preset named '{}'", preset_id),
            ))
            .await;
            Err(KidsGuardError::Validation(format!(
                "unknown preset '{}'",
                preset_id
            )))
        }
    }
}

/// Evaluate `condition` once against the current stream
pub async fn run_check(ctx: &Context, condition: &str) -> crate::Result<SafetyCheckResult> {
    let condition = condition.trim();
    if condition.is_empty() {
        ctx.notify(Toast::warning(
            "Missing condition",
            "Pick a preset or describe what to check",
        ))
        .await;
        return Err(KidsGuardError::Validation(
            "condition is required".to_string(),
        ));
    }

    let Some(stream_url) = ctx.stream_url().await else {
        ctx.notify(Toast::warning(
            "No stream",
            "Validate a stream URL before running checks",
        ))
        .await;
        return Err(KidsGuardError::Validation(
            "a validated stream URL is required".to_string(),
        ));
    };

    tracing::debug!("Running check on {}: {}", stream_url, condition);
    let result = match ctx.backend.check(&stream_url, condition).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Safety check failed: {}", e);
            ctx.notify(Toast::error("Check failed", e.to_string())).await;
            return Err(e);
        }
    };

    {
        let mut state = ctx.state.write().await;
        state.check_count += 1;
        state.stream.last_latency_ms = Some(result.latency_ms);
        state.page.latest_result = render::render_check_result(&result);
    }
    history::prepend(ctx, result.clone()).await;

    tracing::info!(
        "Check complete: {} (triggered={}, {}ms)",
        result.danger_level,
        result.triggered,
        result.latency_ms
    );
    ctx.notify(Toast::for_check(&result)).await;
    Ok(result)
}
