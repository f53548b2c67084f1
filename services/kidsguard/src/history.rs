//! Alert history: load, prepend, export and clear

use std::path::Path;

use crate::api::{DangerLevel, SafetyCheckResult};
use crate::confirm::Confirm;
use crate::context::Context;
use crate::toast::Toast;
use crate::KidsGuardError;

/// Default file name of an exported history
pub const EXPORT_FILE_NAME: &str = "kidsguard_alerts.json";

/// Records whose level equals `level`; everything when `level` is `None`
pub fn filter_by_level(
    records: Vec<SafetyCheckResult>,
    level: Option<DangerLevel>,
) -> Vec<SafetyCheckResult> {
    match level {
        Some(level) => records
            .into_iter()
            .filter(|r| r.danger_level == level)
            .collect(),
        None => records,
    }
}

/// Fetch the history from the backend and replace the list and table
pub async fn load(
    ctx: &Context,
    level: Option<DangerLevel>,
) -> crate::Result<Vec<SafetyCheckResult>> {
    let records = match ctx.backend.alerts(level).await {
        Ok(records) => filter_by_level(records, level),
        Err(e) => {
            tracing::warn!("Failed to load history: {}", e);
            ctx.notify(Toast::error("Could not load history", e.to_string()))
                .await;
            return Err(e);
        }
    };

    tracing::debug!("Loaded {} history records (level={:?})", records.len(), level);
    ctx.state.write().await.set_history(records.clone());
    Ok(records)
}

/// Put a freshly produced result at the front of the history
pub async fn prepend(ctx: &Context, record: SafetyCheckResult) {
    ctx.state.write().await.prepend_history(record);
}

/// Download the backend-served export into `path`
pub async fn export(ctx: &Context, path: &Path) -> crate::Result<usize> {
    let body = match ctx.backend.export_alerts().await {
        Ok(body) => body,
        Err(e) => {
            ctx.notify(Toast::error("Export failed", e.to_string())).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::write(path, body.as_bytes()).await {
        tracing::warn!("Failed to write export to {:?}: {}", path, e);
        ctx.notify(Toast::error(
            "Export failed",
            format!("Could not write {}: {}", path.display(), e),
        ))
        .await;
        return Err(e.into());
    }
    tracing::info!("Exported history to {:?} ({} bytes)", path, body.len());
    ctx.notify(Toast::success(
        "History exported",
        format!("Saved to {}", path.display()),
    ))
    .await;
    Ok(body.len())
}

/// Clear the history on the backend after the user confirms
pub async fn clear(ctx: &Context, confirm: &dyn Confirm) -> crate::Result<()> {
    if !confirm.confirm("Clear all alert history?") {
        tracing::debug!("History clear declined");
        return Err(KidsGuardError::Cancelled("history clear".to_string()));
    }

    if let Err(e) = ctx.backend.clear_alerts().await {
        tracing::warn!("Failed to clear history: {}", e);
        ctx.notify(Toast::error("Could not clear history", e.to_string()))
            .await;
        return Err(e);
    }

    ctx.state.write().await.clear_history();
    ctx.notify(Toast::info("History cleared", "")).await;
    Ok(())
}
