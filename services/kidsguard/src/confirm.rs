//! User confirmation for destructive actions

/// Asks the user to confirm an action
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Confirms everything, for `--yes` style invocations
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-confirmed: {}", prompt);
        true
    }
}

/// Declines everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-declined: {}", prompt);
        false
    }
}
