//! BDD step definitions for the kidsguard client

pub mod digest_steps;
pub mod event_steps;
pub mod history_steps;
pub mod monitor_steps;
pub mod stream_steps;
