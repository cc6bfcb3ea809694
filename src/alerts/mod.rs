//! Alert engine: evaluates each active alert's typed condition per run and
//! dispatches at most one notification per satisfied check.

pub mod condition;
pub mod engine;
pub mod notify;

pub use condition::AlertCondition;
pub use engine::{process_alerts, AlertRunSummary};
pub use notify::{LogNotifier, Notification, Notifier, WebhookNotifier};
