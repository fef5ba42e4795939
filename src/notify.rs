//! User-facing notification capability.
//!
//! The client raises a notification when something needs the user's
//! attention, such as a denied consent prompt. Hosts plug in their own toast
//! or tray implementation; [`TracingNotifier`] just logs.

/// How urgent a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Shows a transient, non-blocking notification to the user.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, title: &str, body: &str, severity: Severity);
}

/// A [`Notifier`] that writes notifications to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, body: &str, severity: Severity) {
        match severity {
            Severity::Info => tracing::info!(title, "{body}"),
            Severity::Warning => tracing::warn!(title, "{body}"),
            Severity::Error => tracing::error!(title, "{body}"),
        }
    }
}
