//! User-facing feedback channel the controllers report outcomes to.

use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: Option<String>,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Renders notifications as log events, for headless consumers.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let title = notification.title.as_deref().unwrap_or_default();
        match notification.severity {
            Severity::Success | Severity::Info => {
                info!(title, "notify: {}", notification.message)
            }
            Severity::Warning | Severity::Error => {
                warn!(title, "notify: {}", notification.message)
            }
        }
    }
}

/// Fans notifications out to any number of view-layer subscribers.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    /// `capacity` is the number of notifications a slow subscriber may lag
    /// behind by; it is raised to at least one.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        // No subscribers is fine; the notification is simply dropped.
        let _ = self.tx.send(notification);
    }
}
