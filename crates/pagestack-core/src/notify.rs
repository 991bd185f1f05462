//! Transient user-facing notifications
//!
//! The session queues messages; the page layer drains, shows and dismisses
//! them after `duration_ms`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub duration_ms: u32,
}

/// FIFO of pending notifications with a fixed display duration
#[derive(Debug, Default)]
pub struct Notifier {
    pending: Vec<Notification>,
    duration_ms: u32,
}

impl Notifier {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            pending: Vec::new(),
            duration_ms,
        }
    }

    pub fn push(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.pending.push(Notification {
            level,
            message: message.into(),
            duration_ms: self.duration_ms,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NotificationLevel::Error, message);
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    /// Take every queued notification, oldest first
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
