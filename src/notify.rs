//! User-facing notifications.
//!
//! Fire-and-forget messages about session start, completion and failure.
//! The overlay that shows them lives outside this crate.

use std::sync::Mutex;
use tracing::{debug, info};

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sends notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "notification", "{}", message);
    }
}

/// Keeps notifications until an overlay drains them.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    messages: Mutex<Vec<String>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every pending notification, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|mut m| std::mem::take(&mut *m))
            .unwrap_or_default()
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, message: &str) {
        debug!(target: "notification", "{}", message);
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
