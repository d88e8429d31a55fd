//! User-facing error notifications.

use std::sync::{Arc, Mutex};

/// Receives the display message of every intercepted error.
pub trait Notifier {
    fn notify_error(&self, message: &str);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify_error(&self, message: &str) {
        (**self).notify_error(message)
    }
}

/// Emits notifications as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        tracing::error!(target: "pdfcase::notify", "{message}");
    }
}

/// Keeps every message, for UIs that drain a notification queue.
#[derive(Debug, Default)]
pub struct QueueNotifier {
    messages: Mutex<Vec<String>>,
}

impl QueueNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return pending messages, oldest first.
    pub fn drain(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(mut messages) => std::mem::take(&mut *messages),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for QueueNotifier {
    fn notify_error(&self, message: &str) {
        let mut messages = self.messages.lock().unwrap_or_else(|p| p.into_inner());
        messages.push(message.to_string());
    }
}
