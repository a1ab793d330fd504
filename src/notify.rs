//! Transient user notifications and the audio cue.
//!
//! Messages stack in arrival order. Each one stays visible for a fixed
//! window, then enters a short exit phase, then is dropped. Every
//! message is mirrored to the log.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::types::NotificationLevel;

pub const VISIBLE_FOR: Duration = Duration::from_millis(3000);
pub const EXIT_TRANSITION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPhase {
    Visible,
    Leaving,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub phase: NotificationPhase,
    pub created_at: DateTime<Utc>,
}

/// Queue of short-lived messages. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct NotificationService {
    queue: Arc<Mutex<Vec<Notification>>>,
    visible_for: Duration,
    exit_after: Duration,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(VISIBLE_FOR, EXIT_TRANSITION)
    }
}

impl NotificationService {
    pub fn new(visible_for: Duration, exit_after: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Vec::new())),
            visible_for,
            exit_after,
        }
    }

    /// Show a message and schedule its dismissal.
    ///
    /// Outside a tokio runtime the message is kept until `dismiss`.
    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) -> Uuid {
        let message = message.into();
        match level {
            NotificationLevel::Success => info!(message = %message, "Notification"),
            NotificationLevel::Warning => warn!(message = %message, "Notification"),
            NotificationLevel::Error => error!(message = %message, "Notification"),
        }

        let id = Uuid::new_v4();
        self.queue.lock().push(Notification {
            id,
            level,
            message,
            phase: NotificationPhase::Visible,
            created_at: Utc::now(),
        });

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let queue = Arc::clone(&self.queue);
            let (visible_for, exit_after) = (self.visible_for, self.exit_after);
            handle.spawn(async move {
                tokio::time::sleep(visible_for).await;
                if let Some(n) = queue.lock().iter_mut().find(|n| n.id == id) {
                    n.phase = NotificationPhase::Leaving;
                }
                tokio::time::sleep(exit_after).await;
                queue.lock().retain(|n| n.id != id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.push(NotificationLevel::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Uuid {
        self.push(NotificationLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.push(NotificationLevel::Error, message)
    }

    /// Remove a message before its timer runs out. Returns false if it
    /// was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|n| n.id != id);
        queue.len() != before
    }

    /// Messages currently on screen, oldest first.
    pub fn active(&self) -> Vec<Notification> {
        self.queue.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

/// Short audio cue played on good news.
pub trait Chime: Send + Sync {
    fn play(&self);
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&self) {
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

pub struct SilentChime;

impl Chime for SilentChime {
    fn play(&self) {}
}
