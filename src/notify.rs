use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            NotificationKind::Success => write!(f, "[ok] {}", self.message),
            NotificationKind::Error => write!(f, "[error] {}", self.message),
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Notification>,
    generation: u64,
}

/// Single-slot status banner. Showing a message replaces the previous one,
/// and a message disappears on its own after `duration` unless replaced
/// first. Clones share the same slot.
#[derive(Clone, Debug)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    duration: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called from within a tokio runtime, which runs the expiry timer.
    pub fn show(&self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        match kind {
            NotificationKind::Success => info!(%message, "notification"),
            NotificationKind::Error => warn!(%message, "notification"),
        }
        let generation = {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.current = Some(Notification { message, kind });
            slot.generation
        };
        let slot = Arc::clone(&self.slot);
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            // A later show() owns the slot now.
            if slot.generation == generation {
                slot.current = None;
            }
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, NotificationKind::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, NotificationKind::Error);
    }

    pub fn current(&self) -> Option<Notification> {
        self.lock().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_message_expires() {
        let notifier = Notifier::new(Duration::from_secs(3));
        notifier.success("saved");
        assert_eq!(
            notifier.current(),
            Some(Notification {
                message: "saved".into(),
                kind: NotificationKind::Success
            })
        );
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(notifier.current().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(notifier.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins() {
        let notifier = Notifier::new(Duration::from_secs(3));
        notifier.success("first");
        tokio::time::sleep(Duration::from_secs(2)).await;
        notifier.error("second");
        let current = notifier.current().unwrap();
        assert_eq!(current.message, "second");
        assert_eq!(current.kind, NotificationKind::Error);
        // The first timer fires here and must leave the second message alone.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(notifier.current().unwrap().message, "second");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_slot() {
        let notifier = Notifier::default();
        let other = notifier.clone();
        other.error("boom");
        assert_eq!(notifier.current().unwrap().message, "boom");
    }
}
