use crate::config::Config;
use crate::error::OrganiserResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Success or failure of the operation a notification reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A transient, auto-dismissing message for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub shown_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    pub fn is_dismissed(&self, now: Instant) -> bool {
        now >= self.shown_at + self.ttl
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Fans notifications out to every subscribed presentation layer
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx, ttl }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(NotificationKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(NotificationKind::Error, message.into());
    }

    fn send(&self, kind: NotificationKind, message: String) {
        let notification = Notification {
            kind,
            message,
            shown_at: Instant::now(),
            ttl: self.ttl,
        };
        // No subscribers just means nobody is looking
        if self.tx.send(notification).is_err() {
            debug!("Notification dropped, no subscribers");
        }
    }
}

/// The single toast slot of a screen: the newest notification wins
#[derive(Debug, Default)]
pub struct ToastBoard {
    current: Option<Notification>,
}

impl ToastBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, notification: Notification) {
        self.current = Some(notification);
    }

    /// The visible toast, if it has not been dismissed yet
    pub fn current(&mut self, now: Instant) -> Option<&Notification> {
        if self.current.as_ref().is_some_and(|n| n.is_dismissed(now)) {
            self.current = None;
        }
        self.current.as_ref()
    }
}

/// Component owning the process-wide notifier and the toast slot it feeds
pub struct Notifications {
    notifier: Notifier,
    board: Arc<Mutex<ToastBoard>>,
    feeder: Mutex<Option<JoinHandle<()>>>,
}

impl Notifications {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            board: Arc::new(Mutex::new(ToastBoard::new())),
            feeder: Mutex::new(None),
        }
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    /// The toast currently on screen, if any
    pub async fn current_toast(&self) -> Option<Notification> {
        self.board.lock().await.current(Instant::now()).cloned()
    }
}

#[async_trait]
impl super::Component for Notifications {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn init(&self, _config: Arc<RwLock<Config>>) -> OrganiserResult<()> {
        let mut feeder = self.feeder.lock().await;
        if feeder.is_some() {
            return Ok(());
        }

        let mut rx = self.notifier.subscribe();
        let board = Arc::clone(&self.board);
        *feeder = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => board.lock().await.show(notification),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Toast board skipped {} notifications", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        Ok(())
    }

    async fn shutdown(&self) -> OrganiserResult<()> {
        if let Some(feeder) = self.feeder.lock().await.take() {
            feeder.abort();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notification_auto_dismisses() {
        let notifier = Notifier::new(Duration::from_millis(3000));
        let mut rx = notifier.subscribe();

        notifier.success("Event added successfully!");
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.kind, NotificationKind::Success);
        assert!(!notification.is_dismissed(Instant::now()));

        tokio::time::advance(Duration::from_millis(3000)).await;
        assert!(notification.is_dismissed(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_board_replaces_and_expires() {
        let notifier = Notifier::new(Duration::from_millis(1000));
        let mut rx = notifier.subscribe();
        let mut board = ToastBoard::new();

        notifier.success("first");
        board.show(rx.recv().await.unwrap());
        tokio::time::advance(Duration::from_millis(600)).await;

        notifier.error("second");
        board.show(rx.recv().await.unwrap());
        assert_eq!(board.current(Instant::now()).unwrap().message, "second");

        // The replacement has its own lifetime
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(board.current(Instant::now()).unwrap().is_error());

        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(board.current(Instant::now()).is_none());
    }

    #[test]
    fn test_send_without_subscribers() {
        let notifier = Notifier::new(Duration::from_secs(1));
        notifier.error("nobody listens");
    }
}
