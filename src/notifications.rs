use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Error,
}

/// A transient, user-facing message about an add, sync or import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Info => "info",
            NotificationKind::Error => "error",
        };

        write!(f, "[{tag}] {}", self.message)
    }
}

#[derive(Clone, Debug)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);

        Notifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification {
            kind,
            message: message.into(),
        };

        // nobody listening is fine
        if self.tx.send(notification).is_err() {
            tracing::debug!("dropped notification with no subscribers");
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
