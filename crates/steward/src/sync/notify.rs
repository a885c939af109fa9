//! Downstream notifications for applied store mutations.

use tokio::sync::mpsc;

use crate::entity::source_id::SourceId;

use super::types::ChangeAction;

/// One applied create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEvent {
    pub action: ChangeAction,
    pub owner_id: i64,
    pub owner_name: String,
    pub key: String,
    pub label: String,
    pub source: SourceId,
    pub url: String,
}

impl std::fmt::Display for RepositoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The repo named {} has been {} ({}). The repo node is owned by {} ({}).",
            self.label, self.action, self.url, self.owner_name, self.owner_id
        )
    }
}

/// Receives events after each successful mutation. Never called in dry-run.
pub trait RepositoryNotifier: Send + Sync {
    fn notify(&self, event: &RepositoryEvent);
}

/// Writes each event as an info log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl RepositoryNotifier for LoggingNotifier {
    fn notify(&self, event: &RepositoryEvent) {
        tracing::info!(
            action = %event.action,
            owner_id = event.owner_id,
            key = %event.key,
            source = %event.source,
            "{}",
            event
        );
    }
}

/// Forwards events to a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<RepositoryEvent>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<RepositoryEvent>) -> Self {
        Self { tx }
    }

    /// A notifier and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RepositoryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl RepositoryNotifier for ChannelNotifier {
    fn notify(&self, event: &RepositoryEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!(key = %event.key, "Notification receiver dropped");
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl RepositoryNotifier for NullNotifier {
    fn notify(&self, _event: &RepositoryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(action: ChangeAction) -> RepositoryEvent {
        RepositoryEvent {
            action,
            owner_id: 3,
            owner_name: "ada".into(),
            key: "aquaman-repository".into(),
            label: "The Aquaman repository".into(),
            source: SourceId::Yml,
            url: "https://example.com/aquaman.yml".into(),
        }
    }

    #[test]
    fn test_display_message() {
        assert_eq!(
            event(ChangeAction::Created).to_string(),
            "The repo named The Aquaman repository has been created \
             (https://example.com/aquaman.yml). The repo node is owned by ada (3)."
        );
        assert!(event(ChangeAction::Deleted).to_string().contains("has been deleted"));
    }

    #[tokio::test]
    async fn test_channel_notifier_forwards_events() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(&event(ChangeAction::Updated));
        drop(notifier);

        assert_eq!(rx.recv().await, Some(event(ChangeAction::Updated)));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_channel_notifier_tolerates_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(&event(ChangeAction::Created));
    }
}
