//! Publishing newly discovered tickets.

use chrono::{DateTime, Utc};
use std::time::Duration;
use ticketwatch_core::TicketRecord;
use tokio::sync::broadcast;

/// Receives newly stored, fresh tickets. Publishing never fails the caller.
pub trait NotificationSink: Send + Sync {
    /// Hand a record to subscribers.
    fn publish(&self, record: &TicketRecord);
}

/// Sink backed by a broadcast channel.
///
/// Publishing with no subscribers is not an error; lagging subscribers lose
/// the oldest records.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<TicketRecord>,
}

impl BroadcastNotifier {
    /// Create a notifier buffering up to `capacity` records per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to records published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TicketRecord> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastNotifier {
    fn publish(&self, record: &TicketRecord) {
        match self.sender.send(record.clone()) {
            Ok(receivers) => tracing::debug!("Published {} to {} subscribers", record.id, receivers),
            Err(_) => tracing::debug!("Published {} with no subscribers", record.id),
        }
    }
}

/// Whether a ticket issued at `issued_at` is still within `window` of `now`.
///
/// Timestamps in the future count as fresh.
#[must_use]
pub fn is_fresh(issued_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let age = now.signed_duration_since(issued_at);
    chrono::Duration::from_std(window).map_or(true, |window| age <= window)
}
