//! The stream of detected state mutations.
//!
//! [`ChangeStream`] stands in for the storage layer's change feed: each
//! recorded report state publishes one [`ChangeEvent`], and the fan-out
//! task consumes them. Delivery is fire-and-forget; a consumer that
//! falls more than the buffer capacity behind loses the overrun events
//! and is told how many it missed.

use tokio::sync::broadcast;

use super::change_event::ChangeEvent;

/// Fan-in point for [`ChangeEvent`]s, cheap to clone into every
/// producer.
///
/// A thin wrapper over [`tokio::sync::broadcast`]; capacity comes from
/// `CHANGE_STREAM_CAPACITY`. Events published while no consumer is
/// attached are lost, which is acceptable: a notification has no value
/// once its moment has passed.
#[derive(Debug, Clone)]
pub struct ChangeStream {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeStream {
    /// Creates a stream able to buffer `capacity` in-flight events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Hands an event to every attached consumer, returning how many
    /// there were.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Attaches a consumer; it observes events published from this
    /// point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Number of currently attached consumers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::change_event::MutationKind;
    use chrono::Utc;

    fn make_event(reporte_id: &str) -> ChangeEvent {
        ChangeEvent {
            reporte_id: Some(reporte_id.to_string()),
            estado: Some("asignado".to_string()),
            timestamp: Utc::now(),
            kind: MutationKind::Updated,
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let stream = ChangeStream::new(100);
        assert_eq!(stream.publish(make_event("R1")), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let stream = ChangeStream::new(100);
        let mut rx = stream.subscribe();

        stream.publish(make_event("R1"));

        let Ok(event) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.routable(), Some("R1"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let stream = ChangeStream::new(100);
        let mut rx1 = stream.subscribe();
        let mut rx2 = stream.subscribe();

        let count = stream.publish(make_event("R2"));
        assert_eq!(count, 2);

        let Ok(e1) = rx1.recv().await else {
            panic!("rx1 failed");
        };
        let Ok(e2) = rx2.recv().await else {
            panic!("rx2 failed");
        };
        assert_eq!(e1, e2);
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let stream = ChangeStream::new(100);
        assert_eq!(stream.receiver_count(), 0);

        let rx1 = stream.subscribe();
        assert_eq!(stream.receiver_count(), 1);

        let _rx2 = stream.subscribe();
        assert_eq!(stream.receiver_count(), 2);

        drop(rx1);
        assert_eq!(stream.receiver_count(), 1);
    }
}
