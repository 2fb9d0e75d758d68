//! Change-event fan-out.
//!
//! One engine invocation handles one change event: resolve the
//! effective delivery set, build one notification, deliver to every
//! channel concurrently, and reconcile the registry when a delivery
//! proves a channel dead. A failing subscriber never blocks or fails
//! the rest of the fan-out; the overall outcome of event processing is
//! always success.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::{ChangeEvent, ChannelId, Notificacion};
use crate::gateway::{ChannelGateway, SendError};
use crate::registry::SubscriptionRegistry;

/// Per-invocation delivery counts, for observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Deliveries that succeeded.
    pub delivered: usize,
    /// Channels found gone; deregistered best-effort.
    pub gone: usize,
    /// Transient delivery failures; not retried, not deregistered.
    pub failed: usize,
}

impl FanoutReport {
    /// Adds another report's counts into this one.
    pub fn absorb(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.gone += other.gone;
        self.failed += other.failed;
    }
}

/// Delivers change events to all matching subscribed channels.
#[derive(Debug, Clone)]
pub struct FanoutEngine {
    registry: SubscriptionRegistry,
    gateway: Arc<dyn ChannelGateway>,
}

impl FanoutEngine {
    /// Creates an engine over the given registry and gateway.
    #[must_use]
    pub fn new(registry: SubscriptionRegistry, gateway: Arc<dyn ChannelGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Processes one change event.
    ///
    /// `origin` is the channel whose own action produced the event, if
    /// any; it already received a direct response and is excluded from
    /// the delivery set. Unroutable events are discarded. Registry
    /// failures yield an empty delivery set instead of an error: a
    /// dependency fault on one event must not poison the stream.
    pub async fn process(&self, event: &ChangeEvent, origin: Option<&ChannelId>) -> FanoutReport {
        let Some(reporte_id) = event.routable() else {
            tracing::debug!("change event without reporte_id, discarding");
            return FanoutReport::default();
        };

        let targets = match self.registry.resolve_all(reporte_id, origin).await {
            Ok(targets) => targets,
            Err(err) => {
                tracing::error!(reporte_id, error = %err, "failed to resolve subscribers");
                return FanoutReport::default();
            }
        };

        if targets.is_empty() {
            // Routine near TTL expiry or with no watchers; not an error.
            tracing::info!(reporte_id, "no active subscribers for change event");
            return FanoutReport::default();
        }

        let notificacion = Notificacion::from_event(reporte_id, event);
        let payload = match serde_json::to_value(&notificacion) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(reporte_id, error = %err, "failed to encode notification");
                return FanoutReport::default();
            }
        };

        // Deliveries are independent; issue them concurrently.
        let sends = targets.iter().map(|sub| {
            let payload = payload.clone();
            async move { (&sub.channel_id, self.gateway.send(&sub.channel_id, payload).await) }
        });
        let outcomes = futures_util::future::join_all(sends).await;

        let mut report = FanoutReport::default();
        let mut dead: Vec<&ChannelId> = Vec::new();
        for (channel_id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(SendError::Gone) => {
                    report.gone += 1;
                    dead.push(channel_id);
                }
                Err(SendError::Transient(reason)) => {
                    report.failed += 1;
                    tracing::warn!(channel_id = %channel_id, reason, "delivery failed");
                }
            }
        }

        // Best-effort cleanup; losing the race with TTL expiry is fine.
        for channel_id in dead {
            tracing::debug!(channel_id = %channel_id, "channel gone, deregistering");
            if let Err(err) = self.registry.deregister(channel_id).await {
                tracing::warn!(channel_id = %channel_id, error = %err, "cleanup failed");
            }
        }

        tracing::info!(
            reporte_id,
            delivered = report.delivered,
            gone = report.gone,
            failed = report.failed,
            "fanout complete"
        );
        report
    }

    /// Processes a batch of events sequentially, accumulating counts.
    pub async fn process_batch(
        &self,
        events: &[ChangeEvent],
        origin: Option<&ChannelId>,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        for event in events {
            report.absorb(self.process(event, origin).await);
        }
        report
    }

    /// Consumes change events from a stream receiver until it closes.
    ///
    /// Lagging (events dropped by the broadcast ring buffer) is logged
    /// and skipped; there is no replay.
    pub async fn run(&self, mut rx: broadcast::Receiver<ChangeEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = self.process(&event, None).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "fanout fell behind change stream");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("change stream closed, fanout loop exiting");
    }
}
