//! Event bus implementation for publishing and subscribing to harvest events

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use super::errors::EventBusError;
use super::metrics::EventBusMetrics;
use super::types::{HarvestEvent, ShutdownReason};

/// Event bus for publishing and subscribing to harvest events
///
/// Cloning shares the underlying channel, metrics and shutdown flag.
#[derive(Debug, Clone)]
pub struct HarvestEventBus {
    sender: broadcast::Sender<HarvestEvent>,
    metrics: EventBusMetrics,
    shutdown_flag: Arc<AtomicBool>,
}

impl HarvestEventBus {
    /// Create a new event bus with the specified capacity
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of events buffered per lagging subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            metrics: EventBusMetrics::new(),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Publish an event to all subscribers
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of active subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody is listening
    /// * `Err(EventBusError::Shutdown)` - The bus was shut down
    pub fn publish(&self, event: HarvestEvent) -> Result<usize, EventBusError> {
        if self.is_shutdown() {
            return Err(EventBusError::Shutdown);
        }
        let severity = event.severity();
        match self.sender.send(event) {
            Ok(subscriber_count) => {
                self.metrics.record(severity, Some(subscriber_count));
                Ok(subscriber_count)
            }
            Err(_) => {
                self.metrics.record(severity, None);
                log::debug!("Published event but no active subscribers");
                Err(EventBusError::NoSubscribers)
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HarvestEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::Acquire)
    }

    /// Signal shutdown to all subscribers
    ///
    /// Publishes a final [`HarvestEvent::Shutdown`] and refuses further
    /// events. Idempotent: only the first call publishes.
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.shutdown_flag.swap(true, Ordering::AcqRel) {
            return;
        }
        let event = HarvestEvent::shutdown(reason);
        let severity = event.severity();
        let delivered = self.sender.send(event).ok();
        self.metrics.record(severity, delivered);
    }
}

/// Receive the next event, mapping broadcast errors onto [`EventBusError`].
pub async fn recv_event(
    receiver: &mut broadcast::Receiver<HarvestEvent>,
) -> Result<HarvestEvent, EventBusError> {
    match receiver.recv().await {
        Ok(event) => Ok(event),
        Err(broadcast::error::RecvError::Lagged(n)) => Err(EventBusError::ReceiverLagged(n)),
        Err(broadcast::error::RecvError::Closed) => Err(EventBusError::Shutdown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Severity;

    #[tokio::test]
    async fn publish_without_subscribers_reports_and_counts() {
        let bus = HarvestEventBus::new(8);
        let result = bus.publish(HarvestEvent::diagnostic(Severity::Info, "hello"));
        assert!(matches!(result, Err(EventBusError::NoSubscribers)));
        assert_eq!(bus.metrics().snapshot().events_dropped, 1);
    }

    #[tokio::test]
    async fn shutdown_is_published_once() {
        let bus = HarvestEventBus::new(8);
        let mut rx = bus.subscribe();
        bus.shutdown(ShutdownReason::Cancelled);
        bus.shutdown(ShutdownReason::RunCompleted);

        let event = recv_event(&mut rx).await.expect("shutdown event");
        assert!(matches!(
            event,
            HarvestEvent::Shutdown {
                reason: ShutdownReason::Cancelled,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            bus.publish(HarvestEvent::diagnostic(Severity::Info, "late")),
            Err(EventBusError::Shutdown)
        ));
    }
}
