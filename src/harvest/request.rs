use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{broadcast, oneshot};

use super::{CancelToken, HarvestError, HarvestOutcome};
use crate::events::{HarvestEvent, HarvestEventBus};

/// A pending harvest run.
///
/// Await it for the outcome. Dropping the request does not stop the run;
/// call [`HarvestRequest::cancel`] for that.
pub struct HarvestRequest {
    receiver: oneshot::Receiver<Result<HarvestOutcome, HarvestError>>,
    cancel: CancelToken,
    bus: Arc<HarvestEventBus>,
}

impl HarvestRequest {
    #[must_use]
    pub fn new(
        receiver: oneshot::Receiver<Result<HarvestOutcome, HarvestError>>,
        cancel: CancelToken,
        bus: Arc<HarvestEventBus>,
    ) -> Self {
        Self {
            receiver,
            cancel,
            bus,
        }
    }

    /// Ask the run to stop at the next state boundary. Nothing is committed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress events from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HarvestEvent> {
        self.bus.subscribe()
    }

    #[must_use]
    pub fn event_bus(&self) -> Arc<HarvestEventBus> {
        Arc::clone(&self.bus)
    }
}

impl Future for HarvestRequest {
    type Output = Result<HarvestOutcome, HarvestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HarvestError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_run_resolves_as_cancelled() {
        let (tx, rx) = oneshot::channel();
        let request = HarvestRequest::new(rx, CancelToken::new(), Arc::new(HarvestEventBus::new(4)));
        drop(tx);
        assert!(matches!(request.await, Err(HarvestError::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_reaches_the_shared_token() {
        let (_tx, rx) = oneshot::channel();
        let request = HarvestRequest::new(rx, CancelToken::new(), Arc::new(HarvestEventBus::new(4)));
        let token = request.cancel_token();
        request.cancel();
        assert!(token.is_cancelled());
    }
}
