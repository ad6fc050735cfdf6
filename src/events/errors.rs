/// Why an event could not be sent or received.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("no subscriber is listening for harvest events")]
    NoSubscribers,

    /// The receiver fell behind and the oldest events were overwritten.
    #[error("subscriber fell behind and missed {0} harvest event(s)")]
    ReceiverLagged(u64),

    #[error("harvest event bus is shut down")]
    Shutdown,
}
