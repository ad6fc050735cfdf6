//! Failure classification for interactive actions

use serde::{Deserialize, Serialize};

use crate::driver::DriverError;

/// Message fragments that mean the browser session is gone for good.
///
/// Retrying against a dead session only burns the retry budget, so these
/// short-circuit straight to [`FailureKind::Fatal`].
const FATAL_PATTERNS: &[&str] = &[
    "session deleted because of page crash",
    "invalid session id",
    "browser closed",
    "browser disconnected",
    "target closed",
    "session not found",
    "session closed",
    "no response from the chromium instance",
    "page crash",
    "channel closed",
    "websocket",
];

const INTERACTION_PATTERNS: &[&str] = &[
    "not interactable",
    "intercept",
    "stale",
    "detached",
    "not clickable",
    "obscured",
];

const LOAD_PATTERNS: &[&str] = &[
    "not present",
    "not found",
    "no node",
    "could not find node",
    "timed out",
    "timeout",
];

/// Whether an error message reports a dead browser session.
#[must_use]
pub fn is_fatal_message(message: &str) -> bool {
    let msg = message.to_lowercase();
    FATAL_PATTERNS.iter().any(|p| msg.contains(p))
}

/// Failure taxonomy of the resilient action executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Element exists but cannot take the action right now (covered,
    /// animating, re-rendered underneath us). Retried after a fixed delay.
    TransientInteraction,
    /// Element or content is not there yet. Retried after an explicit wait.
    TransientLoad,
    /// The session is gone. Never retried.
    Fatal,
}

impl FailureKind {
    /// Classify a driver failure.
    ///
    /// Typed variants map directly; free-form CDP messages are matched by
    /// substring. Unrecognized messages count as interaction failures so they
    /// get the bounded retry rather than aborting the run.
    #[must_use]
    pub fn classify(error: &DriverError) -> Self {
        match error {
            DriverError::Fatal(_) => Self::Fatal,
            DriverError::NotInteractable(_) | DriverError::Intercepted(_) | DriverError::Stale(_) => {
                Self::TransientInteraction
            }
            DriverError::NotFound(_) | DriverError::Timeout { .. } => Self::TransientLoad,
            DriverError::Other(message) => Self::classify_message(message),
        }
    }

    fn classify_message(message: &str) -> Self {
        if is_fatal_message(message) {
            return Self::Fatal;
        }
        let msg = message.to_lowercase();
        if INTERACTION_PATTERNS.iter().any(|p| msg.contains(p)) {
            return Self::TransientInteraction;
        }
        if LOAD_PATTERNS.iter().any(|p| msg.contains(p)) {
            return Self::TransientLoad;
        }
        Self::TransientInteraction
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }

    /// Short token used in diagnostic artifact names.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::TransientInteraction => "interaction",
            Self::TransientLoad => "load",
            Self::Fatal => "fatal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_variants_classify_directly() {
        assert_eq!(
            FailureKind::classify(&DriverError::Intercepted("x".into())),
            FailureKind::TransientInteraction
        );
        assert_eq!(
            FailureKind::classify(&DriverError::Stale("x".into())),
            FailureKind::TransientInteraction
        );
        assert_eq!(
            FailureKind::classify(&DriverError::NotFound("x".into())),
            FailureKind::TransientLoad
        );
        assert_eq!(
            FailureKind::classify(&DriverError::Fatal("x".into())),
            FailureKind::Fatal
        );
    }

    #[test]
    fn crash_messages_are_fatal() {
        for msg in [
            "unknown error: session deleted because of page crash",
            "Invalid session id",
            "Failed to send: channel closed",
            "WebSocket protocol error: Connection reset without closing handshake",
        ] {
            assert_eq!(
                FailureKind::classify(&DriverError::Other(msg.into())),
                FailureKind::Fatal,
                "{msg}"
            );
        }
    }

    #[test]
    fn unknown_messages_get_bounded_retry() {
        let kind = FailureKind::classify(&DriverError::Other("Uncaught TypeError".into()));
        assert!(kind.is_retryable());
        assert_eq!(kind, FailureKind::TransientInteraction);
    }

    #[test]
    fn lookup_messages_are_load_failures() {
        assert_eq!(
            FailureKind::classify(&DriverError::Other("Could not find node with given id".into())),
            FailureKind::TransientLoad
        );
    }
}
