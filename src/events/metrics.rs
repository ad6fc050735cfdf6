use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use super::types::Severity;

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    unheard: AtomicU64,
    warnings: AtomicU64,
    errors: AtomicU64,
    peak_subscribers: AtomicUsize,
}

/// Shared tallies of what went over the bus.
///
/// Severity counts include events nobody was subscribed to, so a headless
/// run can still report how many warnings it raised.
#[derive(Debug, Clone, Default)]
pub struct EventBusMetrics {
    counters: Arc<Counters>,
}

impl EventBusMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event. `delivered` is `None` when no receiver was attached.
    pub fn record(&self, severity: Severity, delivered: Option<usize>) {
        let c = &self.counters;
        match delivered {
            Some(receivers) => {
                c.published.fetch_add(1, Ordering::Relaxed);
                c.peak_subscribers.fetch_max(receivers, Ordering::Relaxed);
            }
            None => {
                c.unheard.fetch_add(1, Ordering::Relaxed);
            }
        }
        match severity {
            Severity::Warn => {
                c.warnings.fetch_add(1, Ordering::Relaxed);
            }
            Severity::Error => {
                c.errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            events_published: c.published.load(Ordering::Relaxed),
            events_dropped: c.unheard.load(Ordering::Relaxed),
            warnings: c.warnings.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            peak_subscribers: c.peak_subscribers.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Events at least one receiver got.
    pub events_published: u64,
    /// Events sent while nobody was subscribed.
    pub events_dropped: u64,
    pub warnings: u64,
    pub errors: u64,
    pub peak_subscribers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_tallied_whether_or_not_anyone_listened() {
        let metrics = EventBusMetrics::new();
        metrics.record(Severity::Warn, None);
        metrics.record(Severity::Error, Some(3));
        metrics.record(Severity::Info, Some(1));

        let snap = metrics.snapshot();
        assert_eq!(snap.events_published, 2);
        assert_eq!(snap.events_dropped, 1);
        assert_eq!(snap.warnings, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.peak_subscribers, 3);
    }
}
