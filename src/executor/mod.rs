//! Resilient action executor
//!
//! Every interactive action the navigator takes goes through
//! [`ActionExecutor::perform`], which classifies failures
//! ([`FailureKind`]), retries the transient ones under a [`RetryPolicy`], and
//! escalates fatal ones untouched.

pub mod failure;
pub mod policy;

pub use failure::FailureKind;
pub use policy::RetryPolicy;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::diagnostics::{DiagnosticsSink, capture_screenshot};
use crate::driver::{DriverError, PageDriver, Target};
use crate::events::{HarvestEvent, Severity};
use crate::utils::POLL_INTERVAL_MS;

/// An interactive action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Click,
    Hover,
    ScrollIntoView,
    /// Poll until the target is visible, bounded by `timeout_ms`.
    WaitVisible { timeout_ms: u64 },
}

impl Action {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Hover => "hover",
            Self::ScrollIntoView => "scroll",
            Self::WaitVisible { .. } => "wait-visible",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an action gave up.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    /// Transient failures outlasted the retry policy. Recoverable at entity
    /// granularity.
    #[error("{action} on {target} exhausted after {attempts} attempt(s): {last_error}")]
    Exhausted {
        action: &'static str,
        target: String,
        kind: FailureKind,
        attempts: u32,
        last_error: DriverError,
    },

    /// The browser session is gone. Aborts the run.
    #[error("fatal browser failure during {action} on {target}: {error}")]
    Fatal {
        action: &'static str,
        target: String,
        error: DriverError,
    },
}

impl ActionError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// What a polling wait is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Present,
    Visible,
}

/// Wraps a [`PageDriver`] with failure classification and bounded retries.
pub struct ActionExecutor<D: ?Sized> {
    driver: Arc<D>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl<D: ?Sized> Clone for ActionExecutor<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<D> ActionExecutor<D>
where
    D: PageDriver + ?Sized,
{
    pub fn new(driver: Arc<D>, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { driver, sink }
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    #[must_use]
    pub fn sink(&self) -> &dyn DiagnosticsSink {
        self.sink.as_ref()
    }

    /// Perform `action` on `target` under `policy`.
    ///
    /// Interaction failures are retried after `policy.backoff_ms`, load
    /// failures after an explicit presence wait of `policy.load_timeout_ms`.
    /// Each kind has its own budget of `policy.max_retries`. A screenshot is
    /// captured on the first failure of each kind and again on exhaustion.
    /// Fatal failures return immediately.
    pub async fn perform(&self, action: Action, target: &Target, policy: &RetryPolicy) -> Result<(), ActionError> {
        if let Action::WaitVisible { timeout_ms } = action {
            return self.perform_wait(action, target, Duration::from_millis(timeout_ms)).await;
        }

        let mut attempts = 0u32;
        let mut interaction_failures = 0u32;
        let mut load_failures = 0u32;

        loop {
            attempts += 1;
            let error = match self.attempt(action, target).await {
                Ok(()) => {
                    if attempts > 1 {
                        debug!(
                            target: "catalogscrape::executor",
                            "{action} on {target} succeeded on attempt {attempts}"
                        );
                    }
                    return Ok(());
                }
                Err(e) => e,
            };

            let kind = FailureKind::classify(&error);
            let failures = match kind {
                FailureKind::Fatal => return Err(self.fatal(action, target, error)),
                FailureKind::TransientInteraction => {
                    interaction_failures += 1;
                    interaction_failures
                }
                FailureKind::TransientLoad => {
                    load_failures += 1;
                    load_failures
                }
            };

            if failures == 1 {
                self.snapshot(&format!("{}-{}", action.name(), kind.slug()), target)
                    .await;
            }
            if failures > policy.max_retries {
                return Err(self.exhausted(action, target, kind, attempts, error).await);
            }

            self.sink
                .log_event(HarvestEvent::action_retried(action.name(), &target.to_string(), kind, attempts));

            match kind {
                FailureKind::TransientInteraction => sleep(policy.backoff()).await,
                FailureKind::TransientLoad => {
                    let appeared = self
                        .wait_for(target, Condition::Present, policy.load_timeout())
                        .await
                        .map_err(|e| self.fatal(action, target, e))?;
                    if !appeared {
                        let timeout = DriverError::Timeout {
                            operation: format!("waiting for {target}"),
                            timeout_ms: policy.load_timeout_ms,
                        };
                        return Err(self.exhausted(action, target, kind, attempts, timeout).await);
                    }
                }
                FailureKind::Fatal => {}
            }
        }
    }

    async fn attempt(&self, action: Action, target: &Target) -> Result<(), DriverError> {
        trace!(target: "catalogscrape::executor", "{action} -> {target}");
        match action {
            Action::Click => self.driver.click(target).await,
            Action::Hover => self.driver.hover(target).await,
            Action::ScrollIntoView => self.driver.scroll_into_view(target).await,
            Action::WaitVisible { .. } => Ok(()),
        }
    }

    async fn perform_wait(&self, action: Action, target: &Target, timeout: Duration) -> Result<(), ActionError> {
        match self.wait_for(target, Condition::Visible, timeout).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                let error = DriverError::Timeout {
                    operation: format!("waiting for {target} to become visible"),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                };
                Err(self
                    .exhausted(action, target, FailureKind::TransientLoad, 1, error)
                    .await)
            }
            Err(e) => Err(self.fatal(action, target, e)),
        }
    }

    /// Poll `condition` on `target` until it holds or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout. Transient polling errors count as "not
    /// yet"; only fatal errors are returned.
    pub async fn wait_for(&self, target: &Target, condition: Condition, timeout: Duration) -> Result<bool, DriverError> {
        let start = Instant::now();
        let poll = Duration::from_millis(POLL_INTERVAL_MS);
        loop {
            let checked = match condition {
                Condition::Present => self.driver.is_present(target).await,
                Condition::Visible => self.driver.is_visible(target).await,
            };
            match checked {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if FailureKind::classify(&e) == FailureKind::Fatal => return Err(e),
                Err(e) => trace!(target: "catalogscrape::executor", "poll for {target} failed: {e}"),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            sleep(poll.min(timeout - elapsed)).await;
        }
    }

    fn fatal(&self, action: Action, target: &Target, error: DriverError) -> ActionError {
        self.sink.log(
            Severity::Error,
            format!("{action} on {target} hit a fatal browser failure: {error}"),
        );
        ActionError::Fatal {
            action: action.name(),
            target: target.to_string(),
            error,
        }
    }

    async fn exhausted(
        &self,
        action: Action,
        target: &Target,
        kind: FailureKind,
        attempts: u32,
        last_error: DriverError,
    ) -> ActionError {
        warn!(
            target: "catalogscrape::executor",
            "{action} on {target} exhausted after {attempts} attempt(s): {last_error}"
        );
        self.snapshot(&format!("{}-exhausted", action.name()), target)
            .await;
        ActionError::Exhausted {
            action: action.name(),
            target: target.to_string(),
            kind,
            attempts,
            last_error,
        }
    }

    async fn snapshot(&self, label: &str, target: &Target) {
        capture_screenshot(self.driver.as_ref(), self.sink.as_ref(), label, &target.slug()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::driver::{DriverResult, NameList};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Driver whose `click` replays a script of outcomes, then succeeds.
    #[derive(Default)]
    struct ScriptedDriver {
        clicks: Mutex<VecDeque<DriverResult<()>>>,
        click_calls: AtomicUsize,
        present: bool,
    }

    impl ScriptedDriver {
        fn new(script: Vec<DriverResult<()>>, present: bool) -> Self {
            Self {
                clicks: Mutex::new(script.into()),
                click_calls: AtomicUsize::new(0),
                present,
            }
        }

        fn calls(&self) -> usize {
            self.click_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageDriver for ScriptedDriver {
        async fn goto(&self, _url: &str) -> DriverResult<()> {
            Ok(())
        }
        async fn click(&self, _target: &Target) -> DriverResult<()> {
            self.click_calls.fetch_add(1, Ordering::SeqCst);
            self.clicks.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
        async fn hover(&self, _target: &Target) -> DriverResult<()> {
            Ok(())
        }
        async fn scroll_into_view(&self, _target: &Target) -> DriverResult<()> {
            Ok(())
        }
        async fn is_present(&self, _target: &Target) -> DriverResult<bool> {
            Ok(self.present)
        }
        async fn is_visible(&self, _target: &Target) -> DriverResult<bool> {
            Ok(self.present)
        }
        async fn names(&self, _list: &NameList) -> DriverResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn link_href(&self, _target: &Target) -> DriverResult<Option<String>> {
            Ok(None)
        }
        async fn variant_count(&self, _category: &str, _material: &str) -> DriverResult<usize> {
            Ok(0)
        }
        async fn region_html(&self) -> DriverResult<Option<String>> {
            Ok(None)
        }
        async fn scroll_height(&self) -> DriverResult<u64> {
            Ok(0)
        }
        async fn scroll_to_bottom(&self) -> DriverResult<()> {
            Ok(())
        }
        async fn screenshot(&self) -> DriverResult<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
        async fn page_source(&self) -> DriverResult<String> {
            Ok(String::new())
        }
    }

    fn executor(driver: ScriptedDriver) -> (ActionExecutor<ScriptedDriver>, Arc<ScriptedDriver>, Arc<MemorySink>) {
        let driver = Arc::new(driver);
        let sink = Arc::new(MemorySink::new());
        (ActionExecutor::new(Arc::clone(&driver), sink.clone()), driver, sink)
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 1).with_load_timeout_ms(20)
    }

    fn target() -> Target {
        Target::Category("Aluminum".to_string())
    }

    fn intercepted() -> DriverError {
        DriverError::Intercepted("category 'Aluminum'".to_string())
    }

    #[tokio::test]
    async fn transient_interaction_recovers_within_budget() {
        let (exec, driver, sink) = executor(ScriptedDriver::new(vec![Err(intercepted()), Err(intercepted())], true));

        exec.perform(Action::Click, &target(), &fast_policy(3))
            .await
            .expect("recovers");

        assert_eq!(driver.calls(), 3);
        // one screenshot for the first interaction failure only
        assert_eq!(sink.artifact_names().len(), 1);
        let retries = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, HarvestEvent::ActionRetried { .. }))
            .count();
        assert_eq!(retries, 2);
    }

    #[tokio::test]
    async fn interaction_budget_exhausts_after_max_retries() {
        let script = (0..10).map(|_| Err(intercepted())).collect();
        let (exec, driver, sink) = executor(ScriptedDriver::new(script, true));

        let err = exec
            .perform(Action::Click, &target(), &fast_policy(2))
            .await
            .expect_err("exhausts");

        assert!(!err.is_fatal());
        match err {
            ActionError::Exhausted { kind, attempts, .. } => {
                assert_eq!(kind, FailureKind::TransientInteraction);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.calls(), 3);
        let names = sink.artifact_names();
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("click-interaction_category-Aluminum_"));
        assert!(names[1].starts_with("click-exhausted_category-Aluminum_"));
    }

    #[tokio::test]
    async fn fatal_failure_is_not_retried() {
        let script = vec![Err(DriverError::Fatal("target closed".to_string()))];
        let (exec, driver, sink) = executor(ScriptedDriver::new(script, true));

        let err = exec
            .perform(Action::Click, &target(), &fast_policy(5))
            .await
            .expect_err("fatal");

        assert!(err.is_fatal());
        assert_eq!(driver.calls(), 1);
        assert!(sink.artifact_names().is_empty());
    }

    #[tokio::test]
    async fn load_failure_waits_for_presence_then_retries() {
        let script = vec![Err(DriverError::NotFound("category 'Aluminum'".to_string()))];
        let (exec, driver, _sink) = executor(ScriptedDriver::new(script, true));

        exec.perform(Action::Click, &target(), &fast_policy(1))
            .await
            .expect("recovers after wait");
        assert_eq!(driver.calls(), 2);
    }

    #[tokio::test]
    async fn load_failure_escalates_when_target_never_appears() {
        let script = vec![Err(DriverError::NotFound("category 'Aluminum'".to_string()))];
        let (exec, driver, _sink) = executor(ScriptedDriver::new(script, false));

        let err = exec
            .perform(Action::Click, &target(), &fast_policy(3))
            .await
            .expect_err("never appears");

        match err {
            ActionError::Exhausted { kind, last_error, .. } => {
                assert_eq!(kind, FailureKind::TransientLoad);
                assert!(matches!(last_error, DriverError::Timeout { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.calls(), 1);
    }

    #[tokio::test]
    async fn interaction_and_load_budgets_are_separate() {
        let script = vec![
            Err(intercepted()),
            Err(DriverError::NotFound("x".to_string())),
            Err(intercepted()),
        ];
        let (exec, driver, sink) = executor(ScriptedDriver::new(script, true));

        // max_retries = 1 per kind: interaction fails twice would exhaust,
        // but here each kind only sees its own failures.
        let err = exec
            .perform(Action::Click, &target(), &fast_policy(1))
            .await
            .expect_err("second interaction failure exhausts");
        match err {
            ActionError::Exhausted { kind, attempts, .. } => {
                assert_eq!(kind, FailureKind::TransientInteraction);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(driver.calls(), 3);
        // first interaction, first load, exhaustion
        assert_eq!(sink.artifact_names().len(), 3);
    }

    #[tokio::test]
    async fn wait_visible_times_out_as_exhausted() {
        let (exec, _driver, sink) = executor(ScriptedDriver::new(Vec::new(), false));

        let err = exec
            .perform(Action::WaitVisible { timeout_ms: 10 }, &Target::DetailReady, &fast_policy(5))
            .await
            .expect_err("never visible");
        assert!(!err.is_fatal());
        assert_eq!(sink.artifact_names().len(), 1);
    }
}
