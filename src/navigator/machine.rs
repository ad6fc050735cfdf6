use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::{NavState, NavigationError, TraversalOutcome, TraversalProgress};
use crate::catalog::{CatalogEntity, CategorySelect, EntityKind, MaterialOpen, SiteProfile, Source};
use crate::config::NavigatorSettings;
use crate::diagnostics::{DiagnosticsSink, capture_screenshot, dump_entry_page};
use crate::driver::{DriverError, NameList, PageDriver, Target};
use crate::events::{HarvestEvent, Severity};
use crate::executor::{Action, ActionError, ActionExecutor, Condition, FailureKind, RetryPolicy};
use crate::extraction::{self, ExtractionContext, RecordSet, SpecRecord};
use crate::harvest::CancelToken;

/// Failure inside one transition: either isolated to the current entity or
/// fatal for the whole run.
enum Fault {
    Recoverable(String),
    Fatal(String),
}

impl From<ActionError> for Fault {
    fn from(e: ActionError) -> Self {
        if e.is_fatal() {
            Self::Fatal(e.to_string())
        } else {
            Self::Recoverable(e.to_string())
        }
    }
}

impl From<DriverError> for Fault {
    fn from(e: DriverError) -> Self {
        if FailureKind::classify(&e) == FailureKind::Fatal {
            Self::Fatal(e.to_string())
        } else {
            Self::Recoverable(e.to_string())
        }
    }
}

type StepResult<T> = Result<T, Fault>;

/// Recoverable faults become a reason to log; fatal ones end the run.
fn escalate(fault: Fault) -> Result<String, NavigationError> {
    match fault {
        Fault::Recoverable(reason) => Ok(reason),
        Fault::Fatal(reason) => Err(NavigationError::Fatal(reason)),
    }
}

/// `Category / Material / #n` for log lines.
fn breadcrumb(category: &str, material: &str, variant: Option<usize>) -> String {
    let category = CatalogEntity::category(category);
    let material = CatalogEntity::child(&category, EntityKind::Material, material);
    match variant {
        Some(index) => CatalogEntity::child(&material, EntityKind::Variant, format!("#{}", index + 1)).path(),
        None => material.path(),
    }
}

/// Category → material → variant → detail traversal of one site.
pub struct Navigator<D: ?Sized> {
    executor: ActionExecutor<D>,
    profile: &'static SiteProfile,
    policy: RetryPolicy,
    settings: NavigatorSettings,
    cancel: CancelToken,
    state: NavState,
    progress: TraversalProgress,
    records: RecordSet,
    transitions: usize,
    failed_materials: usize,
    dump_entry_page: bool,
}

impl<D> Navigator<D>
where
    D: PageDriver + ?Sized,
{
    pub fn new(
        driver: Arc<D>,
        sink: Arc<dyn DiagnosticsSink>,
        profile: &'static SiteProfile,
        policy: RetryPolicy,
        settings: NavigatorSettings,
        cancel: CancelToken,
    ) -> Self {
        Self {
            executor: ActionExecutor::new(driver, sink),
            profile,
            policy,
            settings,
            cancel,
            state: NavState::Idle,
            progress: TraversalProgress::new(),
            records: RecordSet::new(),
            transitions: 0,
            failed_materials: 0,
            dump_entry_page: true,
        }
    }

    /// Whether to save the raw entry page when it never becomes ready.
    #[must_use]
    pub fn with_entry_page_dump(mut self, enabled: bool) -> Self {
        self.dump_entry_page = enabled;
        self
    }

    #[must_use]
    pub fn state(&self) -> &NavState {
        &self.state
    }

    #[must_use]
    pub fn progress(&self) -> &TraversalProgress {
        &self.progress
    }

    #[must_use]
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    #[must_use]
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    fn source(&self) -> Source {
        self.profile.source
    }

    fn driver(&self) -> &D {
        self.executor.driver()
    }

    fn sink(&self) -> &dyn DiagnosticsSink {
        self.executor.sink()
    }

    fn list_timeout(&self) -> u64 {
        self.settings.list_timeout_ms
    }

    /// Step until `AllCategoriesProcessed`.
    pub async fn run(mut self) -> Result<TraversalOutcome, NavigationError> {
        while !self.state.is_terminal() {
            self.step().await?;
        }
        info!(
            target: "catalogscrape::navigator",
            "{}: traversal finished after {} transitions, {} records",
            self.source(),
            self.transitions,
            self.records.len()
        );
        Ok(self.into_outcome())
    }

    /// Perform one transition.
    ///
    /// After an error the navigator is spent and must not be stepped again.
    pub async fn step(&mut self) -> Result<&NavState, NavigationError> {
        if self.cancel.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }

        let state = std::mem::replace(&mut self.state, NavState::Idle);
        trace!(target: "catalogscrape::navigator", "{}: leaving {state}", self.source());
        let next = match state {
            NavState::Idle => self.enter_catalog().await?,
            NavState::AtCategoryList => self.next_category().await?,
            NavState::AtCategory { category } => self.next_material(category).await?,
            NavState::AtMaterialExpanded {
                category,
                material,
                variants,
                next_variant,
                harvested,
            } => {
                self.next_variant(category, material, variants, next_variant, harvested)
                    .await?
            }
            NavState::AtDetailModal {
                category,
                material,
                variant,
                variants,
                harvested,
            } => {
                self.harvest_detail(category, material, variant, variants, harvested)
                    .await?
            }
            NavState::AllCategoriesProcessed => NavState::AllCategoriesProcessed,
        };

        debug!(target: "catalogscrape::navigator", "{}: -> {next}", self.source());
        self.transitions += 1;
        self.state = next;
        Ok(&self.state)
    }

    fn into_outcome(self) -> TraversalOutcome {
        TraversalOutcome {
            source: self.profile.source,
            materials_visited: self.progress.visited_count(),
            failed_materials: self.failed_materials,
            transitions: self.transitions,
            records: self.records.into_vec(),
        }
    }

    // Idle -> AtCategoryList

    async fn enter_catalog(&mut self) -> Result<NavState, NavigationError> {
        let source = self.source();
        info!(target: "catalogscrape::navigator", "{source}: loading {}", self.profile.entry_url);

        if let Err(e) = self.driver().goto(self.profile.entry_url).await {
            let reason = escalate(e.into())?;
            warn!(target: "catalogscrape::navigator", "{source}: entry page load reported: {reason}");
        }

        let timeout_ms = self.settings.entry_timeout_ms;
        let ready = self
            .executor
            .wait_for(&Target::ReadyMarker, Condition::Present, Duration::from_millis(timeout_ms))
            .await
            .map_err(|e| NavigationError::Fatal(e.to_string()))?;

        if !ready {
            self.sink().log(
                Severity::Error,
                format!("{source}: category filter did not render within {timeout_ms}ms"),
            );
            capture_screenshot(self.driver(), self.sink(), "entry", &Target::ReadyMarker.slug()).await;
            if self.dump_entry_page {
                dump_entry_page(self.driver(), self.sink(), source).await;
            }
            return Err(NavigationError::EntryTimeout {
                site: source,
                timeout_ms,
            });
        }

        Ok(NavState::AtCategoryList)
    }

    // AtCategoryList -> AtCategory | AllCategoriesProcessed

    async fn next_category(&mut self) -> Result<NavState, NavigationError> {
        let source = self.source();

        if !self.progress.categories_listed() {
            let names = match self.driver().names(&NameList::Categories).await {
                Ok(names) => names,
                Err(e) => {
                    let reason = escalate(e.into())?;
                    self.sink()
                        .log(Severity::Warn, format!("{source}: could not list categories: {reason}"));
                    Vec::new()
                }
            };
            self.progress.enqueue_categories(names);
            let queued: Vec<String> = self.progress.pending_categories().iter().cloned().collect();
            if queued.is_empty() {
                self.sink()
                    .log(Severity::Warn, format!("{source}: no categories found"));
            }
            self.sink()
                .log_event(HarvestEvent::categories_discovered(source, queued));
        }

        let Some(category) = self.progress.next_category() else {
            return Ok(NavState::AllCategoriesProcessed);
        };

        self.sink()
            .log_event(HarvestEvent::category_started(source, &category));
        match self.enter_category(&category).await {
            Ok(()) => Ok(NavState::AtCategory { category }),
            Err(fault) => {
                let reason = escalate(fault)?;
                self.fail_category(&category, reason).await?;
                Ok(NavState::AtCategoryList)
            }
        }
    }

    // AtCategory -> AtMaterialExpanded | AtCategoryList

    async fn next_material(&mut self, category: String) -> Result<NavState, NavigationError> {
        let listed = match self.list_materials(&category).await {
            Ok(listed) => listed,
            Err(fault) => {
                let reason = escalate(fault)?;
                self.fail_category(&category, reason).await?;
                return Ok(NavState::AtCategoryList);
            }
        };

        let Some(material) = self.progress.first_unvisited(&category, &listed).cloned() else {
            info!(
                target: "catalogscrape::navigator",
                "{}: category '{category}' done, {} material(s) visited",
                self.source(),
                self.progress.visited_in(&category)
            );
            if let Err(fault) = self.reset_filters().await {
                escalate(fault)?;
            }
            return Ok(NavState::AtCategoryList);
        };

        debug!(target: "catalogscrape::navigator", "{}: opening '{material}' in '{category}'", self.source());
        match self.open_material(&category, &material).await {
            Ok(variants) => Ok(NavState::AtMaterialExpanded {
                category,
                material,
                variants,
                next_variant: 0,
                harvested: Vec::new(),
            }),
            Err(fault) => {
                let reason = escalate(fault)?;
                self.fail_material(category, material, Vec::new(), reason)
                    .await
            }
        }
    }

    // AtMaterialExpanded -> AtDetailModal | (material finished) AtCategory

    async fn next_variant(
        &mut self,
        category: String,
        material: String,
        variants: usize,
        next_variant: usize,
        harvested: Vec<SpecRecord>,
    ) -> Result<NavState, NavigationError> {
        if next_variant >= variants {
            return self.complete_material(category, material, harvested).await;
        }

        match self.open_variant(&category, &material, next_variant).await {
            Ok(()) => Ok(NavState::AtDetailModal {
                category,
                material,
                variant: next_variant,
                variants,
                harvested,
            }),
            Err(fault) => {
                let reason = escalate(fault)?;
                self.sink().log(
                    Severity::Warn,
                    format!(
                        "{}: {} could not be opened: {reason}",
                        self.source(),
                        breadcrumb(&category, &material, Some(next_variant))
                    ),
                );
                if let Err(fault) = self.close_detail().await {
                    escalate(fault)?;
                }
                Ok(NavState::AtMaterialExpanded {
                    category,
                    material,
                    variants,
                    next_variant: next_variant + 1,
                    harvested,
                })
            }
        }
    }

    // AtDetailModal -> AtMaterialExpanded

    async fn harvest_detail(
        &mut self,
        category: String,
        material: String,
        variant: usize,
        variants: usize,
        mut harvested: Vec<SpecRecord>,
    ) -> Result<NavState, NavigationError> {
        let source = self.source();

        match self.driver().region_html().await {
            Ok(Some(html)) => {
                let outcome = extraction::analyze(&html, &ExtractionContext::new(source, &category, &material));
                for note in &outcome.notes {
                    debug!(target: "catalogscrape::extraction", "{source}: '{material}': {note}");
                }
                if outcome.records.is_empty() {
                    self.sink().log(
                        Severity::Warn,
                        format!("{source}: no records in {}", breadcrumb(&category, &material, Some(variant))),
                    );
                } else {
                    debug!(
                        target: "catalogscrape::extraction",
                        "{source}: '{material}' read as {} layout, {} record(s)",
                        outcome.layout,
                        outcome.records.len()
                    );
                }
                harvested.extend(outcome.records);
            }
            Ok(None) => self.sink().log(
                Severity::Warn,
                format!("{source}: detail region of '{material}' not found"),
            ),
            Err(e) => {
                let reason = escalate(e.into())?;
                self.sink().log(
                    Severity::Warn,
                    format!("{source}: could not read detail of '{material}': {reason}"),
                );
            }
        }

        if let Err(fault) = self.close_detail().await {
            escalate(fault)?;
        }

        Ok(NavState::AtMaterialExpanded {
            category,
            material,
            variants,
            next_variant: variant + 1,
            harvested,
        })
    }

    // Material bookkeeping

    fn record_material(&mut self, category: &str, material: &str, harvested: Vec<SpecRecord>) -> usize {
        let ctx = ExtractionContext::new(self.source(), category, material);
        let kept = self
            .records
            .extend(extraction::finish_material(harvested, &ctx));
        self.progress.mark_visited(category, material);
        kept
    }

    async fn complete_material(
        &mut self,
        category: String,
        material: String,
        harvested: Vec<SpecRecord>,
    ) -> Result<NavState, NavigationError> {
        let kept = self.record_material(&category, &material, harvested);
        self.sink().log_event(HarvestEvent::material_harvested(
            self.source(),
            &category,
            &material,
            kept,
        ));
        self.reenter_category(category).await
    }

    async fn fail_material(
        &mut self,
        category: String,
        material: String,
        harvested: Vec<SpecRecord>,
        reason: String,
    ) -> Result<NavState, NavigationError> {
        let target = Target::Material {
            category: category.clone(),
            name: material.clone(),
        };
        warn!(
            target: "catalogscrape::navigator",
            "{}: {} failed: {reason}",
            self.source(),
            breadcrumb(&category, &material, None)
        );
        capture_screenshot(self.driver(), self.sink(), "material-failed", &target.slug()).await;
        self.sink().log_event(HarvestEvent::material_skipped(
            self.source(),
            &category,
            &material,
            reason,
        ));
        self.failed_materials += 1;
        self.record_material(&category, &material, harvested);
        self.reenter_category(category).await
    }

    async fn fail_category(&self, category: &str, reason: String) -> Result<(), NavigationError> {
        capture_screenshot(
            self.driver(),
            self.sink(),
            "category-failed",
            &Target::Category(category.to_string()).slug(),
        )
        .await;
        self.sink()
            .log_event(HarvestEvent::category_failed(self.source(), category, reason));
        if let Err(fault) = self.reset_filters().await {
            escalate(fault)?;
        }
        Ok(())
    }

    /// Back to the category after a material, ready to list again.
    async fn reenter_category(&mut self, category: String) -> Result<NavState, NavigationError> {
        let result = self.prepare_reentry().await;
        let result = match result {
            Ok(()) => self.enter_category(&category).await,
            Err(fault) => Err(fault),
        };
        match result {
            Ok(()) => Ok(NavState::AtCategory { category }),
            Err(fault) => {
                let reason = escalate(fault)?;
                self.fail_category(&category, reason).await?;
                Ok(NavState::AtCategoryList)
            }
        }
    }

    async fn prepare_reentry(&self) -> StepResult<()> {
        if self.profile.reload_entry_between_materials {
            return self.reload_entry().await;
        }
        if self.driver().is_present(&Target::DetailReady).await? {
            self.close_detail().await?;
        }
        Ok(())
    }

    // Page-level helpers

    async fn reload_entry(&self) -> StepResult<()> {
        if let Err(e) = self.driver().goto(self.profile.entry_url).await {
            match Fault::from(e) {
                Fault::Fatal(reason) => return Err(Fault::Fatal(reason)),
                Fault::Recoverable(reason) => {
                    debug!(target: "catalogscrape::navigator", "{}: entry reload reported: {reason}", self.source());
                }
            }
        }
        let ready = self
            .executor
            .wait_for(
                &Target::ReadyMarker,
                Condition::Present,
                Duration::from_millis(self.settings.entry_timeout_ms),
            )
            .await?;
        if ready {
            Ok(())
        } else {
            Err(Fault::Recoverable("entry page did not render on reload".to_string()))
        }
    }

    /// Select `category` and wait for its material list.
    async fn enter_category(&self, category: &str) -> StepResult<()> {
        self.reset_filters().await?;

        let target = Target::Category(category.to_string());
        let action = match self.profile.category_select {
            CategorySelect::Click => Action::Click,
            CategorySelect::Hover => Action::Hover,
        };
        self.executor.perform(action, &target, &self.policy).await?;
        self.executor
            .perform(
                Action::WaitVisible {
                    timeout_ms: self.list_timeout(),
                },
                &Target::MaterialList,
                &self.policy,
            )
            .await?;
        Ok(())
    }

    async fn list_materials(&self, category: &str) -> StepResult<Vec<String>> {
        if self.profile.scroll_for_materials {
            self.settle_scroll().await?;
        }
        let names = self
            .driver()
            .names(&NameList::Materials {
                category: category.to_string(),
            })
            .await?;
        Ok(names)
    }

    /// Scroll to the bottom until the document height stops changing, at
    /// most `max_scroll_rounds` times.
    async fn settle_scroll(&self) -> StepResult<()> {
        let pause = Duration::from_millis(self.settings.scroll_pause_ms);
        let mut last = self.driver().scroll_height().await?;
        for round in 1..=self.settings.max_scroll_rounds {
            self.driver().scroll_to_bottom().await?;
            sleep(pause).await;
            let height = self.driver().scroll_height().await?;
            if height == last {
                trace!(target: "catalogscrape::navigator", "height settled at {height} after {round} round(s)");
                return Ok(());
            }
            last = height;
        }
        debug!(
            target: "catalogscrape::navigator",
            "{}: scroll cap of {} rounds reached",
            self.source(),
            self.settings.max_scroll_rounds
        );
        Ok(())
    }

    /// Expand or follow a material; returns how many detail views it has.
    async fn open_material(&self, category: &str, material: &str) -> StepResult<usize> {
        let target = Target::Material {
            category: category.to_string(),
            name: material.to_string(),
        };

        match self.profile.material_open {
            MaterialOpen::Expand => {
                self.executor
                    .perform(Action::ScrollIntoView, &target, &self.policy)
                    .await?;
                self.executor.perform(Action::Click, &target, &self.policy).await?;
                if !self.profile.has_variant_controls() {
                    return Ok(1);
                }
                let first = Target::VariantControl {
                    category: category.to_string(),
                    material: material.to_string(),
                    index: 0,
                };
                self.executor
                    .perform(
                        Action::WaitVisible {
                            timeout_ms: self.list_timeout(),
                        },
                        &first,
                        &self.policy,
                    )
                    .await?;
                match self.driver().variant_count(category, material).await? {
                    0 => Err(Fault::Recoverable(format!("{target} lists no details"))),
                    n => Ok(n),
                }
            }
            MaterialOpen::FollowLink => {
                let href = self
                    .driver()
                    .link_href(&target)
                    .await?
                    .ok_or_else(|| Fault::Recoverable(format!("{target} has no link")))?;
                debug!(target: "catalogscrape::navigator", "{}: following {href}", self.source());
                self.driver().goto(&href).await?;
                Ok(1)
            }
        }
    }

    /// Open detail view `index` and let it settle.
    async fn open_variant(&self, category: &str, material: &str, index: usize) -> StepResult<()> {
        if self.profile.has_variant_controls() {
            let control = Target::VariantControl {
                category: category.to_string(),
                material: material.to_string(),
                index,
            };
            self.executor.perform(Action::Click, &control, &self.policy).await?;
        }
        self.executor
            .perform(
                Action::WaitVisible {
                    timeout_ms: self.list_timeout(),
                },
                &Target::DetailReady,
                &self.policy,
            )
            .await?;
        self.driver().scroll_to_bottom().await?;
        sleep(Duration::from_millis(self.settings.scroll_pause_ms)).await;
        Ok(())
    }

    /// Close the detail view: close controls first, then the return-to-list
    /// control. Only fatal failures are returned.
    async fn close_detail(&self) -> StepResult<()> {
        let close_count = self.profile.close_controls.len();
        if close_count == 0 && self.profile.back_control.is_none() {
            return Ok(());
        }

        let best_effort = self.policy.best_effort();
        let candidates = (0..close_count)
            .map(Target::CloseControl)
            .chain(self.profile.back_control.map(|_| Target::BackControl));

        for target in candidates {
            match self.driver().is_present(&target).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => match Fault::from(e) {
                    Fault::Fatal(reason) => return Err(Fault::Fatal(reason)),
                    Fault::Recoverable(reason) => {
                        trace!(target: "catalogscrape::navigator", "probing {target}: {reason}");
                        continue;
                    }
                },
            }
            match self.executor.perform(Action::Click, &target, &best_effort).await {
                Ok(()) => {
                    debug!(target: "catalogscrape::navigator", "detail closed via {target}");
                    return Ok(());
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => debug!(target: "catalogscrape::navigator", "{e}"),
            }
        }

        self.sink().log(
            Severity::Warn,
            format!(
                "{}: no close or return control worked for the detail view, continuing",
                self.source()
            ),
        );
        Ok(())
    }

    /// Clear filters left active. Only fatal failures are returned.
    async fn reset_filters(&self) -> StepResult<()> {
        if self.profile.active_filter.is_none() || self.profile.filter_reset.is_none() {
            return Ok(());
        }

        match self.driver().is_present(&Target::ActiveFilter).await {
            Ok(false) => return Ok(()),
            Ok(true) => {}
            Err(e) => {
                return match Fault::from(e) {
                    Fault::Fatal(reason) => Err(Fault::Fatal(reason)),
                    Fault::Recoverable(reason) => {
                        debug!(target: "catalogscrape::navigator", "filter check failed: {reason}");
                        Ok(())
                    }
                };
            }
        }

        match self
            .executor
            .perform(Action::Click, &Target::FilterReset, &self.policy.best_effort())
            .await
        {
            Ok(()) => {
                self.executor
                    .wait_for(
                        &Target::ReadyMarker,
                        Condition::Present,
                        Duration::from_millis(self.list_timeout()),
                    )
                    .await?;
                debug!(target: "catalogscrape::navigator", "{}: filters reset", self.source());
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                self.sink()
                    .log(Severity::Warn, format!("{}: filter reset failed: {e}", self.source()));
                Ok(())
            }
        }
    }
}
