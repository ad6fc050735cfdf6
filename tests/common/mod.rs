//! Test utilities: an in-memory catalog driven through semantic targets
//!
//! The same catalog serves both profiles: categories can be clicked or
//! hovered, materials expanded in place or followed as `mock://` links.

use async_trait::async_trait;
use kodegen_tools_catalogscrape::catalog::{OSH_CUT, SEND_CUT_SEND, SiteProfile};
use kodegen_tools_catalogscrape::config::NavigatorSettings;
use kodegen_tools_catalogscrape::diagnostics::DiagnosticsSink;
use kodegen_tools_catalogscrape::driver::{DriverError, DriverResult, NameList, PageDriver, Target};
use kodegen_tools_catalogscrape::executor::RetryPolicy;
use kodegen_tools_catalogscrape::session::{SessionError, SessionFactory, SiteSession};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const MATERIAL_URL_PREFIX: &str = "mock://";

/// Detail panel for one thickness, in the layout the expanding catalog uses.
#[allow(dead_code)]
pub fn detail_html(thickness: &str, k_factor: &str) -> String {
    format!(
        r#"<div class="materialDescription">
             <div class="materialActionBar"><div class="subHeader">{thickness}" 5052-H32</div></div>
             <table class="metalProperties">
               <tr><td>K-factor</td><td>{k_factor}</td></tr>
               <tr><td>Gauge</td><td>14</td></tr>
             </table>
           </div>"#
    )
}

#[derive(Debug, Clone)]
pub struct MockMaterial {
    pub name: String,
    pub details: Vec<String>,
}

#[allow(dead_code)]
impl MockMaterial {
    pub fn new(name: &str, details: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            details,
        }
    }

    /// One detail per `(thickness, k_factor)` pair.
    pub fn with_thicknesses(name: &str, rows: &[(&str, &str)]) -> Self {
        Self::new(name, rows.iter().map(|(t, k)| detail_html(t, k)).collect())
    }
}

#[derive(Default)]
struct PageState {
    ready: bool,
    selected: Option<String>,
    expanded: Option<(String, String)>,
    detail: Option<String>,
    filter_active: bool,
}

/// In-memory catalog implementing [`PageDriver`] with failure injection.
pub struct MockCatalog {
    categories: Vec<(String, Vec<MockMaterial>)>,
    entry_renders: bool,
    page: Mutex<PageState>,
    queued_failures: Mutex<HashMap<Target, VecDeque<DriverError>>>,
    always_failing: Mutex<HashMap<Target, DriverError>>,
    clicks: Mutex<Vec<Target>>,
    screenshots: AtomicUsize,
    detail_opens: AtomicUsize,
    hidden_lists: HashSet<String>,
    /// Batches appended by scrolling the list; `None` keeps growing forever.
    lazy_batches: Option<usize>,
    list_scrolls: AtomicUsize,
}

#[allow(dead_code)]
impl MockCatalog {
    pub fn new() -> Self {
        Self {
            categories: Vec::new(),
            entry_renders: true,
            page: Mutex::new(PageState::default()),
            queued_failures: Mutex::new(HashMap::new()),
            always_failing: Mutex::new(HashMap::new()),
            clicks: Mutex::new(Vec::new()),
            screenshots: AtomicUsize::new(0),
            detail_opens: AtomicUsize::new(0),
            hidden_lists: HashSet::new(),
            lazy_batches: Some(0),
            list_scrolls: AtomicUsize::new(0),
        }
    }

    /// Selecting `category` works but its material list never shows.
    pub fn hide_material_list(mut self, category: &str) -> Self {
        self.hidden_lists.insert(category.to_string());
        self
    }

    /// The material list grows by one batch per scroll, `batches` times.
    pub fn lazy_loading(mut self, batches: usize) -> Self {
        self.lazy_batches = Some(batches);
        self
    }

    /// Every scroll makes the page taller.
    pub fn endless_scroll(mut self) -> Self {
        self.lazy_batches = None;
        self
    }

    /// Scrolls to the bottom while no detail view was open.
    pub fn list_scrolls(&self) -> usize {
        self.list_scrolls.load(Ordering::SeqCst)
    }

    pub fn category(mut self, name: &str, materials: Vec<MockMaterial>) -> Self {
        self.categories.push((name.to_string(), materials));
        self
    }

    /// The category filter never appears.
    pub fn entry_never_ready(mut self) -> Self {
        self.entry_renders = false;
        self
    }

    /// The next `times` clicks on `target` fail with `error`.
    pub fn fail_clicks(self, target: Target, times: usize, error: DriverError) -> Self {
        if let Ok(mut queued) = self.queued_failures.lock() {
            queued
                .entry(target)
                .or_default()
                .extend(std::iter::repeat_n(error, times));
        }
        self
    }

    /// Every click on `target` fails with `error`.
    pub fn always_fail(self, target: Target, error: DriverError) -> Self {
        if let Ok(mut always) = self.always_failing.lock() {
            always.insert(target, error);
        }
        self
    }

    pub fn clicks(&self) -> Vec<Target> {
        self.clicks.lock().expect("clicks lock").clone()
    }

    pub fn screenshots(&self) -> usize {
        self.screenshots.load(Ordering::SeqCst)
    }

    pub fn detail_opens(&self) -> usize {
        self.detail_opens.load(Ordering::SeqCst)
    }

    fn materials(&self, category: &str) -> Option<&[MockMaterial]> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, materials)| materials.as_slice())
    }

    fn material(&self, category: &str, name: &str) -> Option<&MockMaterial> {
        self.materials(category)?.iter().find(|m| m.name == name)
    }

    fn injected_failure(&self, target: &Target) -> Option<DriverError> {
        let queued = self
            .queued_failures
            .lock()
            .expect("failure lock")
            .get_mut(target)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| {
            self.always_failing
                .lock()
                .expect("failure lock")
                .get(target)
                .cloned()
        })
    }

    fn present(&self, page: &PageState, target: &Target) -> bool {
        match target {
            Target::ReadyMarker => page.ready,
            Target::Category(name) => page.ready && self.materials(name).is_some(),
            Target::MaterialList => page
                .selected
                .as_ref()
                .is_some_and(|category| !self.hidden_lists.contains(category)),
            Target::Material { category, name } => {
                page.selected.as_deref() == Some(category.as_str()) && self.material(category, name).is_some()
            }
            Target::VariantControl {
                category,
                material,
                index,
            } => match &page.expanded {
                Some((c, m)) if c == category && m == material => self
                    .material(category, material)
                    .is_some_and(|mat| *index < mat.details.len()),
                _ => false,
            },
            Target::DetailReady | Target::CloseControl(_) => page.detail.is_some(),
            Target::BackControl => false,
            Target::ActiveFilter | Target::FilterReset => page.filter_active,
        }
    }

    fn activate(&self, target: &Target) -> DriverResult<()> {
        let mut page = self.page.lock().expect("page lock");
        if !self.present(&page, target) {
            return Err(DriverError::NotFound(target.to_string()));
        }
        match target {
            Target::Category(name) => {
                page.selected = Some(name.clone());
                page.expanded = None;
                page.filter_active = true;
            }
            Target::Material { category, name } => {
                page.expanded = Some((category.clone(), name.clone()));
            }
            Target::VariantControl {
                category,
                material,
                index,
            } => {
                let html = self
                    .material(category, material)
                    .and_then(|m| m.details.get(*index))
                    .cloned();
                page.detail = html;
                self.detail_opens.fetch_add(1, Ordering::SeqCst);
            }
            Target::CloseControl(_) | Target::BackControl => page.detail = None,
            Target::FilterReset => {
                page.filter_active = false;
                page.selected = None;
                page.expanded = None;
            }
            _ => return Err(DriverError::NotInteractable(target.to_string())),
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockCatalog {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        let mut page = self.page.lock().expect("page lock");
        // Material pages are `mock://<category>/<material>`; anything else is the entry page.
        if let Some((category, material)) = url.strip_prefix(MATERIAL_URL_PREFIX).and_then(|p| p.split_once('/')) {
            let detail = self
                .material(category, material)
                .and_then(|m| m.details.first())
                .cloned()
                .ok_or_else(|| DriverError::NotFound(url.to_string()))?;
            self.detail_opens.fetch_add(1, Ordering::SeqCst);
            *page = PageState {
                detail: Some(detail),
                ..PageState::default()
            };
            return Ok(());
        }
        *page = PageState {
            ready: self.entry_renders,
            ..PageState::default()
        };
        Ok(())
    }

    async fn click(&self, target: &Target) -> DriverResult<()> {
        self.clicks.lock().expect("clicks lock").push(target.clone());
        if let Some(error) = self.injected_failure(target) {
            return Err(error);
        }
        self.activate(target)
    }

    async fn hover(&self, target: &Target) -> DriverResult<()> {
        self.activate(target)
    }

    async fn scroll_into_view(&self, target: &Target) -> DriverResult<()> {
        let page = self.page.lock().expect("page lock");
        if self.present(&page, target) {
            Ok(())
        } else {
            Err(DriverError::NotFound(target.to_string()))
        }
    }

    async fn is_present(&self, target: &Target) -> DriverResult<bool> {
        let page = self.page.lock().expect("page lock");
        Ok(self.present(&page, target))
    }

    async fn is_visible(&self, target: &Target) -> DriverResult<bool> {
        self.is_present(target).await
    }

    async fn names(&self, list: &NameList) -> DriverResult<Vec<String>> {
        let page = self.page.lock().expect("page lock");
        Ok(match list {
            NameList::Categories => self.categories.iter().map(|(name, _)| name.clone()).collect(),
            NameList::Materials { category } if page.selected.as_deref() == Some(category.as_str()) => self
                .materials(category)
                .map(|ms| ms.iter().map(|m| m.name.clone()).collect())
                .unwrap_or_default(),
            NameList::Materials { .. } => Vec::new(),
        })
    }

    async fn link_href(&self, target: &Target) -> DriverResult<Option<String>> {
        let page = self.page.lock().expect("page lock");
        if !self.present(&page, target) {
            return Err(DriverError::NotFound(target.to_string()));
        }
        Ok(match target {
            Target::Material { category, name } => Some(format!("{MATERIAL_URL_PREFIX}{category}/{name}")),
            _ => None,
        })
    }

    async fn variant_count(&self, category: &str, material: &str) -> DriverResult<usize> {
        Ok(self.material(category, material).map_or(0, |m| m.details.len()))
    }

    async fn region_html(&self) -> DriverResult<Option<String>> {
        Ok(self.page.lock().expect("page lock").detail.clone())
    }

    async fn scroll_height(&self) -> DriverResult<u64> {
        let scrolls = self.list_scrolls();
        let batches = self.lazy_batches.map_or(scrolls, |cap| scrolls.min(cap));
        Ok(1_000 + 500 * batches as u64)
    }

    async fn scroll_to_bottom(&self) -> DriverResult<()> {
        if self.page.lock().expect("page lock").detail.is_none() {
            self.list_scrolls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.screenshots.fetch_add(1, Ordering::SeqCst);
        Ok(b"\x89PNG".to_vec())
    }

    async fn page_source(&self) -> DriverResult<String> {
        Ok("<html><head><title>Just a moment...</title></head><body>Cloudflare</body></html>".to_string())
    }
}

/// Hands out sessions over prepared catalogs, one per profile.
pub struct MockSessions {
    catalogs: Mutex<HashMap<&'static str, Arc<MockCatalog>>>,
    released: Arc<AtomicUsize>,
    acquired: Mutex<HashSet<&'static str>>,
}

#[allow(dead_code)]
impl MockSessions {
    pub fn new() -> Self {
        Self {
            catalogs: Mutex::new(HashMap::new()),
            released: Arc::new(AtomicUsize::new(0)),
            acquired: Mutex::new(HashSet::new()),
        }
    }

    pub fn site(self, profile: &'static SiteProfile, catalog: Arc<MockCatalog>) -> Self {
        if let Ok(mut catalogs) = self.catalogs.lock() {
            catalogs.insert(profile.entry_url, catalog);
        }
        self
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.lock().expect("acquired lock").len()
    }
}

struct MockSession {
    driver: Arc<MockCatalog>,
    released: Arc<AtomicUsize>,
    done: bool,
}

#[async_trait]
impl SiteSession for MockSession {
    fn driver(&self) -> Arc<dyn PageDriver> {
        self.driver.clone()
    }

    async fn release(&mut self) {
        if !self.done {
            self.done = true;
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl SessionFactory for MockSessions {
    async fn acquire(
        &self,
        profile: &'static SiteProfile,
        _sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Box<dyn SiteSession>, SessionError> {
        let driver = self
            .catalogs
            .lock()
            .expect("catalog lock")
            .get(profile.entry_url)
            .cloned()
            .ok_or_else(|| SessionError::Init(format!("no catalog for {}", profile.source)))?;
        self.acquired.lock().expect("acquired lock").insert(profile.entry_url);
        Ok(Box::new(MockSession {
            driver,
            released: Arc::clone(&self.released),
            done: false,
        }))
    }
}

/// Profile with expandable materials and per-thickness detail modals.
#[allow(dead_code)]
pub fn profile() -> &'static SiteProfile {
    &OSH_CUT
}

/// Profile with hover menus and materials on their own pages.
#[allow(dead_code)]
pub fn link_profile() -> &'static SiteProfile {
    &SEND_CUT_SEND
}

/// Retries without delays.
#[allow(dead_code)]
pub fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, 0).with_load_timeout_ms(20)
}

#[allow(dead_code)]
pub fn fast_settings() -> NavigatorSettings {
    NavigatorSettings {
        entry_timeout_ms: 50,
        list_timeout_ms: 50,
        scroll_pause_ms: 0,
        max_scroll_rounds: 3,
    }
}
