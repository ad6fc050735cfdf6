//! Fixed site profiles for the two supported catalogs
//!
//! A profile is data, not code: the navigator and the Chromium driver read
//! these locators to resolve semantic targets (a category by name, the n-th
//! "More info" button under a material, ...) against the live DOM.

use serde::Serialize;

use super::Source;

/// CSS selector, optionally narrowed to elements whose normalized text
/// contains `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Locator {
    pub css: &'static str,
    pub text: Option<&'static str>,
}

impl Locator {
    #[must_use]
    pub const fn css(css: &'static str) -> Self {
        Self { css, text: None }
    }

    #[must_use]
    pub const fn with_text(css: &'static str, text: &'static str) -> Self {
        Self {
            css,
            text: Some(text),
        }
    }
}

/// A list of named entities (categories or materials).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListSpec {
    /// Selector matching one element per entity.
    pub item: &'static str,
    /// Sub-selector holding the display name; the item itself when `None`.
    pub label: Option<&'static str>,
    /// Sub-selector receiving clicks; the item itself when `None`.
    pub click: Option<&'static str>,
    /// Normalize names with title casing (menu labels are upper-cased by CSS).
    pub title_case: bool,
}

/// How a category becomes the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategorySelect {
    /// Clicking applies a category filter.
    Click,
    /// Hovering a menu entry reveals its sub-menu.
    Hover,
}

/// How a material's detail view is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaterialOpen {
    /// Click the material header to expand it in place.
    Expand,
    /// Navigate to the material link's `href`.
    FollowLink,
}

/// Where material items live relative to the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaterialScope {
    /// The filtered material list is document-wide.
    Document,
    /// Materials are nested inside the category item (sub-menus).
    WithinCategory,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SiteProfile {
    pub source: Source,
    pub entry_url: &'static str,
    /// Rendered once the category filter is usable.
    pub ready: Locator,
    pub categories: ListSpec,
    pub category_select: CategorySelect,
    pub materials: ListSpec,
    pub material_scope: MaterialScope,
    pub material_open: MaterialOpen,
    /// Present once materials for the selected category are listed.
    pub material_list_ready: Locator,
    /// "More info" style controls under an expanded material. `None` means
    /// the material page itself is the single detail region.
    pub variant_controls: Option<Locator>,
    /// Visible once a detail region has rendered.
    pub detail_ready: Locator,
    /// Candidate roots of the detail region, first match wins.
    pub detail_region: &'static [&'static str],
    pub close_controls: &'static [Locator],
    pub back_control: Option<Locator>,
    /// Present while a filter is applied.
    pub active_filter: Option<Locator>,
    pub filter_reset: Option<Locator>,
    /// Material pages are separate documents; go back to the entry page
    /// before re-entering the category.
    pub reload_entry_between_materials: bool,
    /// Scroll until the document height stabilizes before listing materials.
    pub scroll_for_materials: bool,
}

impl SiteProfile {
    /// Whether each material opens several detail modals.
    #[must_use]
    pub fn has_variant_controls(&self) -> bool {
        self.variant_controls.is_some()
    }
}

pub static OSH_CUT: SiteProfile = SiteProfile {
    source: Source::OshCut,
    entry_url: "https://app.oshcut.com/catalog/sheet",
    ready: Locator::with_text("div.filterBoxHeader", "Material"),
    categories: ListSpec {
        item: "div.supertype.clickable",
        label: Some("b.header"),
        click: None,
        title_case: false,
    },
    category_select: CategorySelect::Click,
    materials: ListSpec {
        item: "div.materialType",
        label: Some("header"),
        click: Some("header"),
        title_case: false,
    },
    material_scope: MaterialScope::Document,
    material_open: MaterialOpen::Expand,
    material_list_ready: Locator::css("div.materialType"),
    variant_controls: Some(Locator::with_text("button", "More info")),
    detail_ready: Locator::css("div.materialDescription"),
    // Whole document; extraction reads only the action-bar header and the
    // `metalProperties` / `MaterialBendTable` tables.
    detail_region: &["body"],
    close_controls: &[Locator::with_text("button", "Close"), Locator::css(".close")],
    back_control: Some(Locator::with_text(".btnTertiary", "Back to Catalog")),
    active_filter: Some(Locator::css("span.pill")),
    filter_reset: Some(Locator::css("span.filterReset")),
    reload_entry_between_materials: false,
    scroll_for_materials: true,
};

pub static SEND_CUT_SEND: SiteProfile = SiteProfile {
    source: Source::SendCutSend,
    entry_url: "https://sendcutsend.com/materials/",
    ready: Locator::css("#menu-1-711fca"),
    categories: ListSpec {
        item: "#menu-1-711fca > li.menu-item-has-children",
        label: Some(":scope > a"),
        click: Some(":scope > a"),
        title_case: true,
    },
    category_select: CategorySelect::Hover,
    materials: ListSpec {
        item: "ul.sub-menu li a",
        label: None,
        click: None,
        title_case: true,
    },
    material_scope: MaterialScope::WithinCategory,
    material_open: MaterialOpen::FollowLink,
    material_list_ready: Locator::css("#menu-1-711fca"),
    variant_controls: None,
    detail_ready: Locator::css("div.e-n-tabs-content"),
    detail_region: &["div.e-n-tabs", "div.e-n-tabs-content"],
    close_controls: &[],
    back_control: None,
    active_filter: None,
    filter_reset: None,
    reload_entry_between_materials: true,
    scroll_for_materials: false,
};
