//! JavaScript bridge evaluated through `Runtime.evaluate`
//!
//! Targets are resolved inside the page on every call instead of holding
//! remote element handles, so a DOM re-render between two actions shows up as
//! "missing" or "stale" rather than as a dangling CDP node id.

use serde::{Deserialize, Serialize};

use super::{DriverError, DriverResult, NameList, Target};
use crate::catalog::{ListSpec, Locator, MaterialScope, SiteProfile};

/// In-page element resolution recipe.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum Resolve {
    /// `index`-th element matching `css` (and containing `text`) under `scope`.
    Locator {
        css: &'static str,
        text: Option<&'static str>,
        index: usize,
        scope: Option<Box<Resolve>>,
    },
    /// Item of a named list whose normalized label equals `name`; `part`
    /// narrows to a child of the item.
    ListItem {
        item: &'static str,
        label: Option<&'static str>,
        title_case: bool,
        name: String,
        part: Option<&'static str>,
        scope: Option<Box<Resolve>>,
    },
}

impl Resolve {
    fn locator(loc: Locator, index: usize, scope: Option<Resolve>) -> Self {
        Self::Locator {
            css: loc.css,
            text: loc.text,
            index,
            scope: scope.map(Box::new),
        }
    }

    fn list_item(list: &ListSpec, name: &str, part: Option<&'static str>, scope: Option<Resolve>) -> Self {
        Self::ListItem {
            item: list.item,
            label: list.label,
            title_case: list.title_case,
            name: name.to_string(),
            part,
            scope: scope.map(Box::new),
        }
    }
}

fn category_item(profile: &SiteProfile, category: &str, part: Option<&'static str>) -> Resolve {
    Resolve::list_item(&profile.categories, category, part, None)
}

fn material_item(profile: &SiteProfile, category: &str, material: &str, part: Option<&'static str>) -> Resolve {
    let scope = match profile.material_scope {
        MaterialScope::Document => None,
        MaterialScope::WithinCategory => Some(category_item(profile, category, None)),
    };
    Resolve::list_item(&profile.materials, material, part, scope)
}

/// Map a semantic target onto the profile's locators.
///
/// Returns `None` when the site has no such control at all (for example a
/// filter reset on a menu-driven site).
#[must_use]
pub fn resolve_target(profile: &SiteProfile, target: &Target) -> Option<Resolve> {
    match target {
        Target::ReadyMarker => Some(Resolve::locator(profile.ready, 0, None)),
        Target::Category(name) => Some(category_item(profile, name, profile.categories.click)),
        Target::MaterialList => Some(Resolve::locator(profile.material_list_ready, 0, None)),
        Target::Material { category, name } => {
            Some(material_item(profile, category, name, profile.materials.click))
        }
        Target::VariantControl {
            category,
            material,
            index,
        } => profile.variant_controls.map(|loc| {
            Resolve::locator(loc, *index, Some(material_item(profile, category, material, None)))
        }),
        Target::DetailReady => Some(Resolve::locator(profile.detail_ready, 0, None)),
        Target::CloseControl(i) => profile
            .close_controls
            .get(*i)
            .map(|loc| Resolve::locator(*loc, 0, None)),
        Target::BackControl => profile.back_control.map(|loc| Resolve::locator(loc, 0, None)),
        Target::ActiveFilter => profile.active_filter.map(|loc| Resolve::locator(loc, 0, None)),
        Target::FilterReset => profile.filter_reset.map(|loc| Resolve::locator(loc, 0, None)),
    }
}

/// Payload handed to [`BRIDGE_JS`].
#[derive(Debug, Serialize)]
pub struct ScriptRequest<'a> {
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Resolve>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<&'a ListSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Resolve>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<&'a [&'static str]>,
}

impl<'a> ScriptRequest<'a> {
    #[must_use]
    pub fn op(op: &'static str) -> Self {
        Self {
            op,
            target: None,
            list: None,
            scope: None,
            regions: None,
        }
    }

    #[must_use]
    pub fn on(op: &'static str, target: Resolve) -> Self {
        Self {
            target: Some(target),
            ..Self::op(op)
        }
    }

    #[must_use]
    pub fn names(profile: &'a SiteProfile, list: &NameList) -> Self {
        match list {
            NameList::Categories => Self {
                list: Some(&profile.categories),
                ..Self::op("names")
            },
            NameList::Materials { category } => Self {
                list: Some(&profile.materials),
                scope: match profile.material_scope {
                    MaterialScope::Document => None,
                    MaterialScope::WithinCategory => Some(category_item(profile, category, None)),
                },
                ..Self::op("names")
            },
        }
    }

    #[must_use]
    pub fn region(profile: &'a SiteProfile) -> Self {
        Self {
            regions: Some(profile.detail_region),
            ..Self::op("region")
        }
    }

    /// Render the request as a self-invoking expression.
    pub fn to_expression(&self) -> DriverResult<String> {
        let payload = serde_json::to_string(self)
            .map_err(|e| DriverError::Other(format!("Failed to encode script request: {e}")))?;
        Ok(format!("({BRIDGE_JS})({payload})"))
    }
}

/// Viewport point the `hover` operation resolves a target to.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HoverPoint {
    pub x: f64,
    pub y: f64,
}

/// Reply shape returned by every bridge operation.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptReply {
    pub status: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ScriptReply {
    /// Translate the in-page status into a driver result.
    pub fn into_value(self, what: &Target) -> DriverResult<serde_json::Value> {
        match self.status.as_str() {
            "ok" => Ok(self.value),
            "missing" => Err(DriverError::NotFound(what.to_string())),
            "stale" => Err(DriverError::Stale(what.to_string())),
            "not_interactable" => Err(DriverError::NotInteractable(what.to_string())),
            "intercepted" => Err(DriverError::Intercepted(what.to_string())),
            other => Err(DriverError::Other(format!(
                "Unexpected bridge status '{other}' for {what}"
            ))),
        }
    }
}

/// In-page half of the bridge. Whitespace normalization mirrors
/// [`crate::utils::collapse_whitespace`]; menus flagged `title_case` are
/// re-cased in the page.
pub const BRIDGE_JS: &str = r#"function (req) {
    const norm = (t) => (t || '').replace(/\s+/g, ' ').trim();
    const titleCase = (t) => {
        let out = '';
        let prev = false;
        for (const c of t) {
            const letter = c.toLowerCase() !== c.toUpperCase();
            out += letter ? (prev ? c.toLowerCase() : c.toUpperCase()) : c;
            prev = letter;
        }
        return out;
    };
    const labelOf = (el, spec) => {
        const src = spec.label ? el.querySelector(spec.label) : el;
        if (!src) return null;
        const text = norm(src.textContent);
        return spec.title_case ? titleCase(text) : text;
    };
    const resolveAll = (r) => {
        const root = r.scope ? resolve(r.scope) : document;
        if (!root) return [];
        if (r.kind === 'Locator') {
            return Array.from(root.querySelectorAll(r.css))
                .filter((el) => !r.text || norm(el.textContent).includes(r.text));
        }
        const hits = Array.from(root.querySelectorAll(r.item)).filter((el) => labelOf(el, r) === r.name);
        return hits.map((el) => (r.part ? el.querySelector(r.part) || el : el));
    };
    const resolve = (r) => {
        const hits = resolveAll(r);
        const idx = r.kind === 'Locator' ? r.index : 0;
        return hits[idx] || null;
    };
    const visible = (el) => {
        if (!el || !el.isConnected) return false;
        const style = window.getComputedStyle(el);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    };
    const covered = (el) => {
        const rect = el.getBoundingClientRect();
        const x = rect.left + rect.width / 2;
        const y = rect.top + rect.height / 2;
        if (x < 0 || y < 0 || x > window.innerWidth || y > window.innerHeight) return false;
        const top = document.elementFromPoint(x, y);
        return !!top && top !== el && !el.contains(top) && !top.contains(el);
    };
    switch (req.op) {
        case 'click': {
            const el = resolve(req.target);
            if (!el) return { status: 'missing' };
            el.scrollIntoView({ block: 'center', inline: 'center' });
            if (!el.isConnected) return { status: 'stale' };
            if (el.disabled || !visible(el)) return { status: 'not_interactable' };
            if (covered(el)) return { status: 'intercepted' };
            el.click();
            return { status: 'ok' };
        }
        case 'hover': {
            const el = resolve(req.target);
            if (!el) return { status: 'missing' };
            el.scrollIntoView({ block: 'center', inline: 'center' });
            if (!el.isConnected) return { status: 'stale' };
            if (!visible(el)) return { status: 'not_interactable' };
            const rect = el.getBoundingClientRect();
            return { status: 'ok', value: { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 } };
        }
        case 'scroll': {
            const el = resolve(req.target);
            if (!el) return { status: 'missing' };
            el.scrollIntoView({ block: 'center', inline: 'center' });
            return { status: 'ok' };
        }
        case 'present':
            return { status: 'ok', value: resolve(req.target) !== null };
        case 'visible':
            return { status: 'ok', value: visible(resolve(req.target)) };
        case 'href': {
            const el = resolve(req.target);
            if (!el) return { status: 'missing' };
            return { status: 'ok', value: el.href ? String(el.href) : null };
        }
        case 'count':
            return { status: 'ok', value: resolveAll(req.target).length };
        case 'names': {
            const root = req.scope ? resolve(req.scope) : document;
            if (!root) return { status: 'missing' };
            const names = Array.from(root.querySelectorAll(req.list.item))
                .map((el) => labelOf(el, req.list))
                .filter((n) => n);
            return { status: 'ok', value: names };
        }
        case 'region': {
            for (const css of req.regions) {
                const el = document.querySelector(css);
                if (el) return { status: 'ok', value: el.outerHTML };
            }
            return { status: 'ok', value: null };
        }
        case 'height': {
            const body = document.body ? document.body.scrollHeight : 0;
            return { status: 'ok', value: Math.max(body, document.documentElement.scrollHeight) };
        }
        case 'bottom':
            window.scrollTo(0, document.body ? document.body.scrollHeight : 0);
            return { status: 'ok' };
        default:
            return { status: 'unknown_op' };
    }
}"#;
