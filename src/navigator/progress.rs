use std::collections::{HashMap, HashSet, VecDeque};

/// Per-run traversal bookkeeping. Never persisted.
///
/// `visited` only grows: once a material is marked (harvested or given up
/// on) it is never offered again, which bounds the traversal.
#[derive(Debug, Clone, Default)]
pub struct TraversalProgress {
    visited: HashMap<String, HashSet<String>>,
    pending_categories: VecDeque<String>,
    categories_listed: bool,
}

impl TraversalProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue categories in DOM order, once per run. Repeated names are
    /// the same category.
    pub fn enqueue_categories<I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        self.categories_listed = true;
        let mut seen: HashSet<String> = self.pending_categories.iter().cloned().collect();
        let before = self.pending_categories.len();
        for name in names {
            if !name.is_empty() && seen.insert(name.clone()) {
                self.pending_categories.push_back(name);
            }
        }
        self.pending_categories.len() - before
    }

    #[must_use]
    pub fn categories_listed(&self) -> bool {
        self.categories_listed
    }

    pub fn next_category(&mut self) -> Option<String> {
        self.pending_categories.pop_front()
    }

    #[must_use]
    pub fn pending_categories(&self) -> &VecDeque<String> {
        &self.pending_categories
    }

    /// Mark `material` visited in `category`. Returns `false` if it already was.
    pub fn mark_visited(&mut self, category: &str, material: &str) -> bool {
        self.visited
            .entry(category.to_string())
            .or_default()
            .insert(material.to_string())
    }

    #[must_use]
    pub fn is_visited(&self, category: &str, material: &str) -> bool {
        self.visited
            .get(category)
            .is_some_and(|materials| materials.contains(material))
    }

    /// First listed material not yet visited.
    #[must_use]
    pub fn first_unvisited<'a>(&self, category: &str, listed: &'a [String]) -> Option<&'a String> {
        listed
            .iter()
            .find(|name| !name.is_empty() && !self.is_visited(category, name))
    }

    #[must_use]
    pub fn visited_in(&self, category: &str) -> usize {
        self.visited.get(category).map_or(0, HashSet::len)
    }

    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.values().map(HashSet::len).sum()
    }
}
