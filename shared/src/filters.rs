//! Search filters: radius, a bounded category selection and the free-text
//! query. Radius and category changes need a new search; the query only
//! refilters what is already loaded.

use serde::{Deserialize, Serialize};

use crate::item::{Category, Item};

/// What the caller must do after a filter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Nothing changed.
    None,
    /// Radius or categories changed: issue a new fetch.
    Refetch,
    /// Only the free-text query changed: re-filter the loaded items.
    Refilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// 0 means no radius limit.
    pub radius_km: u32,
    categories: Vec<Category>,
    pub query: String,
    max_categories: usize,
}

impl SearchFilters {
    #[must_use]
    pub fn new(radius_km: u32, max_categories: usize) -> Self {
        Self {
            radius_km,
            categories: Vec::new(),
            query: String::new(),
            max_categories,
        }
    }

    /// Selected categories in the order they were picked.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn is_selected(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    #[must_use]
    pub fn can_add_category(&self) -> bool {
        self.categories.len() < self.max_categories
    }

    /// Removes a selected category, or adds it while below the cap. Adding
    /// past the cap is silently ignored.
    pub fn toggle_category(&mut self, category: Category) -> FilterChange {
        if let Some(pos) = self.categories.iter().position(|c| *c == category) {
            self.categories.remove(pos);
            return FilterChange::Refetch;
        }
        if !self.can_add_category() {
            tracing::debug!(%category, max = self.max_categories, "category cap reached");
            return FilterChange::None;
        }
        self.categories.push(category);
        FilterChange::Refetch
    }

    pub fn set_radius(&mut self, radius_km: u32) -> FilterChange {
        if self.radius_km == radius_km {
            return FilterChange::None;
        }
        self.radius_km = radius_km;
        FilterChange::Refetch
    }

    pub fn set_query(&mut self, query: impl Into<String>) -> FilterChange {
        let query = query.into();
        if self.query == query {
            return FilterChange::None;
        }
        self.query = query;
        FilterChange::Refilter
    }

    /// Comma-joined wire value, `None` when no category is selected.
    #[must_use]
    pub fn category_param(&self) -> Option<String> {
        if self.categories.is_empty() {
            return None;
        }
        Some(
            self.categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        self.query.trim().is_empty() || item.matches_query(&self.query)
    }

    #[must_use]
    pub const fn is_nationwide(&self) -> bool {
        self.radius_km == 0
    }
}
