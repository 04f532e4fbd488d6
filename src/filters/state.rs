//! Filter State Module
//!
//! The current filter selections and partial updates to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sort order used when nothing else is selected.
pub const DEFAULT_SORT: &str = "name";

// == Filter State ==
/// Current filter selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub search_query: String,
    pub selected_category: String,
    pub selected_price: String,
    /// Ordered, without duplicates
    pub selected_keywords: Vec<String>,
    pub sort_by: String,
    /// Additional named filters
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            selected_category: String::new(),
            selected_price: String::new(),
            selected_keywords: Vec::new(),
            sort_by: DEFAULT_SORT.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

impl FilterState {
    // == Comparison ==
    /// Field-wise equality, with keywords compared as a set.
    pub fn same_selection(&self, other: &FilterState) -> bool {
        self.search_query == other.search_query
            && self.selected_category == other.selected_category
            && self.selected_price == other.selected_price
            && self.sort_by == other.sort_by
            && self.extra == other.extra
            && self.selected_keywords.len() == other.selected_keywords.len()
            && self
                .selected_keywords
                .iter()
                .all(|keyword| other.has_keyword(keyword))
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.selected_keywords.iter().any(|k| k == keyword)
    }

    /// Appends `keyword` unless it is already selected.
    ///
    /// Returns whether the selection changed.
    pub fn add_keyword(&mut self, keyword: &str) -> bool {
        if self.has_keyword(keyword) {
            return false;
        }
        self.selected_keywords.push(keyword.to_string());
        true
    }

    /// Returns whether the selection changed.
    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let before = self.selected_keywords.len();
        self.selected_keywords.retain(|k| k != keyword);
        before != self.selected_keywords.len()
    }

    // == Active Filters ==
    /// True when any of search, category, price or keywords is set.
    ///
    /// Sort order is not a filter.
    pub fn has_active_filters(&self) -> bool {
        self.active_filters_count() > 0
    }

    pub fn active_filters_count(&self) -> usize {
        [
            !self.search_query.is_empty(),
            !self.selected_category.is_empty(),
            !self.selected_price.is_empty(),
            !self.selected_keywords.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    // == Apply Patch ==
    /// Overwrites every field the patch carries.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(search) = patch.search_query {
            self.search_query = search;
        }
        if let Some(category) = patch.selected_category {
            self.selected_category = category;
        }
        if let Some(price) = patch.selected_price {
            self.selected_price = price;
        }
        if let Some(keywords) = patch.selected_keywords {
            self.selected_keywords.clear();
            for keyword in keywords {
                self.add_keyword(&keyword);
            }
        }
        if let Some(sort) = patch.sort_by {
            self.sort_by = sort;
        }
        self.extra.extend(patch.extra);
    }
}

// == Filter Patch ==
/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPatch {
    pub search_query: Option<String>,
    pub selected_category: Option<String>,
    pub selected_price: Option<String>,
    pub selected_keywords: Option<Vec<String>>,
    pub sort_by: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl FilterPatch {
    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.selected_category = Some(category.into());
        self
    }

    pub fn price(mut self, price: impl Into<String>) -> Self {
        self.selected_price = Some(price.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort_by = Some(sort.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_keywords(keywords: &[&str]) -> FilterState {
        FilterState {
            selected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..FilterState::default()
        }
    }

    #[test]
    fn test_default_sort_is_name() {
        let state = FilterState::default();
        assert_eq!(state.sort_by, "name");
        assert!(!state.has_active_filters());
    }

    #[test]
    fn test_keywords_compared_as_set() {
        assert!(with_keywords(&["a", "b"]).same_selection(&with_keywords(&["b", "a"])));
        assert!(!with_keywords(&["a", "b"]).same_selection(&with_keywords(&["a"])));
        assert!(!with_keywords(&["a", "b"]).same_selection(&with_keywords(&["a", "c"])));
    }

    #[test]
    fn test_scalar_fields_compared() {
        let a = FilterState::default();
        let mut b = FilterState::default();
        b.sort_by = "rating".into();
        assert!(!a.same_selection(&b));

        let mut c = FilterState::default();
        c.extra.insert("platform".into(), "web".into());
        assert!(!a.same_selection(&c));
    }

    #[test]
    fn test_add_keyword_keeps_set_semantics() {
        let mut state = FilterState::default();
        assert!(state.add_keyword("x"));
        assert!(!state.add_keyword("x"));
        assert!(state.add_keyword("y"));
        assert_eq!(state.selected_keywords, vec!["x", "y"]);
    }

    #[test]
    fn test_active_filters_count_ignores_sort() {
        let mut state = FilterState::default();
        state.sort_by = "newest".into();
        assert_eq!(state.active_filters_count(), 0);

        state.search_query = "ai".into();
        state.add_keyword("llm");
        state.add_keyword("chat");
        assert_eq!(state.active_filters_count(), 2);
    }

    #[test]
    fn test_apply_patch_dedupes_keywords() {
        let mut state = FilterState::default();
        state.search_query = "keep".into();
        state.apply(FilterPatch::default().category("dev").keywords(["a", "b", "a"]));

        assert_eq!(state.search_query, "keep");
        assert_eq!(state.selected_category, "dev");
        assert_eq!(state.selected_keywords, vec!["a", "b"]);
    }

    #[test]
    fn test_patch_deserializes_camel_case() {
        let patch: FilterPatch =
            serde_json::from_str(r#"{"searchQuery":"x","sortBy":"rating","platform":"web"}"#)
                .unwrap();
        assert_eq!(patch.search_query.as_deref(), Some("x"));
        assert_eq!(patch.sort_by.as_deref(), Some("rating"));
        assert_eq!(patch.extra.get("platform").map(String::as_str), Some("web"));
    }
}
