//! Filter Facade Module
//!
//! The only way to mutate [`FilterState`]. Every mutation is handed to the
//! [`ChangeScheduler`]; when a burst ends the state is compared with the
//! last applied one and the change callback runs only if they differ.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::debug;

use crate::cache::Params;
use crate::config::Config;
use crate::filters::query::{
    patch_from_query, patch_from_query_string, to_query_params, to_query_string,
};
use crate::filters::scheduler::{ChangeScheduler, FireHandler, FireToken};
use crate::filters::{FilterPatch, FilterState};

/// Receives a copy of the filters each time an applied change is delivered.
pub type FilterCallback = Arc<dyn Fn(FilterState) + Send + Sync>;

// == Filter Config ==
#[derive(Clone)]
pub struct FilterConfig {
    /// Quiet period after the last mutation
    pub debounce: Duration,
    /// Maximum delay from the first mutation of a burst
    pub batch_timeout: Duration,
    pub on_filter_change: Option<FilterCallback>,
    /// Applied on top of the defaults at construction
    pub initial_filters: FilterPatch,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            batch_timeout: Duration::from_millis(1500),
            on_filter_change: None,
            initial_filters: FilterPatch::default(),
        }
    }
}

impl FilterConfig {
    /// Takes the timing defaults from the gateway config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            batch_timeout: Duration::from_millis(config.batch_timeout_ms),
            ..Self::default()
        }
    }

    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(FilterState) + Send + Sync + 'static,
    {
        self.on_filter_change = Some(Arc::new(callback));
        self
    }

    pub fn initial(mut self, filters: FilterPatch) -> Self {
        self.initial_filters = filters;
        self
    }
}

impl std::fmt::Debug for FilterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterConfig")
            .field("debounce", &self.debounce)
            .field("batch_timeout", &self.batch_timeout)
            .field("on_filter_change", &self.on_filter_change.is_some())
            .field("initial_filters", &self.initial_filters)
            .finish()
    }
}

struct FacadeState {
    filters: FilterState,
    last_applied: FilterState,
    scheduler: ChangeScheduler,
}

fn lock(state: &Mutex<FacadeState>) -> MutexGuard<'_, FacadeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Debounced Filters ==
/// Filter state with debounced, batched change notification.
///
/// Mutations must be made from within a tokio runtime since they arm
/// timers. Dropping the facade cancels any pending timers.
pub struct DebouncedFilters {
    state: Arc<Mutex<FacadeState>>,
    callback: Option<FilterCallback>,
}

impl DebouncedFilters {
    pub fn new(config: FilterConfig) -> Self {
        let FilterConfig {
            debounce,
            batch_timeout,
            on_filter_change,
            initial_filters,
        } = config;

        let mut filters = FilterState::default();
        filters.apply(initial_filters);

        let callback = on_filter_change.clone();
        let state = Arc::new_cyclic(|weak: &Weak<Mutex<FacadeState>>| {
            let weak = weak.clone();
            let on_fire: FireHandler = Arc::new(move |token: FireToken| {
                if let Some(state) = weak.upgrade() {
                    deliver(&state, callback.as_ref(), Some(token));
                }
            });
            Mutex::new(FacadeState {
                last_applied: filters.clone(),
                filters,
                scheduler: ChangeScheduler::new(debounce, batch_timeout, on_fire),
            })
        });

        Self {
            state,
            callback: on_filter_change,
        }
    }

    fn mutate<F>(&self, change: F)
    where
        F: FnOnce(&mut FilterState),
    {
        let mut guard = lock(&self.state);
        change(&mut guard.filters);
        guard.scheduler.schedule();
    }

    // == Setters ==
    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.mutate(|f| f.search_query = query);
    }

    pub fn set_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.mutate(|f| f.selected_category = category);
    }

    pub fn set_price(&self, price: impl Into<String>) {
        let price = price.into();
        self.mutate(|f| f.selected_price = price);
    }

    pub fn set_sort_by(&self, sort: impl Into<String>) {
        let sort = sort.into();
        self.mutate(|f| f.sort_by = sort);
    }

    /// Selects `keyword` if absent. Schedules either way.
    pub fn add_keyword(&self, keyword: &str) {
        self.mutate(|f| {
            f.add_keyword(keyword);
        });
    }

    pub fn remove_keyword(&self, keyword: &str) {
        self.mutate(|f| {
            f.remove_keyword(keyword);
        });
    }

    pub fn toggle_keyword(&self, keyword: &str) {
        self.mutate(|f| {
            if !f.remove_keyword(keyword) {
                f.add_keyword(keyword);
            }
        });
    }

    pub fn clear_keywords(&self) {
        self.mutate(|f| f.selected_keywords.clear());
    }

    /// Resets every field, extension filters included, to its default.
    pub fn clear_all_filters(&self) {
        self.mutate(|f| *f = FilterState::default());
    }

    /// Bulk assignment of the fields the patch carries.
    pub fn set_filters(&self, patch: FilterPatch) {
        self.mutate(|f| f.apply(patch));
    }

    // == Immediate Apply ==
    /// Cancels pending timers and runs the compare-and-notify step now.
    pub fn apply_filters_now(&self) {
        deliver(&self.state, self.callback.as_ref(), None);
    }

    // == Hydration ==
    /// Loads filters recovered from navigation state.
    ///
    /// Updates both the current and the last applied filters and does not
    /// schedule, so no notification follows.
    pub fn init_from_query<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.hydrate(patch_from_query(pairs));
    }

    pub fn init_from_query_string(&self, query: &str) {
        self.hydrate(patch_from_query_string(query));
    }

    fn hydrate(&self, patch: FilterPatch) {
        let mut guard = lock(&self.state);
        guard.filters.apply(patch);
        guard.last_applied = guard.filters.clone();
        debug!(filters = ?guard.filters, "Filters hydrated from query");
    }

    // == Accessors ==
    pub fn filters(&self) -> FilterState {
        lock(&self.state).filters.clone()
    }

    /// Filters as of the last delivered notification (or hydration).
    pub fn last_applied(&self) -> FilterState {
        lock(&self.state).last_applied.clone()
    }

    /// True while a burst is waiting for its timers.
    pub fn pending_changes(&self) -> bool {
        lock(&self.state).scheduler.is_pending()
    }

    pub fn timers_armed(&self) -> bool {
        lock(&self.state).scheduler.timers_armed()
    }

    pub fn has_active_filters(&self) -> bool {
        lock(&self.state).filters.has_active_filters()
    }

    pub fn active_filters_count(&self) -> usize {
        lock(&self.state).filters.active_filters_count()
    }

    pub fn query_params(&self) -> Params {
        to_query_params(&lock(&self.state).filters)
    }

    pub fn to_query_string(&self) -> String {
        to_query_string(&lock(&self.state).filters)
    }

    /// Cancels pending timers without notifying.
    pub fn shutdown(&self) {
        lock(&self.state).scheduler.disarm();
    }
}

impl Drop for DebouncedFilters {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DebouncedFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = lock(&self.state);
        f.debug_struct("DebouncedFilters")
            .field("filters", &guard.filters)
            .field("last_applied", &guard.last_applied)
            .field("scheduler", &guard.scheduler)
            .finish()
    }
}

/// Ends the current burst and notifies if the filters moved since the last
/// delivery. `None` means an immediate apply rather than a timer wake-up.
fn deliver(
    state: &Mutex<FacadeState>,
    callback: Option<&FilterCallback>,
    token: Option<FireToken>,
) {
    let changed = {
        let mut guard = lock(state);
        match token {
            Some(token) => {
                if !guard.scheduler.begin_fire(token) {
                    return;
                }
            }
            None => guard.scheduler.disarm(),
        }

        if guard.filters.same_selection(&guard.last_applied) {
            debug!("Filter burst ended without changes");
            None
        } else {
            guard.last_applied = guard.filters.clone();
            Some(guard.filters.clone())
        }
    };

    if let Some(filters) = changed {
        debug!(filters = ?filters, "Filters changed");
        if let Some(callback) = callback {
            callback(filters);
        }
    }
}
