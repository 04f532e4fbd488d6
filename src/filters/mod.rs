//! Filters Module
//!
//! Filter selections for the tools listing and the debounced, batched
//! notification of their changes.

mod facade;
mod query;
mod scheduler;
mod state;

pub use facade::{DebouncedFilters, FilterCallback, FilterConfig};
pub use query::{patch_from_query, patch_from_query_string, to_query_params, to_query_string};
pub use scheduler::{ChangeScheduler, FireHandler, FireToken, TimerKind, TimerSlot};
pub use state::{FilterPatch, FilterState, DEFAULT_SORT};
