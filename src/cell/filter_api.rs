//! Dashboard-wide filter API and its per-cell binding
//!
//! Charts can push filters onto the dashboard (clicking a bar, picking a
//! value in a filter box). The dashboard keeps them keyed by the slice that
//! emitted them; a cell hands its chart a [`ScopedFilterApi`] so the chart
//! never has to know its own slice id.

use crate::core::SliceId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Column → selected values emitted by one slice
pub type SliceFilters = BTreeMap<String, Vec<String>>;

pub trait DashboardFilterApi: Send + Sync {
    fn add_filter(&self, slice_id: SliceId, column: &str, values: &[String], merge: bool, refresh: bool);

    fn get_filters(&self, slice_id: SliceId) -> SliceFilters;

    fn clear_filter(&self, slice_id: SliceId);

    fn remove_filter(&self, slice_id: SliceId, column: &str, values: &[String], refresh: bool);
}

/// The dashboard filter API bound to one slice
#[derive(Clone)]
pub struct ScopedFilterApi {
    slice_id: SliceId,
    api: Arc<dyn DashboardFilterApi>,
}

impl ScopedFilterApi {
    pub fn new(slice_id: SliceId, api: Arc<dyn DashboardFilterApi>) -> Self {
        Self { slice_id, api }
    }

    pub fn slice_id(&self) -> SliceId {
        self.slice_id
    }

    pub fn add_filter(&self, column: &str, values: &[String], merge: bool, refresh: bool) {
        self.api.add_filter(self.slice_id, column, values, merge, refresh);
    }

    pub fn get_filters(&self) -> SliceFilters {
        self.api.get_filters(self.slice_id)
    }

    pub fn clear_filter(&self) {
        self.api.clear_filter(self.slice_id);
    }

    pub fn remove_filter(&self, column: &str, values: &[String], refresh: bool) {
        self.api.remove_filter(self.slice_id, column, values, refresh);
    }
}

impl fmt::Debug for ScopedFilterApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedFilterApi")
            .field("slice_id", &self.slice_id)
            .finish_non_exhaustive()
    }
}

/// Process-local dashboard filter registry
#[derive(Debug, Default)]
pub struct InMemoryFilterApi {
    filters: Mutex<HashMap<SliceId, SliceFilters>>,
}

impl InMemoryFilterApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_filters<R>(&self, f: impl FnOnce(&mut HashMap<SliceId, SliceFilters>) -> R) -> R {
        let mut guard = match self.filters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl DashboardFilterApi for InMemoryFilterApi {
    fn add_filter(&self, slice_id: SliceId, column: &str, values: &[String], merge: bool, refresh: bool) {
        debug!(%slice_id, column, merge, refresh, "dashboard filter added");
        self.with_filters(|all| {
            let current = all
                .entry(slice_id)
                .or_default()
                .entry(column.to_string())
                .or_default();
            if merge {
                for value in values {
                    if !current.contains(value) {
                        current.push(value.clone());
                    }
                }
            } else {
                *current = values.to_vec();
            }
        });
    }

    fn get_filters(&self, slice_id: SliceId) -> SliceFilters {
        self.with_filters(|all| all.get(&slice_id).cloned().unwrap_or_default())
    }

    fn clear_filter(&self, slice_id: SliceId) {
        debug!(%slice_id, "dashboard filters cleared");
        self.with_filters(|all| {
            all.remove(&slice_id);
        });
    }

    fn remove_filter(&self, slice_id: SliceId, column: &str, values: &[String], refresh: bool) {
        debug!(%slice_id, column, refresh, "dashboard filter removed");
        self.with_filters(|all| {
            let Some(slice_filters) = all.get_mut(&slice_id) else {
                return;
            };
            if let Some(current) = slice_filters.get_mut(column) {
                current.retain(|v| !values.contains(v));
                if current.is_empty() {
                    slice_filters.remove(column);
                }
            }
        });
    }
}
