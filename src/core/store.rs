//! Ordered filter clauses plus their positional value-choice cache
//!
//! The two lists always have the same length: every insert or removal on
//! one is mirrored on the other inside the same call. Mutations never talk
//! to the network or the query runner; they return what the caller should
//! do next.

use crate::core::clause::{ClauseCacheEntry, ClauseEdit, FilterClause, FilterValue};
use crate::core::error::CellError;
use crate::core::operator::{Operator, coerce};
use crate::core::types::ValueChoice;
use tracing::debug;

/// Value lookup the caller should issue after a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub index: usize,
    pub column: String,
}

/// Reducer input for [`FilterClauseStore::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    Add { default_column: Option<String> },
    Change { index: usize, edit: ClauseEdit },
    Remove { index: usize },
}

/// Result of a mutation: the updated clause list and an optional lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub clauses: Vec<FilterClause>,
    pub fetch: Option<FetchRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterClauseStore {
    clauses: Vec<FilterClause>,
    cache: Vec<ClauseCacheEntry>,
}

impl FilterClauseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing clauses, repairing any value shape mismatch
    pub fn from_clauses(clauses: Vec<FilterClause>) -> Self {
        let clauses: Vec<FilterClause> = clauses.into_iter().map(FilterClause::normalized).collect();
        let cache = vec![ClauseCacheEntry::default(); clauses.len()];
        Self { clauses, cache }
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn cache(&self) -> &[ClauseCacheEntry] {
        &self.cache
    }

    pub fn clause(&self, index: usize) -> Option<&FilterClause> {
        self.clauses.get(index)
    }

    pub fn cache_entry(&self, index: usize) -> Option<&ClauseCacheEntry> {
        self.cache.get(index)
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Reducer entry point
    pub fn apply(&mut self, action: StoreAction) -> Result<Transition, CellError> {
        match action {
            StoreAction::Add { default_column } => Ok(self.add(default_column)),
            StoreAction::Change { index, edit } => self.change(index, edit),
            StoreAction::Remove { index } => self.remove(index),
        }
    }

    /// Append an `in` clause on `default_column` with an empty value
    ///
    /// The seed is always the empty list, whether or not the datasource
    /// offers value selects, since `in` takes a list.
    pub fn add(&mut self, default_column: Option<String>) -> Transition {
        let clause = FilterClause::new(default_column, Operator::In);
        let index = self.clauses.len();
        let fetch = fetch_for(index, clause.col.as_deref());

        self.clauses.push(clause);
        self.cache.push(ClauseCacheEntry::default());
        debug!(index, "added filter clause");

        self.transition(fetch)
    }

    pub fn change(&mut self, index: usize, edit: ClauseEdit) -> Result<Transition, CellError> {
        let len = self.clauses.len();
        let clause = self
            .clauses
            .get_mut(index)
            .ok_or(CellError::ClauseIndexOutOfRange { index, len })?;

        let mut fetch = None;
        match edit {
            ClauseEdit::Column(col) => {
                // Selected values belong to the previous column
                clause.val = FilterValue::empty(clause.op.value_shape());
                fetch = fetch_for(index, col.as_deref());
                clause.col = col;
            }
            ClauseEdit::Operator(op) => {
                let previous = std::mem::replace(&mut clause.val, FilterValue::None);
                clause.val = coerce(clause.op, op, previous);
                clause.op = op;
            }
            ClauseEdit::Value(val) => {
                clause.val = val.conform(clause.op.value_shape());
            }
            ClauseEdit::OperatorAndValue { op, val } => {
                clause.op = op;
                clause.val = val.conform(op.value_shape());
            }
        }
        debug!(index, clause = ?clause, "changed filter clause");

        Ok(self.transition(fetch))
    }

    /// Delete the clause and cache entry at `index`; later entries shift down
    pub fn remove(&mut self, index: usize) -> Result<Transition, CellError> {
        let len = self.clauses.len();
        if index >= len {
            return Err(CellError::ClauseIndexOutOfRange { index, len });
        }
        self.clauses.remove(index);
        self.cache.remove(index);
        debug!(index, remaining = self.clauses.len(), "removed filter clause");

        Ok(self.transition(None))
    }

    /// Flag a clause as waiting on a value lookup
    pub fn mark_loading(&mut self, index: usize) -> Result<(), CellError> {
        let entry = self.entry_mut(index)?;
        entry.loading = true;
        Ok(())
    }

    /// Clear the loading flag without touching the choices
    pub fn clear_loading(&mut self, index: usize) -> Result<(), CellError> {
        let entry = self.entry_mut(index)?;
        entry.loading = false;
        Ok(())
    }

    /// Replace a clause's cache entry with freshly looked-up choices
    pub fn set_choices(&mut self, index: usize, choices: Vec<ValueChoice>) -> Result<(), CellError> {
        let entry = self.entry_mut(index)?;
        *entry = ClauseCacheEntry::loaded(choices);
        Ok(())
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut ClauseCacheEntry, CellError> {
        let len = self.cache.len();
        self.cache
            .get_mut(index)
            .ok_or(CellError::ClauseIndexOutOfRange { index, len })
    }

    fn transition(&self, fetch: Option<FetchRequest>) -> Transition {
        debug_assert_eq!(self.clauses.len(), self.cache.len());
        Transition {
            clauses: self.clauses.clone(),
            fetch,
        }
    }
}

fn fetch_for(index: usize, column: Option<&str>) -> Option<FetchRequest> {
    column.filter(|c| !c.is_empty()).map(|c| FetchRequest {
        index,
        column: c.to_string(),
    })
}
