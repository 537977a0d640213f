//! Asynchronous value-choice lookups for filter clauses
//!
//! A cell keeps at most one lookup in flight. Issuing a new one aborts the
//! previous task, and every request is tagged with a per-cell sequence
//! number so a completion that slips through after being superseded is
//! still discarded. Completions travel back to the cell's owner over an
//! unbounded channel and are applied there with [`FilterValueFetcher::complete`].

use crate::core::{CellError, Datasource, FilterClauseStore, LookupError, ValueChoice};
use crate::services::lookup::ValueLookup;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Result of one lookup, delivered to the cell's owner
#[derive(Debug)]
pub struct FetchCompletion {
    pub seq: u64,
    pub index: usize,
    pub column: String,
    pub outcome: Result<Vec<ValueChoice>, LookupError>,
}

/// Lookup currently in flight
#[derive(Debug)]
struct InFlight {
    seq: u64,
    index: usize,
    handle: JoinHandle<()>,
}

/// Context that decides whether a lookup applies at all
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    pub datasource: Option<&'a Datasource>,
    pub having: bool,
}

pub struct FilterValueFetcher {
    lookup: Arc<dyn ValueLookup>,
    completions: UnboundedSender<FetchCompletion>,
    last_seq: u64,
    in_flight: Option<InFlight>,
}

impl FilterValueFetcher {
    pub fn new(lookup: Arc<dyn ValueLookup>, completions: UnboundedSender<FetchCompletion>) -> Self {
        Self {
            lookup,
            completions,
            last_seq: 0,
            in_flight: None,
        }
    }

    /// Start a lookup of `column` for the clause at `index`
    ///
    /// Returns the request's sequence number, or `None` when no lookup
    /// applies (no column, datasource without value lookup, having mode).
    /// Must be called from within a tokio runtime.
    pub fn fetch(
        &mut self,
        store: &mut FilterClauseStore,
        ctx: FetchContext<'_>,
        index: usize,
        column: Option<&str>,
    ) -> Result<Option<u64>, CellError> {
        let Some(column) = column.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let Some(datasource) = ctx.datasource.filter(|ds| ds.filter_select) else {
            return Ok(None);
        };
        if ctx.having {
            return Ok(None);
        }
        if index >= store.len() {
            return Err(CellError::ClauseIndexOutOfRange {
                index,
                len: store.len(),
            });
        }

        self.cancel(store);
        store.mark_loading(index)?;

        self.last_seq += 1;
        let seq = self.last_seq;
        let lookup = Arc::clone(&self.lookup);
        let tx = self.completions.clone();
        let datasource_type = datasource.datasource_type;
        let datasource_id = datasource.id;
        let column = column.to_string();

        debug!(seq, index, column = %column, "fetching filter values");
        let handle = tokio::spawn(async move {
            let outcome = lookup.lookup(datasource_type, datasource_id, &column).await;
            let completion = FetchCompletion {
                seq,
                index,
                column,
                outcome,
            };
            if tx.send(completion).is_err() {
                debug!(seq, "cell dropped before filter values arrived");
            }
        });
        self.in_flight = Some(InFlight { seq, index, handle });

        Ok(Some(seq))
    }

    /// Apply a completion if it belongs to the latest request
    ///
    /// Returns `true` when the cache was updated.
    pub fn complete(&mut self, store: &mut FilterClauseStore, completion: FetchCompletion) -> bool {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.seq == completion.seq && completion.seq == self.last_seq);
        if !current {
            debug!(seq = completion.seq, latest = self.last_seq, "discarding stale filter values");
            return false;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };

        // The clause may have moved since the request was issued
        let index = in_flight.index;
        let applied = match completion.outcome {
            Ok(choices) => store.set_choices(index, choices),
            Err(err) => {
                warn!(column = %completion.column, index, "filter value lookup failed: {err}");
                store.set_choices(index, Vec::new())
            }
        };
        applied.is_ok()
    }

    /// Abort the outstanding lookup, if any
    ///
    /// The abandoned clause stops showing a pending state; its previous
    /// choices are kept.
    pub fn cancel(&mut self, store: &mut FilterClauseStore) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(seq = in_flight.seq, index = in_flight.index, "cancelling filter value lookup");
            in_flight.handle.abort();
            let _ = store.clear_loading(in_flight.index);
        }
    }

    /// Keep the outstanding lookup pointed at the right clause after a removal
    pub fn clause_removed(&mut self, index: usize) {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return;
        };
        if in_flight.index == index {
            debug!(seq = in_flight.seq, index, "clause removed, dropping its lookup");
            in_flight.handle.abort();
            self.in_flight = None;
        } else if in_flight.index > index {
            in_flight.index -= 1;
        }
    }

    /// Clause index the outstanding lookup targets
    pub fn pending_index(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|f| f.index)
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }
}

impl Drop for FilterValueFetcher {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}
