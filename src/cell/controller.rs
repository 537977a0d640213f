//! One dashboard cell: filter state, value lookups and query dispatch
//!
//! Every clause mutation goes through [`CellController::dispatch`], which
//! updates the store, starts a value lookup when the store asks for one, and
//! re-runs the chart query with the full clause list. Lookup completions
//! arrive on the receiver returned by [`CellController::new`] and must be
//! fed back through [`CellController::on_values_loaded`] (or [`CellController::pump`]).

use crate::cell::filter_api::{DashboardFilterApi, ScopedFilterApi};
use crate::cell::geometry::{self, CellGeometry, ElementMetrics, GeometrySettings};
use crate::cell::query::{ChartProps, QueryConfig, QueryRunner, Slice};
use crate::cell::view::{self, ClauseView, ValueControl};
use crate::core::{
    CellError, ClauseCacheEntry, ClauseEdit, Datasource, FilterClause, FilterClauseStore, Operator,
    StoreAction,
};
use crate::services::{FetchCompletion, FetchContext, FilterValueFetcher, ValueLookup};
use std::sync::Arc;
use strum::Display;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};

/// Host-supplied description of the cell
#[derive(Debug, Clone)]
pub struct CellProps {
    pub slice: Slice,
    pub chart_key: String,
    pub datasource: Option<Datasource>,
    pub timeout_secs: u64,
    pub widget_width: u32,
    pub widget_height: u32,
    pub is_expanded: bool,
    pub edit_mode: bool,
    /// Clauses the cell starts with
    pub initial_filters: Vec<FilterClause>,
}

/// External services the cell talks to
#[derive(Clone)]
pub struct Collaborators {
    pub query_runner: Arc<dyn QueryRunner>,
    pub filter_api: Arc<dyn DashboardFilterApi>,
    pub value_lookup: Arc<dyn ValueLookup>,
}

/// Clause mutation requested by the filter editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellAction {
    AddFilter,
    ChangeFilter { index: usize, edit: ClauseEdit },
    /// Operator change; the value is coerced when the shape differs
    SwitchOperator { index: usize, op: Operator },
    RemoveFilter { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CellPhase {
    Idle,
    Editing,
    QueryDispatched,
}

pub struct CellController {
    slice: Slice,
    chart_key: String,
    datasource: Option<Datasource>,
    timeout_secs: u64,
    widget_width: u32,
    widget_height: u32,
    expanded: bool,
    edit_mode: bool,
    having: bool,
    geometry: GeometrySettings,
    store: FilterClauseStore,
    fetcher: FilterValueFetcher,
    query_runner: Arc<dyn QueryRunner>,
    filter_api: ScopedFilterApi,
    phase: CellPhase,
    queries_dispatched: u64,
}

impl CellController {
    pub fn new(
        props: CellProps,
        collaborators: Collaborators,
        geometry: GeometrySettings,
    ) -> (Self, UnboundedReceiver<FetchCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter_api = ScopedFilterApi::new(props.slice.slice_id, collaborators.filter_api);
        let controller = Self {
            chart_key: props.chart_key,
            datasource: props.datasource,
            timeout_secs: props.timeout_secs,
            widget_width: props.widget_width,
            widget_height: props.widget_height,
            expanded: props.is_expanded,
            edit_mode: props.edit_mode,
            having: false,
            geometry,
            store: FilterClauseStore::from_clauses(props.initial_filters),
            fetcher: FilterValueFetcher::new(collaborators.value_lookup, tx),
            query_runner: collaborators.query_runner,
            filter_api,
            phase: CellPhase::Idle,
            queries_dispatched: 0,
            slice: props.slice,
        };
        (controller, rx)
    }

    /// Look up value choices for every existing clause
    ///
    /// Only one lookup can be outstanding per cell, so when several clauses
    /// have columns only the last one's choices end up loaded.
    pub fn mount(&mut self) -> Result<usize, CellError> {
        let mut issued = 0;
        for index in 0..self.store.len() {
            let column = self.store.clauses()[index].col.clone();
            if self.fetch(index, column.as_deref())?.is_some() {
                issued += 1;
            }
        }
        debug!(slice_id = %self.slice.slice_id, issued, "cell mounted");
        Ok(issued)
    }

    /// Apply a clause mutation and re-run the chart query
    pub fn dispatch(&mut self, action: CellAction) -> Result<&[FilterClause], CellError> {
        self.phase = CellPhase::Editing;
        debug!(?action, "cell action");

        let store_action = match action {
            CellAction::AddFilter => StoreAction::Add {
                default_column: self
                    .datasource
                    .as_ref()
                    .and_then(|ds| ds.default_filter_column())
                    .map(str::to_string),
            },
            CellAction::ChangeFilter { index, edit } => StoreAction::Change { index, edit },
            CellAction::SwitchOperator { index, op } => {
                let clause = self.store.clause(index).ok_or(CellError::ClauseIndexOutOfRange {
                    index,
                    len: self.store.len(),
                });
                match clause {
                    Ok(clause) => StoreAction::Change {
                        index,
                        edit: ClauseEdit::switch_operator(clause, op),
                    },
                    Err(err) => {
                        self.phase = CellPhase::Idle;
                        return Err(err);
                    }
                }
            }
            CellAction::RemoveFilter { index } => StoreAction::Remove { index },
        };
        let removed = match &store_action {
            StoreAction::Remove { index } => Some(*index),
            _ => None,
        };

        let transition = match self.store.apply(store_action) {
            Ok(t) => t,
            Err(err) => {
                self.phase = CellPhase::Idle;
                return Err(err);
            }
        };
        if let Some(index) = removed {
            self.fetcher.clause_removed(index);
        }
        if let Some(request) = transition.fetch {
            self.fetch(request.index, Some(&request.column))?;
        }

        self.run_query(&transition.clauses)?;
        Ok(self.store.clauses())
    }

    pub fn add_filter(&mut self) -> Result<&[FilterClause], CellError> {
        self.dispatch(CellAction::AddFilter)
    }

    pub fn change_filter(&mut self, index: usize, edit: ClauseEdit) -> Result<&[FilterClause], CellError> {
        self.dispatch(CellAction::ChangeFilter { index, edit })
    }

    pub fn switch_operator(&mut self, index: usize, op: Operator) -> Result<&[FilterClause], CellError> {
        self.dispatch(CellAction::SwitchOperator { index, op })
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<&[FilterClause], CellError> {
        self.dispatch(CellAction::RemoveFilter { index })
    }

    /// Apply a lookup completion; stale ones are ignored
    pub fn on_values_loaded(&mut self, completion: FetchCompletion) -> bool {
        self.fetcher.complete(&mut self.store, completion)
    }

    /// Apply every completion already waiting on `rx`
    pub fn pump(&mut self, rx: &mut UnboundedReceiver<FetchCompletion>) -> usize {
        let mut applied = 0;
        while let Ok(completion) = rx.try_recv() {
            if self.on_values_loaded(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Look up value choices for one clause again
    pub fn refresh_choices(&mut self, index: usize) -> Result<Option<u64>, CellError> {
        let column = self
            .store
            .clause(index)
            .ok_or(CellError::ClauseIndexOutOfRange {
                index,
                len: self.store.len(),
            })?
            .col
            .clone();
        self.fetch(index, column.as_deref())
    }

    fn fetch(&mut self, index: usize, column: Option<&str>) -> Result<Option<u64>, CellError> {
        let ctx = FetchContext {
            datasource: self.datasource.as_ref(),
            having: self.having,
        };
        self.fetcher.fetch(&mut self.store, ctx, index, column)
    }

    fn run_query(&mut self, clauses: &[FilterClause]) -> Result<(), CellError> {
        let query = match self.slice.form_data.with_filters(clauses) {
            Ok(query) => query,
            Err(err) => {
                self.phase = CellPhase::Idle;
                return Err(err.into());
            }
        };
        self.phase = CellPhase::QueryDispatched;
        info!(
            chart_key = %self.chart_key,
            filters = clauses.len(),
            "re-running chart query"
        );
        self.query_runner
            .run_query(query, true, self.timeout_secs, &self.chart_key);
        self.queries_dispatched += 1;
        self.phase = CellPhase::Idle;
        Ok(())
    }

    /// Query configuration reflecting the current clauses
    pub fn query_config(&self) -> Result<QueryConfig, CellError> {
        Ok(self.slice.form_data.with_filters(self.store.clauses())?)
    }

    pub fn geometry(&self, metrics: &dyn ElementMetrics) -> CellGeometry {
        self.geometry
            .compute(self.widget_width, self.widget_height, self.expanded, metrics)
    }

    /// Props for the chart-rendering collaborator
    pub fn chart_props(&self, metrics: &dyn ElementMetrics) -> Result<ChartProps, CellError> {
        let geo = self.geometry(metrics);
        Ok(ChartProps {
            container_id: geometry::container_id(self.slice.slice_id),
            chart_key: self.chart_key.clone(),
            datasource: self.datasource.clone(),
            query_config: self.query_config()?,
            width: geo.width,
            height: geo.height,
            header_height: geo.header_height,
            timeout_secs: self.timeout_secs,
            viz_type: self.slice.form_data.viz_type().map(str::to_string),
            filter_api: self.filter_api.clone(),
        })
    }

    pub fn clause_views(&self) -> Vec<ClauseView> {
        view::clause_views(
            self.store.clauses(),
            self.store.cache(),
            self.datasource.as_ref(),
            self.having,
        )
    }

    pub fn value_control(&self, index: usize) -> Option<ValueControl> {
        let clause = self.store.clause(index)?;
        let entry = self.store.cache_entry(index)?;
        Some(view::value_control(clause, entry, self.having))
    }

    pub fn column_choices(&self) -> &[(String, String)] {
        view::column_choices(self.datasource.as_ref(), self.having)
    }

    pub fn operator_choices(&self) -> Vec<Operator> {
        view::operator_choices(self.datasource.as_ref(), self.having)
    }

    pub fn clauses(&self) -> &[FilterClause] {
        self.store.clauses()
    }

    pub fn cache(&self) -> &[ClauseCacheEntry] {
        self.store.cache()
    }

    pub fn phase(&self) -> CellPhase {
        self.phase
    }

    pub fn queries_dispatched(&self) -> u64 {
        self.queries_dispatched
    }

    pub fn filter_api(&self) -> &ScopedFilterApi {
        &self.filter_api
    }

    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    pub fn chart_key(&self) -> &str {
        &self.chart_key
    }

    pub fn datasource(&self) -> Option<&Datasource> {
        self.datasource.as_ref()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    pub fn is_having(&self) -> bool {
        self.having
    }

    /// Switch between column filters and aggregate (having) filters
    ///
    /// Column value lookups do not apply to aggregates, so entering having
    /// mode cancels the outstanding one.
    pub fn set_having(&mut self, having: bool) {
        if having && !self.having {
            self.fetcher.cancel(&mut self.store);
        }
        self.having = having;
    }

    pub fn set_widget_size(&mut self, width: u32, height: u32) {
        self.widget_width = width;
        self.widget_height = height;
    }

    pub fn pending_fetch_index(&self) -> Option<usize> {
        self.fetcher.pending_index()
    }
}
