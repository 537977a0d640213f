//! What the filter editor shows for each clause
//!
//! Pure functions of the clause, its cache entry and the cell context, so
//! any front end (terminal or otherwise) renders the same controls.

use crate::core::operator::{self, Operator, ValueShape};
use crate::core::{ClauseCacheEntry, Datasource, FilterClause, FilterValue, ValueChoice};

/// Control used to edit a clause's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueControl {
    /// Operator takes no value
    Hidden,
    /// Pick from looked-up choices; free-form entries are allowed too
    Select {
        multi: bool,
        loading: bool,
        choices: Vec<ValueChoice>,
        selected: Vec<String>,
    },
    Text { value: String },
}

pub fn value_control(clause: &FilterClause, entry: &ClauseCacheEntry, having: bool) -> ValueControl {
    let descriptor = operator::describe(clause.op);
    if descriptor.value_shape == ValueShape::None {
        return ValueControl::Hidden;
    }
    if descriptor.uses_select && !having {
        let selected = match &clause.val {
            FilterValue::None => Vec::new(),
            FilterValue::Scalar(s) if s.is_empty() => Vec::new(),
            FilterValue::Scalar(s) => vec![s.clone()],
            FilterValue::List(values) => values.clone(),
        };
        return ValueControl::Select {
            multi: descriptor.multi,
            loading: entry.loading,
            choices: entry.choices.clone(),
            selected,
        };
    }
    ValueControl::Text {
        value: clause.val.display(),
    }
}

/// `(value, label)` pairs offered in the column selector
pub fn column_choices(datasource: Option<&Datasource>, having: bool) -> &[(String, String)] {
    match datasource {
        Some(ds) if having => &ds.metrics_combo,
        Some(ds) => &ds.filterable_cols,
        None => &[],
    }
}

/// Operators offered in the operator selector
pub fn operator_choices(datasource: Option<&Datasource>, having: bool) -> Vec<Operator> {
    operator::applicable(having, datasource.map(|ds| ds.datasource_type))
}

/// Row model for one clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseView {
    pub index: usize,
    pub column: Option<String>,
    pub column_label: Option<String>,
    pub operator: Operator,
    pub control: ValueControl,
}

pub fn clause_views(
    clauses: &[FilterClause],
    cache: &[ClauseCacheEntry],
    datasource: Option<&Datasource>,
    having: bool,
) -> Vec<ClauseView> {
    let columns = column_choices(datasource, having);
    clauses
        .iter()
        .zip(cache)
        .enumerate()
        .map(|(index, (clause, entry))| {
            let column_label = clause.col.as_deref().and_then(|col| {
                columns
                    .iter()
                    .find(|(value, _)| value == col)
                    .map(|(_, label)| label.clone())
            });
            ClauseView {
                index,
                column: clause.col.clone(),
                column_label,
                operator: clause.op,
                control: value_control(clause, entry, having),
            }
        })
        .collect()
}
