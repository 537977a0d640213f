use crate::core::operator::{Operator, ValueShape, coerce};
use crate::core::types::ValueChoice;
use serde::{Deserialize, Serialize};

/// Value side of a filter clause
///
/// Serialized as `null`, a string, or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    None,
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Empty value of the given shape
    pub fn empty(shape: ValueShape) -> Self {
        match shape {
            ValueShape::None => Self::None,
            ValueShape::Scalar => Self::Scalar(String::new()),
            ValueShape::List => Self::List(Vec::new()),
        }
    }

    pub fn shape(&self) -> ValueShape {
        match self {
            Self::None => ValueShape::None,
            Self::Scalar(_) => ValueShape::Scalar,
            Self::List(_) => ValueShape::List,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Scalar(s) => s.is_empty(),
            Self::List(values) => values.is_empty(),
        }
    }

    /// Reshape this value, keeping as much content as the target allows
    pub fn conform(self, shape: ValueShape) -> Self {
        match (self, shape) {
            (value, target) if value.shape() == target => value,
            (Self::List(values), ValueShape::Scalar) => {
                Self::Scalar(values.into_iter().next().unwrap_or_default())
            }
            (Self::Scalar(s), ValueShape::List) if s.is_empty() => Self::List(Vec::new()),
            (Self::Scalar(s), ValueShape::List) => Self::List(vec![s]),
            (_, target) => Self::empty(target),
        }
    }

    /// Human readable form used by the editor
    pub fn display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Scalar(s) => s.clone(),
            Self::List(values) => values.join(", "),
        }
    }
}

/// One filter condition attached to a cell's chart query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub col: Option<String>,
    pub op: Operator,
    pub val: FilterValue,
}

impl FilterClause {
    /// Clause on `col` with the given operator and its empty value
    pub fn new(col: Option<String>, op: Operator) -> Self {
        Self {
            col,
            op,
            val: FilterValue::empty(op.value_shape()),
        }
    }

    /// Force `val` into the shape required by `op`
    pub(crate) fn normalized(mut self) -> Self {
        self.val = self.val.conform(self.op.value_shape());
        self
    }
}

/// Loading state and looked-up choices for one clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseCacheEntry {
    pub loading: bool,
    pub choices: Vec<ValueChoice>,
}

impl ClauseCacheEntry {
    pub fn loaded(choices: Vec<ValueChoice>) -> Self {
        Self {
            loading: false,
            choices,
        }
    }
}

/// Edit applied to a single clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseEdit {
    Column(Option<String>),
    Operator(Operator),
    Value(FilterValue),
    /// Operator switch across value shapes, applied in one step
    OperatorAndValue { op: Operator, val: FilterValue },
}

impl ClauseEdit {
    /// Edit that moves `clause` to `next`, carrying the value over
    pub fn switch_operator(clause: &FilterClause, next: Operator) -> Self {
        if clause.op.value_shape() == next.value_shape() {
            Self::Operator(next)
        } else {
            Self::OperatorAndValue {
                op: next,
                val: coerce(clause.op, next, clause.val.clone()),
            }
        }
    }

    pub fn touches_column(&self) -> bool {
        matches!(self, Self::Column(_))
    }
}
