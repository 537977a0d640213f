//! Operator table and value-shape coercion rules for filter clauses

use crate::core::clause::FilterValue;
use crate::core::types::DatasourceType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Filter operator, printed and parsed as its wire symbol
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Operator {
    #[serde(rename = "in")]
    #[strum(serialize = "in")]
    In,
    #[serde(rename = "not in")]
    #[strum(serialize = "not in")]
    NotIn,
    #[serde(rename = "==")]
    #[strum(serialize = "==")]
    Eq,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    NotEq,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Gte,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Lte,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "regex")]
    #[strum(serialize = "regex")]
    Regex,
    #[serde(rename = "LIKE")]
    #[strum(serialize = "LIKE")]
    Like,
    #[serde(rename = "IS NULL")]
    #[strum(serialize = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    #[strum(serialize = "IS NOT NULL")]
    IsNotNull,
}

/// Shape of the value an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// No value at all (`IS NULL`, `IS NOT NULL`)
    None,
    Scalar,
    List,
}

/// Static description of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorDescriptor {
    pub operator: Operator,
    pub value_shape: ValueShape,
    /// Offered when filtering aggregates (having mode)
    pub having_only: bool,
    /// `None` means every datasource type accepts the operator
    pub allowed_datasource_types: Option<&'static [DatasourceType]>,
    /// Value is picked from the looked-up choices rather than typed
    pub uses_select: bool,
    pub multi: bool,
}

impl OperatorDescriptor {
    pub fn symbol(&self) -> String {
        self.operator.to_string()
    }

    /// Whether this operator may be offered for the given context
    pub fn is_applicable(&self, having: bool, datasource_type: Option<DatasourceType>) -> bool {
        if having {
            return self.having_only;
        }
        match (self.allowed_datasource_types, datasource_type) {
            (None, _) => true,
            (Some(allowed), Some(ty)) => allowed.contains(&ty),
            (Some(_), None) => false,
        }
    }
}

const fn descriptor(
    operator: Operator,
    value_shape: ValueShape,
    having_only: bool,
    allowed_datasource_types: Option<&'static [DatasourceType]>,
    uses_select: bool,
    multi: bool,
) -> OperatorDescriptor {
    OperatorDescriptor {
        operator,
        value_shape,
        having_only,
        allowed_datasource_types,
        uses_select,
        multi,
    }
}

// Indexed by `Operator as usize`; order must follow the enum declaration.
static OPERATORS: [OperatorDescriptor; 12] = [
    descriptor(Operator::In, ValueShape::List, false, None, true, true),
    descriptor(Operator::NotIn, ValueShape::List, false, None, true, true),
    descriptor(Operator::Eq, ValueShape::Scalar, true, None, true, false),
    descriptor(Operator::NotEq, ValueShape::Scalar, true, None, true, false),
    descriptor(Operator::Gte, ValueShape::Scalar, true, None, false, false),
    descriptor(Operator::Lte, ValueShape::Scalar, true, None, false, false),
    descriptor(Operator::Gt, ValueShape::Scalar, true, None, false, false),
    descriptor(Operator::Lt, ValueShape::Scalar, true, None, false, false),
    descriptor(
        Operator::Regex,
        ValueShape::Scalar,
        false,
        Some(&[DatasourceType::Druid]),
        false,
        false,
    ),
    descriptor(
        Operator::Like,
        ValueShape::Scalar,
        false,
        Some(&[DatasourceType::Table]),
        false,
        false,
    ),
    descriptor(Operator::IsNull, ValueShape::None, false, None, false, false),
    descriptor(Operator::IsNotNull, ValueShape::None, false, None, false, false),
];

/// Look up the descriptor of an operator
pub fn describe(operator: Operator) -> &'static OperatorDescriptor {
    &OPERATORS[operator as usize]
}

impl Operator {
    pub fn descriptor(self) -> &'static OperatorDescriptor {
        describe(self)
    }

    pub fn value_shape(self) -> ValueShape {
        describe(self).value_shape
    }
}

/// Convert `old_val` for an operator switch from `old_op` to `new_op`
///
/// Values keep their content when both operators take the same shape.
pub fn coerce(old_op: Operator, new_op: Operator, old_val: FilterValue) -> FilterValue {
    let target = new_op.value_shape();
    if old_op.value_shape() == target && old_val.shape() == target {
        return old_val;
    }
    old_val.conform(target)
}

/// Operators to offer in the editor, in table order
pub fn applicable(having: bool, datasource_type: Option<DatasourceType>) -> Vec<Operator> {
    Operator::iter()
        .filter(|op| describe(*op).is_applicable(having, datasource_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn list(values: &[&str]) -> FilterValue {
        FilterValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn table_is_indexed_by_discriminant() {
        for op in Operator::iter() {
            assert_eq!(describe(op).operator, op);
        }
    }

    #[test]
    fn symbols_round_trip_through_from_str() {
        for op in Operator::iter() {
            assert_eq!(Operator::from_str(&op.to_string()).unwrap(), op);
        }
        assert_eq!(Operator::NotIn.to_string(), "not in");
        assert_eq!(serde_json::to_string(&Operator::IsNull).unwrap(), "\"IS NULL\"");
    }

    #[test]
    fn list_to_scalar_keeps_first_value() {
        let val = coerce(Operator::In, Operator::Eq, list(&["a", "b"]));
        assert_eq!(val, FilterValue::Scalar("a".into()));

        let back = coerce(Operator::Eq, Operator::NotIn, val);
        assert_eq!(back, list(&["a"]));
    }

    #[test]
    fn empty_values_coerce_to_empty_target() {
        assert_eq!(
            coerce(Operator::Like, Operator::In, FilterValue::Scalar(String::new())),
            list(&[])
        );
        assert_eq!(
            coerce(Operator::In, Operator::Gt, list(&[])),
            FilterValue::Scalar(String::new())
        );
    }

    #[test]
    fn same_shape_leaves_value_alone() {
        let val = coerce(Operator::In, Operator::NotIn, list(&["x", "y"]));
        assert_eq!(val, list(&["x", "y"]));
    }

    #[test]
    fn none_shape_clears_value() {
        assert_eq!(coerce(Operator::In, Operator::IsNull, list(&["x"])), FilterValue::None);
        assert_eq!(
            coerce(Operator::IsNull, Operator::Eq, FilterValue::None),
            FilterValue::Scalar(String::new())
        );
    }

    #[test]
    fn having_mode_offers_only_having_operators() {
        let ops = applicable(true, Some(DatasourceType::Table));
        assert!(!ops.is_empty());
        assert!(ops.iter().all(|op| describe(*op).having_only));
        assert!(!ops.contains(&Operator::In));
    }

    #[test]
    fn datasource_type_restricts_operators() {
        let druid = applicable(false, Some(DatasourceType::Druid));
        assert!(druid.contains(&Operator::Regex));
        assert!(!druid.contains(&Operator::Like));

        let table = applicable(false, Some(DatasourceType::Table));
        assert!(table.contains(&Operator::Like));
        assert!(!table.contains(&Operator::Regex));

        let unknown = applicable(false, None);
        assert!(!unknown.contains(&Operator::Like));
        assert!(unknown.contains(&Operator::IsNotNull));
    }
}
