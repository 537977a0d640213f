pub mod clause;
pub mod error;
pub mod operator;
pub mod store;
pub mod types;

pub use clause::{ClauseCacheEntry, ClauseEdit, FilterClause, FilterValue};
pub use error::{CellError, LookupError};
pub use operator::{Operator, OperatorDescriptor, ValueShape};
pub use store::{FetchRequest, FilterClauseStore, StoreAction, Transition};
pub use types::*;
