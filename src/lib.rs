#![allow(clippy::collapsible_if)]

pub mod cell;
pub mod config;
pub mod core;
pub mod logging;
pub mod services;
pub mod tui;

// Re-export commonly used types
pub use cell::{CellController, CellProps, Collaborators};
pub use core::{CellError, FilterClause, FilterClauseStore, FilterValue, Operator};
pub use services::{FilterValueFetcher, ValueLookup};
pub use tui::{Action, ActionCategory};
