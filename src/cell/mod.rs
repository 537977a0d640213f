pub mod controller;
pub mod filter_api;
pub mod geometry;
pub mod query;
pub mod view;

pub use controller::{CellAction, CellController, CellPhase, CellProps, Collaborators};
pub use filter_api::{DashboardFilterApi, InMemoryFilterApi, ScopedFilterApi, SliceFilters};
pub use geometry::{CellGeometry, ElementMetrics, GeometrySettings, MeasuredElements, Unmeasured};
pub use query::{ChartProps, FormData, QueryConfig, QueryRunner, Slice};
pub use view::{ClauseView, ValueControl};
