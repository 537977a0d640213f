//! Query configuration handed to the query-execution and chart collaborators

use crate::cell::filter_api::ScopedFilterApi;
use crate::core::{Datasource, FilterClause, SliceId};
use derive_deref::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A slice's form data: free-form query parameters keyed by control name
#[derive(Debug, Clone, Default, PartialEq, Deref, DerefMut, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(pub Map<String, Value>);

impl FormData {
    pub fn viz_type(&self) -> Option<&str> {
        self.0.get("viz_type").and_then(Value::as_str)
    }

    /// Copy of this form data with `filters` replaced by `clauses`
    pub fn with_filters(&self, clauses: &[FilterClause]) -> Result<FormData, serde_json::Error> {
        let mut merged = self.clone();
        merged.insert("filters".to_string(), serde_json::to_value(clauses)?);
        Ok(merged)
    }

    /// Clauses already saved on the slice, if any parse
    pub fn saved_filters(&self) -> Vec<FilterClause> {
        self.0
            .get("filters")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// Query configuration sent to the query-execution collaborator
pub type QueryConfig = FormData;

/// The saved chart shown in a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub slice_id: SliceId,
    #[serde(default)]
    pub slice_name: String,
    #[serde(default, rename = "formData")]
    pub form_data: FormData,
    #[serde(default)]
    pub description_markeddown: Option<String>,
}

/// Runs (or re-runs) a chart query on behalf of a cell
pub trait QueryRunner: Send + Sync {
    fn run_query(&self, query: QueryConfig, force_refresh: bool, timeout_secs: u64, cell_key: &str);
}

/// Everything the chart-rendering collaborator receives
#[derive(Clone)]
pub struct ChartProps {
    pub container_id: String,
    pub chart_key: String,
    pub datasource: Option<Datasource>,
    pub query_config: QueryConfig,
    pub width: u32,
    pub height: u32,
    pub header_height: u32,
    pub timeout_secs: u64,
    pub viz_type: Option<String>,
    pub filter_api: ScopedFilterApi,
}
