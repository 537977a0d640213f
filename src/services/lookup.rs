//! Value-choice lookup backends
//!
//! The dashboard server exposes distinct column values at
//! `/superset/filter/{datasource_type}/{datasource_id}/{column}/` as a JSON
//! array. [`HttpValueLookup`] talks to that endpoint; [`StaticValueLookup`]
//! answers from an in-memory map for offline use and tests.

use crate::core::{DatasourceType, LookupError, ValueChoice};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ValueLookup: Send + Sync {
    async fn lookup(
        &self,
        datasource_type: DatasourceType,
        datasource_id: u64,
        column: &str,
    ) -> Result<Vec<ValueChoice>, LookupError>;
}

pub struct HttpValueLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpValueLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LookupError> {
        let base_url =
            Url::parse(base_url).map_err(|_| LookupError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Endpoint for one column; segments are percent-encoded
    pub fn endpoint(
        &self,
        datasource_type: DatasourceType,
        datasource_id: u64,
        column: &str,
    ) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        let id = datasource_id.to_string();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["superset", "filter", datasource_type.as_ref(), &id, column, ""]);
        Ok(url)
    }
}

#[async_trait]
impl ValueLookup for HttpValueLookup {
    async fn lookup(
        &self,
        datasource_type: DatasourceType,
        datasource_id: u64,
        column: &str,
    ) -> Result<Vec<ValueChoice>, LookupError> {
        let url = self.endpoint(datasource_type, datasource_id, column)?;
        debug!(%url, "requesting filter values");
        let choices = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ValueChoice>>()
            .await?;
        Ok(choices)
    }
}

/// Lookup backed by a fixed column → values map
#[derive(Debug, Clone, Default)]
pub struct StaticValueLookup {
    choices: HashMap<String, Vec<ValueChoice>>,
}

impl StaticValueLookup {
    pub fn new(choices: HashMap<String, Vec<ValueChoice>>) -> Self {
        Self { choices }
    }

    pub fn with_column<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices.insert(
            column.to_string(),
            values.into_iter().map(ValueChoice::new).collect(),
        );
        self
    }
}

#[async_trait]
impl ValueLookup for StaticValueLookup {
    async fn lookup(
        &self,
        _datasource_type: DatasourceType,
        _datasource_id: u64,
        column: &str,
    ) -> Result<Vec<ValueChoice>, LookupError> {
        self.choices
            .get(column)
            .cloned()
            .ok_or_else(|| LookupError::UnknownColumn(column.to_string()))
    }
}
