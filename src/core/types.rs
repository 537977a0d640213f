use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumString};

/// Identifier of a slice (the saved chart a dashboard cell displays)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(u64);

impl SliceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SliceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid slice id '{s}': {e}"))
    }
}

/// Backend flavour of a datasource; some operators only exist for one of them
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatasourceType {
    Table,
    Druid,
}

/// Datasource metadata the filter editor needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub id: u64,
    #[serde(rename = "type")]
    pub datasource_type: DatasourceType,
    /// Whether the backend can list distinct values for a column
    #[serde(default)]
    pub filter_select: bool,
    /// `(value, label)` pairs for raw columns
    #[serde(default)]
    pub filterable_cols: Vec<(String, String)>,
    /// `(value, label)` pairs for metrics, offered in having mode
    #[serde(default)]
    pub metrics_combo: Vec<(String, String)>,
}

impl Datasource {
    /// Column a freshly added clause starts on
    pub fn default_filter_column(&self) -> Option<&str> {
        self.filterable_cols.first().map(|(value, _)| value.as_str())
    }
}

/// One selectable value returned by the value lookup service
///
/// The service answers with a JSON array whose items are usually strings but
/// may be numbers or booleans; everything is normalised to its text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ValueChoice(String);

impl ValueChoice {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ValueChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValueChoice {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for ValueChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match raw {
            serde_json::Value::String(s) => Self(s),
            serde_json::Value::Null => Self(String::new()),
            other => Self(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_type_conversion() {
        assert_eq!(DatasourceType::from_str("druid").unwrap(), DatasourceType::Druid);
        assert_eq!(DatasourceType::Table.as_ref(), "table");
        assert!(DatasourceType::from_str("excel").is_err());
    }

    #[test]
    fn test_datasource_deserialization() {
        let json = r#"{
            "id": 7,
            "type": "table",
            "filter_select": true,
            "filterable_cols": [["region", "Region"], ["country", "Country"]]
        }"#;
        let ds: Datasource = serde_json::from_str(json).unwrap();

        assert_eq!(ds.id, 7);
        assert_eq!(ds.datasource_type, DatasourceType::Table);
        assert!(ds.filter_select);
        assert!(ds.metrics_combo.is_empty());
        assert_eq!(ds.default_filter_column(), Some("region"));
    }

    #[test]
    fn test_value_choice_accepts_mixed_json() {
        let choices: Vec<ValueChoice> = serde_json::from_str(r#"["east", 42, true, null]"#).unwrap();
        let texts: Vec<&str> = choices.iter().map(ValueChoice::as_str).collect();

        assert_eq!(texts, vec!["east", "42", "true", ""]);
    }

    #[test]
    fn test_slice_id_parse() {
        assert_eq!(SliceId::from_str(" 12 ").unwrap(), SliceId::new(12));
        assert!(SliceId::from_str("abc").is_err());
    }
}
