//! Schema manifest: the expected column list plus the numeric subset.

use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A single declared column.
///
/// Accepts either `{ name: foo, dtype: int64 }` or the compact
/// single-key form `{ foo: int64 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumn")]
pub struct SchemaColumn {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Named {
        name: String,
        #[serde(default)]
        dtype: Option<String>,
    },
    Compact(BTreeMap<String, serde_yaml::Value>),
}

impl TryFrom<RawColumn> for SchemaColumn {
    type Error = String;

    fn try_from(raw: RawColumn) -> Result<Self, Self::Error> {
        match raw {
            RawColumn::Named { name, dtype } => Ok(Self { name, dtype }),
            RawColumn::Compact(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "column entry must have exactly one key, found {}",
                        map.len()
                    ));
                }
                let (name, value) = map.into_iter().next().ok_or("empty column entry")?;
                let dtype = match value {
                    serde_yaml::Value::String(s) => Some(s),
                    serde_yaml::Value::Null => None,
                    other => Some(
                        serde_yaml::to_string(&other)
                            .map(|s| s.trim().to_string())
                            .map_err(|e| e.to_string())?,
                    ),
                };
                Ok(Self { name, dtype })
            }
        }
    }
}

/// Declared dataset contract, loaded once per validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    pub columns: Vec<SchemaColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerical_columns: Option<Vec<String>>,
}

impl SchemaManifest {
    /// Load a manifest from a YAML file.
    pub fn load(path: &Path) -> Result<Self, StageError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StageError::schema_config(format!(
                "cannot read schema file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse a manifest from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, StageError> {
        serde_yaml::from_str(content)
            .map_err(|e| StageError::schema_config(format!("malformed schema manifest: {e}")))
    }

    /// Number of declared columns. Order and names are not part of this count.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The set of columns that must be numeric-typed.
    ///
    /// A manifest without a `numerical_columns` key is a configuration defect.
    pub fn required_numeric(&self) -> Result<BTreeSet<&str>, StageError> {
        let declared = self.numerical_columns.as_ref().ok_or_else(|| {
            StageError::schema_config("'numerical_columns' key missing in schema manifest")
        })?;
        Ok(declared.iter().map(String::as_str).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_named_columns() {
        let manifest = SchemaManifest::from_yaml_str(
            "columns:\n  - name: age\n  - name: income\n    dtype: float64\nnumerical_columns: [age, income]\n",
        )
        .unwrap();
        assert_eq!(manifest.column_count(), 2);
        assert_eq!(manifest.columns[1].dtype.as_deref(), Some("float64"));
        let required = manifest.required_numeric().unwrap();
        assert!(required.contains("age") && required.contains("income"));
    }

    #[test]
    fn test_parse_compact_columns() {
        let manifest = SchemaManifest::from_yaml_str(
            "columns:\n  - having_IP_Address: int64\n  - URL_Length: int64\n  - Result: int64\nnumerical_columns:\n  - having_IP_Address\n",
        )
        .unwrap();
        assert_eq!(manifest.column_count(), 3);
        assert_eq!(manifest.columns[0].name, "having_IP_Address");
        assert_eq!(manifest.columns[0].dtype.as_deref(), Some("int64"));
    }

    #[test]
    fn test_missing_numerical_columns_is_config_error() {
        let manifest = SchemaManifest::from_yaml_str("columns:\n  - name: a\n").unwrap();
        let err = manifest.required_numeric().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConfig);
    }

    #[test]
    fn test_malformed_manifest() {
        let err = SchemaManifest::from_yaml_str("numerical_columns: [a]\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConfig);

        let err = SchemaManifest::load(Path::new("/nonexistent/schema.yaml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaConfig);
    }
}
