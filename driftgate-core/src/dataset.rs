//! In-memory tabular datasets loaded from delimited files.

use crate::error::StageError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Cell spellings treated as missing values.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// Typed cell storage for a single column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    /// Classify raw cells: numeric iff every non-missing cell parses as a number.
    ///
    /// An all-missing column with at least one row is numeric. A column with
    /// no rows is text.
    pub fn infer(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        if cells.is_empty() {
            return Self {
                name: name.into(),
                values: ColumnValues::Text(cells),
            };
        }
        let parsed: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(text) => parse_number(text).map(Some),
            })
            .collect();

        let values = match parsed {
            Some(numbers) => ColumnValues::Numeric(
                numbers
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect(),
            ),
            None => ColumnValues::Text(cells),
        };
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_))
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match &self.values {
            ColumnValues::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnValues::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Non-missing values of a numeric column, in row order.
    pub fn numeric_non_missing(&self) -> Option<Vec<f64>> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v.iter().flatten().copied().collect()),
            ColumnValues::Text(_) => None,
        }
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Header names with repeats suffixed `.1`, `.2`, ... so every column is addressable.
fn unique_names(headers: &csv::StringRecord) -> Vec<String> {
    let mut seen = BTreeSet::new();
    headers
        .iter()
        .map(|name| {
            let mut candidate = name.to_string();
            let mut suffix = 0;
            while seen.contains(&candidate) {
                suffix += 1;
                candidate = format!("{name}.{suffix}");
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

fn normalize_cell(cell: &str) -> Option<String> {
    if MISSING_TOKENS.contains(&cell.trim()) {
        None
    } else {
        Some(cell.to_string())
    }
}

/// A table loaded from a delimited file.
///
/// The exact bytes read are retained so the table can be persisted verbatim.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    columns: Vec<Column>,
    row_count: usize,
    raw: Vec<u8>,
}

impl Dataset {
    /// Read and parse a comma-delimited file with a header row.
    pub fn from_csv(path: &Path) -> Result<Self, StageError> {
        let raw = std::fs::read(path).map_err(|e| StageError::data_load(path, e))?;
        Self::from_csv_bytes(path, raw)
    }

    /// Parse comma-delimited bytes. `path` is recorded for error messages.
    pub fn from_csv_bytes(path: &Path, raw: Vec<u8>) -> Result<Self, StageError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(raw.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| StageError::data_load(path, format!("cannot read header: {e}")))?
            .clone();
        if headers.is_empty() {
            return Err(StageError::data_load(path, "no columns to parse from file"));
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0usize;
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                StageError::data_load(path, format!("malformed row {}: {e}", idx + 2))
            })?;
            for (col, field) in record.iter().enumerate() {
                cells[col].push(normalize_cell(field));
            }
            row_count += 1;
        }

        let columns = unique_names(&headers)
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::infer(name, values))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            row_count,
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric-typed columns in table order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    pub fn numeric_column_names(&self) -> BTreeSet<&str> {
        self.numeric_columns().map(|c| c.name.as_str()).collect()
    }

    /// The bytes the table was parsed from.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}
