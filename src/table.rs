//! # Imported Table
//!
//! Column data consumed read-only by the binding resolver.
//!
//! Spreadsheet ingestion hands over a header row plus data rows. Every cell is
//! coerced to a string, rows shorter than the header are filled with empty
//! strings, and cells past the last header are dropped:
//!
//! ```
//! use labelpress::table::ImportedTable;
//!
//! let table = ImportedTable::from_rows(
//!     vec!["Name".into(), "Sku".into()],
//!     vec![vec!["Alice".into(), "A-1".into()], vec!["Bob".into()]],
//! );
//! assert_eq!(table.column("Sku").unwrap().values, vec!["A-1", ""]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::LabelError;

/// One imported column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Imported columns in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedTable {
    columns: Vec<Column>,
}

impl ImportedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-split columns. A later column with a duplicate name
    /// replaces the earlier one.
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        let mut table = Self::new();
        for column in columns {
            table.insert(column);
        }
        table
    }

    /// Build from a header row and data rows.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for row in &rows {
            for (j, column) in columns.iter_mut().enumerate() {
                column.values.push(row.get(j).cloned().unwrap_or_default());
            }
        }

        Self::from_columns(columns)
    }

    /// Parse the JSON table file format: `{"headers": [...], "rows": [[...], ...]}`.
    ///
    /// Cells may be strings, numbers, booleans or null; non-strings are
    /// coerced (`null` becomes the empty string).
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let file: TableFile = serde_json::from_str(json)
            .map_err(|e| LabelError::Config(format!("Invalid table file: {}", e)))?;
        Ok(file.into_table())
    }

    /// Insert or replace a column by name.
    pub fn insert(&mut self, column: Column) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Longest column length (the number of data rows).
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// On-disk table format used by the CLI.
#[derive(Debug, Deserialize)]
pub struct TableFile {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl TableFile {
    pub fn into_table(self) -> ImportedTable {
        let rows = self
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        ImportedTable::from_rows(self.headers, rows)
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
