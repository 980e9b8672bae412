use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::{PipelineError, PipelineResult};

/// One row of the working table: raw cell text, positionally aligned with
/// `Table::headers`.
pub type Record = Vec<String>;

/// An in-memory CSV table. Every record carries exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like `column_index`, but a missing column is a schema error.
    pub fn require_column(&self, name: &str, context: &str) -> PipelineResult<usize> {
        self.column_index(name).ok_or_else(|| PipelineError::Schema {
            column: name.to_string(),
            context: context.to_string(),
        })
    }

    /// A record with every cell blank, sized to this table's schema.
    pub fn blank_record(&self) -> Record {
        vec![String::new(); self.headers.len()]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Semantic type tag attached to a retained column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Currency,
    Numeric,
}

impl FieldKind {
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "a date",
            FieldKind::Currency => "a currency amount",
            FieldKind::Numeric => "a number",
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CleanStats {
    #[serde(rename = "RowsRead")]
    #[tabled(rename = "RowsRead")]
    pub rows_read: usize,
    #[serde(rename = "RowsKept")]
    #[tabled(rename = "RowsKept")]
    pub rows_kept: usize,
    #[serde(rename = "PrepaidRows")]
    #[tabled(rename = "PrepaidRows")]
    pub prepaid_rows: usize,
    #[serde(rename = "PrepaidTotal")]
    #[tabled(rename = "PrepaidTotal")]
    pub prepaid_total: f64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct SummaryStats {
    #[serde(rename = "RowsRead")]
    #[tabled(rename = "RowsRead")]
    pub rows_read: usize,
    #[serde(rename = "Groups")]
    #[tabled(rename = "Groups")]
    pub groups: usize,
    #[serde(rename = "GrandTotal")]
    #[tabled(rename = "GrandTotal")]
    pub grand_total: f64,
}
