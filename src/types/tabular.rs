//! The table returned by point queries.
//!
//! The API wraps a split-orient table (`index`, `columns`, `data`) inside a JSON
//! envelope. The inner table usually arrives as a JSON-encoded string, sometimes as
//! a plain object; both are accepted.

use crate::utils::datetime_from_epoch_seconds;
use crate::weather_data::error::DecodeError;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct PointEnvelope {
    data: InnerTable,
    #[serde(default)]
    attributes: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InnerTable {
    Encoded(String),
    Inline(SplitTable),
}

#[derive(Debug, Deserialize)]
struct SplitTable {
    index: Vec<f64>,
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

/// Rows indexed by timestamp, one column per raw labelled field.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResult {
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Usage figure reported by the server (`attributes.n_parameter_months`), verbatim.
    pub reported_usage: Option<Value>,
}

impl TabularResult {
    /// Decodes the JSON envelope of a point response.
    pub fn from_json_envelope(bytes: &[u8]) -> Result<Self, DecodeError> {
        let envelope: PointEnvelope = serde_json::from_slice(bytes)?;
        let table = match envelope.data {
            InnerTable::Encoded(text) => serde_json::from_str::<SplitTable>(&text)?,
            InnerTable::Inline(table) => table,
        };
        let reported_usage = envelope
            .attributes
            .as_ref()
            .and_then(|a| a.get("n_parameter_months"))
            .cloned();
        Self::from_split(table, reported_usage)
    }

    fn from_split(table: SplitTable, reported_usage: Option<Value>) -> Result<Self, DecodeError> {
        if table.index.len() != table.data.len() {
            return Err(DecodeError::MalformedTable(format!(
                "{} index entries for {} rows",
                table.index.len(),
                table.data.len()
            )));
        }
        if let Some(row) = table.data.iter().find(|r| r.len() != table.columns.len()) {
            return Err(DecodeError::MalformedTable(format!(
                "row with {} values for {} columns",
                row.len(),
                table.columns.len()
            )));
        }
        let index = table
            .index
            .iter()
            .map(|s| {
                datetime_from_epoch_seconds(*s)
                    .ok_or_else(|| DecodeError::MalformedTable(format!("invalid timestamp {s}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            index,
            columns: table.columns,
            rows: table.data,
            reported_usage,
        })
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, predicate: impl Fn(&str) -> bool) -> Option<usize> {
        self.columns.iter().position(|c| predicate(c))
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[idx])
    }
}
