use crate::error::ClimateError;
use crate::normalize::columns::{RAW_COORDINATES_PREFIX, RAW_MODEL_PREFIX};
use crate::normalize::{PendingFrame, PendingValues};
use crate::types::query_spec::Model;
use crate::types::tabular::TabularResult;
use crate::types::variables::VariableCatalog;
use crate::weather_data::error::DecodeError;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static COORDINATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*,\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)")
        .expect("coordinate pattern is valid")
});

/// Extracts `(lat, lon)` from a combined coordinate field such as `"(12.5, -71.3)"`.
pub(crate) fn parse_coordinates(text: &str) -> Option<(f64, f64)> {
    let captures = COORDINATE_PATTERN.captures(text)?;
    let lat = captures.get(1)?.as_str().parse().ok()?;
    let lon = captures.get(2)?.as_str().parse().ok()?;
    Some((lat, lon))
}

pub(crate) fn flatten(
    table: TabularResult,
    catalog: &VariableCatalog,
    requested_model: Model,
) -> Result<PendingFrame, ClimateError> {
    let coordinates_idx = table
        .column_index(|c| c.starts_with(RAW_COORDINATES_PREFIX))
        .ok_or_else(|| ClimateError::MissingColumn(RAW_COORDINATES_PREFIX.to_string()))?;
    let model_idx = table.column_index(|c| c.starts_with(RAW_MODEL_PREFIX));

    let mut lat = Vec::with_capacity(table.height());
    let mut lon = Vec::with_capacity(table.height());
    for value in table.column_values(coordinates_idx) {
        let text = value.as_str().ok_or_else(|| {
            DecodeError::MalformedTable(format!("coordinate field is not text: {value}"))
        })?;
        let (la, lo) = parse_coordinates(text).ok_or_else(|| {
            DecodeError::MalformedTable(format!("unparseable coordinate field '{text}'"))
        })?;
        lat.push(la);
        lon.push(lo);
    }

    let model = match model_idx {
        Some(idx) => table
            .column_values(idx)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                _ => requested_model.token().to_string(),
            })
            .collect(),
        None => vec![requested_model.token().to_string(); table.height()],
    };

    let mut columns = Vec::new();
    for (idx, raw_name) in table.columns.iter().enumerate() {
        if idx == coordinates_idx || Some(idx) == model_idx {
            continue;
        }
        let label = catalog.label_for(raw_name).unwrap_or(raw_name).to_string();
        columns.push((label, column_values(&table, idx)));
    }

    Ok(PendingFrame {
        timestamps: table.index,
        lat,
        lon,
        model,
        columns,
    })
}

/// Numeric columns (numbers and nulls only) become floats, anything else text.
fn column_values(table: &TabularResult, idx: usize) -> PendingValues {
    let numeric = table
        .column_values(idx)
        .all(|v| v.is_null() || v.is_number());
    if numeric {
        PendingValues::Float(table.column_values(idx).map(Value::as_f64).collect())
    } else {
        PendingValues::Text(
            table
                .column_values(idx)
                .map(|v| match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect(),
        )
    }
}
