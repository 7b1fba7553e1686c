//! Contains the `CanonicalFrame` wrapper around the normalized Polars frame.

use crate::error::ClimateError;
use crate::normalize::columns::{
    COL_LAT, COL_LON, COL_MODEL, COL_TIMESTAMP_LOCAL, COL_TIMESTAMP_UTC, KEY_COLUMNS,
};
use polars::prelude::{DataFrame, DataType};

/// A normalized retrieval result: one row per (timestamp, location) observation.
///
/// Columns are `timestamp_utc` (Datetime, UTC), `timestamp_local` (Datetime in the
/// area's zone, same instant), `lat`, `lon`, `model`, then one unit-suffixed column
/// per variable. Both snow columns are always present.
///
/// Instances are produced by [`crate::WeatherClient::get_data`] and
/// [`crate::Normalizer::normalize`].
#[derive(Debug, Clone)]
pub struct CanonicalFrame {
    /// The underlying Polars DataFrame.
    pub frame: DataFrame,
}

impl CanonicalFrame {
    pub(crate) fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn into_inner(self) -> DataFrame {
        self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Names of the variable columns, i.e. everything except the key columns.
    pub fn variable_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .filter(|c| !KEY_COLUMNS.contains(&c.as_str()))
            .collect()
    }

    /// The IANA zone `timestamp_local` is expressed in.
    pub fn local_timezone(&self) -> Result<String, ClimateError> {
        let column = self
            .frame
            .column(COL_TIMESTAMP_LOCAL)
            .map_err(|_| ClimateError::MissingColumn(COL_TIMESTAMP_LOCAL.to_string()))?;
        match column.dtype() {
            DataType::Datetime(_, Some(tz)) => Ok(tz.to_string()),
            other => Err(ClimateError::Config(format!(
                "{COL_TIMESTAMP_LOCAL} has dtype {other} without a time zone"
            ))),
        }
    }

    /// Distinct (lat, lon) locations in row order.
    pub fn locations(&self) -> Result<Vec<(f64, f64)>, ClimateError> {
        let lat = self.frame.column(COL_LAT)?.f64()?;
        let lon = self.frame.column(COL_LON)?.f64()?;
        let mut seen: Vec<(f64, f64)> = Vec::new();
        for (la, lo) in lat.into_iter().zip(lon.into_iter()) {
            if let (Some(la), Some(lo)) = (la, lo) {
                if !seen.iter().any(|&(a, b)| a == la && b == lo) {
                    seen.push((la, lo));
                }
            }
        }
        Ok(seen)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == name)
    }

    pub(crate) fn key_columns_present(&self) -> bool {
        [COL_TIMESTAMP_UTC, COL_TIMESTAMP_LOCAL, COL_LAT, COL_LON, COL_MODEL]
            .iter()
            .all(|c| self.has_column(c))
    }
}
