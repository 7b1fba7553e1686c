//! USDA hardiness zones from a canonical frame.
//!
//! Works on the minimum temperature (°F) per period and location, smoothed with a
//! trailing rolling mean and bucketed into half zones.

use crate::error::ClimateError;
use crate::normalize::columns::{COL_LAT, COL_LON, COL_TIMESTAMP_UTC};
use crate::types::canonical_frame::CanonicalFrame;
use bon::Builder;
use log::debug;
use polars::prelude::*;

pub const DEFAULT_TEMP_COL: &str = "fahrenheit";
pub const COL_PERIOD_START: &str = "period_start";
pub const COL_TEMP_MIN: &str = "temp_min";
pub const COL_ROLLING_MEAN: &str = "rolling_mean";
pub const COL_HARDINESS_ZONE: &str = "hardiness_zone";

const ZONE_LOWEST_F: f64 = -60.0;
const ZONE_HIGHEST_F: f64 = 65.0;
const ZONE_WIDTH_F: f64 = 5.0;

/// Period the minimum temperature is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFrequency {
    #[default]
    YearStart,
    MonthStart,
}

impl ResampleFrequency {
    fn every(&self) -> &'static str {
        match self {
            ResampleFrequency::YearStart => "1y",
            ResampleFrequency::MonthStart => "1mo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct HardinessOptions {
    #[builder(default)]
    pub freq: ResampleFrequency,
    /// Number of periods in the trailing rolling mean.
    #[builder(default = 30)]
    pub window: usize,
    #[builder(into, default = DEFAULT_TEMP_COL.to_string())]
    pub temp_col: String,
}

impl Default for HardinessOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Adds `out_col` holding `celsius_col` converted to Fahrenheit.
pub fn with_fahrenheit(
    frame: &CanonicalFrame,
    celsius_col: &str,
    out_col: &str,
) -> Result<DataFrame, ClimateError> {
    if !frame.has_column(celsius_col) {
        return Err(ClimateError::MissingColumn(celsius_col.to_string()));
    }
    let df = frame
        .frame
        .clone()
        .lazy()
        .with_column((col(celsius_col) * lit(9.0) / lit(5.0) + lit(32.0)).alias(out_col))
        .collect()?;
    Ok(df)
}

/// Minimum of `temp_col` per (period start, lat, lon), sorted by location then period.
pub fn temp_min(
    df: &DataFrame,
    temp_col: &str,
    freq: ResampleFrequency,
) -> Result<DataFrame, ClimateError> {
    for required in [COL_TIMESTAMP_UTC, COL_LAT, COL_LON, temp_col] {
        if df.column(required).is_err() {
            return Err(ClimateError::MissingColumn(required.to_string()));
        }
    }
    let out = df
        .clone()
        .lazy()
        .with_column(
            col(COL_TIMESTAMP_UTC)
                .dt()
                .truncate(lit(freq.every()))
                .alias(COL_PERIOD_START),
        )
        .group_by([col(COL_PERIOD_START), col(COL_LAT), col(COL_LON)])
        .agg([col(temp_col).min().cast(DataType::Float64).alias(COL_TEMP_MIN)])
        .sort(
            [COL_LAT, COL_LON, COL_PERIOD_START],
            SortMultipleOptions::default(),
        )
        .collect()?;
    Ok(out)
}

/// Half-zone label for a minimum temperature in °F: 5°F bins from -60 to 65, closed
/// on the right, labelled 1, 1.5, ..., 13. `None` outside that range.
pub fn hardiness_zone(value_f: f64) -> Option<f64> {
    if !value_f.is_finite() || value_f <= ZONE_LOWEST_F || value_f > ZONE_HIGHEST_F {
        return None;
    }
    let bin = ((value_f - ZONE_LOWEST_F) / ZONE_WIDTH_F).ceil() - 1.0;
    Some(1.0 + bin * 0.5)
}

/// Hardiness zone per period and location.
///
/// Returns `period_start, lat, lon, temp_min, rolling_mean, hardiness_zone`. The
/// rolling mean covers the last `window` periods of the same location and needs only
/// one value.
pub fn get_hardiness(df: &DataFrame, options: &HardinessOptions) -> Result<DataFrame, ClimateError> {
    let window = options.window.max(1);
    let rolling = RollingOptionsFixedWindow {
        window_size: window,
        min_periods: 1,
        ..Default::default()
    };
    // temp_min sorts by location then period, so each window trails in time.
    let mut minima = temp_min(df, &options.temp_col, options.freq)?
        .lazy()
        .with_column(
            col(COL_TEMP_MIN)
                .rolling_mean(rolling)
                .over([col(COL_LAT), col(COL_LON)])
                .alias(COL_ROLLING_MEAN),
        )
        .collect()?;

    let zones: Vec<Option<f64>> = minima
        .column(COL_ROLLING_MEAN)?
        .f64()?
        .into_iter()
        .map(|mean| mean.and_then(hardiness_zone))
        .collect();
    debug!(
        "Computed {} hardiness zones over a {}-period window",
        zones.iter().flatten().count(),
        window
    );

    minima.with_column(Column::new(COL_HARDINESS_ZONE.into(), zones))?;
    Ok(minima)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn millis(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    fn frame(rows: &[(i64, f64, f64, f64)]) -> DataFrame {
        let ts = Int64Chunked::from_vec(
            COL_TIMESTAMP_UTC.into(),
            rows.iter().map(|r| r.0).collect(),
        )
        .into_datetime(TimeUnit::Milliseconds, Some("UTC".into()))
        .into_series();
        DataFrame::new(vec![
            Column::from(ts),
            Column::new(COL_LAT.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(COL_LON.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(DEFAULT_TEMP_COL.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn sample() -> DataFrame {
        frame(&[
            (millis(2000, 1, 5), 50.0, 5.0, -12.0),
            (millis(2000, 7, 5), 50.0, 5.0, 70.0),
            (millis(2001, 2, 1), 50.0, 5.0, -8.0),
            (millis(2001, 8, 1), 50.0, 5.0, 75.0),
            (millis(2000, 1, 5), 10.0, 5.0, 40.0),
            (millis(2001, 1, 5), 10.0, 5.0, 45.0),
        ])
    }

    #[test]
    fn test_zone_bins() {
        assert_eq!(hardiness_zone(-60.0), None);
        assert_eq!(hardiness_zone(-59.9), Some(1.0));
        assert_eq!(hardiness_zone(-55.0), Some(1.0));
        assert_eq!(hardiness_zone(-54.0), Some(1.5));
        assert_eq!(hardiness_zone(-10.0), Some(5.5));
        assert_eq!(hardiness_zone(65.0), Some(13.0));
        assert_eq!(hardiness_zone(65.1), None);
        assert_eq!(hardiness_zone(f64::NAN), None);
    }

    #[test]
    fn test_temp_min_per_year_and_location() -> Result<(), ClimateError> {
        let minima = temp_min(&sample(), DEFAULT_TEMP_COL, ResampleFrequency::YearStart)?;
        assert_eq!(minima.height(), 4);
        let lat = minima.column(COL_LAT)?.f64()?;
        let min = minima.column(COL_TEMP_MIN)?.f64()?;
        // Sorted by lat: the 10° location comes first.
        assert_eq!(lat.get(0), Some(10.0));
        assert_eq!(min.get(0), Some(40.0));
        assert_eq!(min.get(2), Some(-12.0));
        assert_eq!(min.get(3), Some(-8.0));
        Ok(())
    }

    #[test]
    fn test_monthly_periods() -> Result<(), ClimateError> {
        let minima = temp_min(&sample(), DEFAULT_TEMP_COL, ResampleFrequency::MonthStart)?;
        assert_eq!(minima.height(), 6);
        Ok(())
    }

    #[test]
    fn test_rolling_mean_stays_within_location() -> Result<(), ClimateError> {
        let options = HardinessOptions::builder().window(2).build();
        let zones = get_hardiness(&sample(), &options)?;

        let names: Vec<&str> = zones.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec![COL_PERIOD_START, COL_LAT, COL_LON, COL_TEMP_MIN, COL_ROLLING_MEAN, COL_HARDINESS_ZONE]
        );
        let mean = zones.column(COL_ROLLING_MEAN)?.f64()?;
        let zone = zones.column(COL_HARDINESS_ZONE)?.f64()?;
        assert_eq!(mean.get(0), Some(40.0));
        assert_eq!(mean.get(1), Some(42.5));
        // The 50° location starts a fresh window.
        assert_eq!(mean.get(2), Some(-12.0));
        assert_eq!(mean.get(3), Some(-10.0));
        assert_eq!(zone.get(0), Some(10.5));
        assert_eq!(zone.get(3), Some(5.5));
        Ok(())
    }

    #[test]
    fn test_window_of_one_uses_period_minimum() -> Result<(), ClimateError> {
        let options = HardinessOptions::builder().window(1).build();
        let zones = get_hardiness(&sample(), &options)?;
        assert_eq!(zones.column(COL_HARDINESS_ZONE)?.f64()?.get(3), Some(6.0));
        Ok(())
    }

    #[test]
    fn test_defaults() {
        let options = HardinessOptions::default();
        assert_eq!(options.window, 30);
        assert_eq!(options.freq, ResampleFrequency::YearStart);
        assert_eq!(options.temp_col, DEFAULT_TEMP_COL);
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            temp_min(&sample(), "celsius", ResampleFrequency::YearStart),
            Err(ClimateError::MissingColumn(c)) if c == "celsius"
        ));
    }
}
