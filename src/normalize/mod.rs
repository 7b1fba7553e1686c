//! Turns gridded and tabular responses into a [`CanonicalFrame`].
//!
//! Both paths first produce a [`PendingFrame`] (key columns plus labelled value
//! columns). The shared steps then run in a fixed order: sanitize column names,
//! localize `timestamp_utc` as UTC, derive `timestamp_local`, and add missing snow
//! columns.

pub mod columns;
mod gridded;
mod tabular;

use crate::error::ClimateError;
use crate::normalize::columns::{
    sanitize_column_name, COL_LAT, COL_LON, COL_MODEL, COL_TIMESTAMP_LOCAL, COL_TIMESTAMP_UTC,
    KEY_COLUMNS,
};
use crate::types::area_of_interest::AreaOfInterest;
use crate::types::canonical_frame::CanonicalFrame;
use crate::types::payload::ResultPayload;
use crate::types::query_spec::Model;
use crate::types::variables::VariableCatalog;
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use log::debug;
use polars::prelude::*;
use std::collections::HashSet;

/// Values of one non-key column before it becomes a Polars column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingValues {
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Row-per-observation data that still carries raw, labelled column names.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingFrame {
    pub timestamps: Vec<NaiveDateTime>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub model: Vec<String>,
    pub columns: Vec<(String, PendingValues)>,
}

/// Normalizes responses using an explicitly passed variable catalog.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    catalog: &'a VariableCatalog,
}

impl<'a> Normalizer<'a> {
    pub fn new(catalog: &'a VariableCatalog) -> Self {
        Self { catalog }
    }

    /// Normalizes one payload. `model` stamps rows when the payload does not name
    /// the model itself.
    pub fn normalize(
        &self,
        payload: ResultPayload,
        aoi: &AreaOfInterest,
        model: Model,
    ) -> Result<CanonicalFrame, ClimateError> {
        let pending = match payload {
            ResultPayload::Gridded(grid) => gridded::flatten(grid, self.catalog, model)?,
            ResultPayload::Tabular(table) => tabular::flatten(table, self.catalog, model)?,
            ResultPayload::Unsupported { content_type } => {
                return Err(ClimateError::UnsupportedResultType(content_type))
            }
        };
        self.finish(pending, aoi.timezone())
    }

    fn finish(&self, pending: PendingFrame, tz: Tz) -> Result<CanonicalFrame, ClimateError> {
        let height = pending.timestamps.len();

        // (a) sanitize
        let mut seen: HashSet<String> = KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut value_columns = Vec::with_capacity(pending.columns.len() + 2);
        for (raw_name, values) in pending.columns {
            let name = sanitize_column_name(&raw_name);
            if !seen.insert(name.clone()) {
                return Err(ClimateError::DuplicateColumn(name));
            }
            value_columns.push(match values {
                PendingValues::Float(v) => Column::new(name.into(), v),
                PendingValues::Text(v) => Column::new(name.into(), v),
            });
        }

        // (b) + (c): both columns hold the same instants, only the zone differs.
        let millis: Vec<i64> = pending
            .timestamps
            .iter()
            .map(|t| t.and_utc().timestamp_millis())
            .collect();
        let utc = Int64Chunked::from_vec(COL_TIMESTAMP_UTC.into(), millis.clone())
            .into_datetime(TimeUnit::Milliseconds, Some("UTC".into()))
            .into_series();
        let local = Int64Chunked::from_vec(COL_TIMESTAMP_LOCAL.into(), millis)
            .into_datetime(TimeUnit::Milliseconds, Some(tz.name().into()))
            .into_series();

        // (d)
        for snow in self.catalog.snow_columns() {
            if !seen.contains(&snow) {
                debug!("Adding null-filled snow column {}", snow);
                value_columns.push(Column::full_null(snow.into(), height, &DataType::Float64));
            }
        }

        let mut columns = vec![
            Column::from(utc),
            Column::from(local),
            Column::new(COL_LAT.into(), pending.lat),
            Column::new(COL_LON.into(), pending.lon),
            Column::new(COL_MODEL.into(), pending.model),
        ];
        columns.extend(value_columns);

        let frame = CanonicalFrame::new(DataFrame::new(columns)?);
        debug_assert!(frame.key_columns_present());
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::gridded::{CoordValues, GriddedResult, DIM_TIME};
    use crate::types::tabular::TabularResult;
    use crate::weather_data::error::DecodeError;
    use chrono::{NaiveDate, Offset, TimeZone};
    use geo::{point, polygon};
    use ndarray::{ArrayD, IxDyn};
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn point_aoi(tz: Tz) -> AreaOfInterest {
        AreaOfInterest::points(vec![point!(x: -71.3, y: 12.5)], tz).unwrap()
    }

    fn table(columns: &[&str], rows: Vec<Vec<serde_json::Value>>, index: Vec<NaiveDateTime>) -> TabularResult {
        TabularResult {
            index,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            reported_usage: None,
        }
    }

    #[test]
    fn test_tabular_coordinates_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let payload = ResultPayload::Tabular(table(
            &["coordinates (lat,lon)", "model (name)", "temperature (degC)"],
            vec![vec![json!("(12.5, -71.3)"), json!("era5"), json!(27.5)]],
            vec![at(2020, 6, 1, 0)],
        ));
        let frame = Normalizer::new(&catalog).normalize(payload, &point_aoi(chrono_tz::UTC), Model::Era5)?;

        assert_eq!(frame.frame.column(COL_LAT)?.f64()?.get(0), Some(12.5));
        assert_eq!(frame.frame.column(COL_LON)?.f64()?.get(0), Some(-71.3));
        assert_eq!(frame.frame.column("temperature_degC")?.f64()?.get(0), Some(27.5));
        assert_eq!(frame.frame.column(COL_MODEL)?.str()?.get(0), Some("era5"));
        Ok(())
    }

    #[test]
    fn test_replaced_axis_is_malformed_grid() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let grid = GriddedResult::new()
            .with_coord(DIM_TIME, CoordValues::Time(vec![at(2020, 1, 1, 0)]))
            .with_coord("lat", CoordValues::Float(vec![10.0]))
            .with_coord("lon", CoordValues::Float(vec![20.0]))
            .with_variable("temperature", &["time", "lat", "lon"], ArrayD::zeros(IxDyn(&[1, 1, 1])))?
            .with_coord("lat", CoordValues::Float(vec![10.0, 11.0]));
        let aoi = AreaOfInterest::polygons(
            vec![polygon![(x: 19.0, y: 9.0), (x: 21.0, y: 9.0), (x: 21.0, y: 12.0)]],
            chrono_tz::UTC,
        )?;
        let result = Normalizer::new(&catalog).normalize(ResultPayload::Gridded(grid), &aoi, Model::Era5);
        assert!(matches!(
            result,
            Err(ClimateError::Decode(DecodeError::MalformedGrid(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_snow_columns_always_present() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let payload = ResultPayload::Tabular(table(
            &["coordinates (lat,lon)", "temperature (degC)"],
            vec![
                vec![json!("(1.0, 2.0)"), json!(20.0)],
                vec![json!("(1.0, 2.0)"), json!(21.0)],
            ],
            vec![at(2020, 1, 1, 0), at(2020, 1, 1, 1)],
        ));
        let frame = Normalizer::new(&catalog).normalize(payload, &point_aoi(chrono_tz::UTC), Model::Era5)?;

        for snow in catalog.snow_columns() {
            let column = frame.frame.column(&snow)?;
            assert_eq!(column.null_count(), 2, "{snow} should be all null");
            assert_eq!(column.dtype(), &DataType::Float64);
        }
        Ok(())
    }

    #[test]
    fn test_requested_snow_values_kept() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let payload = ResultPayload::Tabular(table(
            &["coordinates (lat,lon)", "snowfall (mm of water equivalent)"],
            vec![vec![json!("(60.0, 10.0)"), json!(4.2)]],
            vec![at(2020, 1, 1, 0)],
        ));
        let frame = Normalizer::new(&catalog).normalize(payload, &point_aoi(chrono_tz::UTC), Model::Era5)?;
        assert_eq!(
            frame.frame.column("snowfall_mm_of_water_equivalent")?.f64()?.get(0),
            Some(4.2)
        );
        assert_eq!(
            frame.frame.column("snow_depth_mm_of_water_equivalent")?.null_count(),
            1
        );
        Ok(())
    }

    #[test]
    fn test_local_timestamps_follow_zone_offset_across_dst() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let tz = chrono_tz::America::New_York;
        // 2021-03-14 07:00 UTC is 03:00 EDT, one hour after the spring-forward gap.
        let index = vec![at(2021, 3, 14, 6), at(2021, 3, 14, 7), at(2021, 7, 1, 12)];
        let rows = index
            .iter()
            .map(|_| vec![json!("(40.7, -74.0)"), json!(1.0)])
            .collect();
        let payload = ResultPayload::Tabular(table(
            &["coordinates (lat,lon)", "temperature (degC)"],
            rows,
            index.clone(),
        ));
        let frame = Normalizer::new(&catalog).normalize(payload, &point_aoi(tz), Model::Era5)?;

        assert_eq!(frame.local_timezone()?, "America/New_York");
        assert!(matches!(
            frame.frame.column(COL_TIMESTAMP_UTC)?.dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, Some(z)) if z.as_str() == "UTC"
        ));

        let local_tz: Tz = frame.local_timezone()?.parse()?;
        let local = frame.frame.column(COL_TIMESTAMP_LOCAL)?.cast(&DataType::Int64)?;
        let utc = frame.frame.column(COL_TIMESTAMP_UTC)?.cast(&DataType::Int64)?;
        let expected_offsets = [-5 * 3600, -4 * 3600, -4 * 3600];

        for (i, expected) in expected_offsets.iter().enumerate() {
            let utc_ms = utc.i64()?.get(i).unwrap();
            let local_ms = local.i64()?.get(i).unwrap();
            assert_eq!(utc_ms, local_ms, "both columns store the same instant");

            let instant = chrono::DateTime::from_timestamp_millis(local_ms).unwrap();
            let wall = local_tz.from_utc_datetime(&instant.naive_utc());
            let diff = (wall.naive_local() - instant.naive_utc()).num_seconds();
            assert_eq!(diff, *expected as i64);
            assert_eq!(wall.offset().fix().local_minus_utc(), *expected);
        }
        Ok(())
    }

    #[test]
    fn test_gridded_flatten_renames_and_stamps_model() -> Result<(), Box<dyn std::error::Error>> {
        let catalog = VariableCatalog::default();
        let grid = GriddedResult::new()
            .with_coord(DIM_TIME, CoordValues::Time(vec![at(2020, 1, 1, 0), at(2020, 1, 2, 0)]))
            .with_coord("latitude", CoordValues::Float(vec![10.0, 11.0]))
            .with_coord("longitude", CoordValues::Float(vec![20.0]))
            .with_attr("model", "era5")
            .with_variable(
                "temperature",
                &["time", "latitude", "longitude"],
                ArrayD::from_shape_vec(IxDyn(&[2, 2, 1]), vec![1.0, 2.0, 3.0, f64::NAN])?,
            )?
            .with_variable(
                "surface_net_solar_radiation",
                &["longitude", "latitude", "time"],
                ArrayD::from_shape_vec(IxDyn(&[1, 2, 2]), vec![100.0, 101.0, 110.0, 111.0])?,
            )?;
        let aoi = AreaOfInterest::polygons(
            vec![polygon![(x: 19.0, y: 9.0), (x: 21.0, y: 9.0), (x: 21.0, y: 12.0)]],
            chrono_tz::UTC,
        )?;
        let frame = Normalizer::new(&catalog).normalize(ResultPayload::Gridded(grid), &aoi, Model::Gfs)?;

        assert_eq!(frame.height(), 4);
        let temp = frame.frame.column("temperature_degC")?.f64()?;
        assert_eq!(temp.get(0), Some(1.0));
        assert_eq!(temp.get(3), None, "NaN becomes null");

        // Row order is time-major then lat: rows 0/1 are day 1 at lat 10/11.
        let solar = frame.frame.column("total_solar_radiation_W_per_m_2")?.f64()?;
        assert_eq!(solar.get(0), Some(100.0));
        assert_eq!(solar.get(1), Some(110.0));
        assert_eq!(solar.get(2), Some(101.0));

        let lat = frame.frame.column(COL_LAT)?.f64()?;
        assert_eq!(lat.get(1), Some(11.0));
        // Metadata model wins over the requested one.
        assert_eq!(frame.frame.column(COL_MODEL)?.str()?.get(0), Some("era5"));
        assert!(frame.has_column("snowfall_mm_of_water_equivalent"));
        Ok(())
    }

    #[test]
    fn test_unsupported_payload() {
        let catalog = VariableCatalog::default();
        let result = Normalizer::new(&catalog).normalize(
            ResultPayload::Unsupported {
                content_type: "text/html".into(),
            },
            &point_aoi(chrono_tz::UTC),
            Model::Era5,
        );
        assert!(matches!(result, Err(ClimateError::UnsupportedResultType(t)) if t == "text/html"));
    }

    #[test]
    fn test_duplicate_after_sanitizing_rejected() {
        let catalog = VariableCatalog::default();
        let payload = ResultPayload::Tabular(table(
            &["coordinates (lat,lon)", "wind/gust", "wind per gust"],
            vec![vec![json!("(1, 2)"), json!(1.0), json!(2.0)]],
            vec![at(2020, 1, 1, 0)],
        ));
        let result =
            Normalizer::new(&catalog).normalize(payload, &point_aoi(chrono_tz::UTC), Model::Era5);
        assert!(matches!(result, Err(ClimateError::DuplicateColumn(c)) if c == "wind_per_gust"));
    }
}
