//! Region boundaries for clipping archive data.
//!
//! Boundaries are read from GeoJSON in -180..180 longitudes and moved by +180° into
//! the 0..360 frame the loader compares cells in. Cell centres are shifted the same
//! way before testing, so both sides use one frame. No reprojection is done: the
//! boundary CRS has to match the dataset CRS.

use crate::archive::ARCHIVE_CRS;
use crate::error::ClimateError;
use crate::types::gridded::{GriddedResult, ATTR_CRS, LAT_ALIASES, LON_ALIASES};
use crate::weather_data::error::DecodeError;
use geo::{Geometry, Intersects, MultiPolygon, Point, Polygon, Translate};
use geojson::GeoJson;
use log::{debug, info};
use serde_json::Value;
use std::path::Path;

/// Longitude shift from -180..180 into the 0..360 frame.
pub const LONGITUDE_SHIFT: f64 = 180.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RegionSelector {
    polygons: MultiPolygon<f64>,
    crs: String,
}

impl RegionSelector {
    pub fn new(polygons: Vec<Polygon<f64>>, crs: &str) -> Result<Self, ClimateError> {
        if polygons.is_empty() {
            return Err(ClimateError::RegionFile("boundary contains no polygons".into()));
        }
        Ok(Self {
            polygons: MultiPolygon(polygons),
            crs: normalize_crs(crs),
        })
    }

    pub fn from_geojson_file(path: &Path) -> Result<Self, ClimateError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClimateError::RegionRead(path.to_path_buf(), e))?;
        Self::from_geojson_str(&text)
    }

    /// Parses a GeoJSON FeatureCollection, Feature or bare geometry. The CRS comes from
    /// the legacy `crs` member and defaults to WGS 84.
    pub fn from_geojson_str(text: &str) -> Result<Self, ClimateError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ClimateError::RegionFile(e.to_string()))?;
        let crs = value
            .get("crs")
            .and_then(|c| c.get("properties"))
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .unwrap_or(ARCHIVE_CRS)
            .to_string();

        let geojson =
            GeoJson::from_json_value(value).map_err(|e| ClimateError::RegionFile(e.to_string()))?;
        let collection = geojson::quick_collection::<f64>(&geojson)
            .map_err(|e| ClimateError::RegionFile(e.to_string()))?;

        let mut polygons = Vec::new();
        for geometry in collection {
            match geometry {
                Geometry::Polygon(p) => polygons.push(p),
                Geometry::MultiPolygon(mp) => polygons.extend(mp),
                other => {
                    return Err(ClimateError::RegionFile(format!(
                        "unsupported boundary geometry {other:?}"
                    )))
                }
            }
        }
        Self::new(polygons, &crs)
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn polygons(&self) -> &MultiPolygon<f64> {
        &self.polygons
    }

    /// The boundary moved by +180° in longitude.
    pub fn translated(&self) -> MultiPolygon<f64> {
        self.polygons.translate(LONGITUDE_SHIFT, 0.0)
    }

    /// Clips `grid` to the boundary: keeps the rows and columns spanning the cells whose
    /// centre lies in the boundary and sets every other cell to NaN.
    pub fn clip(&self, grid: &GriddedResult) -> Result<GriddedResult, ClimateError> {
        let dataset_crs = normalize_crs(grid.attr(ATTR_CRS).unwrap_or(ARCHIVE_CRS));
        if dataset_crs != self.crs {
            return Err(ClimateError::CrsMismatch {
                dataset: dataset_crs,
                region: self.crs.clone(),
            });
        }

        grid.check_shapes()?;
        let (lat_dim, lats) = spatial_axis(grid, &LAT_ALIASES)?;
        let (lon_dim, lons) = spatial_axis(grid, &LON_ALIASES)?;
        let boundary = self.translated();

        let inside: Vec<Vec<bool>> = lats
            .iter()
            .map(|lat| {
                lons.iter()
                    .map(|lon| {
                        let shifted = (lon + LONGITUDE_SHIFT).rem_euclid(360.0);
                        boundary.intersects(&Point::new(shifted, *lat))
                    })
                    .collect()
            })
            .collect();

        let rows: Vec<usize> = (0..lats.len()).filter(|&i| inside[i].iter().any(|&c| c)).collect();
        let cols: Vec<usize> = (0..lons.len())
            .filter(|&j| inside.iter().any(|row| row[j]))
            .collect();
        let (Some(&row_lo), Some(&row_hi), Some(&col_lo), Some(&col_hi)) =
            (rows.first(), rows.last(), cols.first(), cols.last())
        else {
            return Err(ClimateError::NoOverlap);
        };
        debug!(
            "Region covers lat rows {}..={} and lon columns {}..={}",
            row_lo, row_hi, col_lo, col_hi
        );

        let row_range: Vec<usize> = (row_lo..=row_hi).collect();
        let col_range: Vec<usize> = (col_lo..=col_hi).collect();
        let mut clipped = grid.clone();
        clipped.select(&lat_dim, &row_range);
        clipped.select(&lon_dim, &col_range);

        for variable in clipped.variables_mut() {
            let (Some(lat_axis), Some(lon_axis)) =
                (variable.axis_of(&lat_dim), variable.axis_of(&lon_dim))
            else {
                continue;
            };
            for (index, value) in variable.values_mut().indexed_iter_mut() {
                if !inside[row_lo + index[lat_axis]][col_lo + index[lon_axis]] {
                    *value = f64::NAN;
                }
            }
        }
        clipped.set_attr(ATTR_CRS, &self.crs);

        info!(
            "Clipped grid to {} x {} cells ({} inside the region)",
            row_range.len(),
            col_range.len(),
            inside.iter().flatten().filter(|&&c| c).count()
        );
        Ok(clipped)
    }
}

fn spatial_axis(grid: &GriddedResult, aliases: &[&str]) -> Result<(String, Vec<f64>), DecodeError> {
    let (name, values) = grid.coord_any(aliases).ok_or_else(|| {
        DecodeError::MalformedGrid(format!("no spatial coordinate named any of {aliases:?}"))
    })?;
    let values = values
        .as_float()
        .map(<[f64]>::to_vec)
        .ok_or_else(|| DecodeError::MalformedGrid(format!("'{name}' coordinate is not numeric")))?;
    Ok((name.to_string(), values))
}

/// Canonical spelling of a CRS identifier. OGC CRS84 and the EPSG URNs collapse to
/// `EPSG:<code>`.
pub fn normalize_crs(crs: &str) -> String {
    let trimmed = crs.trim();
    let upper = trimmed.to_ascii_uppercase();
    if upper.ends_with("CRS84") {
        return ARCHIVE_CRS.to_string();
    }
    if let Some(code) = upper
        .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
        .map(|rest| rest.trim_start_matches(|c: char| !c.is_ascii_digit()))
    {
        return format!("EPSG:{code}");
    }
    if let Some(code) = upper.strip_prefix("EPSG:") {
        return format!("EPSG:{code}");
    }
    trimmed.to_string()
}
