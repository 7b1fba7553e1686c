//! Builds the parameter sets for point and area queries against the weather API.

use crate::error::ClimateError;
use crate::types::area_of_interest::AreaOfInterest;
use crate::types::query_spec::QuerySpec;
use crate::types::variables::VariableCatalog;
use geo::{BoundingRect, Rect};
use log::debug;

/// Points further from the equator than this request snow variables.
pub const SNOW_LATITUDE_THRESHOLD: f64 = 35.0;

/// Fraction of the bounding box width/height added on each side for area queries.
pub const BBOX_PADDING: f64 = 0.1;

const REDACTED: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    fn from_rect(rect: Rect<f64>) -> Self {
        Self {
            north: rect.max().y,
            south: rect.min().y,
            east: rect.max().x,
            west: rect.min().x,
        }
    }

    fn union(self, other: BoundingBox) -> Self {
        Self {
            north: self.north.max(other.north),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            west: self.west.min(other.west),
        }
    }

    /// Grows the box by `fraction` of its width and height on every side.
    pub fn expanded(self, fraction: f64) -> Self {
        let dx = (self.east - self.west) * fraction;
        let dy = (self.north - self.south) * fraction;
        Self {
            north: self.north + dy,
            south: self.south - dy,
            east: self.east + dx,
            west: self.west - dx,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointQuery {
    /// (lat, lon) per requested point.
    pub locations: Vec<(f64, f64)>,
    pub variables: Vec<String>,
    pub start: String,
    pub end: String,
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaQuery {
    pub bbox: BoundingBox,
    pub variables: Vec<String>,
    pub start: String,
    pub end: String,
    pub model: String,
    pub frequency: String,
    pub resample_method: Option<String>,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    Point(PointQuery),
    Area(AreaQuery),
}

impl QueryParams {
    pub fn to_params(&self) -> Vec<(String, String)> {
        match self {
            QueryParams::Point(q) => q.to_params(),
            QueryParams::Area(q) => q.to_params(),
        }
    }

    /// Same as [`QueryParams::to_params`] with the api key masked, for errors and logs.
    pub fn redacted_params(&self) -> Vec<(String, String)> {
        redact(self.to_params())
    }

    pub fn variables(&self) -> &[String] {
        match self {
            QueryParams::Point(q) => &q.variables,
            QueryParams::Area(q) => &q.variables,
        }
    }
}

impl PointQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = variable_params(&self.variables);
        params.push(("start".into(), self.start.clone()));
        params.push(("end".into(), self.end.clone()));
        for (lat, lon) in &self.locations {
            params.push(("lat".into(), lat.to_string()));
            params.push(("lon".into(), lon.to_string()));
        }
        params.push(("api-key".into(), self.api_key.clone()));
        params.push(("model".into(), self.model.clone()));
        params.push(("format".into(), "json".into()));
        params
    }

    pub fn redacted_params(&self) -> Vec<(String, String)> {
        redact(self.to_params())
    }
}

impl AreaQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = variable_params(&self.variables);
        params.extend([
            ("start".into(), self.start.clone()),
            ("end".into(), self.end.clone()),
            ("north".into(), self.bbox.north.to_string()),
            ("south".into(), self.bbox.south.to_string()),
            ("east".into(), self.bbox.east.to_string()),
            ("west".into(), self.bbox.west.to_string()),
            ("api-key".into(), self.api_key.clone()),
            ("model".into(), self.model.clone()),
            ("format".into(), "netcdf".into()),
            ("freq".into(), self.frequency.clone()),
        ]);
        if let Some(method) = &self.resample_method {
            params.push(("resample_method".into(), method.clone()));
        }
        params
    }

    pub fn redacted_params(&self) -> Vec<(String, String)> {
        redact(self.to_params())
    }
}

fn variable_params(variables: &[String]) -> Vec<(String, String)> {
    variables
        .iter()
        .map(|v| ("param".to_string(), v.clone()))
        .collect()
}

fn redact(mut params: Vec<(String, String)>) -> Vec<(String, String)> {
    for (key, value) in params.iter_mut() {
        if key == "api-key" {
            *value = REDACTED.to_string();
        }
    }
    params
}

/// Turns an area of interest and a query spec into request parameters, picking variables
/// from an immutable catalog.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    catalog: &'a VariableCatalog,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(catalog: &'a VariableCatalog) -> Self {
        Self { catalog }
    }

    pub fn build(
        &self,
        aoi: &AreaOfInterest,
        spec: &QuerySpec,
        api_key: &str,
    ) -> Result<QueryParams, ClimateError> {
        spec.validate()?;

        let params = match aoi {
            AreaOfInterest::Points { points, .. } => {
                let locations: Vec<(f64, f64)> = points.iter().map(|p| (p.y(), p.x())).collect();
                let include_snow = locations
                    .iter()
                    .any(|(lat, _)| lat.abs() > SNOW_LATITUDE_THRESHOLD);
                debug!(
                    "Point query for {} location(s), snow variables: {}",
                    locations.len(),
                    include_snow
                );
                QueryParams::Point(PointQuery {
                    locations,
                    variables: self.catalog.tokens_for(include_snow),
                    start: spec.start_date_param(),
                    end: spec.end_date_param(),
                    model: spec.model.token().to_string(),
                    api_key: api_key.to_string(),
                })
            }
            AreaOfInterest::Polygons { polygons, .. } => {
                let bbox = polygons
                    .iter()
                    .filter_map(|p| p.bounding_rect())
                    .map(BoundingBox::from_rect)
                    .reduce(BoundingBox::union)
                    .ok_or(ClimateError::EmptyGeometry)?
                    .expanded(BBOX_PADDING);
                debug!("Area query for bounding box {:?}", bbox);
                QueryParams::Area(AreaQuery {
                    bbox,
                    variables: self.catalog.tokens_for(false),
                    start: spec.start_date_param(),
                    end: spec.end_date_param(),
                    model: spec.model.token().to_string(),
                    frequency: spec.frequency.token().to_string(),
                    resample_method: spec.resample_method.map(|m| m.token().to_string()),
                    api_key: api_key.to_string(),
                })
            }
        };
        Ok(params)
    }
}
