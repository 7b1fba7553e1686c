//! The geographic area a retrieval is made for.
//!
//! An [`AreaOfInterest`] is either a set of points or a set of polygons, never a
//! mix. The kind decides which query shape is sent to the weather API and is fixed
//! when the value is constructed.

use crate::error::ClimateError;
use chrono_tz::Tz;
use geo::{Geometry, Point, Polygon};
use std::fmt;

/// The geometry kind of an [`AreaOfInterest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Point geometries, retrieved with a point query.
    Point,
    /// Polygon geometries, retrieved with an area (bounding box) query.
    Polygon,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "point"),
            GeometryKind::Polygon => write!(f, "polygon"),
        }
    }
}

/// One or more geometries of a single kind, in degrees with longitudes in -180..180,
/// together with the local time zone used for `timestamp_local`.
///
/// # Examples
///
/// ```
/// use aoiclimate::{AreaOfInterest, GeometryKind};
/// use geo::point;
///
/// let aoi = AreaOfInterest::points(vec![point!(x: 5.18, y: 52.11)], chrono_tz::Europe::Amsterdam)?;
/// assert_eq!(aoi.geometry_kind(), GeometryKind::Point);
/// # Ok::<(), aoiclimate::ClimateError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum AreaOfInterest {
    Points { points: Vec<Point<f64>>, timezone: Tz },
    Polygons { polygons: Vec<Polygon<f64>>, timezone: Tz },
}

impl AreaOfInterest {
    /// Creates a point area of interest. Fails with [`ClimateError::EmptyGeometry`]
    /// when `points` is empty.
    pub fn points(points: Vec<Point<f64>>, timezone: Tz) -> Result<Self, ClimateError> {
        if points.is_empty() {
            return Err(ClimateError::EmptyGeometry);
        }
        Ok(AreaOfInterest::Points { points, timezone })
    }

    /// Creates a polygon area of interest. Fails with [`ClimateError::EmptyGeometry`]
    /// when `polygons` is empty.
    pub fn polygons(polygons: Vec<Polygon<f64>>, timezone: Tz) -> Result<Self, ClimateError> {
        if polygons.is_empty() {
            return Err(ClimateError::EmptyGeometry);
        }
        Ok(AreaOfInterest::Polygons {
            polygons,
            timezone,
        })
    }

    /// Classifies loosely typed geometries into a point or polygon area.
    ///
    /// Multi-geometries are flattened into their members. Mixing points with polygons,
    /// or passing any other geometry type, fails with [`ClimateError::InvalidGeometryKind`].
    pub fn from_geometries(
        geometries: Vec<Geometry<f64>>,
        timezone: Tz,
    ) -> Result<Self, ClimateError> {
        let mut points = Vec::new();
        let mut polygons = Vec::new();

        for geometry in geometries {
            match geometry {
                Geometry::Point(p) => points.push(p),
                Geometry::MultiPoint(mp) => points.extend(mp.0),
                Geometry::Polygon(p) => polygons.push(p),
                Geometry::MultiPolygon(mp) => polygons.extend(mp.0),
                other => {
                    return Err(ClimateError::InvalidGeometryKind(
                        geometry_name(&other).to_string(),
                    ))
                }
            }
        }

        match (points.is_empty(), polygons.is_empty()) {
            (false, false) => Err(ClimateError::InvalidGeometryKind(format!(
                "{} points and {} polygons",
                points.len(),
                polygons.len()
            ))),
            (false, true) => Self::points(points, timezone),
            (true, false) => Self::polygons(polygons, timezone),
            (true, true) => Err(ClimateError::EmptyGeometry),
        }
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        match self {
            AreaOfInterest::Points { .. } => GeometryKind::Point,
            AreaOfInterest::Polygons { .. } => GeometryKind::Polygon,
        }
    }

    pub fn timezone(&self) -> Tz {
        match self {
            AreaOfInterest::Points { timezone, .. } | AreaOfInterest::Polygons { timezone, .. } => {
                *timezone
            }
        }
    }
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
