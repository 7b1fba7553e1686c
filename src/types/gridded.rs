//! Named-dimension gridded data, as produced by area queries and the climate archive.

use crate::utils::decode_cf_times;
use crate::weather_data::error::DecodeError;
use chrono::NaiveDateTime;
use ndarray::{ArrayD, Axis, IxDyn};
use std::collections::BTreeMap;

pub const DIM_TIME: &str = "time";
pub const DIM_LAT: &str = "lat";
pub const DIM_LON: &str = "lon";
pub const DIM_MODEL: &str = "model";
pub const DIM_SCENARIO: &str = "scenario";

pub(crate) const LAT_ALIASES: [&str; 2] = ["lat", "latitude"];
pub(crate) const LON_ALIASES: [&str; 2] = ["lon", "longitude"];

pub const ATTR_MODEL: &str = "model";
pub const ATTR_CRS: &str = "crs";

/// Values along one coordinate axis.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    Float(Vec<f64>),
    Time(Vec<NaiveDateTime>),
    Label(Vec<String>),
}

impl CoordValues {
    pub fn len(&self) -> usize {
        match self {
            CoordValues::Float(v) => v.len(),
            CoordValues::Time(v) => v.len(),
            CoordValues::Label(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            CoordValues::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&[NaiveDateTime]> {
        match self {
            CoordValues::Time(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&[String]> {
        match self {
            CoordValues::Label(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the values at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> CoordValues {
        match self {
            CoordValues::Float(v) => CoordValues::Float(indices.iter().map(|&i| v[i]).collect()),
            CoordValues::Time(v) => CoordValues::Time(indices.iter().map(|&i| v[i]).collect()),
            CoordValues::Label(v) => {
                CoordValues::Label(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// max - min of the axis. Time axes are measured in days, labels have no extent.
    pub fn extent(&self) -> f64 {
        match self {
            CoordValues::Float(v) => {
                let finite = v.iter().copied().filter(|x| x.is_finite());
                let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                    (lo.min(x), hi.max(x))
                });
                if min.is_finite() {
                    max - min
                } else {
                    0.0
                }
            }
            CoordValues::Time(v) => match (v.iter().min(), v.iter().max()) {
                (Some(min), Some(max)) => (*max - *min).num_seconds() as f64 / 86_400.0,
                _ => 0.0,
            },
            CoordValues::Label(_) => 0.0,
        }
    }
}

/// A data variable: an n-dimensional array whose axes are named coordinates.
/// Missing values are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    dims: Vec<String>,
    values: ArrayD<f64>,
}

impl DataVariable {
    pub fn new(dims: Vec<String>, values: ArrayD<f64>) -> Result<Self, DecodeError> {
        if dims.len() != values.ndim() {
            return Err(DecodeError::MalformedGrid(format!(
                "{} dimension names for a {}-dimensional array",
                dims.len(),
                values.ndim()
            )));
        }
        Ok(Self { dims, values })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.values
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub(crate) fn select(&mut self, dim: &str, indices: &[usize]) {
        if let Some(axis) = self.axis_of(dim) {
            self.values = self.values.select(Axis(axis), indices);
        }
    }

    pub(crate) fn rename_dim(&mut self, from: &str, to: &str) {
        for d in self.dims.iter_mut().filter(|d| d.as_str() == from) {
            *d = to.to_string();
        }
    }
}

/// One array as read from a self-describing file, before coordinates and data
/// variables are told apart. Shared by the NetCDF decoder and the Zarr store.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArray {
    pub name: String,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
    /// String values for label coordinates (e.g. model names); `values` is ignored when set.
    pub labels: Option<Vec<String>>,
    /// CF `units` attribute; decides whether a `time` coordinate is decoded.
    pub units: Option<String>,
}

/// Named-dimension gridded result with free-form string attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GriddedResult {
    coords: BTreeMap<String, CoordValues>,
    variables: BTreeMap<String, DataVariable>,
    attrs: BTreeMap<String, String>,
}

impl GriddedResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a result from raw arrays. Arrays whose single dimension carries their own
    /// name are coordinates; everything else is a data variable. Dimensions without a
    /// coordinate array get a 0-based index axis.
    pub fn from_raw_arrays(arrays: Vec<RawArray>) -> Result<Self, DecodeError> {
        let mut result = GriddedResult::new();
        let mut data = Vec::new();

        for array in arrays {
            let is_coordinate = array.dims.len() == 1 && array.dims[0] == array.name;
            if !is_coordinate {
                data.push(array);
                continue;
            }
            let coord = match (array.labels, array.units.as_deref()) {
                (Some(labels), _) => CoordValues::Label(labels),
                (None, Some(units)) if array.name == DIM_TIME && units.contains(" since ") => {
                    CoordValues::Time(decode_cf_times(&array.values, units)?)
                }
                (None, _) => CoordValues::Float(array.values),
            };
            result.coords.insert(array.name, coord);
        }

        for array in data {
            for (dim, len) in array.dims.iter().zip(&array.shape) {
                result
                    .coords
                    .entry(dim.clone())
                    .or_insert_with(|| CoordValues::Float((0..*len).map(|i| i as f64).collect()));
            }
            let values = ArrayD::from_shape_vec(IxDyn(&array.shape), array.values)?;
            result.insert_variable(&array.name, array.dims, values)?;
        }
        Ok(result)
    }

    pub fn with_coord(mut self, name: &str, values: CoordValues) -> Self {
        self.coords.insert(name.to_string(), values);
        self
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_variable(
        mut self,
        name: &str,
        dims: &[&str],
        values: ArrayD<f64>,
    ) -> Result<Self, DecodeError> {
        self.insert_variable(name, dims.iter().map(|d| d.to_string()).collect(), values)?;
        Ok(self)
    }

    /// Adds a variable after checking each axis length against its coordinate.
    pub fn insert_variable(
        &mut self,
        name: &str,
        dims: Vec<String>,
        values: ArrayD<f64>,
    ) -> Result<(), DecodeError> {
        let variable = DataVariable::new(dims, values)?;
        self.check_variable(name, &variable)?;
        self.variables.insert(name.to_string(), variable);
        Ok(())
    }

    /// Re-checks every variable against the current coordinates. `with_coord` can
    /// replace an axis after its variables were added, so consumers that index by
    /// coordinate position call this first.
    pub fn check_shapes(&self) -> Result<(), DecodeError> {
        self.variables
            .iter()
            .try_for_each(|(name, variable)| self.check_variable(name, variable))
    }

    fn check_variable(&self, name: &str, variable: &DataVariable) -> Result<(), DecodeError> {
        for (axis, dim) in variable.dims().iter().enumerate() {
            let expected = self.coords.get(dim).map(CoordValues::len).ok_or_else(|| {
                DecodeError::MalformedGrid(format!("variable '{name}' uses unknown dimension '{dim}'"))
            })?;
            let found = variable.values().len_of(Axis(axis));
            if expected != found {
                return Err(DecodeError::MalformedGrid(format!(
                    "variable '{name}' has {found} entries along '{dim}', coordinate has {expected}"
                )));
            }
        }
        Ok(())
    }

    pub fn coord(&self, name: &str) -> Option<&CoordValues> {
        self.coords.get(name)
    }

    /// Looks a coordinate up by any of its accepted names (e.g. `lat` or `latitude`).
    pub fn coord_any(&self, names: &[&str]) -> Option<(&str, &CoordValues)> {
        names
            .iter()
            .find_map(|n| self.coords.get_key_value(*n))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn coords(&self) -> impl Iterator<Item = (&str, &CoordValues)> {
        self.coords.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn set_coord(&mut self, name: &str, values: CoordValues) {
        self.coords.insert(name.to_string(), values);
    }

    pub fn variable(&self, name: &str) -> Option<&DataVariable> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &DataVariable)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn variables_mut(&mut self) -> impl Iterator<Item = &mut DataVariable> {
        self.variables.values_mut()
    }

    pub(crate) fn from_parts(
        coords: BTreeMap<String, CoordValues>,
        variables: BTreeMap<String, DataVariable>,
        attrs: BTreeMap<String, String>,
    ) -> Self {
        Self {
            coords,
            variables,
            attrs,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_string(), value.to_string());
    }

    /// Renames a dimension on the coordinate and every variable using it.
    pub(crate) fn rename_dim(&mut self, from: &str, to: &str) {
        if let Some(values) = self.coords.remove(from) {
            self.coords.insert(to.to_string(), values);
        }
        for variable in self.variables.values_mut() {
            variable.rename_dim(from, to);
        }
    }

    /// Keeps only `indices` along `dim`, for the coordinate and every variable.
    pub(crate) fn select(&mut self, dim: &str, indices: &[usize]) {
        if let Some(values) = self.coords.get(dim) {
            let selected = values.select(indices);
            self.coords.insert(dim.to_string(), selected);
        }
        for variable in self.variables.values_mut() {
            variable.select(dim, indices);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::ArrayD;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_variable_checks_lengths() {
        let grid = GriddedResult::new()
            .with_coord(DIM_LAT, CoordValues::Float(vec![1.0, 2.0]))
            .with_coord(DIM_LON, CoordValues::Float(vec![1.0, 2.0, 3.0]));

        let ok = grid
            .clone()
            .with_variable("t", &[DIM_LAT, DIM_LON], ArrayD::zeros(IxDyn(&[2, 3])));
        assert!(ok.is_ok());

        let bad = grid.with_variable("t", &[DIM_LON, DIM_LAT], ArrayD::zeros(IxDyn(&[2, 3])));
        assert!(matches!(bad, Err(DecodeError::MalformedGrid(_))));
    }

    #[test]
    fn test_check_shapes_after_axis_replaced() -> Result<(), DecodeError> {
        let grid = GriddedResult::new()
            .with_coord(DIM_LAT, CoordValues::Float(vec![1.0]))
            .with_variable("t", &[DIM_LAT], ArrayD::zeros(IxDyn(&[1])))?;
        assert!(grid.check_shapes().is_ok());

        let replaced = grid.with_coord(DIM_LAT, CoordValues::Float(vec![1.0, 2.0]));
        assert!(matches!(replaced.check_shapes(), Err(DecodeError::MalformedGrid(_))));
        Ok(())
    }

    #[test]
    fn test_unknown_dimension_rejected() {
        let result = GriddedResult::new().with_variable("t", &["x"], ArrayD::zeros(IxDyn(&[1])));
        assert!(result.is_err());
    }

    #[test]
    fn test_extent() {
        assert_eq!(CoordValues::Float(vec![3.0, -1.0, 2.5]).extent(), 4.0);
        assert_eq!(CoordValues::Time(vec![day(1), day(31)]).extent(), 30.0);
        assert_eq!(CoordValues::Label(vec!["a".into()]).extent(), 0.0);
        assert_eq!(CoordValues::Float(vec![]).extent(), 0.0);
    }

    #[test]
    fn test_from_raw_arrays() -> Result<(), DecodeError> {
        let arrays = vec![
            RawArray {
                name: "time".into(),
                dims: vec!["time".into()],
                shape: vec![2],
                values: vec![0.0, 24.0],
                labels: None,
                units: Some("hours since 2020-01-01 00:00:00".into()),
            },
            RawArray {
                name: "latitude".into(),
                dims: vec!["latitude".into()],
                shape: vec![1],
                values: vec![10.0],
                labels: None,
                units: Some("degrees_north".into()),
            },
            RawArray {
                name: "temperature".into(),
                dims: vec!["time".into(), "latitude".into(), "longitude".into()],
                shape: vec![2, 1, 2],
                values: vec![1.0, 2.0, 3.0, 4.0],
                labels: None,
                units: Some("degC".into()),
            },
        ];
        let grid = GriddedResult::from_raw_arrays(arrays)?;
        assert_eq!(
            grid.coord("time").and_then(CoordValues::as_time),
            Some(&[day(1), day(2)][..])
        );
        // No longitude coordinate array was given, so an index axis is created.
        assert_eq!(
            grid.coord("longitude").and_then(CoordValues::as_float),
            Some(&[0.0, 1.0][..])
        );
        assert_eq!(grid.variable_count(), 1);
        assert_eq!(grid.variable("temperature").unwrap().values()[IxDyn(&[1, 0, 1])], 4.0);
        Ok(())
    }

    #[test]
    fn test_out_of_range_time_axis_is_error() {
        let arrays = vec![RawArray {
            name: "time".into(),
            dims: vec!["time".into()],
            shape: vec![1],
            values: vec![1e17],
            labels: None,
            units: Some("days since 1970-01-01".into()),
        }];
        assert!(matches!(
            GriddedResult::from_raw_arrays(arrays),
            Err(DecodeError::TimeUnits(_))
        ));
    }

    #[test]
    fn test_select_and_rename() -> Result<(), DecodeError> {
        let mut grid = GriddedResult::new()
            .with_coord("longitude", CoordValues::Float(vec![0.0, 1.0, 2.0]))
            .with_variable(
                "v",
                &["longitude"],
                ArrayD::from_shape_vec(IxDyn(&[3]), vec![10.0, 11.0, 12.0])?,
            )?;
        grid.rename_dim("longitude", DIM_LON);
        grid.select(DIM_LON, &[2, 0]);
        assert_eq!(
            grid.coord(DIM_LON).and_then(CoordValues::as_float),
            Some(&[2.0, 0.0][..])
        );
        let v = grid.variable("v").unwrap();
        assert_eq!(v.dims(), &["lon".to_string()]);
        assert_eq!(v.values().iter().copied().collect::<Vec<_>>(), vec![12.0, 10.0]);
        Ok(())
    }
}
