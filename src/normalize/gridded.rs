use crate::error::ClimateError;
use crate::normalize::{PendingFrame, PendingValues};
use crate::types::gridded::{
    CoordValues, GriddedResult, ATTR_MODEL, DIM_LAT, DIM_LON, DIM_TIME, LAT_ALIASES, LON_ALIASES,
};
use crate::types::query_spec::Model;
use crate::types::variables::VariableCatalog;
use crate::weather_data::error::DecodeError;
use log::warn;
use ndarray::IxDyn;

/// Flattens every (time, lat, lon) variable into one row per grid cell and time step,
/// time-major, then latitude, then longitude.
pub(crate) fn flatten(
    mut grid: GriddedResult,
    catalog: &VariableCatalog,
    requested_model: Model,
) -> Result<PendingFrame, ClimateError> {
    grid.check_shapes()?;
    for (aliases, canonical) in [(LAT_ALIASES, DIM_LAT), (LON_ALIASES, DIM_LON)] {
        let found = grid.coord_any(&aliases).map(|(name, _)| name.to_string());
        match found {
            Some(name) if name != canonical => grid.rename_dim(&name, canonical),
            Some(_) => {}
            None => {
                return Err(DecodeError::MalformedGrid(format!("missing '{canonical}' coordinate")).into())
            }
        }
    }

    let times = coord(&grid, DIM_TIME)?
        .as_time()
        .ok_or_else(|| DecodeError::MalformedGrid("time coordinate is not decoded".into()))?
        .to_vec();
    let lats = float_coord(&grid, DIM_LAT)?;
    let lons = float_coord(&grid, DIM_LON)?;
    let model = grid
        .attr(ATTR_MODEL)
        .map(str::to_string)
        .unwrap_or_else(|| requested_model.token().to_string());

    let height = times.len() * lats.len() * lons.len();
    let mut pending = PendingFrame {
        timestamps: Vec::with_capacity(height),
        lat: Vec::with_capacity(height),
        lon: Vec::with_capacity(height),
        model: vec![model; height],
        columns: Vec::new(),
    };
    for t in &times {
        for la in &lats {
            for lo in &lons {
                pending.timestamps.push(*t);
                pending.lat.push(*la);
                pending.lon.push(*lo);
            }
        }
    }

    for (name, variable) in grid.variables() {
        let axes = match (
            variable.axis_of(DIM_TIME),
            variable.axis_of(DIM_LAT),
            variable.axis_of(DIM_LON),
        ) {
            (Some(t), Some(la), Some(lo)) if variable.dims().len() == 3 => [t, la, lo],
            _ => {
                warn!(
                    "Skipping variable {} with dimensions {:?}; only (time, lat, lon) is flattened",
                    name,
                    variable.dims()
                );
                continue;
            }
        };

        let values = variable.values();
        let mut column = Vec::with_capacity(height);
        let mut index = [0usize; 3];
        for t in 0..times.len() {
            for la in 0..lats.len() {
                for lo in 0..lons.len() {
                    index[axes[0]] = t;
                    index[axes[1]] = la;
                    index[axes[2]] = lo;
                    let value = values[IxDyn(&index)];
                    column.push(if value.is_nan() { None } else { Some(value) });
                }
            }
        }

        let label = catalog.label_for(name).unwrap_or(name).to_string();
        pending.columns.push((label, PendingValues::Float(column)));
    }

    Ok(pending)
}

fn coord<'g>(grid: &'g GriddedResult, name: &str) -> Result<&'g CoordValues, DecodeError> {
    grid.coord(name)
        .ok_or_else(|| DecodeError::MalformedGrid(format!("missing '{name}' coordinate")))
}

fn float_coord(grid: &GriddedResult, name: &str) -> Result<Vec<f64>, DecodeError> {
    coord(grid, name)?
        .as_float()
        .map(<[f64]>::to_vec)
        .ok_or_else(|| DecodeError::MalformedGrid(format!("'{name}' coordinate is not numeric")))
}
