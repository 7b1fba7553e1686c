//! Combines archive groups into one gridded result by their coordinates.

use crate::error::ClimateError;
use crate::types::gridded::{CoordValues, DataVariable, GriddedResult};
use crate::weather_data::error::DecodeError;
use chrono::NaiveDateTime;
use ndarray::{ArrayD, IxDyn};
use std::collections::{BTreeMap, HashMap};

/// Position of every value of one merged axis.
enum AxisIndex {
    Float(HashMap<u64, usize>),
    Time(HashMap<NaiveDateTime, usize>),
    Label(HashMap<String, usize>),
}

impl AxisIndex {
    fn new(values: &CoordValues) -> Self {
        match values {
            CoordValues::Float(v) => {
                AxisIndex::Float(v.iter().enumerate().map(|(i, x)| (x.to_bits(), i)).collect())
            }
            CoordValues::Time(v) => AxisIndex::Time(v.iter().enumerate().map(|(i, t)| (*t, i)).collect()),
            CoordValues::Label(v) => {
                AxisIndex::Label(v.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect())
            }
        }
    }

    /// Maps each source position to its merged position.
    fn positions(&self, source: &CoordValues) -> Option<Vec<usize>> {
        match (self, source) {
            (AxisIndex::Float(idx), CoordValues::Float(v)) => {
                v.iter().map(|x| idx.get(&x.to_bits()).copied()).collect()
            }
            (AxisIndex::Time(idx), CoordValues::Time(v)) => v.iter().map(|t| idx.get(t).copied()).collect(),
            (AxisIndex::Label(idx), CoordValues::Label(v)) => v.iter().map(|l| idx.get(l).copied()).collect(),
            _ => None,
        }
    }
}

/// Outer union of two axes. Numeric and time axes come out sorted, labels keep the
/// order they were first seen in.
fn union(a: &CoordValues, b: &CoordValues, dim: &str) -> Result<CoordValues, DecodeError> {
    match (a, b) {
        (CoordValues::Float(x), CoordValues::Float(y)) => {
            let mut all: Vec<f64> = x.iter().chain(y).copied().collect();
            all.sort_by(f64::total_cmp);
            all.dedup_by(|p, q| p.to_bits() == q.to_bits());
            Ok(CoordValues::Float(all))
        }
        (CoordValues::Time(x), CoordValues::Time(y)) => {
            let mut all: Vec<NaiveDateTime> = x.iter().chain(y).copied().collect();
            all.sort();
            all.dedup();
            Ok(CoordValues::Time(all))
        }
        (CoordValues::Label(x), CoordValues::Label(y)) => {
            let mut all = x.clone();
            for label in y {
                if !all.contains(label) {
                    all.push(label.clone());
                }
            }
            Ok(CoordValues::Label(all))
        }
        _ => Err(DecodeError::MalformedGrid(format!(
            "dimension '{dim}' has different value types across groups"
        ))),
    }
}

/// Merges groups on their coordinates. Missing cells are NaN. When several groups hold
/// the same variable, the first non-NaN value for a cell wins.
pub(crate) fn merge(groups: Vec<GriddedResult>) -> Result<GriddedResult, ClimateError> {
    let mut coords: BTreeMap<String, CoordValues> = BTreeMap::new();
    for group in &groups {
        for (dim, values) in group.coords() {
            let merged = match coords.get(dim) {
                Some(existing) => union(existing, values, dim)?,
                None => union(values, &empty_like(values), dim)?,
            };
            coords.insert(dim.to_string(), merged);
        }
    }
    let indices: HashMap<&str, AxisIndex> = coords
        .iter()
        .map(|(dim, values)| (dim.as_str(), AxisIndex::new(values)))
        .collect();

    let mut attrs = BTreeMap::new();
    let mut variables: BTreeMap<String, (Vec<String>, ArrayD<f64>)> = BTreeMap::new();
    for group in &groups {
        for (key, value) in group.attrs() {
            attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (name, variable) in group.variables() {
            let dims = variable.dims().to_vec();
            let (target_dims, target) = variables.entry(name.to_string()).or_insert_with(|| {
                let shape: Vec<usize> = dims.iter().map(|d| coords[d].len()).collect();
                (dims.clone(), ArrayD::from_elem(IxDyn(&shape), f64::NAN))
            });
            if *target_dims != dims {
                return Err(DecodeError::MalformedGrid(format!(
                    "variable '{name}' has dimensions {dims:?} and {target_dims:?} in different groups"
                ))
                .into());
            }

            let positions = dims
                .iter()
                .map(|d| {
                    let source = group.coord(d).ok_or_else(|| missing_coord(d))?;
                    indices[d.as_str()].positions(source).ok_or_else(|| missing_coord(d))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut index = vec![0usize; dims.len()];
            for (source_index, value) in variable.values().indexed_iter() {
                if value.is_nan() {
                    continue;
                }
                for (axis, position) in positions.iter().enumerate() {
                    index[axis] = position[source_index[axis]];
                }
                let cell = &mut target[IxDyn(&index)];
                if cell.is_nan() {
                    *cell = *value;
                }
            }
        }
    }

    let variables = variables
        .into_iter()
        .map(|(name, (dims, values))| Ok((name, DataVariable::new(dims, values)?)))
        .collect::<Result<BTreeMap<_, _>, DecodeError>>()?;
    Ok(GriddedResult::from_parts(coords, variables, attrs))
}

fn empty_like(values: &CoordValues) -> CoordValues {
    match values {
        CoordValues::Float(_) => CoordValues::Float(Vec::new()),
        CoordValues::Time(_) => CoordValues::Time(Vec::new()),
        CoordValues::Label(_) => CoordValues::Label(Vec::new()),
    }
}

fn missing_coord(dim: &str) -> DecodeError {
    DecodeError::MalformedGrid(format!("coordinate '{dim}' could not be aligned"))
}
