//! Per-group cleanup applied before groups are merged.

use crate::types::gridded::{CoordValues, GriddedResult, DIM_MODEL, LON_ALIASES};
use log::{debug, info, warn};
use std::collections::HashMap;

pub(crate) fn preprocess(mut group: GriddedResult) -> GriddedResult {
    drop_duplicate_models(&mut group);
    wrap_longitude(&mut group);
    group
}

/// Removes every model label that occurs more than once along `model`. Neither copy is
/// kept.
pub(crate) fn drop_duplicate_models(group: &mut GriddedResult) {
    let Some(labels) = group.coord(DIM_MODEL).and_then(CoordValues::as_label) else {
        return;
    };
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label.as_str()).or_default() += 1;
    }
    let keep: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| counts[l.as_str()] == 1)
        .map(|(i, _)| i)
        .collect();
    if keep.len() == labels.len() {
        return;
    }

    let mut dropped: Vec<&str> = counts
        .iter()
        .filter(|(_, c)| **c > 1)
        .map(|(l, _)| *l)
        .collect();
    dropped.sort_unstable();
    info!("Dropping duplicated models {:?}", dropped);
    group.select(DIM_MODEL, &keep);
}

/// Maps longitudes from [0, 360) to [-180, 180) and rolls the axis so it starts at its
/// smallest value again.
pub(crate) fn wrap_longitude(group: &mut GriddedResult) {
    let Some((name, values)) = group.coord_any(&LON_ALIASES) else {
        return;
    };
    let Some(lon) = values.as_float() else {
        return;
    };
    let name = name.to_string();
    let wrapped: Vec<f64> = lon.iter().map(|l| wrap(*l)).collect();

    let start = wrapped
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let order: Vec<usize> = (start..wrapped.len()).chain(0..start).collect();
    debug!("Rolling longitude axis by {} of {}", wrapped.len() - start, wrapped.len());

    group.set_coord(&name, CoordValues::Float(wrapped));
    if start != 0 {
        group.select(&name, &order);
    }

    if let Some(rolled) = group.coord(&name).and_then(CoordValues::as_float) {
        if rolled.windows(2).any(|w| w[0] >= w[1]) {
            warn!("Longitude axis is not strictly increasing after the wrap");
        }
    }
}

fn wrap(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
