//! Loader for the AOI-optimized NEX-GDDP-CMIP6 climate archive.
//!
//! Loading happens in two phases. [`ArchiveLoader::plan`] checks the request against
//! the allow-lists and resolves group paths without touching storage.
//! [`ArchivePlan::materialize`] then reads every group from a [`GroupStore`], drops
//! duplicated models, wraps longitudes and merges the groups into one
//! [`GriddedResult`].

mod merge;
mod preprocess;
pub mod region;
pub mod store;

use crate::archive::store::GroupStore;
use crate::error::ClimateError;
use crate::types::gridded::{GriddedResult, ATTR_CRS};
use log::info;

pub const TIME_OPTIMIZED_ZARR_STORE_PATH: &str =
    "s3://cmip6-data/NEX-GDDP-CMIP6/NEX-GDDP-CMIP6-aoi-optimized";

pub const AVAILABLE_VARIABLES: [&str; 9] = [
    "hurs", "huss", "pr", "rlds", "rsds", "sfcWind", "tas", "tasmax", "tasmin",
];

pub const AVAILABLE_SCENARIOS: [&str; 5] = ["historical", "ssp126", "ssp245", "ssp370", "ssp585"];

/// Scenarios the time-optimized layout is published for.
pub const TIME_OPTIMIZED_SCENARIOS: [&str; 2] = ["historical", "projection"];

/// CRS tag attached to every merged archive result.
pub const ARCHIVE_CRS: &str = "EPSG:4326";

/// One (variable, scenario) group in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAddress {
    pub variable: String,
    pub scenario: String,
    pub path: String,
}

/// Resolved groups, ready to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePlan {
    groups: Vec<GroupAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLoader {
    base: String,
}

impl Default for ArchiveLoader {
    fn default() -> Self {
        Self::new(TIME_OPTIMIZED_ZARR_STORE_PATH)
    }
}

impl ArchiveLoader {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Validates the selection and builds one group address per (variable, scenario)
    /// pair, variable-major. Performs no I/O.
    ///
    /// # Errors
    ///
    /// * [`ClimateError::EmptySelection`] if either list is empty.
    /// * [`ClimateError::UnknownVariable`] listing variables outside [`AVAILABLE_VARIABLES`].
    /// * [`ClimateError::UnsupportedScenario`] listing scenarios outside
    ///   [`TIME_OPTIMIZED_SCENARIOS`].
    pub fn plan(&self, variables: &[&str], scenarios: &[&str]) -> Result<ArchivePlan, ClimateError> {
        if variables.is_empty() || scenarios.is_empty() {
            return Err(ClimateError::EmptySelection);
        }
        let unknown = outside(variables, &AVAILABLE_VARIABLES);
        if !unknown.is_empty() {
            return Err(ClimateError::UnknownVariable(unknown));
        }
        let unsupported = outside(scenarios, &TIME_OPTIMIZED_SCENARIOS);
        if !unsupported.is_empty() {
            return Err(ClimateError::UnsupportedScenario(unsupported));
        }

        let base = self.base.trim_end_matches('/');
        let groups = variables
            .iter()
            .flat_map(|variable| {
                scenarios.iter().map(move |scenario| GroupAddress {
                    variable: variable.to_string(),
                    scenario: scenario.to_string(),
                    path: format!("{base}/{scenario}/{variable}.zarr"),
                })
            })
            .collect();
        Ok(ArchivePlan { groups })
    }
}

/// Requested members missing from `allowed`, deduplicated, in request order.
fn outside(requested: &[&str], allowed: &[&str]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for item in requested {
        if !allowed.contains(item) && !missing.iter().any(|m| m == item) {
            missing.push(item.to_string());
        }
    }
    missing
}

impl ArchivePlan {
    pub fn groups(&self) -> &[GroupAddress] {
        &self.groups
    }

    pub fn paths(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.path.as_str()).collect()
    }

    /// Reads, preprocesses and merges every planned group.
    pub fn materialize(&self, store: &dyn GroupStore) -> Result<GriddedResult, ClimateError> {
        let mut groups = Vec::with_capacity(self.groups.len());
        for address in &self.groups {
            info!("Loading {} / {} from {}", address.variable, address.scenario, address.path);
            let group = store.open(&address.path)?;
            group.check_shapes()?;
            groups.push(preprocess::preprocess(group));
        }
        let mut merged = merge::merge(groups)?;
        merged.set_attr(ATTR_CRS, ARCHIVE_CRS);
        info!(
            "Merged {} groups into {} variables",
            self.groups.len(),
            merged.variable_count()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::store::MemoryGroupStore;
    use crate::types::gridded::{CoordValues, DIM_LON, DIM_MODEL};
    use ndarray::{ArrayD, IxDyn};

    fn group(models: &[&str], fill: f64) -> GriddedResult {
        let lon = vec![0.0, 90.0, 180.0, 270.0];
        GriddedResult::new()
            .with_coord(
                DIM_MODEL,
                CoordValues::Label(models.iter().map(|m| m.to_string()).collect()),
            )
            .with_coord(DIM_LON, CoordValues::Float(lon))
            .with_variable(
                "tas",
                &[DIM_MODEL, DIM_LON],
                ArrayD::from_elem(IxDyn(&[models.len(), 4]), fill),
            )
            .unwrap()
    }

    #[test]
    fn test_plan_paths() -> Result<(), ClimateError> {
        let plan = ArchiveLoader::new("/data/nex/").plan(&["tas", "pr"], &["historical", "projection"])?;
        assert_eq!(
            plan.paths(),
            vec![
                "/data/nex/historical/tas.zarr",
                "/data/nex/projection/tas.zarr",
                "/data/nex/historical/pr.zarr",
                "/data/nex/projection/pr.zarr",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_default_base() -> Result<(), ClimateError> {
        let plan = ArchiveLoader::default().plan(&["tas"], &["historical"])?;
        assert_eq!(
            plan.groups()[0].path,
            format!("{TIME_OPTIMIZED_ZARR_STORE_PATH}/historical/tas.zarr")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_selection_reads_nothing() {
        let store = MemoryGroupStore::new();
        let loader = ArchiveLoader::default();

        match loader.plan(&["tas", "snow", "rain", "snow"], &["historical"]) {
            Err(ClimateError::UnknownVariable(v)) => assert_eq!(v, vec!["snow", "rain"]),
            other => panic!("expected UnknownVariable, got {other:?}"),
        }
        // Listed as available but not published in the time-optimized layout.
        match loader.plan(&["tas"], &["ssp245", "historical"]) {
            Err(ClimateError::UnsupportedScenario(s)) => assert_eq!(s, vec!["ssp245"]),
            other => panic!("expected UnsupportedScenario, got {other:?}"),
        }
        assert!(matches!(loader.plan(&[], &["historical"]), Err(ClimateError::EmptySelection)));
        assert!(matches!(loader.plan(&["tas"], &[]), Err(ClimateError::EmptySelection)));
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn test_materialize() -> Result<(), ClimateError> {
        let loader = ArchiveLoader::new("mem");
        let store = MemoryGroupStore::new()
            .with_group("mem/historical/tas.zarr", group(&["ACCESS-CM2", "MIROC6", "ACCESS-CM2"], 280.0))
            .with_group("mem/projection/tas.zarr", group(&["MIROC6", "CanESM5"], 285.0));

        let merged = loader.plan(&["tas"], &["historical", "projection"])?.materialize(&store)?;

        assert_eq!(store.read_count(), 2);
        assert_eq!(merged.attr(ATTR_CRS), Some(ARCHIVE_CRS));
        let models = merged.coord(DIM_MODEL).and_then(CoordValues::as_label).unwrap();
        assert_eq!(models, &["MIROC6".to_string(), "CanESM5".to_string()]);
        let lon = merged.coord(DIM_LON).and_then(CoordValues::as_float).unwrap();
        assert_eq!(lon, &[-180.0, -90.0, 0.0, 90.0]);
        assert!(lon.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }

    #[test]
    fn test_missing_group_is_storage_error() -> Result<(), ClimateError> {
        let plan = ArchiveLoader::new("mem").plan(&["pr"], &["historical"])?;
        assert!(matches!(
            plan.materialize(&MemoryGroupStore::new()),
            Err(ClimateError::Storage { .. })
        ));
        Ok(())
    }
}
