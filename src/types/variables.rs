//! The catalog of weather variables the API is queried for, and the unit-labelled
//! names they are published under in a [`crate::CanonicalFrame`].
//!
//! The catalog is an immutable value. Query building and normalization both borrow it,
//! so choosing the snow variables for one request never changes what the next
//! request sends.

use crate::normalize::columns::sanitize_column_name;

/// Which part of the variable set a variable belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGroup {
    /// Always requested.
    Base,
    /// Humidity/cloud variables, requested for points within ±35° latitude.
    General,
    /// Snow variables, requested instead of [`VariableGroup::General`] outside ±35°.
    /// Their canonical columns are present in every frame.
    Snow,
}

/// One API variable token and the label of its canonical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Parameter token sent to the API (e.g. `temperature`).
    pub token: String,
    /// Unit-labelled name before sanitizing (e.g. `temperature (degC)`).
    pub label: String,
    pub group: VariableGroup,
}

impl VariableSpec {
    pub fn new(token: &str, label: &str, group: VariableGroup) -> Self {
        Self {
            token: token.to_string(),
            label: label.to_string(),
            group,
        }
    }

    /// The final column name in a canonical frame.
    pub fn canonical_name(&self) -> String {
        sanitize_column_name(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableCatalog {
    variables: Vec<VariableSpec>,
}

impl Default for VariableCatalog {
    fn default() -> Self {
        use VariableGroup::*;
        Self {
            variables: vec![
                VariableSpec::new("temperature", "temperature (degC)", Base),
                VariableSpec::new("dewpoint_temperature", "dewpoint_temperature (degC)", Base),
                VariableSpec::new("wind_speed", "wind_speed (m/s)", Base),
                VariableSpec::new("surface_pressure", "surface_pressure (Pa)", Base),
                VariableSpec::new(
                    "surface_solar_radiation",
                    "surface_solar_radiation (W/m^2)",
                    Base,
                ),
                VariableSpec::new(
                    "surface_thermal_radiation",
                    "surface_thermal_radiation (W/m^2)",
                    Base,
                ),
                // Published as total solar radiation; override with `with_label` if the
                // net flux should keep its own name.
                VariableSpec::new(
                    "surface_net_solar_radiation",
                    "total_solar_radiation (W/m^2)",
                    Base,
                ),
                VariableSpec::new(
                    "total_precipitation",
                    "total_precipitation (mm of water equivalent)",
                    Base,
                ),
                VariableSpec::new("relative_humidity", "relative_humidity (0-1)", General),
                VariableSpec::new("total_cloud_cover", "total_cloud_cover (0-1)", General),
                VariableSpec::new("snowfall", "snowfall (mm of water equivalent)", Snow),
                VariableSpec::new("snow_depth", "snow_depth (mm of water equivalent)", Snow),
            ],
        }
    }
}

impl VariableCatalog {
    pub fn new(variables: Vec<VariableSpec>) -> Self {
        Self { variables }
    }

    /// Returns a copy of the catalog with the label for `token` replaced.
    /// Unknown tokens are added to the base group.
    pub fn with_label(mut self, token: &str, label: &str) -> Self {
        match self.variables.iter_mut().find(|v| v.token == token) {
            Some(spec) => spec.label = label.to_string(),
            None => self
                .variables
                .push(VariableSpec::new(token, label, VariableGroup::Base)),
        }
        self
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    pub fn get(&self, token: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.token == token)
    }

    pub fn group(&self, group: VariableGroup) -> impl Iterator<Item = &VariableSpec> {
        self.variables.iter().filter(move |v| v.group == group)
    }

    /// Tokens sent for a point query: base variables, then either the snow or the
    /// general group.
    pub fn tokens_for(&self, include_snow: bool) -> Vec<String> {
        let swapped = if include_snow {
            VariableGroup::Snow
        } else {
            VariableGroup::General
        };
        self.group(VariableGroup::Base)
            .chain(self.group(swapped))
            .map(|v| v.token.clone())
            .collect()
    }

    /// Canonical column names of the snow variables.
    pub fn snow_columns(&self) -> Vec<String> {
        self.group(VariableGroup::Snow)
            .map(VariableSpec::canonical_name)
            .collect()
    }

    /// Maps a raw variable name or labelled column (`name (unit)`) to its catalog label.
    ///
    /// A labelled column is only relabelled when its unit matches the catalog's, so a
    /// `temperature (degF)` column keeps its own name.
    pub fn label_for(&self, raw: &str) -> Option<&str> {
        let (token, unit) = split_label(raw);
        let spec = self.get(token)?;
        match (unit, split_label(&spec.label).1) {
            (Some(raw_unit), Some(catalog_unit)) if raw_unit != catalog_unit => None,
            _ => Some(spec.label.as_str()),
        }
    }
}

/// Splits `name (unit)` into the name and the unit, if there is one.
fn split_label(label: &str) -> (&str, Option<&str>) {
    match label.split_once(" (") {
        Some((name, rest)) => (name.trim(), rest.strip_suffix(')').map(str::trim)),
        None => (label.trim(), None),
    }
}
