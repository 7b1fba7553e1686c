//! Defines the time range, frequency and model selection of a weather request.

use crate::error::ClimateError;
use bon::Builder;
use chrono::NaiveDateTime;
use std::fmt;

/// Temporal resolution requested from the weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// The frequency token understood by the remote API.
    pub fn token(&self) -> &'static str {
        match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
            Frequency::Yearly => "Y",
        }
    }
}

/// Allows formatting a `Frequency` using its API token.
///
/// # Examples
///
/// ```
/// use aoiclimate::Frequency;
///
/// assert_eq!(Frequency::Daily.to_string(), "D");
/// ```
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Weather model the remote API serves data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Model {
    #[default]
    Era5,
    Era5Land,
    Gfs,
    Cmip6,
}

impl Model {
    pub fn token(&self) -> &'static str {
        match self {
            Model::Era5 => "era5",
            Model::Era5Land => "era5-land",
            Model::Gfs => "gfs",
            Model::Cmip6 => "cmip6",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// How the API aggregates hourly values to the requested frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResampleMethod {
    Mean,
    Min,
    Max,
    Sum,
}

impl ResampleMethod {
    pub fn token(&self) -> &'static str {
        match self {
            ResampleMethod::Mean => "mean",
            ResampleMethod::Min => "min",
            ResampleMethod::Max => "max",
            ResampleMethod::Sum => "sum",
        }
    }
}

/// The time window and data selection of one retrieval.
///
/// # Examples
///
/// ```
/// use aoiclimate::{Frequency, Model, QuerySpec, ResampleMethod};
/// use chrono::NaiveDate;
///
/// let spec = QuerySpec::builder()
///     .start(NaiveDate::from_ymd_opt(1985, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
///     .end(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap())
///     .frequency(Frequency::Daily)
///     .resample_method(ResampleMethod::Min)
///     .build();
/// assert_eq!(spec.model, Model::Era5);
/// assert!(spec.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct QuerySpec {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[builder(default)]
    pub frequency: Frequency,
    #[builder(default)]
    pub model: Model,
    pub resample_method: Option<ResampleMethod>,
}

impl QuerySpec {
    /// Checks that `start <= end`.
    pub fn validate(&self) -> Result<(), ClimateError> {
        if self.start > self.end {
            return Err(ClimateError::EmptyDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn start_date_param(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_date_param(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_date_params_drop_time_of_day() {
        let spec = QuerySpec::builder()
            .start(at(2020, 3, 1, 13))
            .end(at(2020, 3, 2, 23))
            .frequency(Frequency::Hourly)
            .build();
        assert_eq!(spec.start_date_param(), "2020-03-01");
        assert_eq!(spec.end_date_param(), "2020-03-02");
    }

    #[test]
    fn test_validate_rejects_reversed_range() {
        let spec = QuerySpec::builder()
            .start(at(2021, 1, 2, 0))
            .end(at(2021, 1, 1, 0))
            .build();
        assert!(matches!(
            spec.validate(),
            Err(ClimateError::EmptyDateRange { .. })
        ));
    }

    #[test]
    fn test_same_day_is_valid() {
        let spec = QuerySpec::builder()
            .start(at(2021, 1, 1, 0))
            .end(at(2021, 1, 1, 0))
            .build();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_tokens() {
        assert_eq!(Frequency::Monthly.token(), "M");
        assert_eq!(Model::Era5Land.to_string(), "era5-land");
        assert_eq!(ResampleMethod::Min.token(), "min");
    }
}
