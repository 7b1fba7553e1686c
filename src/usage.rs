use crate::types::gridded::{GriddedResult, DIM_TIME, LAT_ALIASES, LON_ALIASES};

/// Days per billing month.
pub const DAYS_PER_USAGE_MONTH: f64 = 30.25;

/// Estimates the API units a gridded result cost: degrees of longitude × degrees of
/// latitude × months × variables, each spatial/temporal factor floored to at least 1,
/// plus 1.
///
/// The estimate is informational only and never enforced.
pub fn estimate_usage(result: &GriddedResult) -> u64 {
    let extent = |names: &[&str]| {
        result
            .coord_any(names)
            .map(|(_, values)| values.extent())
            .unwrap_or(0.0)
    };
    let lon = floor_at_least_one(extent(&LON_ALIASES));
    let lat = floor_at_least_one(extent(&LAT_ALIASES));
    let months = floor_at_least_one(extent(&[DIM_TIME]) / DAYS_PER_USAGE_MONTH);

    lon * lat * months * result.variable_count() as u64 + 1
}

fn floor_at_least_one(value: f64) -> u64 {
    if value.is_finite() && value >= 1.0 {
        value.floor() as u64
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::gridded::CoordValues;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use ndarray::{ArrayD, IxDyn};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn grid(lon_span: f64, lat_span: f64, days: i64, variables: usize) -> GriddedResult {
        let mut grid = GriddedResult::new()
            .with_coord("time", CoordValues::Time(vec![start(), start() + Duration::days(days)]))
            .with_coord("latitude", CoordValues::Float(vec![0.0, lat_span]))
            .with_coord("longitude", CoordValues::Float(vec![0.0, lon_span]));
        for i in 0..variables {
            grid = grid
                .with_variable(
                    &format!("v{i}"),
                    &["time", "latitude", "longitude"],
                    ArrayD::zeros(IxDyn(&[2, 2, 2])),
                )
                .unwrap();
        }
        grid
    }

    #[test]
    fn test_single_cell_costs_at_least_one() {
        assert_eq!(estimate_usage(&grid(0.25, 0.25, 1, 1)), 2);
        assert!(estimate_usage(&GriddedResult::new()) >= 1);
    }

    #[test]
    fn test_formula() {
        // 10 × 4 × floor(365 / 30.25) = 12 months × 2 variables + 1
        assert_eq!(estimate_usage(&grid(10.5, 4.9, 365, 2)), 10 * 4 * 12 * 2 + 1);
    }

    #[test]
    fn test_scales_linearly() {
        let base = estimate_usage(&grid(3.0, 2.0, 121, 1)) - 1;
        assert_eq!(estimate_usage(&grid(6.0, 2.0, 121, 1)) - 1, 2 * base);
        assert_eq!(estimate_usage(&grid(3.0, 4.0, 121, 1)) - 1, 2 * base);
        assert_eq!(estimate_usage(&grid(3.0, 2.0, 242, 1)) - 1, 2 * base);
        assert_eq!(estimate_usage(&grid(3.0, 2.0, 121, 2)) - 1, 2 * base);
    }
}
