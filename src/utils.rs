use crate::weather_data::error::DecodeError;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const EPOCH_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Decodes CF-convention numeric times (`<unit> since <epoch>`) into naive UTC datetimes.
pub fn decode_cf_times(values: &[f64], units: &str) -> Result<Vec<NaiveDateTime>, DecodeError> {
    let (unit, epoch) = units
        .split_once(" since ")
        .ok_or_else(|| DecodeError::TimeUnits(units.to_string()))?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "s" => 1.0,
        "minutes" | "minute" | "mins" => 60.0,
        "hours" | "hour" | "hrs" | "h" => 3_600.0,
        "days" | "day" | "d" => 86_400.0,
        _ => return Err(DecodeError::TimeUnits(units.to_string())),
    };
    let epoch = parse_epoch(epoch.trim()).ok_or_else(|| DecodeError::TimeUnits(units.to_string()))?;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                return Err(DecodeError::TimeUnits(format!("non-finite time value {v}")));
            }
            let millis = (v * seconds_per_unit * 1_000.0).round() as i64;
            TimeDelta::try_milliseconds(millis)
                .and_then(|offset| epoch.checked_add_signed(offset))
                .ok_or_else(|| DecodeError::TimeUnits(format!("time value {v} out of range for '{units}'")))
        })
        .collect()
}

fn parse_epoch(epoch: &str) -> Option<NaiveDateTime> {
    // Trailing zone designators ("Z", "UTC", "+00:00") carry no information for UTC data.
    let trimmed = epoch
        .trim_end_matches('Z')
        .trim_end_matches(" UTC")
        .trim_end_matches("+00:00")
        .trim();
    EPOCH_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(trimmed, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Converts epoch seconds (possibly fractional) into a naive UTC datetime.
pub fn datetime_from_epoch_seconds(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    chrono::DateTime::from_timestamp_millis((seconds * 1_000.0).round() as i64)
        .map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_decode_hours_since() -> Result<(), DecodeError> {
        let times = decode_cf_times(&[0.0, 25.0], "hours since 1900-01-01 00:00:00")?;
        assert_eq!(times, vec![at(1900, 1, 1, 0), at(1900, 1, 2, 1)]);
        Ok(())
    }

    #[test]
    fn test_decode_days_since_date_only() -> Result<(), DecodeError> {
        let times = decode_cf_times(&[0.5], "days since 1950-01-01")?;
        assert_eq!(times, vec![at(1950, 1, 1, 12)]);
        Ok(())
    }

    #[test]
    fn test_decode_iso_epoch_with_zone() -> Result<(), DecodeError> {
        let times = decode_cf_times(&[3600.0], "seconds since 1970-01-01T00:00:00Z")?;
        assert_eq!(times, vec![at(1970, 1, 1, 1)]);
        Ok(())
    }

    #[test]
    fn test_unknown_units_rejected() {
        assert!(matches!(
            decode_cf_times(&[1.0], "fortnights since 1970-01-01"),
            Err(DecodeError::TimeUnits(_))
        ));
        assert!(decode_cf_times(&[1.0], "degC").is_err());
    }

    #[test]
    fn test_out_of_range_time_is_error() {
        assert!(matches!(
            decode_cf_times(&[1e17], "days since 1970-01-01"),
            Err(DecodeError::TimeUnits(_))
        ));
        assert!(matches!(
            decode_cf_times(&[-1e17], "seconds since 1970-01-01"),
            Err(DecodeError::TimeUnits(_))
        ));
    }

    #[test]
    fn test_epoch_seconds() {
        assert_eq!(
            datetime_from_epoch_seconds(86_400.0),
            Some(at(1970, 1, 2, 0))
        );
        assert_eq!(datetime_from_epoch_seconds(f64::NAN), None);
    }
}
