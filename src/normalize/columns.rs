//! Column names shared by every canonical frame, and the column-name sanitizer.

pub const COL_TIMESTAMP_UTC: &str = "timestamp_utc";
pub const COL_TIMESTAMP_LOCAL: &str = "timestamp_local";
pub const COL_LAT: &str = "lat";
pub const COL_LON: &str = "lon";
pub const COL_MODEL: &str = "model";

pub(crate) const KEY_COLUMNS: [&str; 5] = [
    COL_TIMESTAMP_UTC,
    COL_TIMESTAMP_LOCAL,
    COL_LAT,
    COL_LON,
    COL_MODEL,
];

// Raw point-response fields that feed the key columns.
pub(crate) const RAW_COORDINATES_PREFIX: &str = "coordinates";
pub(crate) const RAW_MODEL_PREFIX: &str = "model (";

/// Sanitizes a column name: `/` becomes `per`, every other character that is not
/// alphanumeric or `_` separates words, and word separators collapse into a single `_`.
///
/// The result only contains alphanumerics and underscores, so sanitizing is idempotent.
///
/// # Examples
///
/// ```
/// use aoiclimate::sanitize_column_name;
///
/// assert_eq!(sanitize_column_name("Surface/Wind^Speed"), "Surface_per_Wind_Speed");
/// assert_eq!(sanitize_column_name("wind_speed (m/s)"), "wind_speed_m_per_s");
/// ```
pub fn sanitize_column_name(name: &str) -> String {
    let spaced: String = name
        .replace('/', " per ")
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join("_")
}
