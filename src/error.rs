use crate::clients::weather_client::RetrievalStage;
use crate::weather_data::error::{DecodeError, TransportError};
use chrono::NaiveDateTime;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error("Area of interest must hold only points or only polygons, found {0}")]
    InvalidGeometryKind(String),

    #[error("Area of interest contains no geometries")]
    EmptyGeometry,

    #[error("Query start {start} is after query end {end}")]
    EmptyDateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Result type '{0}' cannot be normalized")]
    UnsupportedResultType(String),

    #[error("Retrieval failed while {stage} (parameters: {params:?})")]
    RetrievalFailed {
        stage: RetrievalStage,
        params: Vec<(String, String)>,
        #[source]
        source: RetrievalSource,
    },

    #[error("One or more variables are not available: {0:?}")]
    UnknownVariable(Vec<String>),

    #[error("One or more scenarios are not available: {0:?}")]
    UnsupportedScenario(Vec<String>),

    #[error("At least one variable and one scenario must be requested")]
    EmptySelection,

    #[error("Region does not overlap the dataset")]
    NoOverlap,

    #[error("Region CRS '{region}' does not match dataset CRS '{dataset}'")]
    CrsMismatch { dataset: String, region: String },

    #[error("Failed to read region boundary '{0}'")]
    RegionRead(PathBuf, #[source] std::io::Error),

    #[error("Invalid region boundary: {0}")]
    RegionFile(String),

    #[error("Storage group '{path}' could not be read: {message}")]
    Storage { path: String, message: String },

    #[error("Column '{0}' appears more than once after sanitizing")]
    DuplicateColumn(String),

    #[error("Required column '{0}' not found")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}

/// Underlying cause carried by [`ClimateError::RetrievalFailed`].
#[derive(Debug, Error)]
pub enum RetrievalSource {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
