use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read response body from {0}")]
    Body(String, #[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to parse JSON payload")]
    Json(#[from] serde_json::Error),

    #[error("Malformed tabular payload: {0}")]
    MalformedTable(String),

    #[error("Malformed gridded payload: {0}")]
    MalformedGrid(String),

    #[error("Array shape does not match its dimensions")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Unrecognised time units '{0}'")]
    TimeUnits(String),

    #[error("Failed to write scratch file '{0}'")]
    ScratchFile(PathBuf, #[source] std::io::Error),

    #[error("NetCDF decoding failed: {0}")]
    Netcdf(String),

    #[error("No decoder for gridded payloads is available; enable the `netcdf` feature or supply a GridDecoder")]
    DecoderUnavailable,
}
