mod archive;
mod clients;
mod error;
mod hardiness;
mod normalize;
mod query;
mod types;
mod usage;
mod utils;
mod weather_data;

pub use error::{ClimateError, RetrievalSource};

pub use clients::config::{ClientConfig, DEFAULT_BASE_URL};
pub use clients::weather_client::{RetrievalStage, WeatherClient};

pub use archive::region::{normalize_crs, RegionSelector};
pub use archive::store::{GroupStore, MemoryGroupStore};
#[cfg(feature = "s3")]
pub use archive::store::S3GroupStore;
#[cfg(feature = "zarr")]
pub use archive::store::ZarrGroupStore;
pub use archive::{
    ArchiveLoader, ArchivePlan, GroupAddress, ARCHIVE_CRS, AVAILABLE_SCENARIOS,
    AVAILABLE_VARIABLES, TIME_OPTIMIZED_SCENARIOS, TIME_OPTIMIZED_ZARR_STORE_PATH,
};

pub use hardiness::{
    get_hardiness, hardiness_zone, temp_min, with_fahrenheit, HardinessOptions,
    ResampleFrequency, COL_HARDINESS_ZONE, COL_PERIOD_START, COL_ROLLING_MEAN, COL_TEMP_MIN,
};
pub use normalize::columns::{
    sanitize_column_name, COL_LAT, COL_LON, COL_MODEL, COL_TIMESTAMP_LOCAL, COL_TIMESTAMP_UTC,
};
pub use normalize::Normalizer;
pub use query::{AreaQuery, BoundingBox, PointQuery, QueryBuilder, QueryParams};
pub use usage::estimate_usage;

pub use types::area_of_interest::{AreaOfInterest, GeometryKind};
pub use types::canonical_frame::CanonicalFrame;
pub use types::gridded::{
    CoordValues, DataVariable, GriddedResult, RawArray, ATTR_CRS, ATTR_MODEL, DIM_LAT, DIM_LON,
    DIM_MODEL, DIM_SCENARIO, DIM_TIME,
};
pub use types::payload::ResultPayload;
pub use types::query_spec::{Frequency, Model, QuerySpec, ResampleMethod};
pub use types::tabular::TabularResult;
pub use types::variables::{VariableCatalog, VariableGroup, VariableSpec};

pub use weather_data::decoder::{GridDecoder, UnavailableDecoder};
#[cfg(feature = "netcdf")]
pub use weather_data::decoder::NetcdfDecoder;
pub use weather_data::error::{DecodeError, TransportError};
pub use weather_data::transport::{HttpTransport, Transport, TransportResponse};
