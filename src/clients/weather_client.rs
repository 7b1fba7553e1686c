//! Provides the `WeatherClient`, which retrieves weather data for an area of interest
//! and returns it as a [`CanonicalFrame`].
//!
//! One call runs through the stages `BuildingQuery → Fetching → EstimatingUsage →
//! Normalizing → Done`. Usage estimation only happens for gridded (area) responses;
//! point responses carry their own usage figure, which is logged as received.

use crate::clients::config::ClientConfig;
use crate::error::{ClimateError, RetrievalSource};
use crate::normalize::Normalizer;
use crate::query::{QueryBuilder, QueryParams};
use crate::types::area_of_interest::AreaOfInterest;
use crate::types::canonical_frame::CanonicalFrame;
use crate::types::payload::ResultPayload;
use crate::types::query_spec::QuerySpec;
use crate::types::tabular::TabularResult;
use crate::types::variables::VariableCatalog;
use crate::usage::estimate_usage;
use crate::weather_data::decoder::GridDecoder;
use crate::weather_data::error::DecodeError;
use crate::weather_data::transport::{HttpTransport, Transport, TransportResponse};
use bon::Builder;
use log::{debug, info, warn};
use std::fmt;

/// Where a retrieval call is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalStage {
    Idle,
    BuildingQuery,
    Fetching,
    EstimatingUsage,
    Normalizing,
    Done,
    Failed,
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RetrievalStage::Idle => "idle",
            RetrievalStage::BuildingQuery => "building query",
            RetrievalStage::Fetching => "fetching",
            RetrievalStage::EstimatingUsage => "estimating usage",
            RetrievalStage::Normalizing => "normalizing",
            RetrievalStage::Done => "done",
            RetrievalStage::Failed => "failed",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Netcdf,
    Json,
    Other,
}

fn body_format(content_type: &str) -> BodyFormat {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("netcdf") || ct.contains("octet-stream") || ct.contains("hdf") {
        BodyFormat::Netcdf
    } else if ct.contains("json") {
        BodyFormat::Json
    } else {
        BodyFormat::Other
    }
}

/// Tracks the stage of a single call and logs each transition.
struct StageTracker {
    stage: RetrievalStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: RetrievalStage::Idle,
        }
    }

    fn enter(&mut self, next: RetrievalStage) {
        debug!("Retrieval stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&self, query: &QueryParams, source: impl Into<RetrievalSource>) -> ClimateError {
        let source = source.into();
        warn!("Retrieval failed while {}: {}", self.stage, source);
        ClimateError::RetrievalFailed {
            stage: self.stage,
            params: query.redacted_params(),
            source,
        }
    }
}

/// The weather retrieval service.
///
/// Polygon areas are fetched with an area query (bounding box, NetCDF response);
/// point areas with a point query (JSON response). Each call makes exactly one request
/// and never retries.
///
/// Build one with [`WeatherClient::new`] for the default HTTP transport, or with
/// [`WeatherClient::builder`] to supply your own [`Transport`], [`GridDecoder`] or
/// [`VariableCatalog`].
///
/// # Area queries need a grid decoder
///
/// Area responses are NetCDF. Without the `netcdf` cargo feature (which links the
/// native libnetcdf) the default decoder is [`crate::UnavailableDecoder`], so every
/// polygon query fails with a `RetrievalFailed` wrapping
/// [`DecodeError::DecoderUnavailable`]. Enable the feature or pass your own decoder
/// through [`WeatherClient::builder`]. Point queries are unaffected.
///
/// # Example
///
/// ```no_run
/// use aoiclimate::{AreaOfInterest, ClientConfig, QuerySpec, WeatherClient};
/// use chrono::NaiveDate;
/// use geo::point;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = WeatherClient::new(ClientConfig::from_env()?)?;
/// let aoi = AreaOfInterest::points(vec![point!(x: -0.13, y: 51.5)], chrono_tz::Europe::London)?;
/// let spec = QuerySpec::builder()
///     .start(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
///     .end(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap())
///     .build();
///
/// let frame = client.get_data(&aoi, &spec)?;
/// println!("{}", frame.frame);
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct WeatherClient {
    transport: Box<dyn Transport>,
    #[builder(default = default_decoder())]
    decoder: Box<dyn GridDecoder>,
    #[builder(default)]
    catalog: VariableCatalog,
    config: ClientConfig,
}

fn default_decoder() -> Box<dyn GridDecoder> {
    #[cfg(feature = "netcdf")]
    {
        Box::new(crate::weather_data::decoder::NetcdfDecoder)
    }
    #[cfg(not(feature = "netcdf"))]
    {
        Box::new(crate::weather_data::decoder::UnavailableDecoder)
    }
}

impl WeatherClient {
    /// Creates a client that talks HTTP, with the default variable catalog.
    pub fn new(config: ClientConfig) -> Result<Self, ClimateError> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::builder()
            .transport(Box::new(transport))
            .config(config)
            .build())
    }

    /// Creates an HTTP client configured from `OIKOLAB_API_KEY` / `OIKOLAB_BASE_URL`.
    pub fn from_env() -> Result<Self, ClimateError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn catalog(&self) -> &VariableCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Retrieves and decodes the response without normalizing it.
    ///
    /// # Errors
    ///
    /// * [`ClimateError::EmptyDateRange`] before any request is made.
    /// * [`ClimateError::RetrievalFailed`] when the request fails or the body cannot be
    ///   decoded. The error carries the request parameters with the api key masked.
    pub fn get_raw(
        &self,
        aoi: &AreaOfInterest,
        spec: &QuerySpec,
    ) -> Result<ResultPayload, ClimateError> {
        let mut tracker = StageTracker::new();
        let (_, payload) = self.fetch(&mut tracker, aoi, spec)?;
        tracker.enter(RetrievalStage::Done);
        Ok(payload)
    }

    /// Retrieves weather data for `aoi` and normalizes it into a [`CanonicalFrame`].
    ///
    /// # Errors
    ///
    /// Everything [`WeatherClient::get_raw`] returns, plus
    /// [`ClimateError::UnsupportedResultType`] when the server answered in a format the
    /// query path does not produce, and [`ClimateError::RetrievalFailed`] at the
    /// normalizing stage for payloads that decode but cannot be normalized.
    pub fn get_data(
        &self,
        aoi: &AreaOfInterest,
        spec: &QuerySpec,
    ) -> Result<CanonicalFrame, ClimateError> {
        let mut tracker = StageTracker::new();
        let (query, payload) = self.fetch(&mut tracker, aoi, spec)?;

        tracker.enter(RetrievalStage::Normalizing);
        let frame = Normalizer::new(&self.catalog)
            .normalize(payload, aoi, spec.model)
            .map_err(|e| match e {
                ClimateError::Decode(source) => tracker.fail(&query, source),
                other => other,
            })?;

        tracker.enter(RetrievalStage::Done);
        info!(
            "Retrieved {} rows with {} variable columns",
            frame.height(),
            frame.variable_columns().len()
        );
        Ok(frame)
    }

    fn fetch(
        &self,
        tracker: &mut StageTracker,
        aoi: &AreaOfInterest,
        spec: &QuerySpec,
    ) -> Result<(QueryParams, ResultPayload), ClimateError> {
        tracker.enter(RetrievalStage::BuildingQuery);
        let query = QueryBuilder::new(&self.catalog).build(aoi, spec, &self.config.api_key)?;
        debug!(
            "Built {} query with parameters {:?}",
            aoi.geometry_kind(),
            query.redacted_params()
        );

        tracker.enter(RetrievalStage::Fetching);
        let response = self
            .transport
            .get(&self.config.base_url, &query.to_params())
            .map_err(|e| tracker.fail(&query, e))?;

        let payload = match &query {
            QueryParams::Area(_) => self.decode_area(tracker, &query, response)?,
            QueryParams::Point(_) => decode_point(tracker, &query, response)?,
        };
        Ok((query, payload))
    }

    fn decode_area(
        &self,
        tracker: &mut StageTracker,
        query: &QueryParams,
        response: TransportResponse,
    ) -> Result<ResultPayload, ClimateError> {
        if let Some(unsupported) = unexpected_format(&response, BodyFormat::Netcdf) {
            return Ok(unsupported);
        }
        let grid = self
            .decoder
            .decode(&response.body)
            .map_err(|e| tracker.fail(query, e))?;

        tracker.enter(RetrievalStage::EstimatingUsage);
        info!("Used {} API units for query", estimate_usage(&grid));
        Ok(ResultPayload::Gridded(grid))
    }
}

fn decode_point(
    tracker: &mut StageTracker,
    query: &QueryParams,
    response: TransportResponse,
) -> Result<ResultPayload, ClimateError> {
    if let Some(unsupported) = unexpected_format(&response, BodyFormat::Json) {
        return Ok(unsupported);
    }
    let table = TabularResult::from_json_envelope(&response.body)
        .map_err(|e: DecodeError| tracker.fail(query, e))?;
    match &table.reported_usage {
        Some(units) => info!("Server reported n_parameter_months: {}", units),
        None => warn!("Point response did not report n_parameter_months"),
    }
    Ok(ResultPayload::Tabular(table))
}

/// Responses without a content type are assumed to be in the expected format.
fn unexpected_format(response: &TransportResponse, expected: BodyFormat) -> Option<ResultPayload> {
    let content_type = response.content_type.as_deref()?;
    if body_format(content_type) == expected {
        return None;
    }
    warn!("Unexpected response content type {}", content_type);
    Some(ResultPayload::Unsupported {
        content_type: content_type.to_string(),
    })
}
