use crate::weather_data::error::TransportError;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Body and content type of one fetched response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Fetches bytes from a URL with query parameters. One call is one request, no retries.
pub trait Transport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse, TransportError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::ClientBuild)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse, TransportError> {
        info!("Requesting {} with {} parameters", url, params.len());

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|e| TransportError::NetworkRequest(url.to_string(), e.without_url()))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                // The request URL carries the query string, api key included.
                let e = e.without_url();
                warn!("HTTP error for {}: {:?}", url, e.status());
                return Err(if let Some(status) = e.status() {
                    TransportError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    TransportError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|e| TransportError::Body(url.to_string(), e.without_url()))?
            .to_vec();
        debug!(
            "Received {} bytes ({}) from {}",
            body.len(),
            content_type.as_deref().unwrap_or("no content type"),
            url
        );

        Ok(TransportResponse { content_type, body })
    }
}
