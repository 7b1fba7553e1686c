//! Connection settings for the weather API.

use crate::error::ClimateError;
use bon::Builder;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.oikolab.com/weather";
pub const API_KEY_ENV: &str = "OIKOLAB_API_KEY";
pub const BASE_URL_ENV: &str = "OIKOLAB_BASE_URL";

/// Settings for a [`crate::WeatherClient`].
///
/// ```
/// use aoiclimate::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .api_key("my-key")
///     .timeout(Duration::from_secs(120))
///     .build();
/// assert_eq!(config.base_url, "https://api.oikolab.com/weather");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,
    #[builder(into)]
    pub api_key: String,
    /// Request timeout applied by the HTTP transport. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Reads `OIKOLAB_API_KEY` (required) and `OIKOLAB_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, ClimateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClimateError> {
        let api_key = lookup(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ClimateError::Config(format!("{API_KEY_ENV} is not set")))?;
        let base_url = lookup(BASE_URL_ENV)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url,
            api_key,
            timeout: None,
        })
    }
}
