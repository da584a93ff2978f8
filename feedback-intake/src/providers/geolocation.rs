//! IP geolocation client (ip-api.com JSON protocol)
//!
//! `GET <base_url>/<ip>`; the body carries a `status` discriminator that must
//! be `"success"` for the location fields to be trusted.

use async_trait::async_trait;
use feedback_common::config::GeolocationConfig;
use feedback_common::GeoLocation;
use serde::Deserialize;
use std::net::IpAddr;

use super::{http_client, GeolocationProvider, ProviderError, ProviderResult};

const SUCCESS_STATUS: &str = "success";

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl LookupResponse {
    /// Convert to a complete location or fail as a whole
    fn into_location(self) -> ProviderResult<GeoLocation> {
        if self.status != SUCCESS_STATUS {
            return Err(ProviderError::Rejected(
                self.message.unwrap_or(self.status),
            ));
        }

        GeoLocation::from_parts(self.country, self.region_name, self.city, self.lat, self.lon)
            .ok_or_else(|| ProviderError::Malformed("incomplete location".to_string()))
    }
}

/// Geolocation lookup client
pub struct GeolocationClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeolocationClient {
    pub fn new(config: &GeolocationConfig) -> feedback_common::Result<Self> {
        Ok(Self {
            http_client: http_client(config.connect_timeout(), config.timeout())?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, ip: IpAddr) -> String {
        format!("{}/{}", self.base_url, ip)
    }
}

#[async_trait]
impl GeolocationProvider for GeolocationClient {
    async fn locate(&self, ip: IpAddr) -> ProviderResult<GeoLocation> {
        tracing::debug!(%ip, "Querying geolocation API");

        let response = self.http_client.get(self.lookup_url(ip)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: LookupResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        parsed.into_location()
    }
}
