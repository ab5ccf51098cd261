use reqwest::Client;
use serde::Deserialize;

use crate::error::ProviderError;

const PROVIDER: &str = "nominatim";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub region: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    name: Option<String>,
    address: Option<ReverseAddress>,
}

#[derive(Debug, Deserialize)]
struct ReverseAddress {
    country: Option<String>,
}

impl ReverseResponse {
    /// Region and country are kept only as a pair; a partial answer counts as none.
    fn into_location(self) -> Location {
        let region = self.name.filter(|name| !name.is_empty());
        let country = self
            .address
            .and_then(|address| address.country)
            .filter(|country| !country.is_empty());

        match (region, country) {
            (Some(region), Some(country)) => Location {
                region: Some(region),
                country: Some(country),
            },
            _ => Location::default(),
        }
    }
}

/// Nominatim-style reverse geocoder at region zoom, Russian labels.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
}

impl Geocoder {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn reverse(&self, lat: f64, lon: f64) -> Result<Location, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
                ("accept-language", "ru".to_string()),
                ("zoom", "8".to_string()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let body: ReverseResponse = super::read_json(PROVIDER, response).await?;
        Ok(body.into_location())
    }

    /// Region lookup as optional enrichment: failures become an empty location.
    pub async fn reverse_or_empty(&self, lat: f64, lon: f64) -> Location {
        match self.reverse(lat, lon).await {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Reverse geocoding ({}, {}) failed: {}", lat, lon, e);
                Location::default()
            }
        }
    }
}
