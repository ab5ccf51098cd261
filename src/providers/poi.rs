use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;

use super::retry::{with_backoff, CancelToken, RetryPolicy};
use crate::error::ProviderError;
use crate::types::track::PoiCategory;

const PROVIDER: &str = "overpass";

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Overpass lookup of nearby map features, with bounded retries.
#[derive(Debug, Clone)]
pub struct PoiClient {
    client: Client,
    base_url: String,
    radius_m: u32,
    retry: RetryPolicy,
}

impl PoiClient {
    pub fn new(client: Client, base_url: impl Into<String>, radius_m: u32, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            radius_m,
            retry,
        }
    }

    /// Distinct categories around a point, in first-seen order.
    pub async fn categories_near(
        &self,
        lat: f64,
        lon: f64,
        cancel: &CancelToken,
    ) -> Result<Vec<PoiCategory>, ProviderError> {
        let query = overpass_query(lat, lon, self.radius_m);
        let (client, url, data) = (&self.client, self.base_url.as_str(), query.as_str());

        let body: OverpassResponse = with_backoff(PROVIDER, &self.retry, cancel, move || async move {
            let response = client
                .post(url)
                .form(&[("data", data)])
                .send()
                .await
                .map_err(|source| ProviderError::Transport {
                    provider: PROVIDER,
                    source,
                })?;
            super::read_json(PROVIDER, response).await
        })
        .await?;

        let mut categories = Vec::new();
        for category in body.elements.iter().filter_map(|e| classify(&e.tags)) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        tracing::debug!(
            "{} POI elements near ({}, {}) -> {:?}",
            body.elements.len(),
            lat,
            lon,
            categories
        );

        Ok(categories)
    }
}

pub fn overpass_query(lat: f64, lon: f64, radius_m: u32) -> String {
    let around = format!("(around:{radius_m},{lat},{lon})");
    format!(
        "[out:json][timeout:60];\n(\n\
         node['building']{around};\n\
         node['natural'='tree']{around};\n\
         node['natural'='wood']{around};\n\
         node['natural'='water']{around};\n\
         node['highway']{around};\n\
         node['amenity'='hospital']{around};\n\
         );\nout body;"
    )
}

/// First matching rule wins.
pub fn classify(tags: &HashMap<String, String>) -> Option<PoiCategory> {
    let natural = tags.get("natural").map(String::as_str);

    if matches!(natural, Some("tree") | Some("wood")) {
        Some(PoiCategory::Tree)
    } else if natural == Some("water") {
        Some(PoiCategory::Water)
    } else if tags.get("amenity").map(String::as_str) == Some("hospital") {
        Some(PoiCategory::Hospital)
    } else if tags.contains_key("highway") {
        Some(PoiCategory::Road)
    } else if tags.contains_key("building") {
        Some(PoiCategory::Building)
    } else {
        None
    }
}
