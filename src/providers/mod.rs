//! Outbound HTTP clients for the third-party data providers.
//!
//! Each provider owns a cheap clone of a shared `reqwest::Client` and a base URL,
//! so tests can point them at an in-process server.

pub mod geocode;
pub mod poi;
pub mod retry;
pub mod weather;

use std::time::Duration;

use reqwest::Client;

use crate::error::ProviderError;

pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|source| ProviderError::Transport {
            provider: "http-client",
            source,
        })
}

/// Fetches a GPX payload; anything other than HTTP 200 is a failure.
pub async fn download_gpx(client: &Client, url: &str) -> Result<String, ProviderError> {
    const PROVIDER: &str = "gpx-download";

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ProviderError::Transport {
            provider: PROVIDER,
            source,
        })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(ProviderError::Status {
            provider: PROVIDER,
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|source| ProviderError::Transport {
            provider: PROVIDER,
            source,
        })
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
        provider,
        message: e.to_string(),
    })
}
