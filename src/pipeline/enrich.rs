use crate::config::Config;
use crate::error::{ParseError, PipelineError, ProviderError};
use crate::pipeline::{parse, process};
use crate::providers::{
    build_client,
    geocode::Geocoder,
    poi::PoiClient,
    retry::CancelToken,
    weather::{describe_weather_code, WeatherClient},
};
use crate::types::track::{EnrichedPoint, EnrichedTrack, TrackPoint};

const UNKNOWN_WEATHER: &str = "Unknown weather";

/// Turns raw GPX text into an [`EnrichedTrack`] using the external providers.
pub struct TrackEnricher {
    geocoder: Geocoder,
    forecast: WeatherClient,
    poi: PoiClient,
    chunk_size: usize,
}

impl TrackEnricher {
    pub fn new(geocoder: Geocoder, forecast: WeatherClient, poi: PoiClient, chunk_size: usize) -> Self {
        Self {
            geocoder,
            forecast,
            poi,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let geocoder_client = build_client(&config.user_agent, config.http_timeout)?;
        let ingest_client = build_client(&config.user_agent, config.ingest_timeout)?;

        Ok(Self::new(
            Geocoder::new(geocoder_client, config.geocoder_url.clone()),
            WeatherClient::new(ingest_client.clone(), config.forecast_url.clone()),
            PoiClient::new(
                ingest_client,
                config.overpass_url.clone(),
                config.poi_radius_m,
                config.poi_retry.clone(),
            ),
            config.poi_chunk_size,
        ))
    }

    pub async fn enrich(&self, gpx: &str, cancel: &CancelToken) -> Result<EnrichedTrack, PipelineError> {
        let parsed = parse::parse(gpx.as_bytes())?;
        let points = parsed.points;
        let Some(first) = points.first() else {
            return Err(ParseError::EmptyFile.into());
        };

        let bounds = process::elevation_bounds(&points);
        let terrain = process::terrain_class(bounds.map(|(min, max)| max - min).unwrap_or(0.0));
        let step_frequency = process::step_frequency(&points)?;

        let location = self.geocoder.reverse_or_empty(first.lat, first.lon).await;
        let (temperature, weather) = self.track_weather(first).await;

        let chunk_count = points.len().div_ceil(self.chunk_size);
        tracing::info!(
            "Enriching {} points: terrain={:?}, {} POI lookups",
            points.len(),
            terrain,
            chunk_count
        );

        let mut enriched = Vec::with_capacity(points.len());
        for (idx, chunk) in points.chunks(self.chunk_size).enumerate() {
            let anchor = chunk_midpoint(chunk);
            let poi = self.poi.categories_near(anchor.lat, anchor.lon, cancel).await?;
            tracing::debug!("POI chunk {}/{}: {:?}", idx + 1, chunk_count, poi);

            enriched.extend(chunk.iter().map(|point| EnrichedPoint {
                lat: point.lat,
                lon: point.lon,
                elevation: point.elevation,
                time: point.time,
                calendar: process::calendar_fields(&point.time),
                poi: poi.clone(),
                temperature,
            }));
        }

        Ok(EnrichedTrack {
            region: location.region,
            country: location.country,
            track_datetime: first.time,
            calendar: process::calendar_fields(&first.time),
            terrain,
            temperature,
            weather,
            elevation_max: bounds.map(|(_, max)| max),
            step_frequency,
            gpx: gpx.to_string(),
            points: enriched,
        })
    }

    /// Daily forecast for the first point; a failed lookup leaves both fields empty.
    async fn track_weather(&self, first: &TrackPoint) -> (Option<f64>, Option<String>) {
        match self
            .forecast
            .daily(first.lat, first.lon, first.time.date_naive())
            .await
        {
            Ok(daily) => {
                let weather = daily
                    .weather_code
                    .map(describe_weather_code)
                    .unwrap_or(UNKNOWN_WEATHER);
                (daily.temperature_max, Some(weather.to_string()))
            }
            Err(e) => {
                tracing::warn!(
                    "Weather lookup for ({}, {}) failed: {}",
                    first.lat,
                    first.lon,
                    e
                );
                (None, None)
            }
        }
    }
}

fn chunk_midpoint(chunk: &[TrackPoint]) -> &TrackPoint {
    &chunk[chunk.len() / 2]
}
