pub mod bundle;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::ScoringError;
use crate::providers::weather::{weather_label, WeatherClient};
use bundle::{ModelBundle, Prediction};

#[derive(Debug, Clone)]
pub struct RiskInput {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub terrain_type: String,
    pub track_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub temperature: f64,
    pub weather: &'static str,
    pub prediction: Prediction,
}

/// Read-only scoring context shared by all request handlers.
#[derive(Clone)]
pub struct Scorer {
    bundle: Arc<ModelBundle>,
    archive: WeatherClient,
}

impl Scorer {
    pub fn new(bundle: Arc<ModelBundle>, archive: WeatherClient) -> Self {
        Self { bundle, archive }
    }

    pub async fn score(&self, input: &RiskInput) -> Result<RiskAssessment, ScoringError> {
        let daily = self
            .archive
            .daily(input.latitude, input.longitude, input.track_date)
            .await
            .map_err(|e| ScoringError::WeatherUnavailable(e.to_string()))?;

        let temperature = daily.temperature_max.ok_or_else(|| {
            ScoringError::WeatherUnavailable(format!(
                "no maximum temperature for {}",
                input.track_date
            ))
        })?;
        let code = daily.weather_code.ok_or_else(|| {
            ScoringError::WeatherUnavailable(format!("no weather code for {}", input.track_date))
        })?;
        let weather = weather_label(code).ok_or_else(|| ScoringError::UnknownCategory {
            field: "weather",
            label: format!("code {code}"),
        })?;

        let prediction =
            self.bundle
                .predict(temperature, input.elevation, weather, &input.terrain_type)?;

        tracing::info!(
            "Scored ({}, {}) on {}: risk={:.3} evacuation={:.3}",
            input.latitude,
            input.longitude,
            input.track_date,
            prediction.risk,
            prediction.evacuation
        );

        Ok(RiskAssessment {
            temperature,
            weather,
            prediction,
        })
    }
}
