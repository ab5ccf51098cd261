use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::scoring::RiskInput;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/risk", post(risk))
}

#[derive(Debug, Deserialize)]
struct RiskRequest {
    latitude: f64,
    longitude: f64,
    elevation: f64,
    terrain_type: String,
    #[serde(deserialize_with = "deserialize_track_date")]
    track_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct RiskResponse {
    coordinates: Coordinates,
    prediction: PredictionBody,
    factors: Factors,
}

#[derive(Debug, Serialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct PredictionBody {
    risk: f64,
    evacuation: f64,
}

#[derive(Debug, Serialize)]
struct Factors {
    temperature: f64,
    elevation: f64,
    terrain: String,
    weather: &'static str,
}

async fn risk(
    State(state): State<AppState>,
    payload: Result<Json<RiskRequest>, JsonRejection>,
) -> Result<Json<RiskResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    validate_coordinates(request.latitude, request.longitude)?;

    let input = RiskInput {
        latitude: request.latitude,
        longitude: request.longitude,
        elevation: request.elevation,
        terrain_type: request.terrain_type,
        track_date: request.track_date,
    };

    let assessment = state.scorer().score(&input).await?;

    Ok(Json(RiskResponse {
        coordinates: Coordinates {
            latitude: input.latitude,
            longitude: input.longitude,
        },
        prediction: PredictionBody {
            risk: assessment.prediction.risk,
            evacuation: assessment.prediction.evacuation,
        },
        factors: Factors {
            temperature: assessment.temperature,
            elevation: input.elevation,
            terrain: input.terrain_type,
            weather: assessment.weather,
        },
    }))
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::BadRequest(format!(
            "Coordinates out of range: ({}, {})",
            latitude, longitude
        )));
    }
    Ok(())
}

/// Accepts an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS` datetime, or a bare date.
fn deserialize_track_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Ok(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| serde::de::Error::custom(format!("invalid track_date: {raw:?}")))
}
