use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid GPX: {0}")]
    InvalidGpx(String),
    #[error("Track point {0} has no timestamp")]
    MissingTimestamp(usize),
    #[error("No track points found in file")]
    EmptyFile,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Degenerate track: {0} points recorded over zero seconds")]
    ZeroDuration(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} responded with HTTP {status}")]
    Status {
        provider: &'static str,
        status: u16,
    },
    #[error("{provider} returned an unreadable body: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} still failing after {attempts} attempts: {last}")]
    RetriesExhausted {
        provider: &'static str,
        attempts: u32,
        last: String,
    },
    #[error("{provider} retry deadline of {deadline:?} exceeded")]
    DeadlineExceeded {
        provider: &'static str,
        deadline: std::time::Duration,
    },
    #[error("{provider} request cancelled")]
    Cancelled { provider: &'static str },
}

impl ProviderError {
    /// Rate limiting, gateway timeouts and transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status == 429 || *status == 504,
            ProviderError::Transport { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Dataset write failed: {0}")]
    Dataset(#[from] csv::Error),
    #[error("Dataset I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Map rendering failed: {0}")]
    RenderFailed(String),
    #[error("Map image could not be written: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model bundle could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("Model bundle is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model bundle is malformed: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Weather unavailable for scoring: {0}")]
    WeatherUnavailable(String),
    #[error("Unknown {field} category: {label:?}")]
    UnknownCategory { field: &'static str, label: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failures that abort ingestion of a single track.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Scoring(ScoringError::WeatherUnavailable(_)) => "weather_unavailable",
            AppError::Scoring(ScoringError::UnknownCategory { .. }) => "unknown_category",
            AppError::Scoring(ScoringError::Model(_)) => "model",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Scoring(ScoringError::WeatherUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Scoring(ScoringError::UnknownCategory { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Scoring(ScoringError::Model(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
