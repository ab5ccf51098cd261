use std::path::PathBuf;
use std::time::Duration;

use crate::providers::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_body_size: usize,
    pub model_path: PathBuf,
    pub model_version_path: PathBuf,
    pub database_path: PathBuf,
    pub dataset_path: PathBuf,
    pub map_dir: PathBuf,
    pub geocoder_url: String,
    pub forecast_url: String,
    pub archive_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    /// Transport timeout for the reverse geocoder.
    pub http_timeout: Duration,
    /// Transport timeout for GPX downloads and the ingest weather lookup.
    pub ingest_timeout: Duration,
    pub poi_radius_m: u32,
    pub poi_chunk_size: usize,
    pub poi_retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8054,
            max_body_size: 64 * 1024,
            model_path: PathBuf::from("model/model.json"),
            model_version_path: PathBuf::from("model/version.json"),
            database_path: PathBuf::from("track_db.sqlite"),
            dataset_path: PathBuf::from("track_dataset.csv"),
            map_dir: PathBuf::from("maps"),
            geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: concat!("trackrisk-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            http_timeout: Duration::from_secs(10),
            ingest_timeout: Duration::from_secs(200),
            poi_radius_m: 500,
            poi_chunk_size: 150,
            poi_retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_body_size_kb: usize = env_parse("MAX_BODY_SIZE_KB").unwrap_or(64);

        let poi_retry = RetryPolicy {
            max_attempts: env_parse("POI_MAX_ATTEMPTS").unwrap_or(defaults.poi_retry.max_attempts),
            initial_backoff: env_parse("POI_INITIAL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poi_retry.initial_backoff),
            max_backoff: env_parse("POI_MAX_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poi_retry.max_backoff),
            deadline: env_parse("POI_DEADLINE_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poi_retry.deadline),
        };

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            max_body_size: max_body_size_kb * 1024,
            model_path: env_path("MODEL_PATH").unwrap_or(defaults.model_path),
            model_version_path: env_path("MODEL_VERSION_PATH")
                .unwrap_or(defaults.model_version_path),
            database_path: env_path("DATABASE_PATH").unwrap_or(defaults.database_path),
            dataset_path: env_path("DATASET_PATH").unwrap_or(defaults.dataset_path),
            map_dir: env_path("MAP_DIR").unwrap_or(defaults.map_dir),
            geocoder_url: env_string("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            forecast_url: env_string("FORECAST_URL").unwrap_or(defaults.forecast_url),
            archive_url: env_string("ARCHIVE_URL").unwrap_or(defaults.archive_url),
            overpass_url: env_string("OVERPASS_URL").unwrap_or(defaults.overpass_url),
            user_agent: env_string("USER_AGENT").unwrap_or(defaults.user_agent),
            http_timeout: env_parse("HTTP_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            ingest_timeout: env_parse("INGEST_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ingest_timeout),
            poi_radius_m: env_parse("POI_RADIUS_M").unwrap_or(defaults.poi_radius_m),
            poi_chunk_size: env_parse::<usize>("POI_CHUNK_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.poi_chunk_size),
            poi_retry,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.parse().ok())
}
