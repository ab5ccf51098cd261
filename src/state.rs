use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::error::{ModelError, ProviderError};
use crate::providers::{build_client, weather::WeatherClient};
use crate::scoring::{bundle::ModelBundle, Scorer};

/// Scoring weather lookups always use a fixed transport timeout.
const SCORING_WEATHER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Immutable per-process context: the model bundle is loaded once and never reloaded.
#[derive(Clone)]
pub struct AppState {
    scorer: Scorer,
    model_version: Arc<Value>,
}

impl AppState {
    pub fn new(config: Config, bundle: ModelBundle, model_version: Value) -> Result<Self, StateError> {
        let client = build_client(&config.user_agent, SCORING_WEATHER_TIMEOUT)?;
        let archive = WeatherClient::new(client, config.archive_url.clone());

        Ok(Self {
            scorer: Scorer::new(Arc::new(bundle), archive),
            model_version: Arc::new(model_version),
        })
    }

    /// Reads the bundle and its version descriptor from the configured paths.
    pub fn load(config: Config) -> Result<Self, StateError> {
        let bundle = ModelBundle::load(&config.model_path)?;
        let version_text = std::fs::read_to_string(&config.model_version_path).map_err(ModelError::from)?;
        let model_version: Value = serde_json::from_str(&version_text).map_err(ModelError::from)?;

        tracing::info!(
            "Loaded model bundle from {} (version {})",
            config.model_path.display(),
            model_version
        );

        Self::new(config, bundle, model_version)
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn model_version(&self) -> &Value {
        &self.model_version
    }
}
