use std::path::PathBuf;

use reqwest::Client;

use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::enrich::TrackEnricher;
use crate::pipeline::rasterize::write_track_maps;
use crate::providers::{build_client, download_gpx, retry::CancelToken};
use crate::storage::{
    dataset::DatasetWriter,
    db::{SaveOutcome, TrackStore},
};
use crate::types::track::EnrichedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Saved {
        track_id: i64,
        points: usize,
        dataset_rows: usize,
    },
    AlreadySaved {
        track_id: i64,
    },
}

/// Download, enrich, persist, render and export, one track at a time.
pub struct Ingestor {
    download: Client,
    enricher: TrackEnricher,
    store: TrackStore,
    dataset: DatasetWriter,
    map_dir: PathBuf,
}

impl Ingestor {
    pub fn new(
        download: Client,
        enricher: TrackEnricher,
        store: TrackStore,
        dataset: DatasetWriter,
        map_dir: impl Into<PathBuf>,
    ) -> Result<Self, PipelineError> {
        dataset.ensure_header()?;
        Ok(Self {
            download,
            enricher,
            store,
            dataset,
            map_dir: map_dir.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let download = build_client(&config.user_agent, config.ingest_timeout)?;
        let enricher = TrackEnricher::from_config(config)?;
        let store = TrackStore::open(&config.database_path)?;
        let dataset = DatasetWriter::new(config.dataset_path.clone());

        Self::new(download, enricher, store, dataset, config.map_dir.clone())
    }

    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    pub fn dataset(&self) -> &DatasetWriter {
        &self.dataset
    }

    pub async fn ingest_url(
        &mut self,
        url: &str,
        cancel: &CancelToken,
    ) -> Result<IngestOutcome, PipelineError> {
        tracing::info!("Downloading {}", url);
        let gpx = download_gpx(&self.download, url).await?;
        self.ingest_gpx(&gpx, cancel).await
    }

    pub async fn ingest_gpx(
        &mut self,
        gpx: &str,
        cancel: &CancelToken,
    ) -> Result<IngestOutcome, PipelineError> {
        let track = self.enricher.enrich(gpx, cancel).await?;
        self.persist(&track)
    }

    /// Writes an enriched track. Maps and dataset rows are produced only for new tracks.
    pub fn persist(&mut self, track: &EnrichedTrack) -> Result<IngestOutcome, PipelineError> {
        let track_id = match self.store.save(track)? {
            SaveOutcome::AlreadySaved { track_id } => {
                tracing::info!("Track already saved as {}", track_id);
                return Ok(IngestOutcome::AlreadySaved { track_id });
            }
            SaveOutcome::Inserted { track_id } => track_id,
        };

        match write_track_maps(&track.points, track_id, &self.map_dir) {
            Ok(images) => tracing::debug!("Maps for track {}: {:?}", track_id, images),
            Err(e) => tracing::warn!("Map rendering for track {} failed: {}", track_id, e),
        }

        let dataset_rows = self.dataset.append_track(track_id, track)?;

        tracing::info!(
            "Saved track {} with {} points ({} dataset rows)",
            track_id,
            track.points.len(),
            dataset_rows
        );

        Ok(IngestOutcome::Saved {
            track_id,
            points: track.points.len(),
            dataset_rows,
        })
    }
}
