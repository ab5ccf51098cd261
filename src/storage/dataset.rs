use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;

use super::poi_labels_json;
use crate::error::StorageError;
use crate::types::track::EnrichedTrack;

pub const DATASET_COLUMNS: [&str; 17] = [
    "track_id",
    "region",
    "datetime",
    "weak_day",
    "season",
    "year",
    "month",
    "day",
    "time_of_day",
    "temperature",
    "weather",
    "terrain_type",
    "step_frequency",
    "latitude",
    "longitude",
    "elevation",
    "poi_objects",
];

/// One denormalized row per track point. Calendar columns describe the track,
/// coordinates and `datetime` describe the point.
#[derive(Debug, Serialize)]
struct DatasetRow<'a> {
    track_id: i64,
    region: Option<&'a str>,
    datetime: String,
    weak_day: &'a str,
    season: &'a str,
    year: i32,
    month: u32,
    day: u32,
    time_of_day: &'a str,
    temperature: Option<f64>,
    weather: Option<&'a str>,
    terrain_type: &'a str,
    step_frequency: f64,
    latitude: f64,
    longitude: f64,
    elevation: Option<f64>,
    poi_objects: String,
}

/// Append-only CSV writer. Rows for a track are encoded in memory and written
/// with one `write_all` on an append handle while holding the writer lock.
pub struct DatasetWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DatasetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with just the header row if it does not exist yet.
    pub fn ensure_header(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = self.open_append()?;
        if file.metadata()?.len() == 0 {
            file.write_all(&encode_header()?)?;
        }
        Ok(())
    }

    pub fn append_track(&self, track_id: i64, track: &EnrichedTrack) -> Result<usize, StorageError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        for point in &track.points {
            writer.serialize(DatasetRow {
                track_id,
                region: track.region.as_deref(),
                datetime: point.time.format("%Y-%m-%d %H:%M:%S%:z").to_string(),
                weak_day: track.calendar.weekday,
                season: track.calendar.season.label(),
                year: track.calendar.year,
                month: track.calendar.month,
                day: track.calendar.day,
                time_of_day: track.calendar.time_of_day.label(),
                temperature: track.temperature,
                weather: track.weather.as_deref(),
                terrain_type: track.terrain.label(),
                step_frequency: track.step_frequency,
                latitude: point.lat,
                longitude: point.lon,
                elevation: point.elevation,
                poi_objects: poi_labels_json(&point.poi)?,
            })?;
        }

        let rows = writer.into_inner().map_err(into_io_error)?;

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = self.open_append()?;
        if file.metadata()?.len() == 0 {
            file.write_all(&encode_header()?)?;
        }
        file.write_all(&rows)?;
        file.flush()?;

        Ok(track.points.len())
    }

    /// Number of data rows, excluding the header.
    pub fn row_count(&self) -> Result<usize, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.path.exists() {
            return Ok(0);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(count)
    }

    fn open_append(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?)
    }
}

fn encode_header() -> Result<Vec<u8>, StorageError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(DATASET_COLUMNS)?;
    writer.into_inner().map_err(into_io_error)
}

fn into_io_error<W>(err: csv::IntoInnerError<W>) -> StorageError {
    StorageError::Io(std::io::Error::new(err.error().kind(), err.error().to_string()))
}
