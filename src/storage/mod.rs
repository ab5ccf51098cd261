pub mod dataset;
pub mod db;

use chrono::{DateTime, Utc};

use crate::types::track::PoiCategory;

/// Timestamp layout used for keys and columns in the track database.
pub fn db_timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// POI categories as a flat JSON list of labels.
pub fn poi_labels_json(poi: &[PoiCategory]) -> Result<String, serde_json::Error> {
    let labels: Vec<&str> = poi.iter().map(PoiCategory::label).collect();
    serde_json::to_string(&labels)
}
