//! Relational store for enriched tracks.
//!
//! Three tables: `track`, its 1:1 `metadata`, and the many `track_point` rows.
//! A track is keyed for deduplication by `(region, track_datetime)`; the check and
//! all three inserts run inside one transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{db_timestamp, poi_labels_json};
use crate::error::StorageError;
use crate::types::track::EnrichedTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted { track_id: i64 },
    /// A track with the same region and timestamp already exists; nothing was written.
    AlreadySaved { track_id: i64 },
}

pub struct TrackStore {
    conn: Connection,
}

impl TrackStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS track (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                country TEXT,
                region TEXT,
                track_datetime TEXT NOT NULL,
                season TEXT NOT NULL,
                gpx_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_track_region_datetime
                ON track(region, track_datetime);

            CREATE TABLE IF NOT EXISTS metadata (
                track_id INTEGER PRIMARY KEY REFERENCES track(id) ON DELETE CASCADE,
                temperature REAL,
                weather TEXT,
                terrain_type TEXT NOT NULL,
                step_frequency REAL NOT NULL,
                elevation REAL
            );

            CREATE TABLE IF NOT EXISTS track_point (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                track_id INTEGER NOT NULL REFERENCES track(id) ON DELETE CASCADE,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                elevation REAL,
                point_datetime TEXT NOT NULL,
                season TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                day INTEGER NOT NULL,
                weak_day TEXT NOT NULL,
                time_of_day TEXT NOT NULL,
                poi_objects TEXT NOT NULL,
                temperature REAL
            );

            CREATE INDEX IF NOT EXISTS idx_track_point_track ON track_point(track_id);
            "#,
        )?;
        Ok(())
    }

    /// Null-safe lookup: a missing region matches other tracks without a region.
    pub fn find_track(
        &self,
        region: Option<&str>,
        track_datetime: &DateTime<Utc>,
    ) -> Result<Option<i64>, StorageError> {
        find_track_in(&self.conn, region, track_datetime)
    }

    pub fn save(&mut self, track: &EnrichedTrack) -> Result<SaveOutcome, StorageError> {
        let tx = self.conn.transaction()?;

        if let Some(track_id) = find_track_in(&tx, track.region.as_deref(), &track.track_datetime)? {
            return Ok(SaveOutcome::AlreadySaved { track_id });
        }

        tx.execute(
            "INSERT INTO track (country, region, track_datetime, season, gpx_data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                track.country,
                track.region,
                db_timestamp(&track.track_datetime),
                track.calendar.season.label(),
                track.gpx,
            ],
        )?;
        let track_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO metadata (track_id, temperature, weather, terrain_type, step_frequency, elevation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                track_id,
                track.temperature,
                track.weather,
                track.terrain.label(),
                track.step_frequency,
                track.elevation_max,
            ],
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO track_point (track_id, latitude, longitude, elevation, point_datetime,
                     season, year, month, day, weak_day, time_of_day, poi_objects, temperature)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for point in &track.points {
                stmt.execute(params![
                    track_id,
                    point.lat,
                    point.lon,
                    point.elevation,
                    db_timestamp(&point.time),
                    point.calendar.season.label(),
                    point.calendar.year,
                    point.calendar.month,
                    point.calendar.day,
                    point.calendar.weekday,
                    point.calendar.time_of_day.label(),
                    poi_labels_json(&point.poi)?,
                    point.temperature,
                ])?;
            }
        }

        tx.commit()?;
        Ok(SaveOutcome::Inserted { track_id })
    }

    pub fn track_count(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM track", [], |row| row.get(0))?)
    }

    pub fn point_count(&self, track_id: i64) -> Result<i64, StorageError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM track_point WHERE track_id = ?1",
            params![track_id],
            |row| row.get(0),
        )?)
    }
}

fn find_track_in(
    conn: &Connection,
    region: Option<&str>,
    track_datetime: &DateTime<Utc>,
) -> Result<Option<i64>, StorageError> {
    Ok(conn
        .query_row(
            "SELECT id FROM track WHERE region IS ?1 AND track_datetime = ?2 LIMIT 1",
            params![region, db_timestamp(track_datetime)],
            |row| row.get(0),
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::process::calendar_fields;
    use crate::types::track::{EnrichedPoint, PoiCategory, TerrainClass};
    use chrono::{Duration, TimeZone};

    fn sample_track(region: Option<&str>, points: usize) -> EnrichedTrack {
        let start = Utc.with_ymd_and_hms(2024, 7, 14, 6, 0, 0).unwrap();
        let points = (0..points)
            .map(|i| {
                let time = start + Duration::seconds(i as i64 * 10);
                EnrichedPoint {
                    lat: 43.25 + i as f64 * 0.001,
                    lon: 42.5,
                    elevation: Some(1800.0 + i as f64),
                    time,
                    calendar: calendar_fields(&time),
                    poi: vec![PoiCategory::Tree, PoiCategory::Road],
                    temperature: Some(21.5),
                }
            })
            .collect();

        EnrichedTrack {
            region: region.map(str::to_string),
            country: Some("Россия".to_string()),
            track_datetime: start,
            calendar: calendar_fields(&start),
            terrain: TerrainClass::Flat,
            temperature: Some(21.5),
            weather: Some("Clear sky".to_string()),
            elevation_max: Some(1850.0),
            step_frequency: 6.0,
            gpx: "<gpx/>".to_string(),
            points,
        }
    }

    #[test]
    fn saving_twice_inserts_once() {
        let mut store = TrackStore::in_memory().unwrap();
        let track = sample_track(Some("Кабардино-Балкария"), 5);

        let first = store.save(&track).unwrap();
        let SaveOutcome::Inserted { track_id } = first else {
            panic!("expected insert, got {first:?}");
        };
        assert_eq!(
            store.save(&track).unwrap(),
            SaveOutcome::AlreadySaved { track_id }
        );
        assert_eq!(store.track_count().unwrap(), 1);
        assert_eq!(store.point_count(track_id).unwrap(), 5);
    }

    #[test]
    fn null_regions_dedupe_too() {
        let mut store = TrackStore::in_memory().unwrap();
        let track = sample_track(None, 2);
        assert!(matches!(store.save(&track).unwrap(), SaveOutcome::Inserted { .. }));
        assert!(matches!(store.save(&track).unwrap(), SaveOutcome::AlreadySaved { .. }));
        assert_eq!(store.track_count().unwrap(), 1);
    }

    #[test]
    fn same_time_in_other_region_is_a_new_track() {
        let mut store = TrackStore::in_memory().unwrap();
        store.save(&sample_track(Some("Тверская область"), 1)).unwrap();
        store.save(&sample_track(Some("Псковская область"), 1)).unwrap();
        assert_eq!(store.track_count().unwrap(), 2);
    }

    #[test]
    fn failed_point_insert_rolls_back_track_and_metadata() {
        let mut store = TrackStore::in_memory().unwrap();
        store.conn.execute_batch("DROP TABLE track_point").unwrap();

        assert!(store.save(&sample_track(Some("Тверская область"), 3)).is_err());
        assert_eq!(store.track_count().unwrap(), 0);
        let metadata_rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))
            .unwrap();
        assert_eq!(metadata_rows, 0);
    }

    #[test]
    fn points_store_poi_list_and_calendar_labels() {
        let mut store = TrackStore::in_memory().unwrap();
        store.save(&sample_track(Some("Тверская область"), 1)).unwrap();
        let (poi, time_of_day, season): (String, String, String) = store
            .conn
            .query_row(
                "SELECT poi_objects, time_of_day, season FROM track_point",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(poi, r#"["Дерево","Дороги"]"#);
        assert_eq!(time_of_day, "Ночь");
        assert_eq!(season, "Лето");
    }
}
