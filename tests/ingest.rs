mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use trackrisk_rs::{
    config::Config,
    error::{PipelineError, ProviderError},
    pipeline::{
        enrich::TrackEnricher,
        ingest::{IngestOutcome, Ingestor},
    },
    providers::{
        build_client,
        retry::{CancelToken, RetryPolicy},
    },
    storage::{dataset::DatasetWriter, db::TrackStore},
};

struct Providers {
    base: String,
    poi_calls: Arc<AtomicUsize>,
}

/// Each Overpass call answers with a road plus one category of its own, so the
/// stored POI list identifies which lookup a point received.
const PER_CALL_TAGS: [(&str, &str, &str); 4] = [
    ("natural", "tree", "Дерево"),
    ("natural", "water", "Вода"),
    ("amenity", "hospital", "Больница"),
    ("building", "yes", "Здание"),
];

fn poi_of_call(call: usize) -> String {
    format!(r#"["Дороги","{}"]"#, PER_CALL_TAGS[call % PER_CALL_TAGS.len()].2)
}

/// Geocoder, forecast, Overpass and GPX hosting on one local server. With
/// `enrichment_up` false the geocoder and forecast answer HTTP 500.
async fn providers(overpass_status: StatusCode, gpx: String, enrichment_up: bool) -> Providers {
    let poi_calls = Arc::new(AtomicUsize::new(0));
    let counter = poi_calls.clone();
    let enrichment_status = if enrichment_up {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let app = Router::new()
        .route(
            "/reverse",
            get(move || async move {
                (
                    enrichment_status,
                    Json(json!({
                        "name": "Кабардино-Балкария",
                        "address": {"country": "Россия"}
                    })),
                )
            }),
        )
        .route(
            "/forecast",
            get(move || async move {
                (
                    enrichment_status,
                    Json(json!({
                        "daily": {"temperature_2m_max": [14.2], "weathercode": [61]}
                    })),
                )
            }),
        )
        .route(
            "/overpass",
            post(move || {
                let counter = counter.clone();
                async move {
                    let call = counter.fetch_add(1, Ordering::SeqCst);
                    let (key, value, _) = PER_CALL_TAGS[call % PER_CALL_TAGS.len()];
                    let body = json!({
                        "elements": [
                            {"tags": {"highway": "path"}},
                            {"tags": {key: value}},
                            {"tags": {"highway": "track"}}
                        ]
                    });
                    (overpass_status, Json(body))
                }
            }),
        )
        .route("/track.gpx", get(move || async move { gpx }));

    Providers {
        base: common::spawn_mock(app).await,
        poi_calls,
    }
}

fn config(base: &str, dir: &std::path::Path) -> Config {
    Config {
        database_path: dir.join("track_db.sqlite"),
        dataset_path: dir.join("track_dataset.csv"),
        map_dir: dir.join("maps"),
        geocoder_url: format!("{base}/reverse"),
        forecast_url: format!("{base}/forecast"),
        overpass_url: format!("{base}/overpass"),
        poi_retry: RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(10),
            deadline: Duration::from_secs(5),
        },
        ..Config::default()
    }
}

fn ingestor(config: &Config) -> Ingestor {
    Ingestor::new(
        build_client(&config.user_agent, config.ingest_timeout).expect("client"),
        TrackEnricher::from_config(config).expect("enricher"),
        TrackStore::open(&config.database_path).expect("store"),
        DatasetWriter::new(config.dataset_path.clone()),
        config.map_dir.clone(),
    )
    .expect("ingestor")
}

/// `count` points one second apart, climbing 2 m per point from 1000 m.
fn gpx(count: usize, start_minute: u32) -> String {
    let mut body = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><gpx version="1.1" creator="test"><trk><trkseg>"#);
    for i in 0..count {
        let seconds = i as u32;
        body.push_str(&format!(
            r#"<trkpt lat="{:.5}" lon="{:.5}"><ele>{}</ele><time>2023-08-05T10:{:02}:{:02}Z</time></trkpt>"#,
            43.30 + i as f64 * 0.0001,
            42.40 + i as f64 * 0.0001,
            1000 + 2 * i,
            start_minute + seconds / 60,
            seconds % 60,
        ));
    }
    body.push_str("</trkseg></trk></gpx>");
    body
}

/// `poi_objects` of every stored point of `track_id`, in point order.
fn stored_poi(config: &Config, track_id: i64) -> Vec<String> {
    let conn = rusqlite::Connection::open(&config.database_path).expect("open db");
    let mut stmt = conn
        .prepare("SELECT poi_objects FROM track_point WHERE track_id = ?1 ORDER BY id")
        .expect("prepare");
    let rows = stmt
        .query_map([track_id], |row| row.get::<_, String>(0))
        .expect("query");
    let poi: Vec<String> = rows.collect::<Result<_, _>>().expect("rows");
    poi
}

fn dataset_poi(config: &Config) -> Vec<String> {
    let mut reader = csv::Reader::from_path(&config.dataset_path).expect("dataset");
    let column = reader
        .headers()
        .expect("headers")
        .iter()
        .position(|h| h == "poi_objects")
        .expect("poi_objects column");
    reader
        .records()
        .map(|record| record.expect("record")[column].to_string())
        .collect()
}

/// Expected POI per point when chunks of `chunk` points map to consecutive calls.
fn expected_poi(points: usize, chunk: usize) -> Vec<String> {
    (0..points).map(|idx| poi_of_call(idx / chunk)).collect()
}

#[tokio::test]
async fn full_chunks_need_one_lookup_each() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, String::new(), true).await;
    let config = config(&mock.base, dir.path());
    let mut ingestor = ingestor(&config);

    let outcome = ingestor
        .ingest_gpx(&gpx(450, 0), &CancelToken::never())
        .await
        .expect("ingest");

    assert_eq!(
        outcome,
        IngestOutcome::Saved {
            track_id: 1,
            points: 450,
            dataset_rows: 450
        }
    );
    assert_eq!(mock.poi_calls.load(Ordering::SeqCst), 3);
    assert_eq!(ingestor.store().point_count(1).expect("points"), 450);
    assert_eq!(ingestor.dataset().row_count().expect("rows"), 450);

    let stored = stored_poi(&config, 1);
    assert_eq!(stored, expected_poi(450, 150));
    for call in 0..3 {
        let applied = stored.iter().filter(|poi| **poi == poi_of_call(call)).count();
        assert_eq!(applied, 150, "lookup {call}");
    }
    assert_eq!(dataset_poi(&config), stored);

    for name in ["map1.png", "map1_rotated.png", "map1_shifted.png", "map1_bright.png"] {
        assert!(config.map_dir.join(name).exists(), "{name} missing");
    }
}

#[tokio::test]
async fn a_partial_chunk_adds_one_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, String::new(), true).await;
    let config = config(&mock.base, dir.path());
    let mut ingestor = ingestor(&config);

    ingestor
        .ingest_gpx(&gpx(451, 0), &CancelToken::never())
        .await
        .expect("ingest");

    assert_eq!(mock.poi_calls.load(Ordering::SeqCst), 4);

    let stored = stored_poi(&config, 1);
    assert_eq!(stored, expected_poi(451, 150));
    assert_eq!(stored.iter().filter(|poi| **poi == poi_of_call(3)).count(), 1);
    assert_eq!(stored.last(), Some(&poi_of_call(3)));
}

#[tokio::test]
async fn dataset_rows_carry_enrichment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, String::new(), true).await;
    let config = config(&mock.base, dir.path());
    let mut ingestor = ingestor(&config);

    ingestor
        .ingest_gpx(&gpx(10, 0), &CancelToken::never())
        .await
        .expect("ingest");

    let mut reader = csv::Reader::from_path(&config.dataset_path).expect("dataset");
    let headers = reader.headers().expect("headers").clone();
    let column = |name: &str| headers.iter().position(|h| h == name).expect(name);
    let first = reader.records().next().expect("row").expect("record");

    assert_eq!(&first[column("region")], "Кабардино-Балкария");
    assert_eq!(&first[column("weather")], "Rain");
    assert_eq!(&first[column("temperature")], "14.2");
    // August was labelled spring in the historical dataset
    assert_eq!(&first[column("season")], "Весна");
    assert_eq!(&first[column("weak_day")], "Суббота");
    assert_eq!(&first[column("time_of_day")], "Утро");
    assert_eq!(&first[column("poi_objects")], r#"["Дороги","Дерево"]"#);
}

#[tokio::test]
async fn same_track_is_saved_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, String::new(), true).await;
    let mut ingestor = ingestor(&config(&mock.base, dir.path()));
    let track = gpx(20, 0);

    let first = ingestor
        .ingest_gpx(&track, &CancelToken::never())
        .await
        .expect("first");
    let second = ingestor
        .ingest_gpx(&track, &CancelToken::never())
        .await
        .expect("second");

    assert!(matches!(first, IngestOutcome::Saved { track_id: 1, .. }));
    assert_eq!(second, IngestOutcome::AlreadySaved { track_id: 1 });
    assert_eq!(ingestor.store().track_count().expect("tracks"), 1);
    assert_eq!(ingestor.dataset().row_count().expect("rows"), 20);

    let later = ingestor
        .ingest_gpx(&gpx(5, 30), &CancelToken::never())
        .await
        .expect("later");
    assert!(matches!(later, IngestOutcome::Saved { track_id: 2, .. }));
    assert_eq!(ingestor.dataset().row_count().expect("rows"), 25);
}

#[tokio::test]
async fn overpass_rate_limiting_fails_the_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::TOO_MANY_REQUESTS, String::new(), true).await;
    let mut ingestor = ingestor(&config(&mock.base, dir.path()));

    let result = ingestor
        .ingest_gpx(&gpx(10, 0), &CancelToken::never())
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Provider(ProviderError::RetriesExhausted { attempts: 2, .. }))
    ));
    assert_eq!(mock.poi_calls.load(Ordering::SeqCst), 2);
    assert_eq!(ingestor.store().track_count().expect("tracks"), 0);
    assert_eq!(ingestor.dataset().row_count().expect("rows"), 0);
}

#[tokio::test]
async fn downloads_track_by_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, gpx(12, 0), true).await;
    let mut ingestor = ingestor(&config(&mock.base, dir.path()));

    let outcome = ingestor
        .ingest_url(&format!("{}/track.gpx", mock.base), &CancelToken::never())
        .await
        .expect("ingest");
    assert!(matches!(outcome, IngestOutcome::Saved { points: 12, .. }));

    let missing = ingestor
        .ingest_url(&format!("{}/missing.gpx", mock.base), &CancelToken::never())
        .await;
    assert!(matches!(
        missing,
        Err(PipelineError::Provider(ProviderError::Status { status: 404, .. }))
    ));
}

#[tokio::test]
async fn optional_enrichment_failures_still_store_the_track() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mock = providers(StatusCode::OK, String::new(), false).await;
    let config = config(&mock.base, dir.path());
    let mut ingestor = ingestor(&config);
    let track = gpx(10, 0);

    let outcome = ingestor
        .ingest_gpx(&track, &CancelToken::never())
        .await
        .expect("ingest");
    assert!(matches!(outcome, IngestOutcome::Saved { track_id: 1, points: 10, .. }));

    let conn = rusqlite::Connection::open(&config.database_path).expect("open db");
    let (region, country): (Option<String>, Option<String>) = conn
        .query_row("SELECT region, country FROM track WHERE id = 1", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("track row");
    let (temperature, weather): (Option<f64>, Option<String>) = conn
        .query_row(
            "SELECT temperature, weather FROM metadata WHERE track_id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("metadata row");
    assert_eq!((region, country), (None, None));
    assert_eq!((temperature, weather), (None, None));

    let start = chrono::DateTime::parse_from_rfc3339("2023-08-05T10:00:00Z")
        .expect("start")
        .with_timezone(&chrono::Utc);
    assert_eq!(ingestor.store().find_track(None, &start).expect("lookup"), Some(1));

    let mut reader = csv::Reader::from_path(&config.dataset_path).expect("dataset");
    let headers = reader.headers().expect("headers").clone();
    let column = |name: &str| headers.iter().position(|h| h == name).expect(name);
    let first = reader.records().next().expect("row").expect("record");
    assert_eq!(&first[column("region")], "");
    assert_eq!(&first[column("temperature")], "");
    assert_eq!(&first[column("weather")], "");

    // a null region still deduplicates
    let again = ingestor
        .ingest_gpx(&track, &CancelToken::never())
        .await
        .expect("again");
    assert_eq!(again, IngestOutcome::AlreadySaved { track_id: 1 });
}
