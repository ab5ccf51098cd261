use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ParsedTrack {
    pub points: Vec<TrackPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn label(&self) -> &'static str {
        match self {
            Season::Winter => "Зима",
            Season::Spring => "Весна",
            Season::Summer => "Лето",
            Season::Autumn => "Осень",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Night,
    Morning,
    Day,
    Evening,
}

impl TimeOfDay {
    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "Ночь",
            TimeOfDay::Morning => "Утро",
            TimeOfDay::Day => "День",
            TimeOfDay::Evening => "Вечер",
        }
    }
}

/// Coarse ruggedness bucket derived from the elevation range of a whole track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainClass {
    Mountainous,
    Hilly,
    Rugged,
    Flat,
    Undefined,
}

impl TerrainClass {
    pub fn label(&self) -> &'static str {
        match self {
            TerrainClass::Mountainous => "Горы",
            TerrainClass::Hilly => "Холмы",
            TerrainClass::Rugged => "Пересеченная",
            TerrainClass::Flat => "Равнина",
            TerrainClass::Undefined => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiCategory {
    Tree,
    Water,
    Hospital,
    Road,
    Building,
}

impl PoiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            PoiCategory::Tree => "Дерево",
            PoiCategory::Water => "Вода",
            PoiCategory::Hospital => "Больница",
            PoiCategory::Road => "Дороги",
            PoiCategory::Building => "Здание",
        }
    }
}

/// Calendar attributes shared by a track and each of its points.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFields {
    pub season: Season,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: &'static str,
    pub time_of_day: TimeOfDay,
}

#[derive(Debug, Clone)]
pub struct EnrichedPoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub time: DateTime<Utc>,
    pub calendar: CalendarFields,
    pub poi: Vec<PoiCategory>,
    /// Track-level temperature repeated on every point.
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EnrichedTrack {
    pub region: Option<String>,
    pub country: Option<String>,
    pub track_datetime: DateTime<Utc>,
    pub calendar: CalendarFields,
    pub terrain: TerrainClass,
    pub temperature: Option<f64>,
    pub weather: Option<String>,
    pub elevation_max: Option<f64>,
    pub step_frequency: f64,
    pub gpx: String,
    pub points: Vec<EnrichedPoint>,
}
