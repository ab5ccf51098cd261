use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::error::ProcessError;
use crate::types::track::{CalendarFields, Season, TerrainClass, TimeOfDay, TrackPoint};

/// Month to season, exactly as the historical dataset was labelled.
pub fn season_for_month(month: u32) -> Season {
    match month {
        1 | 11 | 12 => Season::Winter,
        8..=10 => Season::Spring,
        5..=7 => Season::Summer,
        _ => Season::Autumn,
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday.num_days_from_monday() {
        0 => "Понедельник",
        1 => "Вторник",
        // trailing space is part of the stored vocabulary
        2 => "Среда ",
        3 => "Четверг",
        4 => "Пятница",
        5 => "Суббота",
        _ => "Воскресенье",
    }
}

/// Half-open buckets: [0,8) night, [8,12) morning, [12,18) day, [18,24) evening.
pub fn time_of_day(hour: u32) -> TimeOfDay {
    match hour {
        0..=7 => TimeOfDay::Night,
        8..=11 => TimeOfDay::Morning,
        12..=17 => TimeOfDay::Day,
        _ => TimeOfDay::Evening,
    }
}

/// Branch order matters: the first threshold exceeded wins.
pub fn terrain_class(elevation_range: f64) -> TerrainClass {
    if elevation_range > 1000.0 {
        TerrainClass::Mountainous
    } else if elevation_range > 500.0 {
        TerrainClass::Hilly
    } else if elevation_range > 250.0 {
        TerrainClass::Rugged
    } else if elevation_range > 0.0 {
        TerrainClass::Flat
    } else {
        TerrainClass::Undefined
    }
}

pub fn calendar_fields(time: &DateTime<Utc>) -> CalendarFields {
    CalendarFields {
        season: season_for_month(time.month()),
        year: time.year(),
        month: time.month(),
        day: time.day(),
        weekday: weekday_name(time.weekday()),
        time_of_day: time_of_day(time.hour()),
    }
}

/// (min, max) over the points that carry an elevation.
pub fn elevation_bounds(points: &[TrackPoint]) -> Option<(f64, f64)> {
    points
        .iter()
        .filter_map(|p| p.elevation)
        .fold(None, |bounds, ele| match bounds {
            None => Some((ele, ele)),
            Some((min, max)) => Some((f64::min(min, ele), f64::max(max, ele))),
        })
}

/// Points per minute over the span between the earliest and latest timestamp,
/// rounded to one decimal place.
pub fn step_frequency(points: &[TrackPoint]) -> Result<f64, ProcessError> {
    let (Some(first), Some(last)) = (
        points.iter().map(|p| p.time).min(),
        points.iter().map(|p| p.time).max(),
    ) else {
        return Err(ProcessError::ZeroDuration(0));
    };

    let total_seconds = (last - first).num_milliseconds() as f64 / 1000.0;
    if total_seconds <= 0.0 {
        return Err(ProcessError::ZeroDuration(points.len()));
    }

    let frequency = (points.len() as f64 / total_seconds) * 60.0;
    // halves go to the even neighbour, matching the stored dataset
    Ok((frequency * 10.0).round_ties_even() / 10.0)
}
