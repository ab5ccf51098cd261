use crate::error::ParseError;
use crate::types::track::{ParsedTrack, TrackPoint};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

struct PendingPoint {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
}

pub fn parse_gpx(bytes: &[u8]) -> Result<ParsedTrack, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut points = Vec::new();
    let mut current_point: Option<PendingPoint> = None;
    let mut current_element = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e)?;
                if name == "trkpt" {
                    current_point = Some(start_point(&e)?);
                } else if current_point.is_some() {
                    current_element = name;
                }
            }
            Ok(Event::Empty(e)) => {
                // a self-closing trkpt can never carry a timestamp
                if local_name(&e)? == "trkpt" {
                    start_point(&e)?;
                    return Err(ParseError::MissingTimestamp(points.len()));
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(point) = current_point.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

                    match current_element.as_str() {
                        "ele" => point.elevation = text.trim().parse().ok(),
                        "time" => point.time = text.trim().parse::<DateTime<Utc>>().ok(),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"trkpt" {
                    if let Some(point) = current_point.take() {
                        let time = point
                            .time
                            .ok_or(ParseError::MissingTimestamp(points.len()))?;
                        points.push(TrackPoint {
                            lat: point.lat,
                            lon: point.lon,
                            elevation: point.elevation,
                            time,
                        });
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if points.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    Ok(ParsedTrack { points })
}

fn local_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|e| ParseError::InvalidGpx(e.to_string()))
}

fn start_point(e: &BytesStart<'_>) -> Result<PendingPoint, ParseError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value)
            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;

        match attr.key.local_name().as_ref() {
            b"lat" => lat = value.trim().parse::<f64>().ok(),
            b"lon" => lon = value.trim().parse::<f64>().ok(),
            _ => {}
        }
    }

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(PendingPoint {
            lat,
            lon,
            elevation: None,
            time: None,
        }),
        _ => Err(ParseError::InvalidGpx(
            "trkpt is missing a numeric lat/lon".to_string(),
        )),
    }
}
