use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ProviderError;

const PROVIDER: &str = "open-meteo";

/// Daily maximum temperature and WMO weather code for a single date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyWeather {
    pub temperature_max: Option<f64>,
    pub weather_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: DailyValues,
}

#[derive(Debug, Deserialize)]
struct DailyValues {
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    weathercode: Vec<Option<f64>>,
}

/// Open-Meteo daily lookup. The same client serves the forecast endpoint used
/// during ingestion and the historical archive used for scoring.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn daily(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<DailyWeather, ProviderError> {
        let day = date.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
                ("daily", "temperature_2m_max,weathercode".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let body: DailyResponse = super::read_json(PROVIDER, response).await?;

        if body.daily.temperature_2m_max.is_empty() || body.daily.weathercode.is_empty() {
            return Err(ProviderError::Decode {
                provider: PROVIDER,
                message: format!("no daily values for {}", date),
            });
        }

        Ok(DailyWeather {
            temperature_max: body.daily.temperature_2m_max[0],
            weather_code: body.daily.weathercode[0].map(|code| code as i64),
        })
    }
}

/// Human-readable description stored with ingested tracks.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "Clear sky",
        1 | 2 | 3 => "Mainly clear/partly cloudy/overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing Drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing Rain",
        71 | 73 | 75 => "Snow fall",
        77 => "Snow grains",
        80 | 81 | 82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown weather",
    }
}

/// Machine-readable label the risk models were trained on. This vocabulary is
/// distinct from [`describe_weather_code`] and must stay verbatim, including `"fog ="`.
pub fn weather_label(code: i64) -> Option<&'static str> {
    let label = match code {
        0 => "clearSky",
        1 => "mainlyClear",
        2 => "partlyCloudy",
        3 => "overcast",
        45 => "fog =",
        48 => "depositingRimeFog",
        51 => "lightDrizzle",
        53 => "moderateDrizzle",
        55 => "denseDrizzle",
        56 => "lightFreezingDrizzle",
        57 => "moderateOrDenseFreezingDrizzle",
        61 => "lightRain",
        63 => "moderateRain",
        65 => "heavyRain",
        66 => "lightFreezingRain",
        67 => "moderateOrHeavyFreezingRain",
        71 => "slightSnowfall",
        73 => "moderateSnowfall",
        75 => "heavySnowfall",
        77 => "snowGrains",
        80 => "slightRainShowers",
        81 => "moderateRainShowers",
        82 => "heavyRainShowers",
        85 => "slightSnowShowers",
        86 => "heavySnowShowers",
        95 => "thunderstormSlightOrModerate",
        96 => "thunderstormStrong",
        99 => "thunderstormHeavy",
        _ => return None,
    };
    Some(label)
}
