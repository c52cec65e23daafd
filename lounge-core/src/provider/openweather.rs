use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    error::WeatherError,
    model::{CurrentWeather, ForecastEntry, Location, LocationCandidate},
};

use super::{MAX_SEARCH_RESULTS, WeatherProvider};

const GEOCODING_PATH: &str = "/geo/1.0/direct";
const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "requesting OpenWeather endpoint");

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn coordinates(location: &Location) -> [(&'static str, String); 3] {
        [
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("units", "metric".to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct OwGeocodingMatch {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    dt_txt: Option<String>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

/// Condition group (lower-cased), description and icon of the first weather element.
fn primary_condition(weather: &[OwWeather]) -> (String, String, String) {
    weather
        .first()
        .map(|w| (w.main.to_lowercase(), w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("unknown".to_string(), "Unknown".to_string(), String::new()))
}

impl From<OwGeocodingMatch> for LocationCandidate {
    fn from(m: OwGeocodingMatch) -> Self {
        LocationCandidate {
            location: Location { name: m.name, latitude: m.lat, longitude: m.lon },
            country: m.country,
            state: m.state,
        }
    }
}

impl From<OwCurrentResponse> for CurrentWeather {
    fn from(parsed: OwCurrentResponse) -> Self {
        let (condition, description, icon) = primary_condition(&parsed.weather);

        CurrentWeather {
            timestamp: unix_to_utc(parsed.dt),
            temperature_c: parsed.main.temp,
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            condition,
            description,
            icon,
        }
    }
}

impl From<OwForecastEntry> for ForecastEntry {
    fn from(entry: OwForecastEntry) -> Self {
        let (condition, _, icon) = primary_condition(&entry.weather);
        let timestamp = unix_to_utc(entry.dt);

        // dt_txt is taken verbatim; fall back to the UTC wall clock when it is absent.
        let local_time = entry
            .dt_txt
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, DT_TXT_FORMAT).ok())
            .unwrap_or_else(|| timestamp.naive_utc());

        ForecastEntry {
            timestamp,
            local_time,
            temperature_c: entry.main.temp,
            humidity_pct: entry.main.humidity,
            condition,
            icon,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn search_locations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        let limit = limit.clamp(1, MAX_SEARCH_RESULTS);
        let matches: Vec<OwGeocodingMatch> = self
            .get_json(
                GEOCODING_PATH,
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        tracing::debug!(query, count = matches.len(), "geocoding finished");
        Ok(matches.into_iter().map(LocationCandidate::from).collect())
    }

    async fn current_weather(&self, location: &Location) -> Result<CurrentWeather, WeatherError> {
        let parsed: OwCurrentResponse =
            self.get_json(CURRENT_PATH, &Self::coordinates(location)).await?;
        Ok(parsed.into())
    }

    async fn forecast_entries(
        &self,
        location: &Location,
    ) -> Result<Vec<ForecastEntry>, WeatherError> {
        let parsed: OwForecastResponse =
            self.get_json(FORECAST_PATH, &Self::coordinates(location)).await?;
        Ok(parsed.list.into_iter().map(ForecastEntry::from).collect())
    }
}

fn unix_to_utc(ts: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
