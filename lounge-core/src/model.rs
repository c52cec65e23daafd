use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved place the weather is fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One geocoding match offered to the user during an interactive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub location: Location,
    pub country: String,
    pub state: Option<String>,
}

impl LocationCandidate {
    /// Disambiguating label, e.g. "Portland, Oregon, US" or "Paris, FR".
    pub fn label(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}, {}", self.location.name, state, self.country),
            None => format!("{}, {}", self.location.name, self.country),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    /// Lower-cased provider condition group, e.g. "rain".
    pub condition: String,
    pub description: String,
    pub icon: String,
}

/// One 3-hour step of the provider forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    /// Wall-clock time as printed by the provider (`dt_txt`).
    pub local_time: NaiveDateTime,
    pub temperature_c: f64,
    pub humidity_pct: u8,
    pub condition: String,
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(state: Option<&str>) -> LocationCandidate {
        LocationCandidate {
            location: Location { name: "Portland".into(), latitude: 45.5, longitude: -122.6 },
            country: "US".into(),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn label_includes_state_when_present() {
        assert_eq!(candidate(Some("Oregon")).label(), "Portland, Oregon, US");
    }

    #[test]
    fn label_skips_missing_or_blank_state() {
        assert_eq!(candidate(None).label(), "Portland, US");
        assert_eq!(candidate(Some("")).label(), "Portland, US");
    }
}
