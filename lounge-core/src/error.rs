use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the weather provider client.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("No location matches '{0}'")]
    NotFound(String),

    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl WeatherError {
    /// Short message suitable for a notification in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::NotFound(_) => "No matching locations found.",
            WeatherError::EmptyQuery => "City name empty, please enter a valid city.",
            WeatherError::Network(e) if e.is_timeout() => {
                "The weather service timed out. Showing the last known weather."
            }
            WeatherError::Network(_) => {
                "Unable to reach the weather service. Showing the last known weather."
            }
            WeatherError::Upstream { status, .. } if *status == 401 => {
                "The weather service rejected the API key. Check your configuration."
            }
            WeatherError::Upstream { .. } => {
                "The weather service returned an error. Showing the last known weather."
            }
            WeatherError::Decode(_) => {
                "Received an unexpected response from the weather service."
            }
        }
    }
}

/// Failures of forecast aggregation and of reads against the displayed forecast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("Forecast bucket for {0} has no entries")]
    EmptyBucket(NaiveDate),

    #[error("Forecast contains no days")]
    NoForecastData,

    #[error("No forecast for {0}")]
    UnknownDay(NaiveDate),
}
