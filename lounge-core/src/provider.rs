use crate::{
    Config,
    error::WeatherError,
    model::{CurrentWeather, ForecastEntry, Location, LocationCandidate},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Upper bound on geocoding matches returned by one search.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Geocoding plus current/forecast retrieval. Implementations do no caching.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Candidate locations for `query`, in provider order.
    ///
    /// Fails with [`WeatherError::EmptyQuery`] before any request if the query is blank.
    async fn search_locations(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LocationCandidate>, WeatherError>;

    async fn current_weather(&self, location: &Location) -> Result<CurrentWeather, WeatherError>;

    /// Forecast steps in the order the provider delivered them.
    async fn forecast_entries(
        &self,
        location: &Location,
    ) -> Result<Vec<ForecastEntry>, WeatherError>;

    /// Best geocoding match for `query`.
    async fn resolve_location(&self, query: &str) -> Result<Location, WeatherError> {
        self.search_locations(query, 1)
            .await?
            .into_iter()
            .next()
            .map(|candidate| candidate.location)
            .ok_or_else(|| WeatherError::NotFound(query.trim().to_string()))
    }
}

/// Construct the OpenWeather client from config.
pub fn provider_from_config(config: &Config) -> Result<Arc<dyn WeatherProvider>, WeatherError> {
    let provider = OpenWeatherProvider::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.request_timeout(),
    )?;
    Ok(Arc::new(provider))
}
