//! Refresh orchestration and ownership of the displayed state.
//!
//! Every refresh takes a sequence number at the moment it starts. Only the
//! refresh holding the latest number may publish its result, so a slow
//! refresh for an old location can never overwrite a newer one. User-initiated
//! refreshes always start (and supersede whatever is in flight); scheduled
//! refreshes are dropped while another refresh is running.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    error::{ForecastError, WeatherError},
    forecast::{self, DailyBucket, DailyForecast, DaySummary},
    model::{CurrentWeather, ForecastEntry, Location, LocationCandidate},
    provider::{MAX_SEARCH_RESULTS, WeatherProvider},
    scene::{self, SceneDescriptor, TrackChange, TrackSelector},
};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Everything the UI needs to draw one refresh.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayState {
    pub sequence: u64,
    pub refreshed_at: DateTime<Utc>,
    pub location: Location,
    pub current: CurrentWeather,
    pub forecast: DailyForecast,
    pub summaries: Vec<(NaiveDate, DaySummary)>,
    /// Day shown in the hourly view until the user picks another one.
    pub selected_day: Option<NaiveDate>,
    pub scene: SceneDescriptor,
    pub track: TrackChange,
}

impl DisplayState {
    pub fn summary(&self, date: NaiveDate) -> Option<&DaySummary> {
        self.summaries.iter().find(|(d, _)| *d == date).map(|(_, s)| s)
    }
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Loading { location: Location },
    Updated(Arc<DisplayState>),
    /// A refresh failed; the previous [`DisplayState`] stays on screen.
    /// `location` is `None` when the failure was resolving a typed query.
    Failed { location: Option<Location>, message: String, user_message: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh started before this one finished; its result was dropped.
    Superseded,
    /// Nothing was fetched (no location yet, or a scheduled tick hit a busy controller).
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    User,
    Schedule,
}

#[derive(Debug)]
enum Target {
    Active,
    Location(Location),
    Query(String),
}

/// Where a started refresh gets its location from.
enum Pending {
    Known(Location),
    Lookup(String),
}

#[derive(Debug)]
struct ControllerState {
    phase: Phase,
    location: Option<Location>,
    latest_sequence: u64,
    in_flight: usize,
    display: Option<Arc<DisplayState>>,
    tracks: TrackSelector,
    rng: StdRng,
}

#[derive(Debug)]
pub struct AppController {
    provider: Arc<dyn WeatherProvider>,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

/// Keeps `in_flight` honest even when a refresh future is dropped mid-request.
struct InFlight<'a> {
    controller: &'a AppController,
    sequence: u64,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if !self.finished && state.latest_sequence == self.sequence {
            tracing::debug!(sequence = self.sequence, "refresh cancelled");
            state.phase = if state.display.is_some() { Phase::Ready } else { Phase::Idle };
        }
    }
}

impl AppController {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self::with_rng(provider, StdRng::from_entropy())
    }

    /// Controller with a caller-supplied RNG for track selection.
    pub fn with_rng(provider: Arc<dyn WeatherProvider>, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            provider,
            state: Mutex::new(ControllerState {
                phase: Phase::Idle,
                location: None,
                latest_sequence: 0,
                in_flight: 0,
                display: None,
                tracks: TrackSelector::new(),
                rng,
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn location(&self) -> Option<Location> {
        self.lock().location.clone()
    }

    /// Last successfully applied state, kept across failed refreshes.
    pub fn display_state(&self) -> Option<Arc<DisplayState>> {
        self.lock().display.clone()
    }

    pub async fn search(&self, query: &str) -> Result<Vec<LocationCandidate>, WeatherError> {
        self.provider.search_locations(query, MAX_SEARCH_RESULTS).await
    }

    /// Replace the active location and refresh it.
    pub async fn change_location(
        &self,
        location: Location,
    ) -> Result<RefreshOutcome, WeatherError> {
        self.run_refresh(Target::Location(location), Trigger::User).await
    }

    /// Geocode `query` and refresh the first match. The lookup belongs to the
    /// refresh, so a newer change supersedes it while it is still resolving.
    pub async fn change_location_by_query(
        &self,
        query: &str,
    ) -> Result<RefreshOutcome, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }
        self.run_refresh(Target::Query(query.to_string()), Trigger::User).await
    }

    /// Refresh the active location now.
    pub async fn refresh(&self) -> Result<RefreshOutcome, WeatherError> {
        self.run_refresh(Target::Active, Trigger::User).await
    }

    /// Timer-driven refresh; dropped if another refresh is in flight.
    pub async fn scheduled_refresh(&self) -> Result<RefreshOutcome, WeatherError> {
        self.run_refresh(Target::Active, Trigger::Schedule).await
    }

    /// Forecast bucket of one day from the displayed state, without touching the network.
    pub fn select_day(&self, date: NaiveDate) -> Result<DailyBucket, ForecastError> {
        self.lock()
            .display
            .as_ref()
            .and_then(|display| display.forecast.get(date).cloned())
            .ok_or(ForecastError::UnknownDay(date))
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_refresh(
        &self,
        target: Target,
        trigger: Trigger,
    ) -> Result<RefreshOutcome, WeatherError> {
        let (sequence, pending) = {
            let mut state = self.lock();

            if trigger == Trigger::Schedule && state.in_flight > 0 {
                tracing::debug!("refresh already in flight, skipping scheduled tick");
                return Ok(RefreshOutcome::Skipped);
            }

            let pending = match target {
                Target::Active => {
                    let Some(location) = state.location.clone() else {
                        tracing::debug!("no location selected, nothing to refresh");
                        return Ok(RefreshOutcome::Skipped);
                    };
                    Pending::Known(location)
                }
                Target::Location(location) => {
                    state.location = Some(location.clone());
                    Pending::Known(location)
                }
                Target::Query(query) => Pending::Lookup(query),
            };

            state.latest_sequence += 1;
            state.in_flight += 1;
            state.phase = Phase::Loading;
            (state.latest_sequence, pending)
        };

        let mut guard = InFlight { controller: self, sequence, finished: false };

        let location = match pending {
            Pending::Known(location) => location,
            Pending::Lookup(query) => {
                tracing::debug!(sequence, %query, "resolving location");
                let resolved = self.provider.resolve_location(&query).await;

                let mut state = self.lock();
                if state.latest_sequence != sequence {
                    tracing::debug!(sequence, %query, "discarding superseded lookup");
                    return Ok(RefreshOutcome::Superseded);
                }
                match resolved {
                    Ok(location) => {
                        state.location = Some(location.clone());
                        location
                    }
                    Err(err) => {
                        guard.finished = true;
                        state.phase = Phase::Error;
                        drop(state);
                        tracing::warn!(%query, error = %err, "location lookup failed");
                        self.publish_failure(None, &err);
                        return Err(err);
                    }
                }
            }
        };

        tracing::debug!(sequence, location = %location.name, "refresh started");
        let _ = self.events.send(ControllerEvent::Loading { location: location.clone() });

        let fetched = self.fetch(&location).await;
        guard.finished = true;
        drop(guard);

        let mut state = self.lock();
        if state.latest_sequence != sequence {
            tracing::debug!(sequence, latest = state.latest_sequence, "discarding superseded refresh");
            return Ok(RefreshOutcome::Superseded);
        }

        match fetched {
            Ok((current, entries)) => {
                let state = &mut *state;
                let applied = Arc::new(build_display(
                    sequence,
                    location,
                    current,
                    &entries,
                    &mut state.tracks,
                    &mut state.rng,
                ));
                state.display = Some(Arc::clone(&applied));
                state.phase = Phase::Ready;

                tracing::info!(
                    location = %applied.location.name,
                    condition = %applied.current.condition,
                    days = applied.forecast.len(),
                    "weather refreshed"
                );
                let _ = self.events.send(ControllerEvent::Updated(applied));
                Ok(RefreshOutcome::Applied)
            }
            Err(err) => {
                state.phase = Phase::Error;
                drop(state);

                tracing::warn!(location = %location.name, error = %err, "weather refresh failed");
                self.publish_failure(Some(location), &err);
                Err(err)
            }
        }
    }

    fn publish_failure(&self, location: Option<Location>, err: &WeatherError) {
        let _ = self.events.send(ControllerEvent::Failed {
            location,
            message: err.to_string(),
            user_message: err.user_message(),
        });
    }

    async fn fetch(
        &self,
        location: &Location,
    ) -> Result<(CurrentWeather, Vec<ForecastEntry>), WeatherError> {
        let current = self.provider.current_weather(location).await?;
        let entries = self.provider.forecast_entries(location).await?;
        Ok((current, entries))
    }
}

fn build_display(
    sequence: u64,
    location: Location,
    current: CurrentWeather,
    entries: &[ForecastEntry],
    tracks: &mut TrackSelector,
    rng: &mut StdRng,
) -> DisplayState {
    let forecast = forecast::bucket_by_day(entries);

    let summaries = forecast
        .iter()
        .filter_map(|bucket| match forecast::summarize_day(bucket) {
            Ok(summary) => Some((bucket.date(), summary)),
            Err(err) => {
                tracing::warn!(error = %err, "skipping day without summary");
                None
            }
        })
        .collect();

    let selected_day = match forecast::select_default_day(&forecast) {
        Ok(date) => Some(date),
        Err(err) => {
            tracing::warn!(error = %err, "forecast has no days to show");
            None
        }
    };

    let scene = scene::select_scene(&current.condition, &current.icon);
    let track = tracks.select(scene.music, rng);

    DisplayState {
        sequence,
        refreshed_at: Utc::now(),
        location,
        current,
        forecast,
        summaries,
        selected_day,
        scene,
        track,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDateTime, TimeZone};
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Failure {
        /// The provider answered with a 503.
        Upstream,
        /// The request never reached a server.
        Network,
    }

    /// Scripted weather for one location.
    #[derive(Debug, Clone)]
    pub struct Script {
        pub delay: Duration,
        pub lookup_delay: Duration,
        pub condition: &'static str,
        pub icon: &'static str,
        pub temperature_c: f64,
        pub failure: Option<Failure>,
    }

    impl Script {
        pub fn weather(condition: &'static str, icon: &'static str, temperature_c: f64) -> Self {
            Self {
                delay: Duration::ZERO,
                lookup_delay: Duration::ZERO,
                condition,
                icon,
                temperature_c,
                failure: None,
            }
        }

        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Delay geocoding queries that match this location.
        pub fn lookup_delayed(mut self, delay: Duration) -> Self {
            self.lookup_delay = delay;
            self
        }

        pub fn failing(mut self, failure: Failure) -> Self {
            self.failure = Some(failure);
            self
        }
    }

    async fn network_error() -> WeatherError {
        // Nothing listens on port 1.
        match reqwest::Client::new().get("http://127.0.0.1:1/").send().await {
            Ok(response) => panic!("unexpected response: {}", response.status()),
            Err(err) => WeatherError::Network(err),
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeProvider {
        scripts: Mutex<HashMap<String, Script>>,
        pub current_calls: AtomicUsize,
    }

    impl FakeProvider {
        pub fn with(self, name: &str, script: Script) -> Self {
            self.set(name, script);
            self
        }

        pub fn set(&self, name: &str, script: Script) {
            self.scripts.lock().expect("lock").insert(name.to_string(), script);
        }

        pub fn calls(&self) -> usize {
            self.current_calls.load(Ordering::SeqCst)
        }

        fn script(&self, location: &Location) -> Script {
            self.scripts.lock().expect("lock").get(&location.name).cloned().expect("scripted")
        }
    }

    pub fn location(name: &str) -> Location {
        Location { name: name.to_string(), latitude: 10.0, longitude: 20.0 }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn search_locations(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<LocationCandidate>, WeatherError> {
            if query.trim().is_empty() {
                return Err(WeatherError::EmptyQuery);
            }
            let (names, lookup_delay) = {
                let scripts = self.scripts.lock().expect("lock");
                let mut names: Vec<String> = scripts
                    .keys()
                    .filter(|name| name.starts_with(query.trim()))
                    .cloned()
                    .collect();
                names.sort();
                let lookup_delay = names
                    .first()
                    .and_then(|name| scripts.get(name))
                    .map_or(Duration::ZERO, |script| script.lookup_delay);
                (names, lookup_delay)
            };
            if !lookup_delay.is_zero() {
                tokio::time::sleep(lookup_delay).await;
            }

            Ok(names
                .iter()
                .take(limit)
                .map(|name| LocationCandidate {
                    location: location(name),
                    country: "NO".into(),
                    state: None,
                })
                .collect())
        }

        async fn current_weather(&self, loc: &Location) -> Result<CurrentWeather, WeatherError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            let script = self.script(loc);
            if !script.delay.is_zero() {
                tokio::time::sleep(script.delay).await;
            }
            match script.failure {
                Some(Failure::Upstream) => {
                    return Err(WeatherError::Upstream { status: 503, body: "unavailable".into() });
                }
                Some(Failure::Network) => return Err(network_error().await),
                None => {}
            }

            Ok(CurrentWeather {
                timestamp: Utc.timestamp_opt(1_714_579_200, 0).single().expect("valid ts"),
                temperature_c: script.temperature_c,
                humidity_pct: 55,
                wind_speed_mps: 2.0,
                condition: script.condition.to_string(),
                description: script.condition.to_string(),
                icon: script.icon.to_string(),
            })
        }

        async fn forecast_entries(&self, loc: &Location) -> Result<Vec<ForecastEntry>, WeatherError> {
            let script = self.script(loc);
            let start = NaiveDateTime::parse_from_str("2024-05-01 18:00:00", "%Y-%m-%d %H:%M:%S")
                .expect("valid start");

            Ok((0..8)
                .map(|i| {
                    let local_time = start + chrono::Duration::hours(3 * i);
                    ForecastEntry {
                        timestamp: Utc.from_utc_datetime(&local_time),
                        local_time,
                        temperature_c: script.temperature_c + i as f64,
                        humidity_pct: 60,
                        condition: script.condition.to_string(),
                        icon: script.icon.to_string(),
                    }
                })
                .collect())
        }
    }
}
