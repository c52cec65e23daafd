//! Core library for the weather lounge.
//!
//! This crate defines:
//! - Configuration handling
//! - The OpenWeather client behind the [`WeatherProvider`] trait
//! - Day/hour aggregation of the 3-hour forecast feed
//! - Condition → scene (background, effect, music) selection
//! - The refresh controller and its periodic scheduler
//!
//! It is used by `lounge-cli`, but a graphical front end can subscribe to
//! [`AppController`] events in the same way.

pub mod config;
pub mod controller;
pub mod error;
pub mod forecast;
pub mod model;
pub mod provider;
pub mod scene;
pub mod scheduler;

pub use config::Config;
pub use controller::{AppController, ControllerEvent, DisplayState, Phase, RefreshOutcome};
pub use error::{ForecastError, WeatherError};
pub use forecast::{DailyBucket, DailyForecast, DaySummary, HourSlot};
pub use model::{CurrentWeather, ForecastEntry, Location, LocationCandidate};
pub use provider::{WeatherProvider, provider_from_config};
pub use scene::{SceneDescriptor, TrackChange, TrackId};
pub use scheduler::RefreshScheduler;
