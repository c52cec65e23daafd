//! Day and hour views over the provider's flat 3-hour forecast feed.
//!
//! The date key of an entry is the date portion of its provider wall-clock
//! time (`dt_txt`), so a day boundary is the location's own midnight as far as
//! the provider reports it.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{error::ForecastError, model::ForecastEntry};

/// Width of one provider forecast step.
pub const STEP_HOURS: i64 = 3;

/// Forecast entries sharing one calendar date, in feed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    date: NaiveDate,
    entries: Vec<ForecastEntry>,
}

impl DailyBucket {
    /// Buckets come from [`bucket_by_day`]; every entry must fall on `date`.
    pub(crate) fn new(date: NaiveDate, entries: Vec<ForecastEntry>) -> Self {
        debug_assert!(entries.iter().all(|e| e.local_time.date() == date));
        Self { date, entries }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn entries(&self) -> &[ForecastEntry] {
        &self.entries
    }

    /// Rows for the hourly-detail view of this day.
    pub fn hour_slots(&self) -> Vec<HourSlot> {
        self.entries.iter().map(HourSlot::from).collect()
    }
}

/// Ordered mapping from date to bucket; iteration follows first appearance in the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyForecast {
    days: Vec<DailyBucket>,
}

impl DailyForecast {
    pub fn get(&self, date: NaiveDate) -> Option<&DailyBucket> {
        self.days.iter().find(|bucket| bucket.date == date)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailyBucket> {
        self.days.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().map(DailyBucket::date)
    }

    /// At most `n` days from the start, for a fixed-width strip of day tiles.
    pub fn leading_days(&self, n: usize) -> &[DailyBucket] {
        &self.days[..n.min(self.days.len())]
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<'a> IntoIterator for &'a DailyForecast {
    type Item = &'a DailyBucket;
    type IntoIter = std::slice::Iter<'a, DailyBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}

/// Per-day figures shown on a day tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub dominant_icon: String,
    pub min_temperature_c: f64,
    pub max_temperature_c: f64,
}

/// One row of the hourly-detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub icon: String,
    pub humidity_pct: u8,
    pub temperature_c: f64,
}

impl HourSlot {
    /// Time range such as "21:00 - 00:00".
    pub fn label(&self) -> String {
        format!("{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl From<&ForecastEntry> for HourSlot {
    fn from(entry: &ForecastEntry) -> Self {
        HourSlot {
            start: entry.local_time,
            end: entry.local_time + chrono::Duration::hours(STEP_HOURS),
            icon: entry.icon.clone(),
            humidity_pct: entry.humidity_pct,
            temperature_c: entry.temperature_c,
        }
    }
}

/// Group entries by calendar date, keeping feed order inside each day and
/// first-occurrence order across days.
pub fn bucket_by_day(entries: &[ForecastEntry]) -> DailyForecast {
    let mut days: Vec<DailyBucket> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for entry in entries {
        let date = entry.local_time.date();
        let slot = *index.entry(date).or_insert_with(|| {
            days.push(DailyBucket::new(date, Vec::new()));
            days.len() - 1
        });
        days[slot].entries.push(entry.clone());
    }

    DailyForecast { days }
}

/// Dominant icon and temperature range of one day.
///
/// The dominant icon is the most frequent one; on a tie the icon seen first wins.
pub fn summarize_day(bucket: &DailyBucket) -> Result<DaySummary, ForecastError> {
    let first = bucket.entries.first().ok_or(ForecastError::EmptyBucket(bucket.date))?;

    // (icon, count) in order of first appearance.
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in &bucket.entries {
        match counts.iter_mut().find(|(icon, _)| *icon == entry.icon) {
            Some((_, n)) => *n += 1,
            None => counts.push((entry.icon.as_str(), 1)),
        }
    }

    let mut dominant = counts[0];
    for &candidate in &counts[1..] {
        if candidate.1 > dominant.1 {
            dominant = candidate;
        }
    }

    let (min, max) = bucket.entries.iter().fold(
        (first.temperature_c, first.temperature_c),
        |(mn, mx), e| (mn.min(e.temperature_c), mx.max(e.temperature_c)),
    );

    Ok(DaySummary {
        dominant_icon: dominant.0.to_string(),
        min_temperature_c: min,
        max_temperature_c: max,
    })
}

/// The nearest day, i.e. the first one in the feed.
pub fn select_default_day(forecast: &DailyForecast) -> Result<NaiveDate, ForecastError> {
    forecast.days.first().map(DailyBucket::date).ok_or(ForecastError::NoForecastData)
}
