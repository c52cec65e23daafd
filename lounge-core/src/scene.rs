//! Condition → scene mapping.
//!
//! A scene is the background, the optional animated foreground effect and the
//! music category derived from the current weather condition and icon. The
//! tables here are the asset contract with the UI layer: every key resolves to
//! a file under the application's asset directory.

use rand::Rng;
use serde::Serialize;

/// Number of tracks shipped per music category.
pub const TRACKS_PER_CATEGORY: usize = 4;

/// Icon shown when the provider sends a code without a pictogram.
pub const FALLBACK_ICON_ASSET: &str = "icons/clear_d.gif";

/// Background family a condition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneCategory {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Fog,
    Smoke,
    Dust,
    Squall,
    Tornado,
}

impl SceneCategory {
    /// Canonicalize a provider condition group. Unknown conditions map to [`SceneCategory::Clear`].
    pub fn from_condition(condition: &str) -> Self {
        match condition.trim().to_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" | "fog" | "haze" => Self::Fog,
            "smoke" | "ash" => Self::Smoke,
            "dust" | "sand" => Self::Dust,
            "squall" => Self::Squall,
            "tornado" => Self::Tornado,
            other => {
                tracing::warn!(condition = other, "unmapped weather condition, using clear scene");
                Self::Clear
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::Rain => "rain",
            Self::Drizzle => "drizzle",
            Self::Thunderstorm => "thunderstorm",
            Self::Snow => "snow",
            Self::Fog => "fog",
            Self::Smoke => "smoke",
            Self::Dust => "dust",
            Self::Squall => "squall",
            Self::Tornado => "tornado",
        }
    }

    pub fn effect(&self) -> Option<ForegroundEffect> {
        match self {
            Self::Rain | Self::Drizzle => Some(ForegroundEffect::Rain),
            Self::Thunderstorm => Some(ForegroundEffect::Thunder),
            Self::Snow => Some(ForegroundEffect::Snow),
            Self::Squall => Some(ForegroundEffect::Squall),
            Self::Fog => Some(ForegroundEffect::Fog),
            Self::Smoke | Self::Dust => Some(ForegroundEffect::Dust),
            Self::Clear | Self::Clouds | Self::Tornado => None,
        }
    }

    pub fn music(&self) -> MusicCategory {
        match self {
            Self::Rain => MusicCategory::Rain,
            Self::Drizzle => MusicCategory::Drizzle,
            Self::Thunderstorm => MusicCategory::Thunderstorm,
            Self::Snow => MusicCategory::Snow,
            Self::Squall => MusicCategory::Squall,
            Self::Fog | Self::Smoke | Self::Dust => MusicCategory::Atmosphere,
            Self::Clouds => MusicCategory::Clouds,
            Self::Clear | Self::Tornado => MusicCategory::Clear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    /// Icons ending in `n` are night; everything else, including malformed codes, is day.
    pub fn from_icon(icon: &str) -> Self {
        if icon.trim_end().ends_with('n') { Self::Night } else { Self::Day }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Day => "d",
            Self::Night => "n",
        }
    }
}

/// Animated overlay drawn above the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForegroundEffect {
    Rain,
    Thunder,
    Snow,
    Squall,
    Fog,
    Dust,
}

impl ForegroundEffect {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Rain => "rain",
            Self::Thunder => "thunder",
            Self::Snow => "snow",
            Self::Squall => "squall",
            Self::Fog => "fog",
            Self::Dust => "dust",
        }
    }

    pub fn asset_path(&self) -> String {
        format!("effects/{}.gif", self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicCategory {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Squall,
    Atmosphere,
}

impl MusicCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Clouds => "clouds",
            Self::Rain => "rain",
            Self::Drizzle => "drizzle",
            Self::Thunderstorm => "thunderstorm",
            Self::Snow => "snow",
            Self::Squall => "squall",
            Self::Atmosphere => "atmosphere",
        }
    }

    /// File name stem of this category's tracks.
    fn track_stem(&self) -> &'static str {
        match self {
            Self::Thunderstorm => "thunder",
            Self::Atmosphere => "atmo",
            other => other.as_str(),
        }
    }

    /// All tracks of this category, in file order.
    pub fn tracks(self) -> impl Iterator<Item = TrackId> {
        (0..TRACKS_PER_CATEGORY).map(move |index| TrackId { category: self, index })
    }
}

/// One concrete track, identified by category and zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TrackId {
    pub category: MusicCategory,
    pub index: usize,
}

impl TrackId {
    pub fn asset_path(&self) -> String {
        format!("music/{}{}.mp3", self.category.track_stem(), self.index + 1)
    }
}

/// Background, effect and music derived from one (condition, icon) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneDescriptor {
    pub category: SceneCategory,
    pub phase: DayPhase,
    /// Background asset key such as `rain_d`.
    pub background: String,
    pub effect: Option<ForegroundEffect>,
    pub music: MusicCategory,
}

impl SceneDescriptor {
    pub fn background_path(&self) -> String {
        format!("backgrounds/{}.jpg", self.background)
    }
}

/// Map a condition group and icon code to a scene. Pure and deterministic.
pub fn select_scene(condition: &str, icon: &str) -> SceneDescriptor {
    let category = SceneCategory::from_condition(condition);
    let phase = DayPhase::from_icon(icon);

    SceneDescriptor {
        category,
        phase,
        background: format!("{}_{}", category.as_str(), phase.suffix()),
        effect: category.effect(),
        music: category.music(),
    }
}

/// Pictogram for a provider icon code.
pub fn icon_asset(icon: &str) -> &'static str {
    match icon {
        "01d" => "icons/clear_d.gif",
        "01n" => "icons/clear_n.gif",
        "02d" => "icons/few_clouds_d.gif",
        "02n" => "icons/few_clouds_n.gif",
        "03d" | "03n" => "icons/scattered_clouds.gif",
        "04d" | "04n" => "icons/broken_clouds.gif",
        "09d" | "09n" | "10d" | "10n" => "icons/rain.gif",
        "11d" | "11n" => "icons/storm.gif",
        "13d" | "13n" => "icons/snow.gif",
        "50d" | "50n" => "icons/fog.gif",
        _ => FALLBACK_ICON_ASSET,
    }
}

/// What the audio layer has to do after a scene update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackChange {
    /// Keep playing the current track; reloading it would restart it audibly.
    Keep(TrackId),
    /// Stop `previous` (if any), then start `next`.
    Switch { previous: Option<TrackId>, next: TrackId },
}

impl TrackChange {
    pub fn track(&self) -> TrackId {
        match self {
            Self::Keep(track) => *track,
            Self::Switch { next, .. } => *next,
        }
    }

    pub fn restarts_playback(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }
}

/// Holds the current track; a new one is drawn only when the music category changes.
#[derive(Debug, Clone, Default)]
pub struct TrackSelector {
    current: Option<TrackId>,
}

impl TrackSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<TrackId> {
        self.current
    }

    pub fn select<R: Rng>(&mut self, category: MusicCategory, rng: &mut R) -> TrackChange {
        if let Some(current) = self.current.filter(|t| t.category == category) {
            return TrackChange::Keep(current);
        }

        let next = TrackId { category, index: rng.gen_range(0..TRACKS_PER_CATEGORY) };
        let previous = self.current.replace(next);
        tracing::debug!(track = %next.asset_path(), "switching track");

        TrackChange::Switch { previous, next }
    }
}
