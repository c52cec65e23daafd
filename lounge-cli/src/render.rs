//! Plain-text rendering of controller output.

use lounge_core::{
    ControllerEvent, DailyBucket, DisplayState, LocationCandidate, TrackChange,
    scene::icon_asset,
};

/// Number of day tiles in the weekly strip.
const MAX_DAY_TILES: usize = 8;

pub fn print_candidates(candidates: &[LocationCandidate]) {
    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "{:>2}. {}  ({:.4}, {:.4})",
            i + 1,
            candidate.label(),
            candidate.location.latitude,
            candidate.location.longitude
        );
    }
}

pub fn print_display(display: &DisplayState) {
    let current = &display.current;

    println!("{}", current.timestamp.format("%A - %B %d"));
    println!(
        "{}: {}, {:.1}°C",
        display.location.name,
        title_case(&current.description),
        current.temperature_c
    );
    println!("Humidity {}%   Wind {} m/s", current.humidity_pct, current.wind_speed_mps);

    let scene = &display.scene;
    match scene.effect {
        Some(effect) => println!("Scene: {} + {}", scene.background_path(), effect.asset_path()),
        None => println!("Scene: {}", scene.background_path()),
    }
    println!("{}", track_line(&display.track));

    println!();
    for bucket in display.forecast.leading_days(MAX_DAY_TILES) {
        let Some(summary) = display.summary(bucket.date()) else {
            continue;
        };
        let marker = if Some(bucket.date()) == display.selected_day { '*' } else { ' ' };
        println!(
            "{marker} {}  {:<28} {:.0}°C / {:.0}°C",
            bucket.date().format("%a %d"),
            icon_asset(&summary.dominant_icon),
            summary.min_temperature_c,
            summary.max_temperature_c
        );
    }
}

pub fn print_hours(bucket: &DailyBucket) {
    println!();
    println!("{}", bucket.date().format("%A %Y-%m-%d"));
    for slot in bucket.hour_slots() {
        println!(
            "  {}  {:<28} {:>3}%  {:.0}°C",
            slot.label(),
            icon_asset(&slot.icon),
            slot.humidity_pct,
            slot.temperature_c
        );
    }
}

pub fn print_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::Loading { location } => println!("Refreshing {}...", location.name),
        ControllerEvent::Updated(display) => {
            println!();
            print_display(display);
        }
        ControllerEvent::Failed { user_message, message, .. } => {
            eprintln!("{user_message}");
            tracing::debug!(%message, "refresh error detail");
        }
    }
}

fn track_line(track: &TrackChange) -> String {
    match track {
        TrackChange::Keep(current) => format!("Music: {} (continuing)", current.asset_path()),
        TrackChange::Switch { next, .. } => format!("Music: {}", next.asset_path()),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_are_title_cased() {
        assert_eq!(title_case("light rain"), "Light Rain");
        assert_eq!(title_case("overcast  clouds"), "Overcast Clouds");
        assert_eq!(title_case(""), "");
    }
}
