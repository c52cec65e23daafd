use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use lounge_core::{AppController, Config, RefreshScheduler, provider_from_config};
use tokio::sync::broadcast::error::RecvError;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "lounge", version, about = "Ambient weather lounge")]
pub struct Cli {
    /// Config file to use instead of the one in the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and a default city.
    Configure,

    /// List locations matching a query.
    Search {
        query: String,
    },

    /// Show current weather, scene and forecast once.
    Show {
        /// City name; defaults to the configured city.
        city: Option<String>,

        /// Day for the hourly view (YYYY-MM-DD); defaults to the first forecast day.
        #[arg(long)]
        day: Option<NaiveDate>,

        /// Choose among matching locations interactively.
        #[arg(long)]
        pick: bool,
    },

    /// Refresh on the configured interval and print every update until Ctrl-C.
    Watch {
        /// City name; defaults to the configured city.
        city: Option<String>,

        /// Choose among matching locations interactively.
        #[arg(long)]
        pick: bool,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&config_path),
            Command::Search { query } => {
                let (_, controller) = load(&config_path)?;
                let candidates = controller.search(&query).await?;
                if candidates.is_empty() {
                    println!("No matching locations found.");
                } else {
                    render::print_candidates(&candidates);
                }
                Ok(())
            }
            Command::Show { city, day, pick } => {
                let (config, controller) = load(&config_path)?;
                open(&controller, &query_or_default(city, &config)?, pick).await?;

                let display = controller
                    .display_state()
                    .ok_or_else(|| anyhow!("No weather data was loaded"))?;
                render::print_display(&display);

                if let Some(day) = day.or(display.selected_day) {
                    let bucket = controller.select_day(day)?;
                    render::print_hours(&bucket);
                }
                Ok(())
            }
            Command::Watch { city, pick } => {
                let (config, controller) = load(&config_path)?;
                let mut events = controller.subscribe();
                open(&controller, &query_or_default(city, &config)?, pick).await?;

                let scheduler =
                    RefreshScheduler::spawn(Arc::clone(&controller), config.refresh_interval());

                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        event = events.recv() => match event {
                            Ok(event) => render::print_event(&event),
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "display fell behind, skipped updates");
                            }
                            Err(RecvError::Closed) => break,
                        },
                    }
                }

                scheduler.stop().await;
                Ok(())
            }
        }
    }
}

fn load(config_path: &Path) -> Result<(Config, Arc<AppController>)> {
    let config = Config::load_from(config_path)?;
    let provider = provider_from_config(&config).context("Failed to build weather client")?;
    Ok((config, Arc::new(AppController::new(provider))))
}

fn query_or_default(city: Option<String>, config: &Config) -> Result<String> {
    city.or_else(|| config.city.clone()).ok_or_else(|| {
        anyhow!(
            "No city given and none configured.\n\
             Hint: pass a city name or run `lounge configure`."
        )
    })
}

/// Point the controller at `query`, either the best match or one picked by the user.
async fn open(controller: &AppController, query: &str, pick: bool) -> Result<()> {
    if !pick {
        controller.change_location_by_query(query).await?;
        return Ok(());
    }

    let candidates = controller.search(query).await?;
    if candidates.is_empty() {
        bail!("No matching locations found for '{query}'");
    }

    let labels: Vec<String> = candidates.iter().map(|c| c.label()).collect();
    let choice = Select::new("Choose a location:", labels).raw_prompt()?;
    let location = candidates[choice.index].location.clone();

    controller.change_location(location).await?;
    Ok(())
}

fn configure(config_path: &Path) -> Result<()> {
    let existing = Config::read_existing(config_path);

    let entered = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;

    let mut config = existing.unwrap_or_else(|| Config::new(String::new()));
    if !entered.trim().is_empty() {
        config.api_key = entered.trim().to_string();
    }

    let default_city = config.city.clone().unwrap_or_else(|| "London".to_string());
    let city = Text::new("Default city:").with_default(&default_city).prompt()?;
    config.city = Some(city.trim().to_string()).filter(|c| !c.is_empty());

    config.validate()?;
    config.save_to(config_path)?;

    println!("Saved configuration to {}", config_path.display());
    Ok(())
}
