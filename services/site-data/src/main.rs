//! Site data CLI.
//!
//! Runs one query against the configured services and prints the result
//! as JSON on stdout.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use grid_common::{GeoPoint, Site};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use site_data::{load_config, summarize, SiteDataService};

#[derive(Parser, Debug)]
#[command(name = "site-data")]
#[command(about = "Ocean conditions and lice pressure at fish-farming sites")]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/site-data.yaml",
        env = "SITE_DATA_CONFIG"
    )]
    config: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Print repository statistics after the query
    #[arg(long)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ocean conditions at a site
    Conditions {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Recent lice pressure at a site, newest first
    LiceHistory {
        #[command(flatten)]
        site: SiteArgs,
    },
    /// Summary of the lice pressure grid for the week of a date
    LiceGrid {
        /// Reference date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Summary of the ocean model grid
    OceanGrid,
    /// Municipality code at a coordinate
    Municipality {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Current weather at a coordinate
    Weather {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

#[derive(clap::Args, Debug)]
struct SiteArgs {
    /// Site (locality) number
    #[arg(long)]
    id: u32,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

impl SiteArgs {
    fn site(&self) -> Result<Site> {
        GeoPoint::validated(self.lat, self.lon).context("Invalid site coordinate")?;
        Ok(Site::new(self.id, self.name.clone(), self.lat, self.lon))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = load_config(&args.config)?;
    info!(config = %args.config, "Loaded configuration");

    let service = SiteDataService::new(config)?;
    let found = run(&service, &args.command).await?;

    if args.stats {
        print_json(&service.stats().await)?;
    }

    if !found {
        warn!("No data");
        std::process::exit(2);
    }
    Ok(())
}

/// Run one command. Returns whether any data was found.
async fn run(service: &SiteDataService, command: &Command) -> Result<bool> {
    match command {
        Command::Conditions { site } => {
            let site = site.site()?;
            print_optional(service.site_conditions(&site).await)
        }
        Command::LiceHistory { site } => {
            let site = site.site()?;
            let history = service.lice_history(&site).await;
            print_optional(history.as_deref())
        }
        Command::LiceGrid { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let period = service.period_for(date);
            info!(period = %period, "Resolved period");
            let grid = service.lice_grid(period).await;
            print_optional(grid.map(|g| summarize(&g)))
        }
        Command::OceanGrid => {
            let grid = service.ocean_grid().await;
            print_optional(grid.map(|g| summarize(&g)))
        }
        Command::Municipality { lat, lon } => {
            print_optional(service.municipality(GeoPoint::new(*lat, *lon)).await)
        }
        Command::Weather { lat, lon } => {
            print_optional(service.weather(GeoPoint::new(*lat, *lon)).await)
        }
    }
}

fn print_optional<T: Serialize>(value: Option<T>) -> Result<bool> {
    match value {
        Some(value) => {
            print_json(&value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}
