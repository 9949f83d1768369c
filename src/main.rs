mod abort;
mod bookings;
mod catalog;
mod predict;
mod stations;
mod web;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::catalog::{build_client, refresh_once};
use crate::predict::coords::{eci_to_geodetic, km_to_scene, satellite_scene_point};
use crate::predict::tle::{parse_tle_text, OrbitalElementSet};
use crate::predict::{
    predict_satellite_passes, propagate, write_passes_csv, CompiledOrbit, PassPolicy,
};
use crate::stations::{builtin_roster, GroundStation};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "sat-o-view")]
#[command(about = "Satellite tracking, pass prediction and ground station booking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Load the configured catalog once and summarise it
    Catalog {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Predict passes for one satellite from a TLE file
    Passes {
        /// File with name/line1/line2 triples
        #[arg(long)]
        tle: PathBuf,
        /// NORAD id; defaults to the first satellite in the file
        #[arg(long)]
        satellite: Option<String>,
        /// Station as "lat, lon"; repeatable. Defaults to the built-in roster.
        #[arg(long)]
        station: Vec<String>,
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        #[arg(long, default_value_t = 24.0)]
        hours: f64,
        #[arg(long)]
        min_elevation: Option<f64>,
        /// Write CSV to this file instead of printing a table
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the position of one satellite
    Position {
        #[arg(long)]
        tle: PathBuf,
        #[arg(long)]
        satellite: Option<String>,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Catalog { config } => summarise_catalog(&config).await,
        Commands::Passes {
            tle,
            satellite,
            station,
            start,
            hours,
            min_elevation,
            csv,
        } => passes(
            &tle,
            satellite.as_deref(),
            &station,
            start,
            hours,
            min_elevation,
            csv,
        ),
        Commands::Position { tle, satellite, at } => position(&tle, satellite.as_deref(), at),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading config {}: {}", path, e);
            None
        }
    }
}

async fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn summarise_catalog(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let timeout = match config.catalog.fetch_timeout() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match build_client(timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Cannot build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = refresh_once(&config.catalog.sources, &client).await;
    println!("{} satellites", catalog.len());
    for category in catalog.categories() {
        println!("  {:<20} {}", category.category, category.count);
    }
    for source in catalog.failed_sources() {
        println!("  unavailable: {}", source);
    }

    if catalog.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn load_satellite(path: &Path, satellite: Option<&str>) -> Option<OrbitalElementSet> {
    let text = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return None;
        }
    };

    let sets = parse_tle_text(&text);
    let set = match satellite {
        Some(id) => {
            let wanted = id.trim().parse::<u32>().ok();
            sets.into_iter().find(|s| {
                s.catalog_number == id.trim() || (wanted.is_some() && s.norad_id() == wanted)
            })
        }
        None => sets.into_iter().next(),
    };
    if set.is_none() {
        eprintln!("No matching satellite in {}", path.display());
    }
    set
}

fn passes(
    tle: &Path,
    satellite: Option<&str>,
    station_args: &[String],
    start: Option<DateTime<Utc>>,
    hours: f64,
    min_elevation: Option<f64>,
    csv_out: Option<PathBuf>,
) -> ExitCode {
    let Some(set) = load_satellite(tle, satellite) else {
        return ExitCode::FAILURE;
    };
    let orbit = match CompiledOrbit::compile(&set) {
        Ok(orbit) => orbit,
        Err(e) => {
            eprintln!("Cannot propagate {}: {}", set.name, e);
            return ExitCode::FAILURE;
        }
    };

    let stations: Vec<GroundStation> = if station_args.is_empty() {
        builtin_roster().into_iter().filter(|s| s.is_online()).collect()
    } else {
        let mut stations = Vec::new();
        for (i, arg) in station_args.iter().enumerate() {
            match GroundStation::from_coordinates(&format!("station-{}", i + 1), arg) {
                Some(s) => stations.push(s),
                None => {
                    eprintln!("Invalid station coordinates: {}", arg);
                    return ExitCode::FAILURE;
                }
            }
        }
        stations
    };

    let mut policy = PassPolicy::default();
    if let Some(min) = min_elevation {
        policy.min_elevation_deg = min;
    }

    let result = match predict_satellite_passes(&orbit, &stations, start, Some(hours), &policy) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Prediction failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(out) = csv_out {
        let written = fs::File::create(&out)
            .map_err(csv::Error::from)
            .and_then(|file| write_passes_csv(file, &result));
        if let Err(e) = written {
            eprintln!("Error writing {}: {}", out.display(), e);
            return ExitCode::FAILURE;
        }
        println!("Wrote passes for {} to {}", set.name, out.display());
        return ExitCode::SUCCESS;
    }

    println!("Passes for {} ({})", set.name, set.catalog_number);
    if result.is_empty() {
        println!("  none");
    }
    for station in &result {
        println!("  {}", station.ground_station_name);
        for pass in &station.passes {
            println!(
                "    {} -> {}  {:>5}s  max {:.1}°",
                pass.start_time.format("%Y-%m-%d %H:%M:%S"),
                pass.end_time.format("%H:%M:%S"),
                pass.duration_seconds,
                pass.max_elevation_deg
            );
        }
    }
    ExitCode::SUCCESS
}

fn position(tle: &Path, satellite: Option<&str>, at: Option<DateTime<Utc>>) -> ExitCode {
    let Some(set) = load_satellite(tle, satellite) else {
        return ExitCode::FAILURE;
    };
    let at = at.unwrap_or_else(Utc::now);

    let state = match propagate(&set, at) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Cannot propagate {}: {}", set.name, e);
            return ExitCode::FAILURE;
        }
    };
    let geo = eci_to_geodetic(state.position_km, at);

    println!("{} at {}", set.name, at.to_rfc3339());
    println!(
        "  lat {:.4}°  lon {:.4}°  alt {:.1} km  speed {:.3} km/s",
        geo.latitude_deg,
        geo.longitude_deg,
        geo.altitude_km,
        state.speed_km_s()
    );
    let p = satellite_scene_point(&geo, 1.0);
    println!("  scene    ({:.4}, {:.4}, {:.4})", p.x, p.y, p.z);
    let p = km_to_scene(state.position_km, 1.0);
    println!("  inertial ({:.4}, {:.4}, {:.4})", p.x, p.y, p.z);
    ExitCode::SUCCESS
}
