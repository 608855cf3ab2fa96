//! Gridslide CLI - run the reference grid scenario or evaluate one correction

use clap::{Parser, Subcommand};
use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use gridslide::config::SlideConfig;
use gridslide::sim::harness::{self, RunReport};
use gridslide::sim::scenario::Scenario;
use gridslide::slide::math::{slide_correction, SlideInput};

#[derive(Parser)]
#[command(name = "gridslide")]
#[command(about = "Slide correction for characters on rotating grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rotating-grid scenario and report per-character drift
    Simulate {
        /// Corrector configuration (slide.toml)
        #[arg(short, long, env = "GRIDSLIDE_CONFIG")]
        config: Option<PathBuf>,
        /// Scenario description (TOML); overrides --angular-speed and --radius
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Number of simulation ticks
        #[arg(short, long, default_value = "600")]
        ticks: u32,
        /// Grid spin about +Y in rad/s
        #[arg(long, default_value = "0.5")]
        angular_speed: f32,
        /// Character distance from the rotation axis
        #[arg(long, default_value = "5.0")]
        radius: f32,
        /// Run without the corrector to see the raw drift
        #[arg(long)]
        no_correction: bool,
        /// Behave like a non-authoritative multiplayer client
        #[arg(long)]
        client: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the correction routine once for the given sample
    Correct {
        /// Linear velocity x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        velocity: Vector3<f64>,
        /// Angular velocity x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        angular: Vector3<f64>,
        /// Support normal x,y,z
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        normal: Vector3<f64>,
        /// Step length in seconds (defaults to the configured fixed step)
        #[arg(long)]
        dt: Option<f64>,
        /// Corrector configuration (slide.toml)
        #[arg(short, long, env = "GRIDSLIDE_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            scenario,
            ticks,
            angular_speed,
            radius,
            no_correction,
            client,
            json,
        } => {
            let scenario = match scenario {
                Some(path) => load_scenario(&path),
                None => Scenario {
                    angular_speed,
                    character_radii: vec![radius],
                    ..Default::default()
                },
            };
            let config = if no_correction {
                None
            } else {
                Some(load_config(config.as_deref()))
            };
            let report = harness::run(&scenario, config, ticks, !client);
            print_report(&report, json);
        }
        Commands::Correct {
            velocity,
            angular,
            normal,
            dt,
            config,
        } => correct_once(velocity, angular, normal, dt, config.as_deref()),
    }
}

// =============================================================================
// Input helpers
// =============================================================================

fn parse_vec3(s: &str) -> Result<Vector3<f64>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{}'", s));
    }
    let mut out = [0.0; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|e| format!("invalid component '{}': {}", part, e))?;
    }
    Ok(Vector3::from(out))
}

fn load_config(path: Option<&Path>) -> SlideConfig {
    let Some(path) = path else {
        return SlideConfig::default();
    };
    match SlideConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_scenario(path: &Path) -> Scenario {
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| toml::from_str::<Scenario>(&content).map_err(|e| e.to_string()));
    match parsed {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Error: failed to load scenario {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

fn print_report(report: &RunReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: failed to encode report: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mode = match (report.corrected, report.passive) {
        (false, _) => "uncorrected",
        (true, true) => "passive (client)",
        (true, false) => "corrected",
    };
    println!("{} ticks, {}", report.ticks, mode);
    for c in &report.characters {
        println!(
            "  character {}: radius {:.4} -> {:.4} (drift {:+.5})",
            c.id, c.start_radius, c.end_radius, c.drift
        );
    }
    if report.corrected {
        let t = &report.totals;
        println!(
            "  corrections applied {}, gated {}, skipped {}, failed {}",
            t.corrected, t.gated, t.skipped, t.failed
        );
    }
}

fn correct_once(
    velocity: Vector3<f64>,
    angular: Vector3<f64>,
    normal: Vector3<f64>,
    dt: Option<f64>,
    config: Option<&Path>,
) {
    let config = load_config(config);
    let dt = dt.unwrap_or_else(|| match config.timestep() {
        gridslide::config::TimestepConfig::Fixed { dt } => dt,
        gridslide::config::TimestepConfig::Measured => gridslide::slide::constants::current::TIMESTEP,
    });
    let input = SlideInput {
        linear_velocity: velocity,
        angular_velocity: angular,
        support_normal: normal,
    };
    let c = slide_correction(&input, dt, config.gains());
    println!("{:.9},{:.9},{:.9}", c.x, c.y, c.z);
}
