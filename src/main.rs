use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use handover_pool::pipeline::{Pipeline, PipelineInput, RunOutput};
use handover_pool::tle::TleLoader;
use handover_pool::RunConfig;

#[derive(Parser)]
#[command(name = "handover-pool")]
#[command(about = "Rank LEO satellites for handover research from TLE data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run configuration file
    Validate { config: PathBuf },
    /// Run the selection pipeline over a directory of TLE files
    Run {
        config: PathBuf,
        tle_dir: PathBuf,
        /// Write the full result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
        /// Process only the first N satellites of each constellation
        #[arg(long)]
        sample: Option<usize>,
        /// Analysis window for every constellation, e.g. "96m"
        #[arg(long)]
        window: Option<humantime::Duration>,
        /// Sample interval, e.g. "30s"
        #[arg(long)]
        step: Option<humantime::Duration>,
        /// Return the visibility record of this satellite (repeatable)
        #[arg(long = "trajectory")]
        trajectories: Vec<u64>,
        #[arg(long)]
        workers: Option<usize>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            tle_dir,
            output,
            sample,
            window,
            step,
            trajectories,
            workers,
        } => {
            let mut config = match RunConfig::from_file(&config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Config error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(n) = sample {
                config.sample_mode = true;
                config.sample_size = n;
            }
            if let Some(window) = window {
                config.time_window_minutes = window.as_secs_f64() / 60.0;
                for constellation in config.constellations.values_mut() {
                    constellation.time_window_minutes = None;
                }
            }
            if let Some(step) = step {
                config.sample_interval_seconds = step.as_secs_f64();
            }
            if workers.is_some() {
                config.workers = workers;
            }
            config.trajectory_requests.extend(trajectories);

            run(config, tle_dir, output.as_deref())
        }
    }
}

fn validate(path: &Path) -> ExitCode {
    match RunConfig::from_file(path) {
        Ok(config) => {
            println!("Config is valid ({} constellations)", config.constellations.len());
            for (name, c) in &config.constellations {
                println!(
                    "  {}: min elevation {}°, window {} min, {} GHz",
                    name,
                    c.min_elevation_deg,
                    c.time_window_minutes.unwrap_or(config.time_window_minutes),
                    c.band.frequency_ghz
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: RunConfig, tle_dir: PathBuf, output: Option<&Path>) -> ExitCode {
    let sources = match TleLoader::new(tle_dir).load_all() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading TLEs: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match pipeline.run(&PipelineInput::new(sources)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    print_summary(&result);

    if let Some(path) = output {
        if let Err(e) = write_json(&result, path) {
            eprintln!("Error writing {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        println!("Wrote {}", path.display());
    }

    ExitCode::SUCCESS
}

fn print_summary(result: &RunOutput) {
    for (name, selection) in &result.selections {
        println!(
            "{}: {} of {} selected ({:.1}% filtered), pool {}, {} handover-ready",
            name,
            selection.retained_count,
            selection.input_count,
            selection.filtering_rate_percent(),
            selection.pool_quality,
            selection.handover_ready
        );
        for (rank, candidate) in selection.selected.iter().take(10).enumerate() {
            println!(
                "  {:>2}. {:>6} {:<24} {:.3} {} / {}",
                rank + 1,
                candidate.norad_id,
                candidate.name,
                candidate.score,
                candidate.signal_grade,
                candidate.handover.suitability
            );
        }
    }
    if let Some(base) = result.metadata.calculation_base_time {
        println!("Calculation base time: {}", base);
    }
    if !result.metadata.exclusions.is_empty() {
        println!("{} exclusions", result.metadata.exclusions.len());
    }
}

fn write_json(result: &RunOutput, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json)?;
    Ok(())
}
