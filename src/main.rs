//! aquaguard - adaptive water-quality anomaly monitor
//!
//! Usage:
//!   aquaguard run --readings 1000
//!   aquaguard run --readings 2000 --train-window 800 --data-dir ./data
//!   aquaguard generate --readings 100

use aquaguard::config::MonitorConfig;
use aquaguard::monitor::Monitor;
use aquaguard::sim::SensorSimulator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aquaguard")]
#[command(about = "Adaptive water-quality anomaly monitoring with ensemble detection")]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full train-then-monitor simulation
    Run {
        /// Total readings to generate (training window included)
        #[arg(long, default_value_t = 1000)]
        readings: usize,

        /// Leading readings used to train the models
        #[arg(long, default_value_t = 800)]
        train_window: usize,

        /// Directory for the dataset, alert log and metrics
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Simulator seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Generate labeled readings as JSON lines on stdout
    Generate {
        /// Number of readings to generate
        #[arg(long, default_value_t = 100)]
        readings: usize,

        /// Simulator seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            readings,
            train_window,
            data_dir,
            seed,
        } => run_monitor(readings, train_window, data_dir, seed),
        Commands::Generate { readings, seed } => run_generate(readings, seed),
    }
}

fn run_monitor(readings: usize, train_window: usize, data_dir: PathBuf, seed: u64) {
    let config = MonitorConfig {
        train_window,
        sim_seed: seed,
        ..MonitorConfig::default()
    };

    let monitor = match Monitor::new(config, &data_dir) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };

    match monitor.run(readings) {
        Ok(report) => {
            println!("readings processed: {}", report.readings_processed);
            println!("alerts raised:      {}", report.metrics.total_alerts);
            println!(
                "final sensitivity:  {:.3}",
                report.metrics.final_sensitivity
            );
            println!(
                "pending feedback:   {}",
                report.metrics.feedback_history_count
            );
        }
        Err(e) => {
            eprintln!("run failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_generate(readings: usize, seed: u64) {
    let config = MonitorConfig::default();
    let mut sim = SensorSimulator::new(config.baselines, seed);

    for record in sim.generate_dataset(readings) {
        println!("{}", serde_json::to_string(&record).unwrap());
    }
}
