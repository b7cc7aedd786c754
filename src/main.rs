use anyhow::{Context, Result};
use clap::Parser;
use devprobe::collectors::{build_collectors, Collector, COLLECTOR_NAMES};
use devprobe::config::Config;
use devprobe::diagnostics::LogDiagnostics;
use devprobe::error::ConfigError;
use devprobe::samples::Sample;
use devprobe::summary::Summary;
use devprobe::units::SizeUnit;
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of the interrupt check while waiting between rounds
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Command-line arguments for the device probe
#[derive(Parser)]
#[command(
    name = "devprobe",
    about = "Device telemetry probe - samples battery, CPU, memory, storage, network, display, processes and services",
    long_about = "Polls each enabled collector a fixed number of times and prints a summary of \
                  every collector after each round, as text or JSON."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Number of polling rounds
    #[arg(short = 'n', long, default_value_t = 1)]
    samples: u32,

    /// Delay between rounds in milliseconds
    #[arg(short, long, value_name = "MS", default_value_t = 1000)]
    interval_ms: u64,

    /// Print summaries as JSON lines
    #[arg(long)]
    json: bool,

    /// Restrict polling to the named collectors
    #[arg(long, value_name = "NAME", num_args = 1..)]
    only: Vec<String>,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if self.samples == 0 {
            return Err("--samples must be at least 1".to_string());
        }

        for name in &self.only {
            if !COLLECTOR_NAMES.contains(&name.as_str()) {
                return Err(format!(
                    "Unknown collector '{}', expected one of: {}",
                    name,
                    COLLECTOR_NAMES.join(", ")
                ));
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    ///
    /// # Returns
    ///
    /// `Ok(Some(path_str))` if config is provided and valid UTF-8,
    /// `Ok(None)` if no config provided,
    /// `Err(String)` if config path contains invalid UTF-8
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

/// Load configuration from file or use defaults
///
/// Unreadable or invalid files are reported and replaced by the defaults.
fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Ok(Config::default())
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Ok(Config::default())
                }
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

/// Disable every collector not named in `only`; an empty list keeps all
fn apply_only(config: &mut Config, only: &[String]) {
    if only.is_empty() {
        return;
    }
    let wanted = |name: &str| only.iter().any(|n| n == name);
    config.battery.enabled &= wanted("battery");
    config.cpu.enabled &= wanted("cpu");
    config.memory.enabled &= wanted("memory");
    config.storage.enabled &= wanted("storage");
    config.network.enabled &= wanted("network");
    config.display.enabled &= wanted("display");
    config.processes.enabled &= wanted("processes");
    config.services.enabled &= wanted("services");
}

/// One collector's output for a round, as emitted with `--json`
#[derive(Serialize)]
struct CollectorReport<'a> {
    round: u32,
    collector: &'a str,
    /// Error from this round's poll, if it failed
    error: Option<String>,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<Vec<&'a Sample>>,
}

/// Poll every collector once and print the results
fn run_round(
    round: u32,
    collectors: &mut [Box<dyn Collector>],
    json: bool,
    units: SizeUnit,
) -> Result<()> {
    for collector in collectors.iter_mut() {
        let outcome = collector.poll();
        if let Err(e) = &outcome {
            warn!("{} poll failed: {}", collector.name(), e);
        }

        if json {
            let report = CollectorReport {
                round,
                collector: collector.name(),
                error: outcome.err().map(|e| e.to_string()),
                summary: collector.summary(),
                history: collector.history().map(|h| h.iter().collect()),
            };
            println!(
                "{}",
                serde_json::to_string(&report).context("Failed to serialize report")?
            );
        } else {
            println!("{}", collector.summary().render(units));
        }
    }
    Ok(())
}

/// Sleep for `interval`, returning early once `running` is cleared
fn wait_between_rounds(interval: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

fn run(cli: &Cli, config: Config) -> Result<()> {
    let diagnostics = Arc::new(LogDiagnostics::new(config.log_tag.clone()));
    let mut collectors =
        build_collectors(&config, diagnostics).context("Failed to build collectors")?;
    if collectors.is_empty() {
        warn!("No collectors enabled, nothing to do");
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), stopping after the current round");
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("Error setting SIGINT handler")?;

    let interval = Duration::from_millis(cli.interval_ms);
    for round in 1..=cli.samples {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        info!("Sampling round {}/{}", round, cli.samples);
        run_round(round, &mut collectors, cli.json, config.output.units)?;

        if round < cli.samples {
            wait_between_rounds(interval, &running);
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    apply_only(&mut config, &cli.only);

    if let Err(e) = run(&cli, config) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
