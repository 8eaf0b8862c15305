//! Activity Sampler CLI
//!
//! Samples desktop activity and reports changes to a remote collector.

use activity_sampler::{
    bootstrap::{self, elevation, HostElevator, HostRegistrar},
    config::Config,
    logging,
    transparency::create_shared_log_with_persistence,
    uploader::{BlockingCollectorClient, Publisher, UploadConfig},
    Driver, HostSensor, SnapshotBuilder, COLLECTION_NOTICE, VERSION,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "activity-sampler")]
#[command(version = VERSION)]
#[command(about = "Reports foreground-window activity changes to a collector", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Set by the elevated relaunch
    #[arg(long, global = true, hide = true)]
    elevated: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register auto-start and run the sampling loop (default)
    Run(RunArgs),

    /// Take one sample and print it
    Once {
        /// Collector URL (overrides the config file)
        #[arg(long)]
        endpoint: Option<String>,

        /// Also upload the sample once
        #[arg(long)]
        publish: bool,
    },

    /// Pause sampling in a running agent
    Pause,

    /// Resume sampling in a running agent
    Resume,

    /// Show configuration and cumulative statistics
    Status,

    /// Display what the sampler collects
    Notice,

    /// Show configuration
    Config,

    /// Check that the collector endpoint is reachable
    Check {
        /// Collector URL (overrides the config file)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Remove the auto-start entry
    Uninstall,
}

#[derive(clap::Args, Default)]
struct RunArgs {
    /// Collector URL (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Sampling interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Maximum retry delay in seconds
    #[arg(long)]
    max_interval: Option<u64>,

    /// Skip auto-start registration
    #[arg(long)]
    no_autostart: bool,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    let result = match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => cmd_run(&config_path, args, cli.verbose, cli.elevated),
        Commands::Once { endpoint, publish } => cmd_once(&config_path, endpoint, publish),
        Commands::Pause => cmd_set_paused(&config_path, true),
        Commands::Resume => cmd_set_paused(&config_path, false),
        Commands::Status => cmd_status(&config_path),
        Commands::Notice => {
            println!("{COLLECTION_NOTICE}");
            Ok(())
        }
        Commands::Config => cmd_config(&config_path),
        Commands::Check { endpoint } => cmd_check(&config_path, endpoint),
        Commands::Uninstall => cmd_uninstall(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_from(path).with_context(|| format!("loading config from {}", path.display()))
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

fn upload_config(config: &Config) -> UploadConfig {
    UploadConfig::new(config.endpoint_url.trim(), config.request_timeout)
}

fn cmd_run(config_path: &Path, args: RunArgs, verbose: bool, elevated_flag: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(endpoint) = args.endpoint {
        config.endpoint_url = endpoint;
    }
    if let Some(secs) = args.interval {
        config.base_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.max_interval {
        config.max_interval = Duration::from_secs(secs);
    }

    logging::init(Some(&config.log_path), verbose);
    config.validate()?;
    if let Err(e) = config.ensure_directories() {
        warn!(error = %e, "could not create data directories");
    }

    let host = host_name();
    info!(
        version = VERSION,
        host = %host,
        endpoint = %config.endpoint_url,
        interval_secs = config.base_interval.as_secs(),
        max_interval_secs = config.max_interval.as_secs(),
        "activity sampler starting"
    );

    if config.autostart && !args.no_autostart {
        let process_args: Vec<String> = std::env::args().skip(1).collect();
        let already_elevated = elevated_flag || elevation::is_elevated(&process_args);
        let registrar = HostRegistrar::for_current_exe()?;
        let elevator = HostElevator::new(process_args);
        if bootstrap::run_bootstrap(&registrar, &elevator, already_elevated).should_exit() {
            return Ok(());
        }
    }

    let user_id = config.resolve_user_id().unwrap_or_else(|| {
        warn!(var = %config.user_env_var, "session user not set, reporting an empty user id");
        String::new()
    });
    info!(user = %user_id, "sampling session user");

    let client = BlockingCollectorClient::new(upload_config(&config))?;
    let activity_log = create_shared_log_with_persistence(config.stats_path());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    let mut driver = Driver::new(
        HostSensor::new(),
        client,
        SnapshotBuilder::new(user_id),
        config.base_interval,
        config.max_interval,
    )
    .with_activity_log(activity_log.clone());

    // Re-read the config before each tick so `pause`/`resume` reach a running agent.
    let mut paused = config.paused;
    if paused {
        info!("sampling is paused, run `activity-sampler resume` to continue");
    }
    driver.run(&running, || {
        if let Ok(current) = Config::load_from(config_path) {
            if current.paused != paused {
                paused = current.paused;
                info!(paused, "pause state changed");
            }
        }
        paused
    });

    info!("activity sampler stopping");
    if let Err(e) = activity_log.save() {
        warn!(error = %e, "could not save sampler stats");
    }
    println!("{}", activity_log.summary());
    Ok(())
}

fn cmd_once(config_path: &Path, endpoint: Option<String>, publish: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(endpoint) = endpoint {
        config.endpoint_url = endpoint;
    }

    let user_id = config.resolve_user_id().unwrap_or_default();
    let snapshot = SnapshotBuilder::new(user_id)
        .build(&HostSensor::new())
        .context("sampling the desktop")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if publish {
        config.validate()?;
        let client = BlockingCollectorClient::new(upload_config(&config))?;
        client.publish(&snapshot)?;
        println!("Published to {}", client.endpoint_url());
    }
    Ok(())
}

fn cmd_set_paused(config_path: &Path, paused: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.paused = paused;
    config
        .save_to(config_path)
        .with_context(|| format!("saving config to {}", config_path.display()))?;
    if paused {
        println!("Sampling paused. Use 'activity-sampler resume' to continue.");
    } else {
        println!("Sampling resumed.");
    }
    Ok(())
}

fn cmd_status(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let host = host_name();

    println!("Activity Sampler Status");
    println!("=======================");
    println!();
    println!("Host: {host}");
    println!(
        "Session user ({}): {}",
        config.user_env_var,
        config.resolve_user_id().as_deref().unwrap_or("<unset>")
    );
    println!();
    println!("Configuration:");
    println!(
        "  Endpoint: {}",
        if config.endpoint_url.is_empty() {
            "<not set>"
        } else {
            config.endpoint_url.as_str()
        }
    );
    println!("  Interval: {}s", config.base_interval.as_secs());
    println!("  Max retry delay: {}s", config.max_interval.as_secs());
    println!("  Auto-start: {}", config.autostart);
    println!("  Paused: {}", config.paused);
    println!("  Log file: {}", config.log_path.display());
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        let stats = create_shared_log_with_persistence(stats_path).stats();
        println!("Cumulative Statistics:");
        println!("  Ticks: {}", stats.ticks);
        println!("  Skipped (no active window): {}", stats.skipped);
        println!("  Unchanged samples: {}", stats.unchanged);
        println!("  Published: {}", stats.published);
        println!("  Failed publishes: {}", stats.failed);
        if let Some(last) = stats.last_published_at {
            println!("  Last publish: {}", last.to_rfc3339());
        }
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", config_path.display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_check(config_path: &Path, endpoint: Option<String>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(endpoint) = endpoint {
        config.endpoint_url = endpoint;
    }
    config.validate()?;

    let client = BlockingCollectorClient::new(upload_config(&config))?;
    let status = client
        .check_endpoint()
        .with_context(|| format!("reaching {}", client.endpoint_url()))?;
    println!("Collector reachable: {} (HTTP {status})", client.endpoint_url());
    Ok(())
}

fn cmd_uninstall() -> Result<()> {
    bootstrap::autostart::unregister().context("removing auto-start entry")?;
    println!("Auto-start entry removed.");
    Ok(())
}
