//! Feed trigger CLI
//!
//! Local execution entry point. For AWS Lambda, use `feed-trigger-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feed_trigger::{
    config::StartupConfig,
    error::Result,
    models::Config,
    pipeline::{self, App},
    registry::SocrataRegistry,
};

/// feed-trigger - dispatch ingestion jobs for due registry feeds
#[derive(Parser, Debug)]
#[command(
    name = "feed-trigger",
    version,
    about = "Triggers feed ingestion jobs when registry feeds are due"
)]
struct Cli {
    /// Path to the tuning configuration file
    #[arg(short, long, default_value = "feed-trigger.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run once: dispatch every due feed and stamp the registry
    Run {
        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show what a run would do, without dispatching or writing
    Plan {
        /// Print the decisions as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration, environment and registry schema
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        let config = Config::load_or_default(&cli.config);
        log::info!("Loaded configuration from {}", cli.config.display());
        config
    } else {
        log::debug!("No config at {}, using defaults", cli.config.display());
        Config::default()
    };
    config.apply_env_overrides();

    let startup = StartupConfig::from_env()?;

    match cli.command {
        Command::Run { json } => {
            let app = App::connect(&startup, config).await?;
            let summary = app.run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            if summary.critical_count() > 0 {
                log::error!(
                    "{} feed(s) were dispatched but not stamped",
                    summary.critical_count()
                );
            }
        }

        Command::Plan { json } => {
            let app = App::connect(&startup, config).await?;
            let entries = app.plan().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                pipeline::log_plan(&entries);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::info!("✓ Environment OK: {:?}", startup);

            SocrataRegistry::connect(&startup, &config.registry).await?;
            log::info!("✓ Registry schema OK at {}", startup.registry_location());

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
