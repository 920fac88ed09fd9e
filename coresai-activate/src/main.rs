//! CoresAI license activation tool
//!
//! Validates and activates license keys against the local key database and
//! shows what the hardware lock sees on this machine.
//!
//! Usage:
//!   coresai-activate activate --key CoresAi-1M-XXXX-XXXX-XXXX-XXXX
//!   coresai-activate fingerprint
//!   coresai-activate status --database private_license_keys.json
//!
//! Exits non-zero when a key is rejected or the database cannot be used.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coresai_activate::{FingerprintReport, KeyOutcome, StatusReport};
use coresai_license::{FingerprintGenerator, LicenseConfig, LicenseStore, LicenseValidator};
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "coresai-activate")]
#[command(about = "Activate and inspect CoresAI license keys")]
struct Args {
    /// License database to use instead of the configured one
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Config file (defaults to ~/.coresai/license.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show this machine's fingerprint and probe status
    Fingerprint,
    /// Check a key without activating it
    Validate {
        #[arg(short, long)]
        key: String,
    },
    /// Validate a key and lock it to this machine
    Activate {
        #[arg(short, long)]
        key: String,
    },
    /// Check that an activated key is locked to this machine
    Check {
        #[arg(short, long)]
        key: String,
    },
    /// Summarize the license database
    Status,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(&args)?;
    debug!(?config, "Resolved license settings");

    match &args.command {
        Command::Fingerprint => {
            let generator = FingerprintGenerator::host().with_timeout(config.probe_timeout());
            let report = FingerprintReport::collect(&generator);
            emit(&report, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { key } => {
            let validator = open_validator(&config)?;
            let outcome = match validator.validate_key(key) {
                Ok(duration) => KeyOutcome::valid(key, duration),
                Err(e) => KeyOutcome::failure(key, format!("Invalid license key: {e}")),
            };
            finish(&outcome, args.json)
        }
        Command::Activate { key } => {
            let mut validator = open_validator(&config)?;
            let outcome = match validator.validate_and_activate(key) {
                Ok(summary) => KeyOutcome::activated(key, &summary),
                Err(message) => KeyOutcome::failure(key, message),
            };
            finish(&outcome, args.json)
        }
        Command::Check { key } => {
            let validator = open_validator(&config)?;
            let outcome = match validator.verify_hardware_lock(key) {
                Ok(()) => KeyOutcome::success(key, "Key is locked to this system"),
                Err(e) => KeyOutcome::failure(key, e.to_string()),
            };
            finish(&outcome, args.json)
        }
        Command::Status => {
            let store = LicenseStore::open(&config.database_path).with_context(|| {
                format!("Failed to open license database {}", config.database_path.display())
            })?;
            let report =
                StatusReport::from_database(store.path().display().to_string(), store.database());
            emit(&report, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(args: &Args) -> Result<LicenseConfig> {
    let mut config = match &args.config {
        Some(path) => LicenseConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LicenseConfig::load().context("Failed to load license config")?,
    };
    if let Some(database) = &args.database {
        config.database_path = database.clone();
    }
    Ok(config)
}

fn open_validator(config: &LicenseConfig) -> Result<LicenseValidator> {
    LicenseValidator::from_config(config).with_context(|| {
        format!("Failed to open license database {}", config.database_path.display())
    })
}

fn emit<T: Serialize + std::fmt::Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

fn finish(outcome: &KeyOutcome, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(if outcome.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
