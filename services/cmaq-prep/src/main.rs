//! CMAQ input preparation.
//!
//! Merges anthropogenic, biogenic and fire emissions onto MCIP grids and
//! interpolates initial and boundary conditions from a global CTM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cmaq_prep::{Pipeline, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "cmaq-prep")]
#[command(about = "Prepare emissions and initial/boundary conditions for CMAQ")]
struct Args {
    /// Run configuration file
    #[arg(short, long, default_value = "cmaq-prep.yaml", env = "CMAQ_PREP_CONFIG")]
    config: PathBuf,

    /// Rewrite outputs that already exist
    #[arg(long)]
    force: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let mut config = RunConfig::load(&args.config)?;
    if args.force {
        config.features.force_update = true;
    }
    info!(
        config = %args.config.display(),
        start = %config.dates.start,
        end = %config.dates.end,
        domains = ?config.domains.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        "Loaded run configuration"
    );

    let mut pipeline = Pipeline::new(&config).context("Failed to load run-wide inputs")?;
    let summary = pipeline.run()?;
    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        "Finished"
    );
    Ok(())
}
