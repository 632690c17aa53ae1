//! Validate a bag against a profile

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use tracing::info;

use satchel::{EngineConfig, Profile, Validator};

use super::{CliObserver, CommandError};

/// Validate a bag against a profile
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Bag to validate: a directory or a .tar file
    bag: PathBuf,

    /// Profile to validate against (internal JSON)
    #[arg(long, short = 'p')]
    profile: PathBuf,

    /// Skip the serialization format check
    #[arg(long)]
    no_serialization_check: bool,

    /// Pause between files, in milliseconds (for UI pacing)
    #[arg(long, value_name = "MS")]
    slow_motion: Option<u64>,
}

pub fn run(args: ValidateArgs) -> Result<ExitCode, CommandError> {
    let profile = Profile::from_json(&fs::read_to_string(&args.profile)?)?;
    let config = EngineConfig {
        slow_motion_delay: Duration::from_millis(args.slow_motion.unwrap_or(0)),
        disable_serialization_check: args.no_serialization_check,
        ..EngineConfig::default()
    };

    let bag = &args.bag;
    info!(?bag, profile = %profile.name, "Validating bag");

    eprintln!("Validating {:?} against profile '{}'", bag, profile.name);
    let report = Validator::new(&profile, &config, &CliObserver).validate(bag);

    eprintln!("  Files: {}", report.files.len());
    eprintln!(
        "  Payload: {} files, {} bytes",
        report.payload_files, report.payload_bytes
    );
    if report.is_valid() {
        eprintln!("Bag is valid");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Bag is invalid: {} error(s)", report.errors.len());
        Ok(ExitCode::from(1))
    }
}
