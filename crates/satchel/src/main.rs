use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lloggs::LoggingArgs;
use tracing::error;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(about = "Package and validate BagIt bags against declarative profiles")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    logging: LoggingArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a bag against a profile
    Validate(commands::validate::ValidateArgs),
    /// Build a bag from source files
    Bag(commands::bag::BagArgs),
    /// Work with profiles
    #[command(subcommand)]
    Profile(commands::profile::ProfileCommand),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = match cli.logging.setup(|v| match v {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to set up logging: {err}");
            return ExitCode::from(3);
        }
    };

    let result = match cli.command {
        Command::Validate(args) => commands::validate::run(args),
        Command::Bag(args) => commands::bag::run(args),
        Command::Profile(command) => commands::profile::run(command),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "Command failed");
            eprintln!("Error: {err}");
            ExitCode::from(3)
        }
    }
}
