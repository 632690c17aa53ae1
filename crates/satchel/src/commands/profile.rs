//! Work with profiles

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Subcommand};
use tracing::info;

use satchel::{standard, Profile};

use super::CommandError;

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Convert a standard BagIt profile JSON into the internal form
    Import(ImportArgs),
    /// Convert an internal profile into the standard schema
    Export(ExportArgs),
    /// Summarize a profile and report well-formedness findings
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Standard profile JSON file
    input: PathBuf,

    /// Name for the imported profile (defaults to the input file stem)
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Internal profile JSON file
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Internal profile JSON file
    input: PathBuf,
}

pub fn run(command: ProfileCommand) -> Result<ExitCode, CommandError> {
    match command {
        ProfileCommand::Import(args) => import(args),
        ProfileCommand::Export(args) => export(args),
        ProfileCommand::Show(args) => show(args),
    }
}

fn import(args: ImportArgs) -> Result<ExitCode, CommandError> {
    let name = args.name.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Imported".to_string())
    });
    let json = fs::read_to_string(&args.input)?;
    let profile = standard::import(&json, &name)?;
    info!(profile = %profile.name, tags = profile.tags.len(), "Imported profile");
    emit(&profile.to_json()?, args.output.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

fn export(args: ExportArgs) -> Result<ExitCode, CommandError> {
    let profile = Profile::from_json(&fs::read_to_string(&args.input)?)?;
    emit(&standard::export_json(&profile)?, args.output.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

fn show(args: ShowArgs) -> Result<ExitCode, CommandError> {
    let profile = Profile::from_json(&fs::read_to_string(&args.input)?)?;
    println!("Profile: {}", profile.name);
    println!("  Id: {}", profile.id);
    println!("  Description: {}", profile.description);
    println!("  Accepts BagIt versions: {}", profile.accept_bag_it_version.join(", "));
    println!(
        "  Manifests required: {}",
        profile
            .manifests_required
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Tag definitions: {}", profile.tags.len());

    let findings = profile.check();
    if findings.is_empty() {
        println!("Profile is well-formed");
    } else {
        println!("Profile has {} finding(s):", findings.len());
        for finding in &findings {
            println!("  {finding}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn emit(json: &str, output: Option<&std::path::Path>) -> Result<(), CommandError> {
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
