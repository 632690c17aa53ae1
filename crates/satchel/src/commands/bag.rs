//! Build a bag from source files

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use tracing::{info, warn};
use walkdir::WalkDir;

use satchel::{BagSource, Bagger, EngineConfig, Profile, BAG_INFO_TXT};

use super::{CliObserver, CommandError};

/// Build a bag from source files
#[derive(Args, Debug)]
pub struct BagArgs {
    /// Output bag: a directory or a .tar file
    output: PathBuf,

    /// Profile the bag must satisfy (internal JSON)
    #[arg(long, short = 'p')]
    profile: PathBuf,

    /// Source file or directory to add to the payload (repeatable)
    #[arg(long = "source", short = 's', required = true)]
    sources: Vec<PathBuf>,

    /// Tag value for bag-info.txt in NAME=VALUE format (repeatable)
    #[arg(long = "tag", short = 't', value_parser = parse_key_value)]
    tags: Vec<(String, String)>,

    /// Skip the self-validation pass after writing
    #[arg(long)]
    no_validate: bool,
}

/// Parse a NAME=VALUE string into a tuple.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid NAME=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub fn run(args: BagArgs) -> Result<ExitCode, CommandError> {
    let mut profile = Profile::from_json(&std::fs::read_to_string(&args.profile)?)?;
    for (name, value) in &args.tags {
        profile.set_tag_value(BAG_INFO_TXT, name, value.as_str());
    }

    let sources = collect_sources(&args.sources)?;
    if sources.is_empty() {
        warn!("No payload files found under the given sources");
    }
    info!(output = ?args.output, files = sources.len(), "Building bag");

    let config = EngineConfig::default();
    let bagger = Bagger::new(&profile, &config, &CliObserver);

    let outcome = if args.no_validate {
        bagger.write(&args.output, &sources)?
    } else {
        let (outcome, report) = bagger.write_validated(&args.output, &sources)?;
        if !report.is_valid() {
            eprintln!(
                "Bag written to {:?} but failed self-validation with {} error(s)",
                outcome.bag_path,
                report.errors.len()
            );
            return Ok(ExitCode::from(1));
        }
        outcome
    };

    eprintln!("Bag written to {:?}", outcome.bag_path);
    eprintln!(
        "  Payload: {} files, {} bytes",
        outcome.payload_files, outcome.payload_bytes
    );
    eprintln!("  Manifests: {}", outcome.manifests.join(", "));
    Ok(ExitCode::SUCCESS)
}

/// Expand each source into payload entries: files map to their file name,
/// directories map their contents under the directory's name.
fn collect_sources(paths: &[PathBuf]) -> Result<Vec<BagSource>, CommandError> {
    let mut sources = Vec::new();
    for path in paths {
        if path.is_file() {
            let name = path
                .file_name()
                .ok_or_else(|| format!("source {path:?} has no file name"))?
                .to_string_lossy()
                .into_owned();
            sources.push(BagSource::new(path.clone(), name));
        } else if path.is_dir() {
            let base = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for dirent in WalkDir::new(path) {
                let dirent = dirent?;
                if !dirent.file_type().is_file() {
                    continue;
                }
                let rel = dirent
                    .path()
                    .strip_prefix(path)
                    .unwrap_or(dirent.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                let dest = if base.is_empty() {
                    rel
                } else {
                    format!("{base}/{rel}")
                };
                sources.push(BagSource::new(dirent.path().to_path_buf(), dest));
            }
        } else {
            return Err(format!("source {path:?} does not exist").into());
        }
    }
    Ok(sources)
}
