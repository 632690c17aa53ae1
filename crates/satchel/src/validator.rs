//! Bag validation against a profile.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{info, warn};

use pannier::ReaderRegistry;

use crate::bagfile::{BagItFile, FileRole};
use crate::config::EngineConfig;
use crate::digest::Algorithm;
use crate::digest::HasherSet;
use crate::errors::ValidationError;
use crate::events::{BagObserver, TaskEvent, TaskKind};
use crate::manifest::ManifestParser;
use crate::parse::Parser;
use crate::profile::{Profile, BAGIT_TXT, BAG_INFO_TXT};
use crate::serialization::FormatRegistry;
use crate::tagfile::TagFileParser;

/// Outcome of a validation run.
#[derive(Debug)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub files: BTreeMap<String, BagItFile>,
    pub payload_bytes: u64,
    pub payload_files: u64,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates one bag against one profile.
///
/// The validator owns the file map it builds; the profile is borrowed
/// read-only. Findings accumulate and the run always signals its end, but a
/// failed profile self-check, a missing bag, a serialization violation, or
/// a reader error stops further phases.
pub struct Validator<'a> {
    profile: &'a Profile,
    config: &'a EngineConfig,
    observer: &'a dyn BagObserver,
    registry: ReaderRegistry,
    formats: FormatRegistry,
    errors: Vec<ValidationError>,
    files: BTreeMap<String, BagItFile>,
}

impl<'a> Validator<'a> {
    pub fn new(profile: &'a Profile, config: &'a EngineConfig, observer: &'a dyn BagObserver) -> Self {
        Validator {
            profile,
            config,
            observer,
            registry: ReaderRegistry::new(),
            formats: FormatRegistry::new(),
            errors: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Replace the reader registry, e.g. to accept additional container
    /// formats.
    pub fn with_registry(mut self, registry: ReaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn validate(mut self, bag_path: &Path) -> ValidationReport {
        self.observer.on_task(&TaskEvent::new(
            TaskKind::Start,
            bag_path.to_string_lossy(),
            "Validation started",
        ));

        if !bag_path.exists() {
            self.record(ValidationError::BagMissing(
                bag_path.to_string_lossy().into_owned(),
            ));
            return self.finish();
        }

        let profile_issues = self.profile.check();
        if !profile_issues.is_empty() {
            for issue in profile_issues {
                self.record(ValidationError::ProfileInvalid(issue));
            }
            return self.finish();
        }

        if self.config.disable_serialization_check {
            info!("Serialization check disabled; skipping");
        } else if self.check_serialization(bag_path).is_err() {
            return self.finish();
        }

        let is_serialized = bag_path.is_file();

        let mut reader = match self.registry.open(bag_path) {
            Ok(reader) => reader,
            Err(err) => {
                self.record(ValidationError::ReadFailed(err.to_string()));
                return self.finish();
            }
        };

        let listed = match reader.list() {
            Ok(listed) => listed,
            Err(err) => {
                self.record(ValidationError::ReadFailed(err.to_string()));
                return self.finish();
            }
        };

        // Serialized bags nest everything under a single top-level
        // directory; paths are stripped to bag-root-relative form.
        let strip_prefix = if is_serialized {
            listed
                .iter()
                .filter_map(|e| e.rel_path.split('/').next())
                .next()
                .map(str::to_string)
        } else {
            None
        };

        if is_serialized && self.profile.tar_dir_must_match_name {
            let expected = bag_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let actual = strip_prefix.clone().unwrap_or_default();
            if expected != actual {
                self.record(ValidationError::UntarNameMismatch { expected, actual });
                return self.finish();
            }
        }

        let strip = |rel: &str| -> String {
            match &strip_prefix {
                Some(prefix) => rel
                    .strip_prefix(prefix.as_str())
                    .map(|rest| rest.trim_start_matches('/'))
                    .filter(|rest| !rest.is_empty())
                    .unwrap_or(rel)
                    .to_string(),
                None => rel.to_string(),
            }
        };

        // Algorithms to hash with: required by the profile, plus whatever
        // manifests the bag actually carries. Manifests present in the bag
        // must verify even when the profile does not ask for them.
        let mut digest_set: BTreeSet<Algorithm> = self
            .profile
            .manifests_required
            .union(&self.profile.tag_manifests_required)
            .copied()
            .collect();
        let mut total_files = 0u64;
        for entry in &listed {
            if !entry.is_file {
                continue;
            }
            total_files += 1;
            if let Some(name) = FileRole::classify(&strip(&entry.rel_path)).manifest_algorithm() {
                if let Some(algorithm) = Algorithm::from_name(name) {
                    digest_set.insert(algorithm);
                }
            }
        }

        let mut cancelled = false;
        let mut processed = 0u64;
        let read_result = reader.read(&mut |entry, stream| {
            if self.config.cancel.is_cancelled() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "cancelled"));
            }
            self.config.pace();

            let rel = strip(&entry.rel_path);
            self.observer.on_task(&TaskEvent::new(
                TaskKind::Add,
                &rel,
                format!("Adding {rel}"),
            ));

            let mut file = BagItFile::new(rel, entry.size);
            let mut hashers = HasherSet::new(digest_set.iter().copied());
            let mut parser: Option<Box<dyn Parser>> = if file.wants_parse() {
                if file.role.is_payload_manifest() || file.role.is_tag_manifest() {
                    Some(Box::new(ManifestParser::new()))
                } else {
                    Some(Box::new(TagFileParser::new()))
                }
            } else {
                None
            };

            let mut buf = [0u8; 64 * 1024];
            let mut seen = 0u64;
            loop {
                let n = stream.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                seen += n as u64;
                hashers.update(&buf[..n]);
                if let Some(parser) = parser.as_mut() {
                    parser.write(&buf[..n]);
                }
                if entry.size > 0 {
                    self.observer.on_task(
                        &TaskEvent::new(
                            TaskKind::Read,
                            &file.rel_path,
                            format!("Read {seen} of {} bytes", entry.size),
                        )
                        .with_percent((seen as f32 / entry.size as f32) * 100.0),
                    );
                }
            }
            file.size = seen;
            file.checksums = hashers.finish();
            if let Some(parser) = parser {
                file.parsed = Some(parser.end());
            }

            processed += 1;
            let percent = if total_files > 0 {
                (processed as f32 / total_files as f32) * 100.0
            } else {
                100.0
            };
            self.observer.on_task(
                &TaskEvent::new(
                    TaskKind::Checksum,
                    &file.rel_path,
                    format!("Computed digests for {}", file.rel_path),
                )
                .with_percent(percent),
            );

            self.files.insert(file.rel_path.clone(), file);
            Ok(())
        });

        if let Err(err) = read_result {
            if err.is_interrupted() {
                info!("Validation cancelled; draining");
                cancelled = true;
            } else {
                self.record(ValidationError::ReadFailed(err.to_string()));
                return self.finish();
            }
        }

        // Every hasher has drained by the time the reader returns; the
        // verification phase below may touch checksums freely.
        if !cancelled {
            self.verify();
        }

        self.finish()
    }

    fn check_serialization(&mut self, bag_path: &Path) -> Result<(), ()> {
        use crate::profile::Serialization;

        let is_dir = bag_path.is_dir();
        match self.profile.serialization {
            Serialization::Required if is_dir => {
                self.record(ValidationError::SerializationRequired);
                Err(())
            }
            Serialization::Forbidden => {
                if is_dir {
                    Ok(())
                } else {
                    self.record(ValidationError::SerializationForbidden);
                    Err(())
                }
            }
            _ if is_dir => Ok(()),
            _ => self.check_serialization_format(bag_path),
        }
    }

    fn check_serialization_format(&mut self, bag_path: &Path) -> Result<(), ()> {
        let extension = bag_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        if !self.formats.is_known(bag_path) {
            self.record(ValidationError::SerializationUnknownFormat { extension });
            return Err(());
        }
        if !self
            .formats
            .is_accepted(bag_path, &self.profile.accept_serialization)
        {
            self.record(ValidationError::SerializationNotAccepted {
                extension,
                accepted: self.profile.accept_serialization.join(", "),
            });
            return Err(());
        }
        Ok(())
    }

    fn verify(&mut self) {
        self.verify_required_manifests();
        self.verify_allowed_manifests();
        self.verify_tag_file_allowlist();
        self.verify_fetch_permission();
        self.verify_bagit_version();
        self.verify_manifest_entries();
        self.verify_payload_coverage();
        self.verify_oxum();
        self.verify_tags();
    }

    fn verify_required_manifests(&mut self) {
        let mut findings = Vec::new();
        for algorithm in &self.profile.manifests_required {
            let name = format!("manifest-{algorithm}.txt");
            if !self.files.contains_key(&name) {
                findings.push(ValidationError::ManifestMissing(name));
            }
        }
        for algorithm in &self.profile.tag_manifests_required {
            let name = format!("tagmanifest-{algorithm}.txt");
            if !self.files.contains_key(&name) {
                findings.push(ValidationError::TagManifestMissing(name));
            }
        }
        self.record_all(findings);
    }

    fn verify_allowed_manifests(&mut self) {
        let mut findings = Vec::new();
        for (rel, file) in &self.files {
            let (allowed_set, name) = match &file.role {
                FileRole::PayloadManifest { algorithm } => {
                    (&self.profile.manifests_allowed, algorithm)
                }
                FileRole::TagManifest { algorithm } => {
                    (&self.profile.tag_manifests_allowed, algorithm)
                }
                _ => continue,
            };
            let permitted = Algorithm::from_name(name)
                .map(|a| allowed_set.contains(&a))
                .unwrap_or(false);
            if !permitted {
                findings.push(ValidationError::ManifestNotAllowed {
                    manifest: rel.clone(),
                    algorithm: name.clone(),
                });
            }
        }
        self.record_all(findings);
    }

    fn verify_tag_file_allowlist(&mut self) {
        let patterns: Vec<&str> = self
            .profile
            .tag_files_allowed
            .iter()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .collect();
        if patterns.is_empty() || patterns.contains(&"*") {
            return;
        }
        let Some(globs) = compile_globs(&patterns) else {
            warn!("Unusable tag file patterns; skipping allowlist check");
            return;
        };

        let mut findings = Vec::new();
        for (rel, file) in &self.files {
            if !file.role.is_tag() || rel == BAGIT_TXT {
                continue;
            }
            if !globs.is_match(rel.as_str()) {
                findings.push(ValidationError::TagFileNotAllowed {
                    file: rel.clone(),
                    patterns: patterns.join(", "),
                });
            }
        }
        self.record_all(findings);
    }

    fn verify_fetch_permission(&mut self) {
        if !self.profile.allow_fetch_txt && self.files.contains_key("fetch.txt") {
            self.record(ValidationError::FetchNotAllowed);
        }
    }

    fn verify_bagit_version(&mut self) {
        if self.profile.accept_bag_it_version.is_empty() {
            return;
        }
        let version = self
            .files
            .get(BAGIT_TXT)
            .and_then(|f| f.parsed.as_ref())
            .map(|kv| kv.first("BagIt-Version").unwrap_or_default().to_string());
        let Some(version) = version else {
            // A missing or unparsed bagit.txt is reported by tag checks.
            return;
        };
        if version.is_empty() {
            self.record(ValidationError::VersionMissing);
        } else if !self.profile.accept_bag_it_version.contains(&version) {
            let allowed = self.profile.accept_bag_it_version.join(", ");
            self.record(ValidationError::VersionMismatch { version, allowed });
        }
    }

    fn verify_manifest_entries(&mut self) {
        let mut findings = Vec::new();
        for (rel, file) in &self.files {
            let Some(name) = file.role.manifest_algorithm() else {
                continue;
            };
            let Some(algorithm) = Algorithm::from_name(name) else {
                continue; // Unresolvable algorithms were flagged above.
            };
            let Some(entries) = file.parsed.as_ref() else {
                continue;
            };
            for (listed_path, listed_digest) in entries.iter() {
                match self.files.get(listed_path) {
                    None => findings.push(ValidationError::FileMissingInBag {
                        file: listed_path.to_string(),
                        manifest: rel.clone(),
                    }),
                    Some(target) => {
                        let actual = target.checksum(algorithm).unwrap_or_default();
                        if actual != listed_digest {
                            findings.push(ValidationError::ChecksumMismatch {
                                algorithm,
                                file: listed_path.to_string(),
                                expected: listed_digest.to_string(),
                                actual: actual.to_string(),
                            });
                        }
                    }
                }
            }
        }
        self.record_all(findings);
    }

    fn verify_payload_coverage(&mut self) {
        let mut findings = Vec::new();
        for (manifest_rel, manifest) in &self.files {
            if !manifest.role.is_payload_manifest() {
                continue;
            }
            let Some(entries) = manifest.parsed.as_ref() else {
                continue;
            };
            for (rel, file) in &self.files {
                if file.role.is_payload() && !entries.contains_key(rel) {
                    findings.push(ValidationError::PayloadMissingInManifest {
                        file: rel.clone(),
                        manifest: manifest_rel.clone(),
                    });
                }
            }
        }
        self.record_all(findings);
    }

    fn payload_totals(&self) -> (u64, u64) {
        let mut bytes = 0u64;
        let mut count = 0u64;
        for file in self.files.values() {
            if file.role.is_payload() {
                bytes += file.size;
                count += 1;
            }
        }
        (bytes, count)
    }

    fn verify_oxum(&mut self) {
        let oxum = self
            .files
            .get(BAG_INFO_TXT)
            .and_then(|f| f.parsed.as_ref())
            .and_then(|kv| kv.first("Payload-Oxum"))
            .map(str::to_string);
        let Some(oxum) = oxum else {
            return;
        };
        let Some((bytes, count)) = parse_oxum(&oxum) else {
            warn!(oxum = %oxum, "Malformed Payload-Oxum; skipping check");
            return;
        };
        let (actual_bytes, actual_count) = self.payload_totals();
        if bytes != actual_bytes {
            self.record(ValidationError::OxumByteMismatch {
                expected: bytes,
                actual: actual_bytes,
            });
        }
        if count != actual_count {
            self.record(ValidationError::OxumFileMismatch {
                expected: count,
                actual: actual_count,
            });
        }
    }

    fn verify_tags(&mut self) {
        let mut findings = Vec::new();
        for tag_file in self.profile.tag_files() {
            let definitions = self.profile.tags_for_file(tag_file);
            let file_required = definitions.iter().any(|d| d.required)
                || self.profile.tag_files_required.iter().any(|f| f == tag_file);
            let Some(file) = self.files.get(tag_file) else {
                if file_required {
                    findings.push(ValidationError::TagFileMissing(tag_file.to_string()));
                }
                continue;
            };
            let parsed = file.parsed.as_ref().filter(|kv| !kv.is_empty());
            let Some(parsed) = parsed else {
                if definitions.iter().any(|d| d.required) {
                    findings.push(ValidationError::TagFileHasNoData(tag_file.to_string()));
                }
                continue;
            };
            for definition in definitions {
                let values = parsed.all(&definition.tag_name);
                let missing = values.is_empty();
                let empty = values.iter().all(|v| v.is_empty());
                if !definition.required && missing {
                    continue;
                }
                if definition.empty_ok && empty {
                    continue;
                }
                if definition.required && missing {
                    findings.push(ValidationError::TagMissing {
                        tag: definition.tag_name.clone(),
                        file: tag_file.to_string(),
                    });
                    continue;
                }
                if !definition.empty_ok && empty {
                    findings.push(ValidationError::TagEmpty {
                        tag: definition.tag_name.clone(),
                        file: tag_file.to_string(),
                    });
                    continue;
                }
                if !definition.values.is_empty() {
                    for value in values {
                        if !value.is_empty() && !definition.values.iter().any(|v| v == value) {
                            findings.push(ValidationError::TagIllegalValue {
                                value: value.to_string(),
                                tag: definition.tag_name.clone(),
                                file: tag_file.to_string(),
                                allowed: definition.values.join(", "),
                            });
                        }
                    }
                }
            }
        }
        // Files that must exist even without individual tag definitions.
        for required in &self.profile.tag_files_required {
            if self.profile.tags_for_file(required).is_empty()
                && !self.files.contains_key(required.as_str())
            {
                findings.push(ValidationError::TagFileMissing(required.clone()));
            }
        }
        self.record_all(findings);
    }

    fn record(&mut self, error: ValidationError) {
        self.observer.on_error(&error);
        self.errors.push(error);
    }

    fn record_all(&mut self, errors: Vec<ValidationError>) {
        for error in errors {
            self.record(error);
        }
    }

    fn finish(self) -> ValidationReport {
        self.observer.on_end(&self.errors);
        let (payload_bytes, payload_files) = self.payload_totals();
        ValidationReport {
            errors: self.errors,
            files: self.files,
            payload_bytes,
            payload_files,
        }
    }
}

fn compile_globs(patterns: &[&str]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut any = false;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                any = true;
            }
            Err(err) => warn!(pattern, %err, "Skipping invalid tag file pattern"),
        }
    }
    if !any {
        return None;
    }
    builder.build().ok()
}

fn parse_oxum(oxum: &str) -> Option<(u64, u64)> {
    let (bytes, count) = oxum.trim().split_once('.')?;
    Some((bytes.parse().ok()?, count.parse().ok()?))
}
