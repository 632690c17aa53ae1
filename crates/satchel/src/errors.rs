//! Error kinds surfaced by the engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::digest::Algorithm;

/// Machine-readable classification of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProfileInvalid,
    IoMissing,
    IoRead,
    SerializationViolation,
    UntarNameMismatch,
    ManifestMissing,
    ManifestNotAllowed,
    TagFileNotAllowed,
    PayloadMissingInManifest,
    FileMissingInBag,
    ChecksumMismatch,
    OxumMismatch,
    TagMissing,
    TagEmpty,
    TagIllegalValue,
    VersionMismatch,
    FetchNotAllowed,
}

/// A single validation finding.
///
/// Findings are data, not control flow: the validator accumulates them and
/// completes the run. Only a handful of kinds abort later phases.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Profile is invalid: {0}")]
    ProfileInvalid(String),

    #[error("Bag does not exist at {0}")]
    BagMissing(String),

    #[error("Error reading bag: {0}")]
    ReadFailed(String),

    #[error("Serialization is required, but bag is a directory")]
    SerializationRequired,

    #[error("Serialization is forbidden, but bag is a single file")]
    SerializationForbidden,

    #[error("Unknown serialization type for format {extension}.")]
    SerializationUnknownFormat { extension: String },

    #[error("Serialization format {extension} is not in the accepted list ({accepted})")]
    SerializationNotAccepted { extension: String, accepted: String },

    #[error("Bag should untar to directory '{expected}', not '{actual}'")]
    UntarNameMismatch { expected: String, actual: String },

    #[error("Required manifest '{0}' is missing.")]
    ManifestMissing(String),

    #[error("Required tag manifest '{0}' is missing.")]
    TagManifestMissing(String),

    #[error("Manifest '{manifest}' uses algorithm '{algorithm}', which the profile does not allow.")]
    ManifestNotAllowed { manifest: String, algorithm: String },

    #[error("Tag file '{file}' does not match any allowed pattern ({patterns})")]
    TagFileNotAllowed { file: String, patterns: String },

    #[error("Payload file {file} not found in {manifest}")]
    PayloadMissingInManifest { file: String, manifest: String },

    #[error("File '{file}' in {manifest} is missing from bag.")]
    FileMissingInBag { file: String, manifest: String },

    #[error(
        "Bad {algorithm} digest for '{file}': manifest says '{expected}', file digest is '{actual}'."
    )]
    ChecksumMismatch {
        algorithm: Algorithm,
        file: String,
        expected: String,
        actual: String,
    },

    #[error("Payload-Oxum says {expected} bytes, but payload totals {actual} bytes.")]
    OxumByteMismatch { expected: u64, actual: u64 },

    #[error("Payload-Oxum says {expected} files, but payload has {actual} files.")]
    OxumFileMismatch { expected: u64, actual: u64 },

    #[error("Required tag file '{0}' is missing.")]
    TagFileMissing(String),

    #[error("Tag file '{0}' has no data.")]
    TagFileHasNoData(String),

    #[error("Required tag '{tag}' is missing from file '{file}'.")]
    TagMissing { tag: String, file: String },

    #[error("Tag '{tag}' in file '{file}' cannot be empty.")]
    TagEmpty { tag: String, file: String },

    #[error("Value '{value}' for tag '{tag}' in '{file}' is not in the list of allowed values ({allowed})")]
    TagIllegalValue {
        value: String,
        tag: String,
        file: String,
        allowed: String,
    },

    #[error("BagIt version {version} in bagit.txt does not match allowed version(s) {allowed}")]
    VersionMismatch { version: String, allowed: String },

    #[error("Required BagIt-Version tag is missing from bagit.txt")]
    VersionMissing,

    #[error("Found fetch.txt, which the profile does not allow.")]
    FetchNotAllowed,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::ProfileInvalid(_) => ErrorKind::ProfileInvalid,
            ValidationError::BagMissing(_) => ErrorKind::IoMissing,
            ValidationError::ReadFailed(_) => ErrorKind::IoRead,
            ValidationError::SerializationRequired
            | ValidationError::SerializationForbidden
            | ValidationError::SerializationUnknownFormat { .. }
            | ValidationError::SerializationNotAccepted { .. } => {
                ErrorKind::SerializationViolation
            }
            ValidationError::UntarNameMismatch { .. } => ErrorKind::UntarNameMismatch,
            ValidationError::ManifestMissing(_) | ValidationError::TagManifestMissing(_) => {
                ErrorKind::ManifestMissing
            }
            ValidationError::ManifestNotAllowed { .. } => ErrorKind::ManifestNotAllowed,
            ValidationError::TagFileNotAllowed { .. } => ErrorKind::TagFileNotAllowed,
            ValidationError::PayloadMissingInManifest { .. } => {
                ErrorKind::PayloadMissingInManifest
            }
            ValidationError::FileMissingInBag { .. } => ErrorKind::FileMissingInBag,
            ValidationError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            ValidationError::OxumByteMismatch { .. } | ValidationError::OxumFileMismatch { .. } => {
                ErrorKind::OxumMismatch
            }
            ValidationError::TagFileMissing(_) => ErrorKind::TagMissing,
            ValidationError::TagFileHasNoData(_) => ErrorKind::TagEmpty,
            ValidationError::TagMissing { .. } => ErrorKind::TagMissing,
            ValidationError::TagEmpty { .. } => ErrorKind::TagEmpty,
            ValidationError::TagIllegalValue { .. } => ErrorKind::TagIllegalValue,
            ValidationError::VersionMismatch { .. } | ValidationError::VersionMissing => {
                ErrorKind::VersionMismatch
            }
            ValidationError::FetchNotAllowed => ErrorKind::FetchNotAllowed,
        }
    }
}

/// Terminal failures while composing a bag.
#[derive(Debug, Error)]
pub enum BagError {
    #[error("Source file {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("Required tag '{tag}' in {file} has no value")]
    MissingTagValue { tag: String, file: String },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read source {path}: {source}")]
    SourceReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
