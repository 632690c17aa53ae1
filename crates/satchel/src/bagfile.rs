//! Per-file model for bag contents.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::digest::Algorithm;
use crate::kv::KeyValueCollection;

fn manifest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^manifest-(\w+)\.txt$").unwrap())
}

fn tag_manifest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tagmanifest-(\w+)\.txt$").unwrap())
}

/// What a file is, judged from its bag-root-relative path.
///
/// Manifest roles carry the algorithm name from the filename; resolution
/// against the supported set happens at the use site, so a manifest written
/// with an unrecognized algorithm is still representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRole {
    Payload,
    PayloadManifest { algorithm: String },
    TagManifest { algorithm: String },
    Tag,
}

impl FileRole {
    /// Classify a forward-slashed, bag-root-relative path.
    pub fn classify(rel_path: &str) -> FileRole {
        if let Some(caps) = manifest_re().captures(rel_path) {
            return FileRole::PayloadManifest {
                algorithm: caps[1].to_ascii_lowercase(),
            };
        }
        if let Some(caps) = tag_manifest_re().captures(rel_path) {
            return FileRole::TagManifest {
                algorithm: caps[1].to_ascii_lowercase(),
            };
        }
        if rel_path.starts_with("data/") {
            return FileRole::Payload;
        }
        FileRole::Tag
    }

    pub fn is_payload(&self) -> bool {
        matches!(self, FileRole::Payload)
    }

    pub fn is_payload_manifest(&self) -> bool {
        matches!(self, FileRole::PayloadManifest { .. })
    }

    pub fn is_tag_manifest(&self) -> bool {
        matches!(self, FileRole::TagManifest { .. })
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, FileRole::Tag)
    }

    /// The manifest algorithm name, for either manifest role.
    pub fn manifest_algorithm(&self) -> Option<&str> {
        match self {
            FileRole::PayloadManifest { algorithm } | FileRole::TagManifest { algorithm } => {
                Some(algorithm)
            }
            _ => None,
        }
    }
}

/// One file encountered in a bag, alive for the duration of a validation or
/// bagging run.
#[derive(Debug, Clone)]
pub struct BagItFile {
    /// Forward-slashed, bag-root-relative path.
    pub rel_path: String,
    pub role: FileRole,
    pub size: u64,
    /// Digests computed from the bytes the reader emitted, by algorithm.
    pub checksums: BTreeMap<Algorithm, String>,
    /// Parsed contents, for manifests and textual tag files.
    pub parsed: Option<KeyValueCollection>,
}

impl BagItFile {
    pub fn new(rel_path: impl Into<String>, size: u64) -> Self {
        let rel_path = rel_path.into();
        let role = FileRole::classify(&rel_path);
        BagItFile {
            rel_path,
            role,
            size,
            checksums: BTreeMap::new(),
            parsed: None,
        }
    }

    pub fn checksum(&self, algorithm: Algorithm) -> Option<&str> {
        self.checksums.get(&algorithm).map(String::as_str)
    }

    /// Whether the multi-digest pipeline should parse this file's contents.
    pub fn wants_parse(&self) -> bool {
        match self.role {
            FileRole::PayloadManifest { .. } | FileRole::TagManifest { .. } => true,
            FileRole::Tag => self.rel_path.ends_with(".txt"),
            FileRole::Payload => false,
        }
    }
}
