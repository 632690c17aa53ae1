//! Serialization-format detection for serialized bags.

use std::path::Path;

use regex::Regex;

/// Maps serialization MIME types to filename patterns.
///
/// The built-in set covers the formats profiles commonly accept; hosts may
/// register more.
pub struct FormatRegistry {
    formats: Vec<(String, Regex)>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        let mut registry = FormatRegistry {
            formats: Vec::new(),
        };
        for (mime, pattern) in [
            ("application/tar", r"\.tar$"),
            ("application/zip", r"\.zip$"),
            ("application/gzip", r"\.gzip$|\.gz$"),
            ("application/tar+gzip", r"\.tgz$|\.tar\.gz$"),
            ("application/x-7z-compressed", r"\.7z$"),
            ("application/x-rar", r"\.rar$"),
        ] {
            registry.register(mime, pattern);
        }
        registry
    }

    /// Register a MIME type pattern; invalid patterns are a programming
    /// error and panic.
    pub fn register(&mut self, mime: impl Into<String>, pattern: &str) {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("invalid format pattern");
        self.formats.push((mime.into(), regex));
    }

    /// MIME types whose pattern matches the file name.
    pub fn mime_types_for(&self, path: &Path) -> Vec<&str> {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.formats
            .iter()
            .filter(|(_, regex)| regex.is_match(&name))
            .map(|(mime, _)| mime.as_str())
            .collect()
    }

    /// Whether the file's format is among the accepted MIME types.
    pub fn is_accepted(&self, path: &Path, accepted: &[String]) -> bool {
        self.mime_types_for(path)
            .iter()
            .any(|mime| accepted.iter().any(|a| a == mime))
    }

    /// Whether any registered pattern recognizes the file at all.
    pub fn is_known(&self, path: &Path) -> bool {
        !self.mime_types_for(path).is_empty()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
