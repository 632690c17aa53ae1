//! Declarative BagIt profiles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::{Algorithm, ALL_ALGORITHMS};

pub const BAGIT_TXT: &str = "bagit.txt";
pub const BAG_INFO_TXT: &str = "bag-info.txt";

/// Whether a bag must, may, or must not be a single serialized file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serialization {
    Required,
    #[default]
    Optional,
    Forbidden,
}

/// Descriptive metadata carried by the standard profile schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileInfo {
    pub bag_it_profile_identifier: String,
    pub source_organization: String,
    pub contact_name: String,
    pub contact_email: String,
    pub external_description: String,
    pub version: String,
}

/// A rule for one tag in one tag file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagDefinition {
    /// Relative path of the tag file this tag lives in.
    pub tag_file: String,
    pub tag_name: String,
    pub required: bool,
    pub empty_ok: bool,
    /// Legal values; empty means free-form.
    pub values: Vec<String>,
    pub default_value: Option<String>,
    pub user_value: Option<String>,
    pub is_built_in: bool,
    pub is_user_added_file: bool,
    pub is_user_added_tag: bool,
    pub was_added_for_job: bool,
}

impl TagDefinition {
    pub fn new(tag_file: impl Into<String>, tag_name: impl Into<String>) -> Self {
        TagDefinition {
            tag_file: tag_file.into(),
            tag_name: tag_name.into(),
            empty_ok: true,
            ..TagDefinition::default()
        }
    }

    fn built_in(tag_file: &str, tag_name: &str) -> Self {
        TagDefinition {
            is_built_in: true,
            ..TagDefinition::new(tag_file, tag_name)
        }
    }

    /// The value the bagger writes: user value first, then the default.
    pub fn effective_value(&self) -> Option<&str> {
        self.user_value
            .as_deref()
            .or(self.default_value.as_deref())
    }
}

/// A declarative rule set specializing BagIt for a community.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_built_in: bool,
    /// Accepted BagIt version strings.
    pub accept_bag_it_version: Vec<String>,
    /// Acceptable serialization MIME types, in preference order.
    pub accept_serialization: Vec<String>,
    pub serialization: Serialization,
    pub allow_fetch_txt: bool,
    pub manifests_required: BTreeSet<Algorithm>,
    pub manifests_allowed: BTreeSet<Algorithm>,
    pub tag_manifests_required: BTreeSet<Algorithm>,
    pub tag_manifests_allowed: BTreeSet<Algorithm>,
    /// Glob patterns for acceptable tag files; `["*"]` accepts any.
    pub tag_files_allowed: Vec<String>,
    /// Tag files that must exist even when no individual tag in them is
    /// defined.
    pub tag_files_required: Vec<String>,
    pub tar_dir_must_match_name: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ProfileInfo>,
    pub tags: Vec<TagDefinition>,
}

impl Profile {
    /// A fresh, minimally well-formed profile.
    pub fn new(name: impl Into<String>) -> Self {
        let mut tags = bagit_txt_defaults();
        tags.push(TagDefinition::built_in(BAG_INFO_TXT, "Source-Organization"));
        Profile {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            accept_bag_it_version: vec!["0.97".into(), "1.0".into()],
            accept_serialization: vec!["application/tar".into()],
            allow_fetch_txt: false,
            manifests_required: BTreeSet::from([Algorithm::Sha256]),
            manifests_allowed: ALL_ALGORITHMS.into_iter().collect(),
            tag_manifests_allowed: ALL_ALGORITHMS.into_iter().collect(),
            tag_files_allowed: vec!["*".into()],
            tags,
            ..Profile::default()
        }
    }

    /// The built-in default profile shipped with the tool.
    pub fn baseline() -> Self {
        let mut profile = Profile::new("Baseline");
        profile.description =
            "Default profile accepting tarred and untarred bags with sha256 manifests".into();
        profile.is_built_in = true;
        profile.accept_serialization = vec![
            "application/tar".into(),
            "application/zip".into(),
            "application/gzip".into(),
        ];
        profile.tags.retain(|t| t.tag_file != BAG_INFO_TXT);
        for name in BAG_INFO_DEFAULT_TAGS {
            profile.tags.push(TagDefinition::built_in(BAG_INFO_TXT, name));
        }
        profile
    }

    /// Copy an existing profile under a new name; copies are never built-in
    /// and get a fresh id.
    pub fn copy_of(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.name = name.into();
        copy.is_built_in = false;
        copy
    }

    /// Check the profile's own well-formedness, returning every finding.
    pub fn check(&self) -> Vec<String> {
        let mut findings = Vec::new();
        if self.id.is_empty() {
            findings.push("Profile id cannot be empty.".to_string());
        }
        if self.name.is_empty() {
            findings.push("Profile name cannot be empty.".to_string());
        }
        if self.accept_bag_it_version.is_empty() {
            findings.push("Profile must accept at least one BagIt version.".to_string());
        }
        if self.manifests_allowed.is_empty() {
            findings.push("Profile must allow at least one manifest algorithm.".to_string());
        } else if !self.manifests_required.is_subset(&self.manifests_allowed) {
            findings.push(
                "Required manifest algorithms must all be in the allowed set.".to_string(),
            );
        }
        if self.tag_manifests_allowed.is_empty() {
            findings.push("Profile must allow at least one tag manifest algorithm.".to_string());
        } else if !self
            .tag_manifests_required
            .is_subset(&self.tag_manifests_allowed)
        {
            findings.push(
                "Required tag manifest algorithms must all be in the allowed set.".to_string(),
            );
        }
        for required in ["BagIt-Version", "Tag-File-Character-Encoding"] {
            if self.find_tag(BAGIT_TXT, required).is_none() {
                findings.push(format!("Profile must define the {required} tag in bagit.txt."));
            }
        }
        if !self.tags.iter().any(|t| t.tag_file == BAG_INFO_TXT) {
            findings.push("Profile must define tags for bag-info.txt.".to_string());
        }
        for tag in &self.tags {
            if let Some(value) = tag.user_value.as_deref() {
                if !tag.values.is_empty() && !tag.values.iter().any(|v| v == value) {
                    findings.push(format!(
                        "Value '{value}' for tag '{}' in '{}' is not in the list of allowed values.",
                        tag.tag_name, tag.tag_file
                    ));
                }
            }
        }
        findings
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_empty()
    }

    /// Tag definitions for one tag file, in definition order.
    pub fn tags_for_file(&self, tag_file: &str) -> Vec<&TagDefinition> {
        self.tags.iter().filter(|t| t.tag_file == tag_file).collect()
    }

    /// Distinct tag files with definitions, in first-definition order.
    pub fn tag_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for tag in &self.tags {
            if !files.contains(&tag.tag_file.as_str()) {
                files.push(&tag.tag_file);
            }
        }
        files
    }

    pub fn find_tag(&self, tag_file: &str, tag_name: &str) -> Option<&TagDefinition> {
        self.tags
            .iter()
            .find(|t| t.tag_file == tag_file && t.tag_name == tag_name)
    }

    pub fn find_tag_mut(&mut self, tag_file: &str, tag_name: &str) -> Option<&mut TagDefinition> {
        self.tags
            .iter_mut()
            .find(|t| t.tag_file == tag_file && t.tag_name == tag_name)
    }

    /// Set a user value, creating the definition when it does not exist.
    pub fn set_tag_value(
        &mut self,
        tag_file: &str,
        tag_name: &str,
        value: impl Into<String>,
    ) -> &mut TagDefinition {
        let index = self
            .tags
            .iter()
            .position(|t| t.tag_file == tag_file && t.tag_name == tag_name)
            .unwrap_or_else(|| {
                let mut tag = TagDefinition::new(tag_file, tag_name);
                tag.is_user_added_tag = true;
                self.tags.push(tag);
                self.tags.len() - 1
            });
        let tag = &mut self.tags[index];
        tag.user_value = Some(value.into());
        tag
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn bagit_txt_defaults() -> Vec<TagDefinition> {
    let mut version = TagDefinition::built_in(BAGIT_TXT, "BagIt-Version");
    version.required = true;
    version.empty_ok = false;
    version.default_value = Some("1.0".into());
    let mut encoding = TagDefinition::built_in(BAGIT_TXT, "Tag-File-Character-Encoding");
    encoding.required = true;
    encoding.empty_ok = false;
    encoding.default_value = Some("UTF-8".into());
    vec![version, encoding]
}

/// Default bag-info.txt tag set for the built-in profile.
const BAG_INFO_DEFAULT_TAGS: [&str; 15] = [
    "Source-Organization",
    "Organization-Address",
    "Contact-Name",
    "Contact-Phone",
    "Contact-Email",
    "External-Description",
    "External-Identifier",
    "Internal-Sender-Description",
    "Internal-Sender-Identifier",
    "Bag-Group-Identifier",
    "Bag-Count",
    "Bagging-Date",
    "Bagging-Software",
    "Payload-Oxum",
    "Bag-Size",
];
