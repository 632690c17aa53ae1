//! Conversion between internal profiles and the community "standard"
//! BagIt profile JSON schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::digest::{Algorithm, ALL_ALGORITHMS};
use crate::profile::{Profile, ProfileInfo, Serialization, TagDefinition, BAGIT_TXT, BAG_INFO_TXT};

#[derive(Debug, thiserror::Error)]
pub enum StandardError {
    #[error("invalid standard profile JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The community schema's top-level shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardProfile {
    #[serde(rename = "BagIt-Profile-Info", default, skip_serializing_if = "Map::is_empty")]
    pub profile_info: Map<String, Value>,
    #[serde(rename = "Accept-BagIt-Version", default, skip_serializing_if = "Vec::is_empty")]
    pub accept_bagit_version: Vec<String>,
    #[serde(rename = "Accept-Serialization", default, skip_serializing_if = "Vec::is_empty")]
    pub accept_serialization: Vec<String>,
    #[serde(rename = "Allow-Fetch.txt", default, skip_serializing_if = "Option::is_none")]
    pub allow_fetch_txt: Option<bool>,
    #[serde(rename = "Serialization", default, skip_serializing_if = "Option::is_none")]
    pub serialization: Option<String>,
    #[serde(rename = "Manifests-Required", default)]
    pub manifests_required: Vec<String>,
    #[serde(rename = "Manifests-Allowed", default, skip_serializing_if = "Vec::is_empty")]
    pub manifests_allowed: Vec<String>,
    #[serde(rename = "Tag-Manifests-Required", default)]
    pub tag_manifests_required: Vec<String>,
    #[serde(rename = "Tag-Manifests-Allowed", default, skip_serializing_if = "Vec::is_empty")]
    pub tag_manifests_allowed: Vec<String>,
    #[serde(rename = "Tag-Files-Allowed", default, skip_serializing_if = "Vec::is_empty")]
    pub tag_files_allowed: Vec<String>,
    #[serde(rename = "Tag-Files-Required", default, skip_serializing_if = "Vec::is_empty")]
    pub tag_files_required: Vec<String>,
    #[serde(rename = "Bag-Info", default, skip_serializing_if = "Map::is_empty")]
    pub bag_info: Map<String, Value>,
}

/// Per-tag rules under `Bag-Info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardTag {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Import a standard-schema JSON document into an internal profile.
///
/// The profile starts from the built-in default tag set; `Bag-Info` keys
/// mutate existing definitions and append new ones.
pub fn import(json: &str, name: &str) -> Result<Profile, StandardError> {
    let standard: StandardProfile = serde_json::from_str(json)?;

    let mut profile = Profile::baseline().copy_of(name);
    let identifier = info_field(&standard.profile_info, "BagIt-Profile-Identifier");
    profile.description = format!(
        "Imported from {}",
        identifier.as_deref().unwrap_or("standard profile JSON")
    );

    if !standard.accept_bagit_version.is_empty() {
        profile.accept_bag_it_version = standard.accept_bagit_version.clone();
    }
    profile.accept_serialization = standard.accept_serialization.clone();
    profile.allow_fetch_txt = standard.allow_fetch_txt.unwrap_or(true);
    profile.serialization = match standard.serialization.as_deref() {
        Some("required") => Serialization::Required,
        Some("forbidden") => Serialization::Forbidden,
        _ => Serialization::Optional,
    };

    profile.manifests_required = parse_algorithms(&standard.manifests_required);
    profile.manifests_allowed = if standard.manifests_allowed.is_empty() {
        ALL_ALGORITHMS.into_iter().collect()
    } else {
        parse_algorithms(&standard.manifests_allowed)
    };
    profile.tag_manifests_required = parse_algorithms(&standard.tag_manifests_required);
    profile.tag_manifests_allowed = if standard.tag_manifests_allowed.is_empty() {
        ALL_ALGORITHMS.into_iter().collect()
    } else {
        parse_algorithms(&standard.tag_manifests_allowed)
    };
    profile.tag_files_allowed = if standard.tag_files_allowed.is_empty() {
        vec!["*".to_string()]
    } else {
        standard.tag_files_allowed.clone()
    };
    profile.tag_files_required = standard.tag_files_required.clone();

    if !standard.profile_info.is_empty() {
        profile.info = Some(ProfileInfo {
            bag_it_profile_identifier: identifier.unwrap_or_default(),
            source_organization: info_field(&standard.profile_info, "Source-Organization")
                .unwrap_or_default(),
            contact_name: info_field(&standard.profile_info, "Contact-Name").unwrap_or_default(),
            contact_email: info_field(&standard.profile_info, "Contact-Email").unwrap_or_default(),
            external_description: info_field(&standard.profile_info, "External-Description")
                .unwrap_or_default(),
            version: info_field(&standard.profile_info, "Version").unwrap_or_default(),
        });
    }

    for (tag_name, value) in &standard.bag_info {
        let rules: StandardTag = serde_json::from_value(value.clone()).unwrap_or_default();
        let index = profile
            .tags
            .iter()
            .position(|t| t.tag_file == BAG_INFO_TXT && t.tag_name == *tag_name)
            .unwrap_or_else(|| {
                profile.tags.push(TagDefinition::new(BAG_INFO_TXT, tag_name));
                profile.tags.len() - 1
            });
        let tag = &mut profile.tags[index];
        tag.required = rules.required;
        tag.empty_ok = !rules.required;
        tag.values = rules.values.clone();
        if rules.values.len() == 1 {
            tag.default_value = Some(rules.values[0].clone());
        }
    }

    Ok(profile)
}

/// Export an internal profile to the standard schema.
///
/// Two lossy cases are inherent to the schema: required tags outside
/// bag-info.txt surface only as `Tag-Files-Required` entries, and bagit.txt
/// tags are omitted from the `Bag-Info` block entirely.
pub fn export(profile: &Profile) -> StandardProfile {
    let mut standard = StandardProfile {
        accept_bagit_version: profile.accept_bag_it_version.clone(),
        accept_serialization: profile.accept_serialization.clone(),
        allow_fetch_txt: Some(profile.allow_fetch_txt),
        serialization: Some(
            match profile.serialization {
                Serialization::Required => "required",
                Serialization::Optional => "optional",
                Serialization::Forbidden => "forbidden",
            }
            .to_string(),
        ),
        manifests_required: algorithm_names(&profile.manifests_required),
        manifests_allowed: algorithm_names(&profile.manifests_allowed),
        tag_manifests_required: algorithm_names(&profile.tag_manifests_required),
        tag_manifests_allowed: algorithm_names(&profile.tag_manifests_allowed),
        tag_files_allowed: profile.tag_files_allowed.clone(),
        tag_files_required: profile.tag_files_required.clone(),
        ..StandardProfile::default()
    };

    if let Some(info) = &profile.info {
        let mut map = Map::new();
        for (key, value) in [
            ("BagIt-Profile-Identifier", &info.bag_it_profile_identifier),
            ("Source-Organization", &info.source_organization),
            ("Contact-Name", &info.contact_name),
            ("Contact-Email", &info.contact_email),
            ("External-Description", &info.external_description),
            ("Version", &info.version),
        ] {
            if !value.is_empty() {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        standard.profile_info = map;
    }

    for tag in &profile.tags {
        if tag.tag_file == BAGIT_TXT {
            continue;
        }
        if tag.tag_file == BAG_INFO_TXT {
            let rules = StandardTag {
                required: tag.required,
                values: tag.values.clone(),
                description: None,
            };
            standard.bag_info.insert(
                tag.tag_name.clone(),
                serde_json::to_value(rules).unwrap_or(Value::Null),
            );
        } else if tag.required && !standard.tag_files_required.contains(&tag.tag_file) {
            standard.tag_files_required.push(tag.tag_file.clone());
        }
    }

    standard
}

pub fn export_json(profile: &Profile) -> Result<String, StandardError> {
    Ok(serde_json::to_string_pretty(&export(profile))?)
}

fn parse_algorithms(names: &[String]) -> std::collections::BTreeSet<Algorithm> {
    names
        .iter()
        .filter_map(|name| {
            let resolved = Algorithm::from_name(&name.to_ascii_lowercase());
            if resolved.is_none() {
                warn!(algorithm = %name, "Skipping unsupported digest algorithm");
            }
            resolved
        })
        .collect()
}

fn algorithm_names(set: &std::collections::BTreeSet<Algorithm>) -> Vec<String> {
    set.iter().map(|a| a.name().to_string()).collect()
}

fn info_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.as_str()).map(str::to_string)
}
