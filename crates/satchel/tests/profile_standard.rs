//! Standard profile JSON import scenarios.

use std::collections::BTreeSet;

use satchel::{standard, Algorithm, Serialization, BAG_INFO_TXT};

const DISK_IMAGES: &str = include_str!("fixtures/disk-images-profile.json");

#[test]
fn disk_images_profile_imports() {
    let profile = standard::import(DISK_IMAGES, "Disk Images").unwrap();

    assert_eq!(profile.name, "Disk Images");
    assert_eq!(
        profile.description,
        "Imported from http://www.library.yale.edu/mssa/bagitprofiles/disk_images.json"
    );
    assert_eq!(
        profile.accept_serialization,
        vec!["application/zip", "application/tar"]
    );
    assert!(!profile.allow_fetch_txt);
    assert_eq!(profile.serialization, Serialization::Required);
    assert_eq!(profile.accept_bag_it_version, vec!["0.96", "0.97"]);
    assert_eq!(
        profile.manifests_required,
        BTreeSet::from([Algorithm::Md5])
    );
    assert_eq!(profile.tags.len(), 17);

    let org = profile.find_tag(BAG_INFO_TXT, "Source-Organization").unwrap();
    assert!(org.required);
    assert_eq!(
        org.values,
        vec!["Simon Fraser University", "York University"]
    );

    assert!(profile.is_valid(), "{:?}", profile.check());
}

#[test]
fn disk_images_profile_round_trips() {
    let original = standard::import(DISK_IMAGES, "Disk Images").unwrap();
    let exported = standard::export_json(&original).unwrap();
    let back = standard::import(&exported, "Disk Images").unwrap();

    assert_eq!(back.accept_bag_it_version, original.accept_bag_it_version);
    assert_eq!(back.accept_serialization, original.accept_serialization);
    assert_eq!(back.serialization, original.serialization);
    assert_eq!(back.allow_fetch_txt, original.allow_fetch_txt);
    assert_eq!(back.manifests_required, original.manifests_required);
    assert_eq!(back.tag_manifests_required, original.tag_manifests_required);
    assert_eq!(back.tags, original.tags);
}

#[test]
fn exported_profile_keeps_profile_info() {
    let original = standard::import(DISK_IMAGES, "Disk Images").unwrap();
    let exported = standard::export_json(&original).unwrap();
    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();

    assert_eq!(
        value["BagIt-Profile-Info"]["BagIt-Profile-Identifier"],
        "http://www.library.yale.edu/mssa/bagitprofiles/disk_images.json"
    );
    assert_eq!(
        value["Bag-Info"]["Source-Organization"]["required"],
        serde_json::Value::Bool(true)
    );
    // bagit.txt tags are never expressible in the standard schema.
    assert!(value["Bag-Info"].get("BagIt-Version").is_none());
}
