//! Bag write → validate round-trips in both container shapes.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use satchel::{
    Algorithm, BagSource, Bagger, EngineConfig, NoopObserver, Profile, Validator,
};

fn write_sources(dir: &Path) -> Vec<BagSource> {
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("one.txt"), "first payload file").unwrap();
    fs::write(dir.join("two.bin"), [7u8; 1024]).unwrap();
    fs::write(dir.join("nested/three.txt"), "deeper").unwrap();
    vec![
        BagSource::new(dir.join("one.txt"), "one.txt"),
        BagSource::new(dir.join("two.bin"), "two.bin"),
        BagSource::new(dir.join("nested/three.txt"), "nested/three.txt"),
    ]
}

fn validate(profile: &Profile, bag: &Path) -> satchel::ValidationReport {
    let config = EngineConfig::default();
    Validator::new(profile, &config, &NoopObserver).validate(bag)
}

#[test]
fn directory_bag_validates_clean() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let profile = Profile::baseline();
    let config = EngineConfig::default();

    let bag_path = tmp.path().join("mybag");
    let outcome = Bagger::new(&profile, &config, &NoopObserver)
        .write(&bag_path, &sources)
        .unwrap();

    assert_eq!(outcome.payload_files, 3);
    assert!(bag_path.join("bagit.txt").is_file());
    assert!(bag_path.join("bag-info.txt").is_file());
    assert!(bag_path.join("manifest-sha256.txt").is_file());
    assert!(bag_path.join("data/one.txt").is_file());

    let report = validate(&profile, &bag_path);
    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.payload_files, 3);
}

#[test]
fn tar_bag_validates_clean() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let mut profile = Profile::baseline();
    profile.tar_dir_must_match_name = true;
    let config = EngineConfig::default();

    let bag_path = tmp.path().join("mybag.tar");
    let (outcome, report) = Bagger::new(&profile, &config, &NoopObserver)
        .write_validated(&bag_path, &sources)
        .unwrap();

    assert_eq!(outcome.payload_files, 3);
    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.payload_bytes, outcome.payload_bytes);
}

#[test]
fn tag_manifests_cover_tag_files_and_manifests() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let mut profile = Profile::baseline();
    profile.tag_manifests_required = BTreeSet::from([Algorithm::Sha256]);
    let config = EngineConfig::default();

    let bag_path = tmp.path().join("covered");
    Bagger::new(&profile, &config, &NoopObserver)
        .write(&bag_path, &sources)
        .unwrap();

    let tag_manifest = fs::read_to_string(bag_path.join("tagmanifest-sha256.txt")).unwrap();
    assert!(tag_manifest.contains(" bagit.txt"));
    assert!(tag_manifest.contains(" bag-info.txt"));
    assert!(tag_manifest.contains(" manifest-sha256.txt"));
    assert!(!tag_manifest.contains("tagmanifest"));
    assert!(!tag_manifest.contains(" data/"));

    let report = validate(&profile, &bag_path);
    assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
}

#[test]
fn repeated_bagging_yields_identical_manifests() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let profile = Profile::baseline();
    let config = EngineConfig::default();
    let bagger = Bagger::new(&profile, &config, &NoopObserver);

    let first = tmp.path().join("first");
    let second = tmp.path().join("second");
    bagger.write(&first, &sources).unwrap();
    bagger.write(&second, &sources).unwrap();

    let manifest_a = fs::read(first.join("manifest-sha256.txt")).unwrap();
    let manifest_b = fs::read(second.join("manifest-sha256.txt")).unwrap();
    assert_eq!(manifest_a, manifest_b);
    assert!(!manifest_a.is_empty());

    // Entries are sorted by path.
    let text = String::from_utf8(manifest_a).unwrap();
    let paths: Vec<&str> = text
        .lines()
        .filter_map(|l| l.split_once(' ').map(|(_, p)| p))
        .collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
}

#[test]
fn missing_source_is_terminal() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let config = EngineConfig::default();

    let sources = vec![BagSource::new(
        PathBuf::from(tmp.path().join("nope.txt")),
        "nope.txt",
    )];
    let err = Bagger::new(&profile, &config, &NoopObserver)
        .write(&tmp.path().join("bag"), &sources)
        .unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn required_tag_without_value_is_terminal() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let mut profile = Profile::baseline();
    {
        let tag = profile
            .find_tag_mut(satchel::BAG_INFO_TXT, "Source-Organization")
            .unwrap();
        tag.required = true;
        tag.empty_ok = false;
    }
    let config = EngineConfig::default();

    let err = Bagger::new(&profile, &config, &NoopObserver)
        .write(&tmp.path().join("bag"), &sources)
        .unwrap_err();
    assert!(err.to_string().contains("Source-Organization"));
}

#[test]
fn payload_digests_match_file_contents() {
    let tmp = tempfile::tempdir().unwrap();
    let sources = write_sources(&tmp.path().join("src"));
    let profile = Profile::baseline();
    let config = EngineConfig::default();

    let bag_path = tmp.path().join("digests");
    Bagger::new(&profile, &config, &NoopObserver)
        .write(&bag_path, &sources)
        .unwrap();

    let manifest = fs::read_to_string(bag_path.join("manifest-sha256.txt")).unwrap();
    for line in manifest.lines() {
        let (digest, rel) = line.split_once(' ').unwrap();
        let mut hasher = satchel::Hasher::new(Algorithm::Sha256);
        hasher.update(&fs::read(bag_path.join(rel)).unwrap());
        assert_eq!(hasher.finish(), digest, "digest mismatch for {rel}");
    }
}
