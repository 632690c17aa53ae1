//! Validation failure scenarios against deliberately damaged bags.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use satchel::{
    Algorithm, BagSource, Bagger, EngineConfig, ErrorKind, NoopObserver, Profile, Serialization,
    ValidationReport, Validator, BAG_INFO_TXT,
};

fn write_sources(dir: &Path) -> Vec<BagSource> {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("one.txt"), "first payload file").unwrap();
    fs::write(dir.join("two.txt"), "second payload file").unwrap();
    vec![
        BagSource::new(dir.join("one.txt"), "one.txt"),
        BagSource::new(dir.join("two.txt"), "two.txt"),
    ]
}

fn build_bag(tmp: &Path, profile: &Profile, name: &str) -> PathBuf {
    let sources = write_sources(&tmp.join("src"));
    let bag_path = tmp.join(name);
    Bagger::new(profile, &EngineConfig::default(), &NoopObserver)
        .write(&bag_path, &sources)
        .unwrap();
    bag_path
}

fn validate(profile: &Profile, bag: &Path) -> ValidationReport {
    let config = EngineConfig::default();
    Validator::new(profile, &config, &NoopObserver).validate(bag)
}

/// Swap the Payload-Oxum line in bag-info.txt for a bogus one.
fn patch_oxum(bag: &Path, replacement: Option<&str>) {
    let info_path = bag.join("bag-info.txt");
    let text = fs::read_to_string(&info_path).unwrap();
    let patched: Vec<String> = text
        .lines()
        .filter_map(|line| {
            if line.starts_with("Payload-Oxum:") {
                replacement.map(|r| format!("Payload-Oxum: {r}"))
            } else {
                Some(line.to_string())
            }
        })
        .collect();
    fs::write(&info_path, patched.join("\n") + "\n").unwrap();
}

#[test]
fn oxum_mismatch_reports_bytes_and_count() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    patch_oxum(&bag, Some("1.1"));

    let report = validate(&profile, &bag);
    assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
    assert!(report
        .errors
        .iter()
        .all(|e| e.kind() == ErrorKind::OxumMismatch));
}

#[test]
fn extraneous_payload_is_reported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    // The extra file changes the payload totals, so the recorded oxum has
    // to go; the scenario is about manifest coverage alone.
    patch_oxum(&bag, None);
    fs::write(bag.join("data/extra.txt"), "stowaway").unwrap();

    let report = validate(&profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(
        report.errors[0].to_string(),
        "Payload file data/extra.txt not found in manifest-sha256.txt"
    );
}

#[test]
fn renamed_tar_fails_untar_directory_check() {
    let tmp = tempfile::tempdir().unwrap();
    let mut profile = Profile::baseline();
    profile.tar_dir_must_match_name = true;

    let sources = write_sources(&tmp.path().join("src"));
    let tar_path = tmp.path().join("mybag.tar");
    Bagger::new(&profile, &EngineConfig::default(), &NoopObserver)
        .write(&tar_path, &sources)
        .unwrap();

    let renamed = tmp.path().join("other.tar");
    fs::rename(&tar_path, &renamed).unwrap();

    let report = validate(&profile, &renamed);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(
        report.errors[0].to_string(),
        "Bag should untar to directory 'other', not 'mybag'"
    );
}

#[test]
fn enumerated_tag_violation_names_the_allowed_set() {
    let tmp = tempfile::tempdir().unwrap();

    let mut write_profile = Profile::baseline();
    write_profile.set_tag_value(BAG_INFO_TXT, "Source-Organization", "Acme");
    let bag = build_bag(tmp.path(), &write_profile, "mybag");

    let mut check_profile = Profile::baseline();
    check_profile
        .find_tag_mut(BAG_INFO_TXT, "Source-Organization")
        .unwrap()
        .values = vec![
        "Simon Fraser University".to_string(),
        "York University".to_string(),
    ];

    let report = validate(&check_profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::TagIllegalValue);
    let message = report.errors[0].to_string();
    assert!(message.contains("Acme"));
    assert!(message.contains("Simon Fraser University, York University"));
}

#[test]
fn every_present_manifest_is_verified() {
    let tmp = tempfile::tempdir().unwrap();

    let mut write_profile = Profile::baseline();
    write_profile.manifests_required = BTreeSet::from([Algorithm::Md5, Algorithm::Sha256]);
    let bag = build_bag(tmp.path(), &write_profile, "mybag");

    // Corrupt one digest in the sha256 manifest.
    let manifest_path = bag.join("manifest-sha256.txt");
    let text = fs::read_to_string(&manifest_path).unwrap();
    let corrupted: Vec<String> = text
        .lines()
        .map(|line| {
            if line.ends_with("data/one.txt") {
                let flipped = if line.starts_with('0') { "1" } else { "0" };
                format!("{flipped}{}", &line[1..])
            } else {
                line.to_string()
            }
        })
        .collect();
    fs::write(&manifest_path, corrupted.join("\n") + "\n").unwrap();

    // The validating profile only requires md5; the sha256 manifest is
    // still present in the bag and must verify.
    let mut check_profile = Profile::baseline();
    check_profile.manifests_required = BTreeSet::from([Algorithm::Md5]);

    let report = validate(&check_profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::ChecksumMismatch);
    assert!(report.errors[0].to_string().contains("sha256"));
}

#[test]
fn missing_bag_is_terminal() {
    let profile = Profile::baseline();
    let report = validate(&profile, Path::new("/no/such/bag"));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind(), ErrorKind::IoMissing);
}

#[test]
fn invalid_profile_aborts_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let good = Profile::baseline();
    let bag = build_bag(tmp.path(), &good, "mybag");

    let mut bad = Profile::baseline();
    bad.name.clear();
    let report = validate(&bad, &bag);
    assert!(!report.errors.is_empty());
    assert!(report
        .errors
        .iter()
        .all(|e| e.kind() == ErrorKind::ProfileInvalid));
    assert!(report.files.is_empty(), "no phases after the self-check");
}

#[test]
fn serialization_required_rejects_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let mut profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    profile.serialization = Serialization::Required;
    let report = validate(&profile, &bag);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].to_string(),
        "Serialization is required, but bag is a directory"
    );
}

#[test]
fn serialization_forbidden_rejects_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let mut profile = Profile::baseline();
    let sources = write_sources(&tmp.path().join("src"));
    let tar_path = tmp.path().join("mybag.tar");
    Bagger::new(&profile, &EngineConfig::default(), &NoopObserver)
        .write(&tar_path, &sources)
        .unwrap();

    profile.serialization = Serialization::Forbidden;
    let report = validate(&profile, &tar_path);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind(), ErrorKind::SerializationViolation);
}

#[test]
fn serialization_format_must_be_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let mut profile = Profile::baseline();
    let sources = write_sources(&tmp.path().join("src"));
    let tar_path = tmp.path().join("mybag.tar");
    Bagger::new(&profile, &EngineConfig::default(), &NoopObserver)
        .write(&tar_path, &sources)
        .unwrap();

    profile.accept_serialization = vec!["application/zip".to_string()];
    let report = validate(&profile, &tar_path);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind(), ErrorKind::SerializationViolation);
    assert!(report.errors[0].to_string().contains(".tar"));

    // Disabling the check skips the phase entirely.
    let config = EngineConfig {
        disable_serialization_check: true,
        ..EngineConfig::default()
    };
    let report = Validator::new(&profile, &config, &NoopObserver).validate(&tar_path);
    assert!(report.is_valid(), "errors: {:?}", report.errors);
}

#[test]
fn missing_required_manifest_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    let mut check_profile = Profile::baseline();
    check_profile.manifests_required = BTreeSet::from([Algorithm::Sha256, Algorithm::Sha512]);
    let report = validate(&check_profile, &bag);
    assert!(report
        .errors
        .iter()
        .any(|e| e.to_string() == "Required manifest 'manifest-sha512.txt' is missing."));
}

#[test]
fn manifest_outside_allowed_set_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let mut write_profile = Profile::baseline();
    write_profile.manifests_required = BTreeSet::from([Algorithm::Md5, Algorithm::Sha256]);
    let bag = build_bag(tmp.path(), &write_profile, "mybag");

    let mut check_profile = Profile::baseline();
    check_profile.manifests_allowed = BTreeSet::from([Algorithm::Sha256]);
    let report = validate(&check_profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::ManifestNotAllowed);
    assert!(report.errors[0].to_string().contains("manifest-md5.txt"));
}

#[test]
fn fetch_txt_needs_permission() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");
    fs::write(bag.join("fetch.txt"), "http://example.org/x 9 data/x\n").unwrap();

    let report = validate(&profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::FetchNotAllowed);

    let mut permissive = Profile::baseline();
    permissive.allow_fetch_txt = true;
    let report = validate(&permissive, &bag);
    assert!(report.is_valid(), "errors: {:?}", report.errors);
}

#[test]
fn bagit_version_must_be_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    let mut strict = Profile::baseline();
    strict.accept_bag_it_version = vec!["0.97".to_string()];
    let report = validate(&strict, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::VersionMismatch);
    assert!(report.errors[0].to_string().contains("0.97"));
}

#[test]
fn tag_files_must_match_allowed_patterns() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");
    fs::write(bag.join("stray-notes.txt"), "Notes: hello\n").unwrap();

    let mut strict = Profile::baseline();
    strict.tag_files_allowed = vec!["bag-info.txt".to_string()];
    let report = validate(&strict, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(report.errors[0].kind(), ErrorKind::TagFileNotAllowed);
    assert!(report.errors[0].to_string().contains("stray-notes.txt"));

    // The wildcard short-circuits the check.
    let report = validate(&profile, &bag);
    assert!(report.is_valid(), "errors: {:?}", report.errors);
}

#[test]
fn required_tag_files_must_exist() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    let mut strict = Profile::baseline();
    strict.tag_files_required = vec!["custom/meta.txt".to_string()];
    let report = validate(&strict, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(
        report.errors[0].to_string(),
        "Required tag file 'custom/meta.txt' is missing."
    );
}

#[test]
fn manifest_listing_a_missing_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");
    fs::remove_file(bag.join("data/two.txt")).unwrap();
    patch_oxum(&bag, None);

    let report = validate(&profile, &bag);
    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    assert_eq!(
        report.errors[0].to_string(),
        "File 'data/two.txt' in manifest-sha256.txt is missing from bag."
    );
}

#[test]
fn cancellation_stops_before_verification() {
    let tmp = tempfile::tempdir().unwrap();
    let profile = Profile::baseline();
    let bag = build_bag(tmp.path(), &profile, "mybag");

    let config = EngineConfig::default();
    config.cancel.cancel();
    let report = Validator::new(&profile, &config, &NoopObserver).validate(&bag);
    assert!(report.files.is_empty());
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
}
