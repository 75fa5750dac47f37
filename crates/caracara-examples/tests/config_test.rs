//! Profile file loading from disk

use std::io::Write;

use caracara_examples::{ExampleError, ExamplesConfig};

const SAMPLE: &str = include_str!("../config.example.yml");

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_sample_config_loads() {
    let file = write_config(SAMPLE);
    let config = ExamplesConfig::load(file.path()).unwrap();

    assert_eq!(config.profile_names(), vec!["my_tenant".to_string()]);
    let (name, profile) = config.select_profile(None).unwrap();
    assert_eq!(name, "my_tenant");
    assert!(profile.falcon().is_ok());
}

#[test]
fn test_sample_config_overlays_globals() {
    let file = write_config(SAMPLE);
    let config = ExamplesConfig::load(file.path()).unwrap();
    let (_, profile) = config.select_profile(None).unwrap();

    let settings = config.example_settings(profile, "hosts", "find_stale_sensors");
    assert_eq!(settings.get_u64("days", 0).unwrap(), 7);
    assert!(!settings.get_bool("remove", true).unwrap());

    let settings = config.example_settings(profile, "rtr", "download_event_log");
    assert_eq!(settings.get_str("filename").as_deref(), Some("Application.evtx"));
    assert_eq!(settings.get_u64("attempt_limit", 0).unwrap(), 10);
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ExamplesConfig::load(&dir.path().join("config.yml")).unwrap_err();
    assert!(matches!(err, ExampleError::Config(_)));
}

#[test]
fn test_profiles_keep_file_order() {
    let file = write_config(
        "profiles:\n  zulu:\n    falcon: {client_id: a, client_secret: b}\n  alpha:\n    default: true\n    falcon: {client_id: c, client_secret: d}\n",
    );
    let config = ExamplesConfig::load(file.path()).unwrap();
    assert_eq!(config.profile_names(), vec!["zulu".to_string(), "alpha".to_string()]);

    let (name, _) = config.select_profile(None).unwrap();
    assert_eq!(name, "alpha");

    let err = config.select_profile(Some("missing")).unwrap_err();
    assert!(matches!(err, ExampleError::ProfileNotFound(ref name) if name == "missing"));
}
