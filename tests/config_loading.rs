use std::fs;
use std::time::Duration;

use procstream::ProcstreamError;
use procstream::config::{load_and_validate, load_from_path};
use procstream::Encoding;

fn write_profile(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Procstream.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn full_profile_becomes_spawn_options() {
    let (_dir, path) = write_profile(
        r#"
[defaults]
timeout = "30s"
retries = 2
retry_delay = "250ms"
encoding = "latin1"
split = true
cwd = "build"

[env]
RUST_LOG = "debug"
"#,
    );

    let profile = load_and_validate(&path).unwrap();
    assert_eq!(profile.timeout, Some(Duration::from_secs(30)));
    assert_eq!(profile.retries, 2);
    assert_eq!(profile.encoding, Encoding::Latin1);

    let options = profile.to_options();
    assert_eq!(options.deadline(), Some(Duration::from_secs(30)));
    assert_eq!(options.effective_retry_delay(), Duration::from_millis(250));
    assert!(options.split);
    assert!(!options.detached);
    assert_eq!(options.cwd.as_deref(), Some(std::path::Path::new("build")));
    assert_eq!(options.env.get("RUST_LOG").map(String::as_str), Some("debug"));
}

#[test]
fn empty_file_is_a_valid_profile() {
    let (_dir, path) = write_profile("");
    let options = load_and_validate(&path).unwrap().to_options();
    assert_eq!(options.retries, 0);
    assert_eq!(options.deadline(), None);
    assert_eq!(options.encoding, Encoding::Utf8Lossy);
}

#[test]
fn unknown_keys_are_rejected() {
    let (_dir, path) = write_profile("[defaults]\nretires = 3\n");
    assert!(matches!(
        load_from_path(&path),
        Err(ProcstreamError::TomlError(_))
    ));
}

#[test]
fn bad_duration_is_a_config_error() {
    let (_dir, path) = write_profile("[defaults]\ntimeout = \"soon\"\n");
    match load_and_validate(&path) {
        Err(ProcstreamError::ConfigError(msg)) => assert!(msg.contains("timeout")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("absent.toml")),
        Err(ProcstreamError::IoError(_))
    ));
}
