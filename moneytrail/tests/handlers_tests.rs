use chrono::{TimeZone, Utc};
use moneytrail::handlers::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::Level;

#[test]
fn test_parse_target_url_with_scheme() {
    let result = parse_target_url("https://example.com");
    assert_eq!(result, Some("https://example.com".to_string()));
}

#[test]
fn test_parse_target_url_without_scheme() {
    let result = parse_target_url("casino-payout.example");
    assert_eq!(result, Some("https://casino-payout.example".to_string()));
}

#[test]
fn test_parse_target_url_invalid() {
    assert_eq!(parse_target_url("not a valid url!!!"), None);
    assert_eq!(parse_target_url("   "), None);
}

#[test]
fn test_generate_run_id_format() {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
    let run_id = generate_run_id(now);

    assert!(run_id.starts_with("20250301-101500-"));
    let suffix = &run_id["20250301-101500-".len()..];
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_generate_run_id_unique() {
    let now = Utc::now();
    let ids: std::collections::HashSet<String> = (0..20).map(|_| generate_run_id(now)).collect();
    assert!(ids.len() > 1);
}

#[test]
fn test_run_directory_joins_run_id() {
    assert_eq!(
        run_directory("./data", "20250301-101500-beef"),
        Path::new("./data").join("20250301-101500-beef")
    );
}

#[test]
fn test_run_directory_expands_tilde() {
    let dir = run_directory("~/moneytrail", "run");
    assert!(!dir.to_string_lossy().starts_with('~'));
    assert!(dir.ends_with("moneytrail/run"));
}

#[test]
fn test_load_policy_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let policy = load_policy(None)?;
    assert_eq!(policy.auth_wall_threshold, 2);
    assert!(policy.infra_blocklist.contains("google.com"));
    Ok(())
}

#[test]
fn test_load_policy_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(
        temp_file,
        r#"{{"external_allowlist": ["partner.example"], "navigation_timeout_ms": 5000}}"#
    )?;

    let path = PathBuf::from(temp_file.path());
    let policy = load_policy(Some(&path))?;

    assert!(policy.is_allowlisted("partner.example"));
    assert_eq!(policy.navigation_timeout().as_millis(), 5000);
    assert!(policy.looks_like_login("https://home.example/login"));
    Ok(())
}

#[test]
fn test_load_policy_bad_file() {
    let path = PathBuf::from("/nonexistent/policy.json");
    let err = load_policy(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Failed to load policy file"));
}

#[test]
fn test_log_level() {
    assert_eq!(log_level(true, false), Level::DEBUG);
    assert_eq!(log_level(false, true), Level::WARN);
    assert_eq!(log_level(false, false), Level::INFO);
}

#[test]
fn test_resolve_scan_dir_falls_back_to_map_step() -> Result<(), Box<dyn std::error::Error>> {
    let run_dir = tempfile::tempdir()?;
    let step_dir = run_dir.path().join(MAP_STEP_DIR);
    std::fs::create_dir_all(&step_dir)?;
    std::fs::write(step_dir.join("mapping.json"), "{}")?;

    assert_eq!(resolve_scan_dir(run_dir.path()), step_dir);
    assert_eq!(resolve_scan_dir(&step_dir), step_dir);
    Ok(())
}

#[test]
fn test_resolve_scan_dir_keeps_dir_without_mapping() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    assert_eq!(resolve_scan_dir(dir.path()), dir.path());
    Ok(())
}
