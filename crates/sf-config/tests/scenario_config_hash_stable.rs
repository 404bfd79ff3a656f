//! Scenario: config hash is stable under key reordering and sensitive to values
//!
//! # Invariants under test
//!
//! 1. Same input twice → same hash and canonical JSON.
//! 2. Reordered keys → same hash.
//! 3. A changed value → different hash.
//! 4. Later layers override earlier ones leaf by leaf.
//! 5. Files on disk load the same as the equivalent strings.

use std::io::Write;

use sf_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE_YAML: &str = r#"
server:
  bind_addr: "0.0.0.0:8080"
  session_cookie: "sf_session"
cart:
  anonymous_ttl_days: 30
checkout:
  stock_policy: strict
"#;

const BASE_YAML_REORDERED: &str = r#"
checkout:
  stock_policy: strict
cart:
  anonymous_ttl_days: 30
server:
  session_cookie: "sf_session"
  bind_addr: "0.0.0.0:8080"
"#;

const OVERLAY_YAML: &str = r#"
checkout:
  stock_policy: lenient
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash_and_value() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    assert_eq!(
        layered.config_json.pointer("/checkout/stock_policy"),
        Some(&serde_json::json!("lenient"))
    );
    // Untouched siblings survive the merge.
    assert_eq!(
        layered.config_json.pointer("/cart/anonymous_ttl_days"),
        Some(&serde_json::json!(30))
    );
}

#[test]
fn files_load_like_strings() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(OVERLAY_YAML.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();

    let from_files = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_an_error() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read yaml path"));
}
