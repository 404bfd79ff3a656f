//! Scenario: unused config keys are reported
//!
//! # Invariants under test
//!
//! 1. Warn policy reports unused leaves without failing.
//! 2. Fail policy errors when any unused leaf exists.
//! 3. Every key the typed config reads is covered by the registry.
//! 4. Report ordering is deterministic.

use sf_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const FULL_YAML: &str = r#"
server:
  bind_addr: "127.0.0.1:9000"
  session_cookie: "shop_sid"
database:
  url_env: SF_DATABASE_URL
  max_connections: 5
  migrate_on_boot: false
cart:
  anonymous_ttl_days: 14
checkout:
  stock_policy: lenient
orders:
  transition_policy: terminal_locked
  my_orders_default_days: 60
catalog:
  page_size: 24
"#;

#[test]
fn full_known_config_is_clean() {
    let loaded = load_layered_yaml_from_strings(&[FULL_YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "unexpected: {:?}", report.unused_leaf_pointers);
}

#[test]
fn warn_mode_reports_typos() {
    let yaml = r#"
cart:
  anonymus_ttl_days: 7
zeta: 1
alpha:
  beta: 2
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/alpha/beta".to_string(),
            "/cart/anonymus_ttl_days".to_string(),
            "/zeta".to_string(),
        ]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let yaml = "catalog:\n  page_size: 12\n  pagesize: 10\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(err.to_string().contains("CONFIG_UNUSED_KEYS"));
    assert!(err.to_string().contains("/catalog/pagesize"));
}
