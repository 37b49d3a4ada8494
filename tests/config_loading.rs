//! Behavior-driven tests for configuration loading
//!
//! These tests verify HOW pipeline tables are read from YAML and JSON files,
//! which mistakes are rejected, and HOW provider settings come from the
//! environment without leaking secrets.

use std::collections::HashMap;
use std::io::Write;

use finwell_core::{
    mask_secret, CoreError, Domain, IntentExtractor, PipelineConfig, ProviderSettings,
    ValidationError,
};
use tempfile::NamedTempFile;

fn file_with(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file should be created");
    file.write_all(contents.as_bytes())
        .expect("temp file should be writable");
    file
}

// =============================================================================
// Loading Pipeline Tables
// =============================================================================

#[test]
fn when_yaml_file_overrides_some_tables_system_keeps_defaults_for_the_rest() {
    // Given: A YAML file that only changes priority and the source cap
    let file = file_with(
        ".yaml",
        "domain_priority: [crypto, stock, insurance, health]\nmax_sources: 3\n",
    );

    // When: The file is loaded
    let config = PipelineConfig::load(file.path()).expect("yaml config should load");

    // Then: Overrides apply and untouched tables keep their defaults
    assert_eq!(config.domain_priority[0], Domain::Crypto);
    assert_eq!(config.max_sources, 3);
    assert_eq!(config.tokens, PipelineConfig::default().tokens);
    assert!(config.insurer("metlife").is_some());
}

#[test]
fn when_json_file_adds_a_ticker_system_classifies_it() {
    // Given: A JSON file with a single custom ticker
    let file = file_with(
        ".json",
        r#"{"tickers": [{"ticker": "NVDA", "name": "Nvidia", "aliases": ["geforce"]}]}"#,
    );

    // When: The config is loaded and used for classification
    let config = PipelineConfig::load(file.path()).expect("json config should load");
    let extractor = IntentExtractor::new(std::sync::Arc::new(config));
    let result = extractor.classify("should I buy geforce stock");

    // Then: The alias resolves to the configured ticker
    assert_eq!(result.domain, Domain::Stock);
    assert_eq!(
        result.entity.as_ref().map(|entity| entity.as_str()),
        Some("NVDA")
    );
}

#[test]
fn when_config_file_is_missing_system_reports_io_error_with_path() {
    let error = PipelineConfig::load(std::path::Path::new("/nonexistent/finwell.yaml"))
        .expect_err("missing file should fail");

    assert!(matches!(error, CoreError::Io { ref path, .. } if path.ends_with("finwell.yaml")));
}

#[test]
fn when_yaml_is_malformed_system_reports_yaml_error() {
    let file = file_with(".yml", "domain_priority: [stock, crypto\n");

    let error = PipelineConfig::load(file.path()).expect_err("malformed yaml should fail");

    assert!(matches!(error, CoreError::Yaml(_)));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn when_priority_lists_a_domain_twice_system_rejects_the_config() {
    let error = PipelineConfig::from_json_str(r#"{"domain_priority": ["stock", "stock"]}"#)
        .expect_err("duplicate priority should fail");

    assert!(matches!(
        error,
        CoreError::Validation(ValidationError::DuplicateDomainPriority { ref domain }) if domain == "stock"
    ));
}

#[test]
fn when_priority_includes_unknown_system_rejects_the_config() {
    let error = PipelineConfig::from_yaml_str("domain_priority: [stock, unknown]\n")
        .expect_err("unknown domain cannot be routed");

    assert!(matches!(
        error,
        CoreError::Validation(ValidationError::UnroutableDomain { .. })
    ));
}

#[test]
fn when_plan_tiers_are_not_open_ended_system_rejects_the_config() {
    let yaml = "plan_tiers:\n  - label: basic\n    max_income: 20000\n    plans: [A]\n";

    let error = PipelineConfig::from_yaml_str(yaml).expect_err("last tier needs no limit");

    assert!(matches!(
        error,
        CoreError::Validation(ValidationError::InvalidPlanTiers)
    ));
}

#[test]
fn when_source_cap_is_zero_system_rejects_the_config() {
    let error =
        PipelineConfig::from_json_str(r#"{"max_sources": 0}"#).expect_err("zero cap should fail");

    assert!(matches!(
        error,
        CoreError::Validation(ValidationError::InvalidSourceCap)
    ));
}

#[test]
fn when_default_tables_are_validated_system_accepts_them() {
    PipelineConfig::default()
        .validate()
        .expect("default tables are valid");
}

// =============================================================================
// Provider Settings
// =============================================================================

#[test]
fn when_environment_sets_keys_system_reads_them_and_ignores_blanks() {
    // Given: A fake environment with a key, a blank override and a timeout
    let env = HashMap::from([
        (ProviderSettings::ASI_API_KEY, "sk-live-1234567890abcdef"),
        (ProviderSettings::SOLANA_RPC_URL, "   "),
        (ProviderSettings::TIMEOUT_MS, "2500"),
        (ProviderSettings::NEWS_URL, "https://news.test/{symbol}"),
    ]);

    // When: Settings are built from it
    let settings =
        ProviderSettings::from_lookup(|name| env.get(name).map(|value| (*value).to_owned()));

    // Then: Set values apply and blank ones fall back to defaults
    let defaults = ProviderSettings::default();
    assert_eq!(settings.llm_api_key.as_deref(), Some("sk-live-1234567890abcdef"));
    assert_eq!(settings.solana_rpc_url, defaults.solana_rpc_url);
    assert_eq!(settings.timeout_ms, 2500);
    assert_eq!(settings.news_url.as_deref(), Some("https://news.test/{symbol}"));
    assert_eq!(settings.alphavantage_api_key, "demo");
}

#[test]
fn when_settings_are_logged_system_masks_secrets() {
    let settings = ProviderSettings {
        llm_api_key: Some(String::from("sk-live-1234567890abcdef")),
        ..ProviderSettings::default()
    };

    let debug = format!("{settings:?}");

    assert!(!debug.contains("sk-live-1234567890abcdef"));
    assert!(debug.contains("sk-l****cdef"));
    assert_eq!(mask_secret("short"), "****");
}
