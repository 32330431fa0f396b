// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use quorum_config::{load_config_from_str, validate_config};
use quorum_core::BackendKind;

#[test]
fn empty_config_yields_defaults() {
    let config = load_config_from_str("").unwrap();
    assert_eq!(config.budget.monthly_budget_usd, 10.0);
    assert!(config.backends.is_empty());
    assert_eq!(config.routing.consensus_size, 3);
    assert_eq!(config.dispatch.call_timeout_secs, 30);
    assert_eq!(config.dispatch.consensus_timeout_secs, 45);
    assert_eq!(config.circuit.failure_threshold, 3);
    assert_eq!(config.circuit.cooldown_secs, 60);
    assert_eq!(config.circuit.max_cooldown_secs, 600);
    assert_eq!(config.classifier.complex_length_chars, 5_000);
    assert_eq!(config.classifier.simple_length_chars, 200);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn full_backend_entry_parses() {
    let config = load_config_from_str(
        r#"
        [budget]
        monthly_budget_usd = 25.0

        [[backends]]
        name = "ollama"
        kind = "local"
        model = "mistral:7b"
        capabilities = ["reasoning", "general"]

        [[backends]]
        name = "claude"
        kind = "remote"
        model = "claude-sonnet-4-20250514"
        api_key = "sk-test"
        cost_per_kilo_input_usd = 0.003
        cost_per_kilo_output_usd = 0.015
        max_context_tokens = 200000
        capabilities = ["reasoning", "creative", "code"]
        "#,
    )
    .unwrap();

    assert_eq!(config.budget.monthly_budget_usd, 25.0);
    assert_eq!(config.backends.len(), 2);

    let local = &config.backends[0];
    assert_eq!(local.kind, BackendKind::Local);
    assert_eq!(local.max_context_tokens, 8_192);
    assert_eq!(local.cost_per_kilo_input_usd, 0.0);

    let remote = &config.backends[1];
    assert_eq!(remote.kind, BackendKind::Remote);
    assert_eq!(remote.api_key.as_deref(), Some("sk-test"));

    let desc = remote.descriptor();
    assert_eq!(desc.name, "claude");
    assert!(desc.has_capability("code"));
    assert!(validate_config(&config).is_ok());
}

#[test]
fn unknown_key_is_rejected() {
    let result = load_config_from_str("[budget]\nmonthly_cap = 5.0\n");
    assert!(result.is_err());
}

#[test]
fn validation_collects_all_errors() {
    let config = load_config_from_str(
        r#"
        [budget]
        monthly_budget_usd = -1.0

        [routing]
        consensus_size = 1

        [circuit]
        cooldown_secs = 120
        max_cooldown_secs = 60

        [[backends]]
        name = "free"
        kind = "local"
        model = "llama3.2:3b"
        cost_per_kilo_output_usd = 0.5

        [[backends]]
        name = "free"
        kind = "local"
        model = "llama3.2:3b"
        "#,
    )
    .unwrap();

    let errors = validate_config(&config).unwrap_err();
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(messages.iter().any(|m| m.contains("monthly_budget_usd")));
    assert!(messages.iter().any(|m| m.contains("consensus_size")));
    assert!(messages.iter().any(|m| m.contains("max_cooldown_secs")));
    assert!(messages.iter().any(|m| m.contains("must be free")));
    assert!(messages.iter().any(|m| m.contains("duplicate backend name")));
}

#[test]
fn timeout_zero_is_rejected() {
    let config = load_config_from_str("[dispatch]\ncall_timeout_secs = 0\n").unwrap();
    let errors = validate_config(&config).unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("call_timeout_secs"))
    );
}

#[test]
fn classifier_keyword_lists_are_overridable() {
    let config = load_config_from_str(
        r#"
        [classifier]
        critical_keywords = ["sev1"]
        "#,
    )
    .unwrap();
    assert_eq!(config.classifier.critical_keywords, vec!["sev1"]);
    // Unset lists keep their defaults.
    assert!(!config.classifier.complex_keywords.is_empty());
}
