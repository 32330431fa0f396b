// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-negative budgets, unique backend names, and
//! free pricing on local backends.

use std::collections::HashSet;

use quorum_core::BackendKind;

use crate::diagnostic::ConfigError;
use crate::model::QuorumConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)`
/// with all collected validation errors (does not fail fast).
pub fn validate_config(config: &QuorumConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.budget.monthly_budget_usd < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "budget.monthly_budget_usd must be non-negative, got {}",
                config.budget.monthly_budget_usd
            ),
        });
    }

    let mut seen = HashSet::new();
    for entry in &config.backends {
        if entry.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "backends entry has an empty name".to_string(),
            });
        }
        if !seen.insert(entry.name.clone()) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate backend name `{}`", entry.name),
            });
        }
        if entry.max_context_tokens == 0 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "backend `{}` max_context_tokens must be positive",
                    entry.name
                ),
            });
        }
        if entry.cost_per_kilo_input_usd < 0.0 || entry.cost_per_kilo_output_usd < 0.0 {
            errors.push(ConfigError::Validation {
                message: format!("backend `{}` token prices must be non-negative", entry.name),
            });
        }
        if entry.kind == BackendKind::Local
            && (entry.cost_per_kilo_input_usd != 0.0 || entry.cost_per_kilo_output_usd != 0.0)
        {
            errors.push(ConfigError::Validation {
                message: format!(
                    "local backend `{}` must be free (token prices of 0)",
                    entry.name
                ),
            });
        }
    }

    if config.routing.consensus_size < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "routing.consensus_size must be at least 2, got {}",
                config.routing.consensus_size
            ),
        });
    }

    if config.dispatch.call_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.call_timeout_secs must be positive".to_string(),
        });
    }
    if config.dispatch.consensus_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.consensus_timeout_secs must be positive".to_string(),
        });
    }
    if config.dispatch.max_attempts == Some(0) {
        errors.push(ConfigError::Validation {
            message: "dispatch.max_attempts must be at least 1 when set".to_string(),
        });
    }

    if config.circuit.failure_threshold == 0 {
        errors.push(ConfigError::Validation {
            message: "circuit.failure_threshold must be at least 1".to_string(),
        });
    }
    if config.circuit.max_cooldown_secs < config.circuit.cooldown_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "circuit.max_cooldown_secs ({}) must not be below circuit.cooldown_secs ({})",
                config.circuit.max_cooldown_secs, config.circuit.cooldown_secs
            ),
        });
    }

    if config.classifier.simple_length_chars >= config.classifier.complex_length_chars {
        errors.push(ConfigError::Validation {
            message: format!(
                "classifier.simple_length_chars ({}) must be below classifier.complex_length_chars ({})",
                config.classifier.simple_length_chars, config.classifier.complex_length_chars
            ),
        });
    }

    if config.storage.ledger_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.ledger_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
