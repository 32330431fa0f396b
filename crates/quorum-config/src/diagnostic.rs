// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Converts Figment deserialization errors into miette diagnostics with
//! "did you mean?" suggestions using Jaro-Winkler string similarity.

use miette::Diagnostic;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// 0.75 catches common typos like `montly_budget_usd` ->
/// `monthly_budget_usd` while filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with diagnostic help text.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(quorum::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction via fuzzy matching, if any.
        suggestion: Option<String>,
        /// List of valid keys for the section.
        valid_keys: String,
    },

    /// A configuration file failed to parse or deserialize.
    #[error("configuration parse error: {message}")]
    #[diagnostic(
        code(quorum::config::parse),
        help("check quorum.toml for TOML syntax or type mismatches")
    )]
    Parse {
        /// The underlying figment error description.
        message: String,
    },

    /// A semantic validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(quorum::config::validation))]
    Validation {
        /// Description of the constraint that failed.
        message: String,
    },
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a figment extraction error into one diagnostic per underlying error.
pub fn from_figment(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| match &e.kind {
            figment::error::Kind::UnknownField(key, valid) => ConfigError::UnknownKey {
                key: key.clone(),
                suggestion: suggest_key(key, valid),
                valid_keys: valid.join(", "),
            },
            _ => ConfigError::Parse {
                message: e.to_string(),
            },
        })
        .collect()
}

/// Find the closest valid key by Jaro-Winkler similarity, if close enough.
fn suggest_key(key: &str, valid: &[&str]) -> Option<String> {
    valid
        .iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(key, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate.to_string())
}
