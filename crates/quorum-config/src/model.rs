// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Quorum routing engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use quorum_core::{BackendDescriptor, BackendKind};
use serde::{Deserialize, Serialize};

/// Top-level Quorum configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; a runnable deployment additionally needs at least one
/// `[[backends]]` entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuorumConfig {
    /// Monthly budget settings.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Configured backend endpoints.
    #[serde(default)]
    pub backends: Vec<BackendEntry>,

    /// Complexity classifier keyword lists and length cutoffs.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Routing policy settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Dispatcher timeout and retry settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Circuit breaker settings.
    #[serde(default)]
    pub circuit: CircuitConfig,

    /// Usage ledger persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Rolling monthly budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Hard spending cap per billing period, in USD.
    #[serde(default = "default_monthly_budget_usd")]
    pub monthly_budget_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            monthly_budget_usd: default_monthly_budget_usd(),
        }
    }
}

fn default_monthly_budget_usd() -> f64 {
    10.0
}

/// One configured backend endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendEntry {
    /// Unique backend name (registry key).
    pub name: String,

    /// Local or remote.
    pub kind: BackendKind,

    /// Model identifier passed on the wire.
    pub model: String,

    /// Base URL; `None` uses the adapter's default endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key; `None` means the adapter reads its conventional env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Cost per 1,000 input tokens in USD. Must be 0 for local backends.
    #[serde(default)]
    pub cost_per_kilo_input_usd: f64,

    /// Cost per 1,000 output tokens in USD. Must be 0 for local backends.
    #[serde(default)]
    pub cost_per_kilo_output_usd: f64,

    /// Largest prompt (in tokens) the backend accepts.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,

    /// Capability tags such as "code", "reasoning", "creative".
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl BackendEntry {
    /// Build the immutable descriptor registered for this entry.
    pub fn descriptor(&self) -> BackendDescriptor {
        BackendDescriptor {
            name: self.name.clone(),
            kind: self.kind,
            model_id: self.model.clone(),
            cost_per_kilo_input_usd: self.cost_per_kilo_input_usd,
            cost_per_kilo_output_usd: self.cost_per_kilo_output_usd,
            max_context_tokens: self.max_context_tokens,
            capability_tags: self.capabilities.clone(),
        }
    }
}

fn default_max_context_tokens() -> u32 {
    8_192
}

/// Keyword lists and length cutoffs for the complexity classifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Prompts containing any of these are always Critical.
    #[serde(default = "default_critical_keywords")]
    pub critical_keywords: Vec<String>,

    /// Prompts containing any of these are at least Complex.
    #[serde(default = "default_complex_keywords")]
    pub complex_keywords: Vec<String>,

    /// Short prompts containing any of these are Simple.
    #[serde(default = "default_simple_keywords")]
    pub simple_keywords: Vec<String>,

    /// Prompts longer than this many characters are at least Complex.
    #[serde(default = "default_complex_length_chars")]
    pub complex_length_chars: usize,

    /// Simple classification applies only below this many characters.
    #[serde(default = "default_simple_length_chars")]
    pub simple_length_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            critical_keywords: default_critical_keywords(),
            complex_keywords: default_complex_keywords(),
            simple_keywords: default_simple_keywords(),
            complex_length_chars: default_complex_length_chars(),
            simple_length_chars: default_simple_length_chars(),
        }
    }
}

fn default_critical_keywords() -> Vec<String> {
    [
        "critical decision",
        "production",
        "emergency",
        "safety critical",
        "customer facing",
        "legal",
        "medical",
        "financial analysis",
        "security incident",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_complex_keywords() -> Vec<String> {
    [
        "complex analysis",
        "architecture",
        "strategy",
        "deep reasoning",
        "research",
        "trade-off",
        "tradeoff",
        "philosophical",
        "nuanced",
        "step by step",
        "comprehensive",
        "in depth",
        "design a",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_simple_keywords() -> Vec<String> {
    [
        "list",
        "format",
        "formatting",
        "what is",
        "what time",
        "what day",
        "define",
        "spell",
        "count",
        "convert",
        "translate",
        "hello",
        "thanks",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_complex_length_chars() -> usize {
    5_000
}

fn default_simple_length_chars() -> usize {
    200
}

/// Routing policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Maximum number of consensus participants (minimum 2).
    #[serde(default = "default_consensus_size")]
    pub consensus_size: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            consensus_size: default_consensus_size(),
        }
    }
}

fn default_consensus_size() -> usize {
    3
}

/// Dispatcher timeout and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Per-backend-call timeout in seconds. A timeout counts as Unavailable.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Global consensus fan-out deadline in seconds.
    #[serde(default = "default_consensus_timeout_secs")]
    pub consensus_timeout_secs: u64,

    /// Cap on fallback attempts; `None` means one attempt per plan candidate.
    #[serde(default)]
    pub max_attempts: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            consensus_timeout_secs: default_consensus_timeout_secs(),
            max_attempts: None,
        }
    }
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_consensus_timeout_secs() -> u64 {
    45
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Initial cooldown window in seconds once the circuit opens.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cooldown ceiling in seconds under repeated opens.
    #[serde(default = "default_max_cooldown_secs")]
    pub max_cooldown_secs: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            max_cooldown_secs: default_max_cooldown_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_max_cooldown_secs() -> u64 {
    600
}

/// Usage ledger persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path of the SQLite file backing the usage ledger.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> String {
    "quorum-ledger.db".to_string()
}
