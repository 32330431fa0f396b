// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Quorum routing engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::QuorumError;

/// Whether a backend runs on this machine (free) or is a metered remote API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

/// Immutable identity of one registered backend adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Unique backend name (registry key).
    pub name: String,
    /// Local or remote.
    pub kind: BackendKind,
    /// Model identifier passed on the wire (e.g., "mistral:7b").
    pub model_id: String,
    /// Cost per 1,000 input tokens in USD; 0 for local backends.
    pub cost_per_kilo_input_usd: f64,
    /// Cost per 1,000 output tokens in USD; 0 for local backends.
    pub cost_per_kilo_output_usd: f64,
    /// Largest prompt (in tokens) the backend accepts.
    pub max_context_tokens: u32,
    /// Capability tags such as "code", "reasoning", "creative", "general".
    pub capability_tags: Vec<String>,
}

impl BackendDescriptor {
    /// True when the descriptor advertises the given capability tag.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capability_tags.iter().any(|t| t == tag)
    }

    /// True for free backends (both token prices are zero).
    pub fn is_free(&self) -> bool {
        self.cost_per_kilo_input_usd == 0.0 && self.cost_per_kilo_output_usd == 0.0
    }
}

/// Request complexity tiers, driving routing aggressiveness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    /// Short lookups, formatting, greetings. Local backends suffice.
    Simple,
    /// General questions and moderate tasks.
    Medium,
    /// Analysis, architecture, multi-step reasoning.
    Complex,
    /// Production, safety, legal, or otherwise high-stakes prompts.
    /// Always served by consensus.
    Critical,
}

/// One inbound ask. Created per call, discarded after the response.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// The question text; must be non-empty.
    pub prompt: String,
    /// Route to this backend only, bypassing selection (if it is healthy).
    pub force_backend: Option<String>,
    /// Skip classification and use this tier.
    pub force_tier: Option<ComplexityTier>,
    /// Consult multiple backends and merge their answers.
    pub require_consensus: bool,
    /// Per-call spend cap; bounds backend choice, never the ledger.
    pub max_cost_usd: Option<f64>,
    /// Sampling temperature forwarded to the backend.
    pub temperature: f32,
    /// Output budget forwarded to the backend.
    pub max_output_tokens: u32,
}

impl RequestSpec {
    /// Create a spec with default knobs for the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            force_backend: None,
            force_tier: None,
            require_consensus: false,
            max_cost_usd: None,
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    pub fn with_force_backend(mut self, name: impl Into<String>) -> Self {
        self.force_backend = Some(name.into());
        self
    }

    pub fn with_force_tier(mut self, tier: ComplexityTier) -> Self {
        self.force_tier = Some(tier);
        self
    }

    pub fn with_consensus(mut self) -> Self {
        self.require_consensus = true;
        self
    }

    pub fn with_max_cost_usd(mut self, cap: f64) -> Self {
        self.max_cost_usd = Some(cap);
        self
    }

    /// Derive the uniform adapter parameter block.
    pub fn call_params(&self) -> CallParams {
        CallParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// The uniform parameter block handed to every backend adapter.
#[derive(Debug, Clone, Copy)]
pub struct CallParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Token counts reported by a backend for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Successful payload returned by a backend adapter.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub content: String,
    pub usage: TokenUsage,
}

/// Per-backend outcome collected by the dispatcher during one request.
///
/// Fed to the consensus synthesizer, then discarded; only aggregate
/// statistics outlive the request.
#[derive(Debug)]
pub struct CallResult {
    pub backend_name: String,
    pub content: Option<String>,
    pub usage: TokenUsage,
    pub latency_ms: u64,
    pub error: Option<QuorumError>,
}

impl CallResult {
    /// A successful call outcome.
    pub fn ok(backend_name: impl Into<String>, reply: BackendReply, latency_ms: u64) -> Self {
        Self {
            backend_name: backend_name.into(),
            content: Some(reply.content),
            usage: reply.usage,
            latency_ms,
            error: None,
        }
    }

    /// A failed call outcome.
    pub fn failed(backend_name: impl Into<String>, error: QuorumError, latency_ms: u64) -> Self {
        Self {
            backend_name: backend_name.into(),
            content: None,
            usage: TokenUsage::default(),
            latency_ms,
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.content.is_some()
    }
}

/// The caller-visible response of one `complete` call.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    /// The final answer (merged when consensus applied).
    pub content: String,
    /// Names of the backends whose answers contributed.
    pub backends_used: Vec<String>,
    /// Actual spend for this request, synthesis included.
    pub total_cost_usd: f64,
    /// Tier the request was classified into.
    pub tier: ComplexityTier,
    /// Whether two or more backend answers were merged.
    pub consensus: bool,
}

/// Durable usage-ledger payload, read at startup and written on commit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedLedger {
    /// Start of the current billing period.
    pub period_start: DateTime<Utc>,
    /// Spend accumulated within the current period.
    pub spent_usd: f64,
}
