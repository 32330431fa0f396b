// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic prompt complexity classification.
//!
//! Classifies prompts into Simple/Medium/Complex/Critical tiers using
//! configured keyword lists and length cutoffs. Zero cost, no network,
//! no latency; ties resolve toward the higher tier so a hard task is
//! never starved of capability.

use quorum_config::ClassifierConfig;
use quorum_core::ComplexityTier;

/// Prompt vocabulary that maps to the "code" capability tag.
const CODE_SIGNALS: &[&str] = &[
    "code", "function", "debug", "program", "script", "compile", "refactor", "bug fix",
];

/// Prompt vocabulary that maps to the "reasoning" capability tag.
const REASONING_SIGNALS: &[&str] = &[
    "reason", "analyze", "analysis", "logic", "math", "prove", "architecture", "strategy",
];

/// Prompt vocabulary that maps to the "creative" capability tag.
const CREATIVE_SIGNALS: &[&str] = &[
    "creative", "story", "poem", "imagine", "brainstorm", "nuanced",
];

/// Keyword-driven complexity classifier.
///
/// Keyword lists come from configuration and are matched
/// case-insensitively as substrings.
pub struct Classifier {
    critical: Vec<String>,
    complex: Vec<String>,
    simple: Vec<String>,
    complex_length_chars: usize,
    simple_length_chars: usize,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let lowered = |list: &[String]| list.iter().map(|k| k.to_lowercase()).collect();
        Self {
            critical: lowered(&config.critical_keywords),
            complex: lowered(&config.complex_keywords),
            simple: lowered(&config.simple_keywords),
            complex_length_chars: config.complex_length_chars,
            simple_length_chars: config.simple_length_chars,
        }
    }

    /// Classify a prompt. Pure: same prompt, same tier.
    ///
    /// Priority order: critical keywords, then length/complex keywords,
    /// then short-and-simple keywords, otherwise Medium.
    pub fn classify(&self, prompt: &str) -> ComplexityTier {
        let lower = prompt.to_lowercase();
        let length = prompt.chars().count();

        if self.critical.iter().any(|k| lower.contains(k)) {
            return ComplexityTier::Critical;
        }
        if length > self.complex_length_chars || self.complex.iter().any(|k| lower.contains(k)) {
            return ComplexityTier::Complex;
        }
        if length < self.simple_length_chars && self.simple.iter().any(|k| lower.contains(k)) {
            return ComplexityTier::Simple;
        }
        ComplexityTier::Medium
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

/// Capability tags suggested by the prompt's vocabulary, used by the
/// routing policy to rank capability-tagged backends first.
pub fn capability_signals(prompt: &str) -> Vec<&'static str> {
    let lower = prompt.to_lowercase();
    let mut signals = Vec::new();
    if CODE_SIGNALS.iter().any(|s| lower.contains(s)) {
        signals.push("code");
    }
    if REASONING_SIGNALS.iter().any(|s| lower.contains(s)) {
        signals.push("reasoning");
    }
    if CREATIVE_SIGNALS.iter().any(|s| lower.contains(s)) {
        signals.push("creative");
    }
    signals
}
