// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token estimation and per-backend cost calculation.
//!
//! Estimates are derived from prompt length and descriptor pricing before
//! a call; actual costs use the token counts the backend reported. Local
//! backends price at zero on both sides.

use quorum_core::{BackendDescriptor, TokenUsage};

/// Characters per token for the length-based estimate. Matches the common
/// rule of thumb for English text and keeps the estimate conservative
/// enough for context-window filtering.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text from its character length.
///
/// Never returns 0; an empty prompt still occupies one token slot.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    (chars.div_ceil(CHARS_PER_TOKEN)).max(1) as u32
}

/// Estimated cost of one call before it happens: prompt length in plus the
/// full output budget out, priced per kilotoken.
pub fn estimate_call_cost(
    descriptor: &BackendDescriptor,
    prompt_tokens: u32,
    max_output_tokens: u32,
) -> f64 {
    (prompt_tokens as f64 / 1_000.0) * descriptor.cost_per_kilo_input_usd
        + (max_output_tokens as f64 / 1_000.0) * descriptor.cost_per_kilo_output_usd
}

/// Actual cost of a completed call from the usage the backend reported.
pub fn actual_call_cost(descriptor: &BackendDescriptor, usage: &TokenUsage) -> f64 {
    (usage.input_tokens as f64 / 1_000.0) * descriptor.cost_per_kilo_input_usd
        + (usage.output_tokens as f64 / 1_000.0) * descriptor.cost_per_kilo_output_usd
}
