// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consensus synthesis: merging multiple backend answers into one.
//!
//! With a single successful answer the content passes through verbatim.
//! With two or more, the cheapest successful backend is asked to
//! reconcile and deduplicate all candidate answers; that synthesis call
//! is reserved, committed, and outcome-reported like any other call. If
//! synthesis fails for any reason the highest-capability-ranked answer is
//! returned unmodified -- a request never fails because merging did.

use std::sync::Arc;
use std::time::Duration;

use quorum_core::{BackendDescriptor, CallParams, CallResult};
use quorum_cost::{CostLedger, pricing};
use quorum_registry::BackendRegistry;
use tracing::{info, warn};

/// Result of a synthesis pass.
#[derive(Debug)]
pub struct SynthesisOutcome {
    /// The final answer text.
    pub content: String,
    /// Cost of the synthesis call itself (0 when skipped or failed).
    pub extra_cost_usd: f64,
    /// Whether a merge call actually produced the content.
    pub merged: bool,
}

/// Merges successful consensus answers into a single response.
pub struct Synthesizer {
    call_timeout: Duration,
}

impl Synthesizer {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }

    /// Merge the successful results for `question`.
    ///
    /// `successes` must be non-empty and every entry must carry content.
    pub async fn merge(
        &self,
        registry: &Arc<BackendRegistry>,
        ledger: &Arc<CostLedger>,
        question: &str,
        successes: &[CallResult],
        params: &CallParams,
    ) -> SynthesisOutcome {
        if successes.len() == 1 {
            return SynthesisOutcome {
                content: successes[0].content.clone().unwrap_or_default(),
                extra_cost_usd: 0.0,
                merged: false,
            };
        }

        let prompt = build_synthesis_prompt(question, successes);

        if let Some(outcome) = self
            .try_synthesis_call(registry, ledger, &prompt, successes, params)
            .await
        {
            return outcome;
        }

        // Synthesis could not run or failed: best single answer, unmodified.
        let best = fallback_best(registry, successes);
        SynthesisOutcome {
            content: best,
            extra_cost_usd: 0.0,
            merged: false,
        }
    }

    /// Issue the synthesis call against the cheapest successful backend.
    /// Returns `None` when no backend is usable, nothing is fundable, or
    /// the call itself fails.
    async fn try_synthesis_call(
        &self,
        registry: &Arc<BackendRegistry>,
        ledger: &Arc<CostLedger>,
        prompt: &str,
        successes: &[CallResult],
        params: &CallParams,
    ) -> Option<SynthesisOutcome> {
        let descriptor = cheapest_descriptor(registry, successes)?;
        let adapter = registry.get(&descriptor.name)?;

        let estimate = pricing::estimate_call_cost(
            &descriptor,
            pricing::estimate_tokens(prompt),
            params.max_output_tokens,
        );
        let reservation = match ledger.try_reserve(estimate).await {
            Ok(Some(reservation)) => reservation,
            Ok(None) => {
                warn!(
                    backend = %descriptor.name,
                    estimate_usd = estimate,
                    "synthesis call not fundable, returning best single answer"
                );
                return None;
            }
            Err(e) => {
                warn!(error = %e, "synthesis reservation failed");
                return None;
            }
        };

        let invocation = tokio::time::timeout(self.call_timeout, adapter.invoke(prompt, params));
        match invocation.await {
            Ok(Ok(reply)) => {
                registry.report_outcome(&descriptor.name, true);
                let actual = pricing::actual_call_cost(&descriptor, &reply.usage);
                if let Err(e) = ledger.commit(reservation, actual).await {
                    warn!(error = %e, "failed to persist synthesis cost");
                }
                info!(
                    backend = %descriptor.name,
                    answers = successes.len(),
                    cost_usd = actual,
                    "consensus answers merged"
                );
                Some(SynthesisOutcome {
                    content: reply.content,
                    extra_cost_usd: actual,
                    merged: true,
                })
            }
            Ok(Err(err)) => {
                registry.report_outcome(&descriptor.name, false);
                ledger.release(reservation);
                warn!(backend = %descriptor.name, error = %err, "synthesis call failed");
                None
            }
            Err(_) => {
                registry.report_outcome(&descriptor.name, false);
                ledger.release(reservation);
                warn!(backend = %descriptor.name, "synthesis call timed out");
                None
            }
        }
    }
}

/// The reconcile-and-deduplicate prompt listing every candidate answer.
fn build_synthesis_prompt(question: &str, successes: &[CallResult]) -> String {
    let mut prompt = format!("Synthesize these answers about: \"{question}\"\n\nAnswers:\n");
    for result in successes {
        if let Some(content) = &result.content {
            prompt.push_str(&format!("\n[{}]: {}\n", result.backend_name, content));
        }
    }
    prompt.push_str(
        "\nCreate a single unified answer that reconciles the responses, \
         removes duplicated points, and keeps the best insights. \
         Keep it concise and clear.",
    );
    prompt
}

/// The cheapest successful backend by combined per-kilotoken price.
fn cheapest_descriptor(
    registry: &Arc<BackendRegistry>,
    successes: &[CallResult],
) -> Option<BackendDescriptor> {
    successes
        .iter()
        .filter_map(|r| registry.get(&r.backend_name))
        .map(|a| a.descriptor().clone())
        .min_by(|a, b| price_rate(a).total_cmp(&price_rate(b)))
}

fn price_rate(d: &BackendDescriptor) -> f64 {
    d.cost_per_kilo_input_usd + d.cost_per_kilo_output_usd
}

/// The highest-capability-ranked successful answer: most capability tags,
/// ties broken toward the pricier (premium) backend.
fn fallback_best(registry: &Arc<BackendRegistry>, successes: &[CallResult]) -> String {
    successes
        .iter()
        .filter(|r| r.content.is_some())
        .max_by(|a, b| {
            let rank = |r: &CallResult| {
                registry
                    .get(&r.backend_name)
                    .map(|adapter| {
                        let d = adapter.descriptor();
                        (d.capability_tags.len(), price_rate(d))
                    })
                    .unwrap_or((0, 0.0))
            };
            let (tags_a, price_a) = rank(a);
            let (tags_b, price_b) = rank(b);
            tags_a.cmp(&tags_b).then(price_a.total_cmp(&price_b))
        })
        .and_then(|r| r.content.clone())
        .unwrap_or_default()
}
