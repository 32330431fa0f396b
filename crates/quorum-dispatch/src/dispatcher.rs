// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request dispatch: classification, planning, execution, synthesis.
//!
//! One dispatcher per process, explicitly constructed with its registry
//! and ledger -- never a global. Each `complete` call runs on the
//! caller's task. Execution follows the plan either as a
//! single-call-with-fallback state machine or as a consensus fan-out
//! joined behind a deadline. The ordering contract holds on every path:
//! a reservation happens before its backend call, and the commit or
//! release happens after that call settles.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use quorum_config::QuorumConfig;
use quorum_core::{
    CallResult, Completion, ComplexityTier, ContextSource, QuorumError, RequestSpec,
};
use quorum_cost::{CostLedger, ReservationId, pricing};
use quorum_registry::BackendRegistry;
use quorum_router::{Classifier, RoutingPlan, RoutingPolicy};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::consensus::Synthesizer;
use crate::metrics;

/// Outcome of one attempt in the fallback state machine.
enum Attempt {
    Succeeded(Completion),
    /// Transient failure; advance to the next candidate.
    Retry(QuorumError),
    /// Non-retryable failure; propagate immediately.
    GiveUp(QuorumError),
    /// Candidate could not be funded or resolved; does not consume an attempt.
    Skipped,
}

/// The engine's single inbound capability: `complete(request) -> response`.
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    ledger: Arc<CostLedger>,
    policy: RoutingPolicy,
    classifier: Classifier,
    synthesizer: Synthesizer,
    context: Option<Arc<dyn ContextSource>>,
    call_timeout: Duration,
    consensus_timeout: Duration,
    max_attempts: Option<usize>,
}

impl Dispatcher {
    /// Build a dispatcher owning one registry and one ledger.
    pub fn new(
        registry: Arc<BackendRegistry>,
        ledger: Arc<CostLedger>,
        config: &QuorumConfig,
    ) -> Self {
        let call_timeout = Duration::from_secs(config.dispatch.call_timeout_secs);
        Self {
            policy: RoutingPolicy::new(registry.clone(), ledger.clone(), &config.routing),
            classifier: Classifier::new(&config.classifier),
            synthesizer: Synthesizer::new(call_timeout),
            registry,
            ledger,
            context: None,
            call_timeout,
            consensus_timeout: Duration::from_secs(config.dispatch.consensus_timeout_secs),
            max_attempts: config.dispatch.max_attempts,
        }
    }

    /// Attach a memory/context collaborator whose lookups are prepended
    /// to the prompt before classification.
    pub fn with_context(mut self, context: Arc<dyn ContextSource>) -> Self {
        self.context = Some(context);
        self
    }

    /// Serve one request to completion.
    pub async fn complete(&self, spec: RequestSpec) -> Result<Completion, QuorumError> {
        self.complete_with_cancel(spec, CancellationToken::new())
            .await
    }

    /// Serve one request; cancelling the token aborts in-flight backend
    /// calls and releases any reservations held for attempts that never
    /// started.
    pub async fn complete_with_cancel(
        &self,
        spec: RequestSpec,
        cancel: CancellationToken,
    ) -> Result<Completion, QuorumError> {
        if spec.prompt.trim().is_empty() {
            return Err(QuorumError::InvalidRequest {
                message: "prompt must not be empty".to_string(),
            });
        }

        let request_id = uuid::Uuid::new_v4();
        let started = std::time::Instant::now();

        let prompt = self.assemble_prompt(&spec).await;
        let tier = spec
            .force_tier
            .unwrap_or_else(|| self.classifier.classify(&prompt));
        metrics::record_request(tier);

        let plan = self.policy.plan(&prompt, &spec, tier).await?;
        info!(
            request_id = %request_id,
            tier = %tier,
            consensus = plan.consensus,
            candidates = plan.calls.len(),
            "dispatching request"
        );

        let result = if plan.consensus {
            self.fan_out(&prompt, &spec, plan, &cancel).await
        } else {
            self.single_with_fallback(&prompt, &spec, plan, &cancel).await
        };

        match &result {
            Ok(completion) => {
                metrics::record_latency(started.elapsed());
                metrics::record_cost(completion.total_cost_usd);
                metrics::set_budget_spent(self.ledger.spent_usd());
                info!(
                    request_id = %request_id,
                    backends = ?completion.backends_used,
                    cost_usd = completion.total_cost_usd,
                    consensus = completion.consensus,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "request served"
                );
            }
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "request failed");
            }
        }
        result
    }

    /// Prepend context lookups to the prompt. Lookup failures are logged
    /// and ignored; memory is an enrichment, not a dependency.
    async fn assemble_prompt(&self, spec: &RequestSpec) -> String {
        let Some(context) = &self.context else {
            return spec.prompt.clone();
        };
        match context.lookup(&spec.prompt).await {
            Ok(snippets) if !snippets.is_empty() => {
                debug!(snippets = snippets.len(), "prepending prior context");
                format!("{}\n\n{}", snippets.join("\n"), spec.prompt)
            }
            Ok(_) => spec.prompt.clone(),
            Err(err) => {
                warn!(error = %err, "context lookup failed, proceeding without prior context");
                spec.prompt.clone()
            }
        }
    }

    /// Single-call mode: `Attempting(i) -> Succeeded | Failed(kind) ->
    /// Retry(i+1) | GiveUp`, bounded by `max_attempts`.
    async fn single_with_fallback(
        &self,
        prompt: &str,
        spec: &RequestSpec,
        plan: RoutingPlan,
        cancel: &CancellationToken,
    ) -> Result<Completion, QuorumError> {
        let tier = plan.tier;
        let max_attempts = self.max_attempts.unwrap_or(plan.calls.len()).max(1);
        let mut queue: VecDeque<_> = plan.calls.into();
        let mut attempts = 0usize;
        let mut last_err: Option<QuorumError> = None;

        while let Some(call) = queue.pop_front() {
            if cancel.is_cancelled() {
                release_reservation(&self.ledger, call.reservation);
                drain_reservations(&self.ledger, &mut queue);
                return Err(QuorumError::Cancelled);
            }
            if attempts >= max_attempts {
                release_reservation(&self.ledger, call.reservation);
                continue;
            }

            let attempt = self
                .attempt_one(prompt, spec, tier, call, attempts, cancel)
                .await?;
            match attempt {
                Attempt::Succeeded(completion) => {
                    drain_reservations(&self.ledger, &mut queue);
                    return Ok(completion);
                }
                Attempt::Retry(err) => {
                    attempts += 1;
                    last_err = Some(err);
                }
                Attempt::GiveUp(err) => {
                    drain_reservations(&self.ledger, &mut queue);
                    return Err(err);
                }
                Attempt::Skipped => {}
            }
        }

        Err(last_err.unwrap_or_else(|| QuorumError::NoBackendAvailable {
            reason: "no candidate could be attempted within budget".to_string(),
        }))
    }

    /// Execute one candidate: ensure a reservation, invoke under the
    /// per-call timeout, then report and settle the ledger.
    async fn attempt_one(
        &self,
        prompt: &str,
        spec: &RequestSpec,
        tier: ComplexityTier,
        call: quorum_router::PlannedCall,
        prior_attempts: usize,
        cancel: &CancellationToken,
    ) -> Result<Attempt, QuorumError> {
        let name = call.descriptor.name.clone();

        // Fallback candidates re-reserve at attempt time; a failed
        // reservation demotes to the next candidate, never errors.
        let reservation = match call.reservation {
            Some(reservation) => reservation,
            None => match self.ledger.try_reserve(call.estimated_cost_usd).await? {
                Some(reservation) => reservation,
                None => {
                    debug!(backend = %name, "fallback not fundable, skipping");
                    return Ok(Attempt::Skipped);
                }
            },
        };

        let Some(adapter) = self.registry.get(&name) else {
            self.ledger.release(reservation);
            return Ok(Attempt::Skipped);
        };

        let params = spec.call_params();
        let started = std::time::Instant::now();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                self.ledger.release(reservation);
                return Err(QuorumError::Cancelled);
            }
            invoked = tokio::time::timeout(self.call_timeout, adapter.invoke(prompt, &params)) => {
                invoked.unwrap_or_else(|_| {
                    Err(QuorumError::Unavailable {
                        backend: name.clone(),
                        message: format!("call timed out after {:?}", self.call_timeout),
                    })
                })
            }
        };

        match outcome {
            Ok(reply) => {
                self.registry.report_outcome(&name, true);
                let actual = pricing::actual_call_cost(&call.descriptor, &reply.usage);
                if let Err(e) = self.ledger.commit(reservation, actual).await {
                    warn!(error = %e, "failed to persist ledger commit");
                }
                if prior_attempts > 0 {
                    metrics::record_fallback(&name);
                }
                Ok(Attempt::Succeeded(Completion {
                    content: reply.content,
                    backends_used: vec![name],
                    total_cost_usd: actual,
                    tier,
                    consensus: false,
                }))
            }
            Err(err) => {
                self.registry.report_outcome(&name, false);
                self.ledger.release(reservation);
                if err.is_retryable() {
                    warn!(
                        backend = %name,
                        attempt = prior_attempts + 1,
                        error = %err,
                        "backend call failed, advancing to next candidate"
                    );
                    Ok(Attempt::Retry(err))
                } else {
                    Ok(Attempt::GiveUp(err))
                }
            }
        }
    }

    /// Consensus mode: invoke every participant concurrently, join behind
    /// the consensus deadline, then merge whatever succeeded.
    async fn fan_out(
        &self,
        prompt: &str,
        spec: &RequestSpec,
        plan: RoutingPlan,
        cancel: &CancellationToken,
    ) -> Result<Completion, QuorumError> {
        let tier = plan.tier;
        let params = spec.call_params();
        let participants = plan.calls.len();

        let mut join: JoinSet<(usize, u64, Result<quorum_core::BackendReply, QuorumError>)> =
            JoinSet::new();
        let mut reservations: Vec<Option<ReservationId>> = Vec::with_capacity(participants);
        let mut descriptors = Vec::with_capacity(participants);

        for (idx, call) in plan.calls.into_iter().enumerate() {
            reservations.push(call.reservation);
            let adapter = self.registry.get(&call.descriptor.name);
            let name = call.descriptor.name.clone();
            descriptors.push(call.descriptor);

            let Some(adapter) = adapter else { continue };
            let prompt = prompt.to_string();
            let timeout = self.call_timeout;
            join.spawn(async move {
                let started = std::time::Instant::now();
                let outcome = match tokio::time::timeout(timeout, adapter.invoke(&prompt, &params))
                    .await
                {
                    Ok(invoked) => invoked,
                    Err(_) => Err(QuorumError::Unavailable {
                        backend: name,
                        message: format!("call timed out after {timeout:?}"),
                    }),
                };
                (idx, started.elapsed().as_millis() as u64, outcome)
            });
        }

        let deadline = tokio::time::sleep(self.consensus_timeout);
        tokio::pin!(deadline);

        let mut results: Vec<CallResult> = Vec::new();
        let mut committed_cost = 0.0f64;
        let mut cancelled = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = &mut deadline => {
                    warn!(
                        settled = results.len(),
                        participants,
                        "consensus deadline reached, abandoning stragglers"
                    );
                    break;
                }
                next = join.join_next() => match next {
                    None => break,
                    Some(Ok((idx, latency_ms, outcome))) => {
                        let name = descriptors[idx].name.clone();
                        match outcome {
                            Ok(reply) => {
                                self.registry.report_outcome(&name, true);
                                let actual =
                                    pricing::actual_call_cost(&descriptors[idx], &reply.usage);
                                if let Some(reservation) = reservations[idx].take() {
                                    if let Err(e) = self.ledger.commit(reservation, actual).await {
                                        warn!(error = %e, "failed to persist ledger commit");
                                    }
                                }
                                committed_cost += actual;
                                results.push(CallResult::ok(name, reply, latency_ms));
                            }
                            Err(err) => {
                                self.registry.report_outcome(&name, false);
                                release_reservation(&self.ledger, reservations[idx].take());
                                debug!(backend = %name, error = %err, "consensus participant failed");
                                results.push(CallResult::failed(name, err, latency_ms));
                            }
                        }
                    }
                    Some(Err(join_err)) => {
                        warn!(error = %join_err, "consensus participant task failed");
                    }
                }
            }
        }

        join.abort_all();
        // Participants that never settled (deadline, cancellation, missing
        // adapter) still hold their reservations: release them now.
        for reservation in reservations.iter_mut() {
            release_reservation(&self.ledger, reservation.take());
        }
        if cancelled {
            return Err(QuorumError::Cancelled);
        }

        let (successes, failures): (Vec<CallResult>, Vec<CallResult>) =
            results.into_iter().partition(CallResult::succeeded);

        if successes.is_empty() {
            let message = failures
                .iter()
                .rev()
                .find_map(|r| r.error.as_ref().map(|e| e.to_string()))
                .unwrap_or_else(|| "no participant completed in time".to_string());
            return Err(QuorumError::ConsensusAllFailed {
                participants,
                message,
            });
        }

        let merged = self
            .synthesizer
            .merge(&self.registry, &self.ledger, &spec.prompt, &successes, &params)
            .await;

        let consensus = successes.len() >= 2;
        if merged.merged {
            metrics::record_consensus_merge();
        }

        Ok(Completion {
            content: merged.content,
            backends_used: successes.iter().map(|r| r.backend_name.clone()).collect(),
            total_cost_usd: committed_cost + merged.extra_cost_usd,
            tier,
            consensus,
        })
    }
}

fn release_reservation(ledger: &Arc<CostLedger>, reservation: Option<ReservationId>) {
    if let Some(reservation) = reservation {
        ledger.release(reservation);
    }
}

fn drain_reservations(
    ledger: &Arc<CostLedger>,
    queue: &mut VecDeque<quorum_router::PlannedCall>,
) {
    for call in queue.drain(..) {
        release_reservation(ledger, call.reservation);
    }
}
