// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend selection policy.
//!
//! Turns a classified request into a [`RoutingPlan`]: one funded primary
//! with ordered fallbacks, or a reserved participant set for consensus.
//! Selection consults registry health (circuits), descriptor fit (context
//! window, per-call cost cap), capability signals, and the budget ledger.

use std::sync::Arc;

use quorum_config::RoutingConfig;
use quorum_core::{BackendDescriptor, BackendKind, ComplexityTier, QuorumError, RequestSpec};
use quorum_cost::{CostLedger, ReservationId, pricing};
use quorum_registry::BackendRegistry;
use tracing::{debug, info, warn};

use crate::classifier::capability_signals;

/// One backend slot in a routing plan.
#[derive(Debug)]
pub struct PlannedCall {
    pub descriptor: BackendDescriptor,
    /// Budget hold for this call; fallbacks are reserved at dispatch time.
    pub reservation: Option<ReservationId>,
    pub estimated_cost_usd: f64,
}

/// Ordered execution plan for one request.
#[derive(Debug)]
pub struct RoutingPlan {
    /// Primary first, then fallbacks -- or all consensus participants.
    pub calls: Vec<PlannedCall>,
    /// When true, every call is a consensus participant.
    pub consensus: bool,
    /// Sum of the reserved estimates.
    pub estimated_cost_usd: f64,
    pub tier: ComplexityTier,
}

/// Picks backends for a request given tier, health, and budget.
pub struct RoutingPolicy {
    registry: Arc<BackendRegistry>,
    ledger: Arc<CostLedger>,
    consensus_size: usize,
}

impl RoutingPolicy {
    pub fn new(
        registry: Arc<BackendRegistry>,
        ledger: Arc<CostLedger>,
        routing: &RoutingConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            consensus_size: routing.consensus_size.max(2),
        }
    }

    /// Produce a plan for the given (context-assembled) prompt.
    ///
    /// Fails only with `NoBackendAvailable` when every candidate is
    /// filtered out, or `BudgetExceeded` when nothing reservable remains
    /// and no free local backend can serve.
    pub async fn plan(
        &self,
        prompt: &str,
        spec: &RequestSpec,
        tier: ComplexityTier,
    ) -> Result<RoutingPlan, QuorumError> {
        let prompt_tokens = pricing::estimate_tokens(prompt);

        if let Some(plan) = self.try_forced(spec, prompt_tokens, tier).await? {
            return Ok(plan);
        }

        let ordered = self.candidates(prompt, spec, prompt_tokens, tier)?;
        let consensus_required = spec.require_consensus || tier == ComplexityTier::Critical;

        if consensus_required && ordered.len() >= 2 {
            self.consensus_plan(spec, prompt_tokens, tier, ordered).await
        } else {
            if consensus_required {
                warn!(
                    tier = %tier,
                    "consensus required but only one candidate backend, degrading to single"
                );
            }
            self.single_plan(spec, prompt_tokens, tier, ordered).await
        }
    }

    /// Step 1: a forced backend bypasses selection when it is registered,
    /// healthy, and fundable.
    async fn try_forced(
        &self,
        spec: &RequestSpec,
        prompt_tokens: u32,
        tier: ComplexityTier,
    ) -> Result<Option<RoutingPlan>, QuorumError> {
        let Some(name) = &spec.force_backend else {
            return Ok(None);
        };
        let Some(adapter) = self.registry.get(name) else {
            warn!(backend = %name, "forced backend not registered, using policy selection");
            return Ok(None);
        };
        if self.registry.is_open(name) {
            warn!(backend = %name, "forced backend circuit open, using policy selection");
            return Ok(None);
        }

        let descriptor = adapter.descriptor().clone();
        let estimate =
            pricing::estimate_call_cost(&descriptor, prompt_tokens, spec.max_output_tokens);
        let Some(reservation) = self.ledger.try_reserve(estimate).await? else {
            warn!(backend = %name, "forced backend not fundable, using policy selection");
            return Ok(None);
        };

        info!(backend = %name, tier = %tier, "routing to forced backend");
        Ok(Some(RoutingPlan {
            calls: vec![PlannedCall {
                descriptor,
                reservation: Some(reservation),
                estimated_cost_usd: estimate,
            }],
            consensus: false,
            estimated_cost_usd: estimate,
            tier,
        }))
    }

    /// Steps 2-4: filter by health and fit, apply the tier's backend-kind
    /// preference, and rank.
    fn candidates(
        &self,
        prompt: &str,
        spec: &RequestSpec,
        prompt_tokens: u32,
        tier: ComplexityTier,
    ) -> Result<Vec<BackendDescriptor>, QuorumError> {
        let all = self.registry.all();
        if all.is_empty() {
            return Err(QuorumError::NoBackendAvailable {
                reason: "no backends registered".to_string(),
            });
        }

        let fits = |d: &BackendDescriptor| {
            d.max_context_tokens >= prompt_tokens
                && spec.max_cost_usd.is_none_or(|cap| {
                    pricing::estimate_call_cost(d, prompt_tokens, spec.max_output_tokens) <= cap
                })
        };

        let mut candidates: Vec<BackendDescriptor> = all
            .iter()
            .filter(|d| !self.registry.is_open(&d.name))
            .filter(|d| fits(d))
            .cloned()
            .collect();

        // Last-resort exception: a sole registered backend is admitted even
        // with its circuit open rather than leaving the request unservable.
        if candidates.is_empty() && all.len() == 1 && fits(&all[0]) {
            warn!(
                backend = %all[0].name,
                "only backend has an open circuit, admitting as last resort"
            );
            candidates = all.clone();
        }

        if candidates.is_empty() {
            return Err(QuorumError::NoBackendAvailable {
                reason: format!(
                    "all {} backends filtered out (open circuits, context window, or cost cap)",
                    all.len()
                ),
            });
        }

        let signals = capability_signals(prompt);
        let (mut locals, mut remotes): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|d| d.kind == BackendKind::Local);
        self.rank(&mut locals, &signals, prompt_tokens, spec.max_output_tokens);
        self.rank(&mut remotes, &signals, prompt_tokens, spec.max_output_tokens);

        let ordered = match tier {
            ComplexityTier::Simple => {
                if locals.is_empty() {
                    return Err(QuorumError::NoBackendAvailable {
                        reason: "simple tier requires a local backend and none is available"
                            .to_string(),
                    });
                }
                locals
            }
            ComplexityTier::Medium => {
                locals.extend(remotes);
                locals
            }
            ComplexityTier::Complex | ComplexityTier::Critical => {
                if tier == ComplexityTier::Critical && remotes.is_empty() {
                    warn!("critical tier with no remote backend, consensus will run locally");
                }
                remotes.extend(locals);
                remotes
            }
        };
        Ok(ordered)
    }

    /// Step 4's ranking: capability overlap desc, estimated cost asc,
    /// recent success rate desc.
    fn rank(
        &self,
        group: &mut [BackendDescriptor],
        signals: &[&str],
        prompt_tokens: u32,
        max_output_tokens: u32,
    ) {
        let overlap = |d: &BackendDescriptor| {
            signals.iter().filter(|s| d.has_capability(s)).count()
        };
        group.sort_by(|a, b| {
            overlap(b)
                .cmp(&overlap(a))
                .then_with(|| {
                    pricing::estimate_call_cost(a, prompt_tokens, max_output_tokens).total_cmp(
                        &pricing::estimate_call_cost(b, prompt_tokens, max_output_tokens),
                    )
                })
                .then_with(|| {
                    self.registry
                        .success_rate(&b.name)
                        .total_cmp(&self.registry.success_rate(&a.name))
                })
        });
    }

    /// Step 5: fund the top-ranked candidate, demoting through the order
    /// until a reservation lands; the rest become unreserved fallbacks.
    async fn single_plan(
        &self,
        spec: &RequestSpec,
        prompt_tokens: u32,
        tier: ComplexityTier,
        ordered: Vec<BackendDescriptor>,
    ) -> Result<RoutingPlan, QuorumError> {
        let mut primary: Option<PlannedCall> = None;
        let mut fallbacks = Vec::new();
        let mut unfunded = Vec::new();

        for descriptor in ordered {
            let estimate =
                pricing::estimate_call_cost(&descriptor, prompt_tokens, spec.max_output_tokens);
            if primary.is_none() {
                match self.ledger.try_reserve(estimate).await? {
                    Some(reservation) => {
                        primary = Some(PlannedCall {
                            descriptor,
                            reservation: Some(reservation),
                            estimated_cost_usd: estimate,
                        });
                    }
                    None => {
                        debug!(
                            backend = %descriptor.name,
                            estimate_usd = estimate,
                            "reservation failed, demoting to next candidate"
                        );
                        unfunded.push(PlannedCall {
                            descriptor,
                            reservation: None,
                            estimated_cost_usd: estimate,
                        });
                    }
                }
            } else {
                fallbacks.push(PlannedCall {
                    descriptor,
                    reservation: None,
                    estimated_cost_usd: estimate,
                });
            }
        }

        let Some(primary) = primary else {
            return Err(QuorumError::BudgetExceeded {
                message: format!(
                    "spent ${:.2} of ${:.2} and no free backend can serve the request",
                    self.ledger.spent_usd(),
                    self.ledger.budget_usd()
                ),
            });
        };

        info!(
            backend = %primary.descriptor.name,
            tier = %tier,
            estimate_usd = primary.estimated_cost_usd,
            fallbacks = fallbacks.len() + unfunded.len(),
            "routing plan selected"
        );

        let estimated_cost_usd = primary.estimated_cost_usd;
        let mut calls = vec![primary];
        calls.extend(fallbacks);
        // Candidates that outranked the primary but could not be funded stay
        // eligible as late fallbacks; dispatch re-reserves before trying them.
        calls.extend(unfunded);

        Ok(RoutingPlan {
            calls,
            consensus: false,
            estimated_cost_usd,
            tier,
        })
    }

    /// Step 6: fund up to `consensus_size` distinct participants, each
    /// passing circuit and budget checks independently.
    async fn consensus_plan(
        &self,
        spec: &RequestSpec,
        prompt_tokens: u32,
        tier: ComplexityTier,
        ordered: Vec<BackendDescriptor>,
    ) -> Result<RoutingPlan, QuorumError> {
        let mut participants: Vec<PlannedCall> = Vec::new();
        let mut skipped = Vec::new();

        for descriptor in ordered {
            if participants.len() == self.consensus_size {
                skipped.push(descriptor);
                continue;
            }
            let estimate =
                pricing::estimate_call_cost(&descriptor, prompt_tokens, spec.max_output_tokens);
            let reserved = match self.ledger.try_reserve(estimate).await {
                Ok(reserved) => reserved,
                Err(e) => {
                    // Don't leak holds already taken for earlier participants.
                    for call in &participants {
                        if let Some(reservation) = call.reservation {
                            self.ledger.release(reservation);
                        }
                    }
                    return Err(e);
                }
            };
            match reserved {
                Some(reservation) => participants.push(PlannedCall {
                    descriptor,
                    reservation: Some(reservation),
                    estimated_cost_usd: estimate,
                }),
                None => {
                    debug!(
                        backend = %descriptor.name,
                        estimate_usd = estimate,
                        "consensus participant not fundable, skipping"
                    );
                    skipped.push(descriptor);
                }
            }
        }

        if participants.len() >= 2 {
            let estimated_cost_usd: f64 =
                participants.iter().map(|c| c.estimated_cost_usd).sum();
            info!(
                participants = participants.len(),
                tier = %tier,
                estimate_usd = estimated_cost_usd,
                "consensus plan selected"
            );
            return Ok(RoutingPlan {
                calls: participants,
                consensus: true,
                estimated_cost_usd,
                tier,
            });
        }

        // Not enough fundable participants for a quorum: degrade to a
        // single plan (the response's consensus flag tells the caller).
        warn!(
            funded = participants.len(),
            "insufficient fundable consensus participants, degrading to single"
        );
        for call in &participants {
            if let Some(reservation) = call.reservation {
                self.ledger.release(reservation);
            }
        }
        let ordered: Vec<BackendDescriptor> = participants
            .into_iter()
            .map(|c| c.descriptor)
            .chain(skipped)
            .collect();
        self.single_plan(spec, prompt_tokens, tier, ordered).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quorum_core::PersistedLedger;
    use quorum_registry::CircuitSettings;
    use quorum_test_utils::{MemoryLedgerStore, MockBackend};

    async fn ledger_with(budget: f64, spent: f64) -> Arc<CostLedger> {
        let store = Arc::new(MemoryLedgerStore::with_state(PersistedLedger {
            period_start: Utc::now(),
            spent_usd: spent,
        }));
        Arc::new(CostLedger::open(store, budget).await.unwrap())
    }

    fn policy(registry: BackendRegistry, ledger: Arc<CostLedger>) -> RoutingPolicy {
        RoutingPolicy::new(Arc::new(registry), ledger, &RoutingConfig::default())
    }

    fn spec(prompt: &str) -> RequestSpec {
        RequestSpec::new(prompt)
    }

    #[tokio::test]
    async fn simple_tier_uses_local_only() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("remote", BackendKind::Remote)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let plan = policy
            .plan("list things", &spec("list things"), ComplexityTier::Simple)
            .await
            .unwrap();
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(plan.calls[0].descriptor.name, "local");
        assert!(!plan.consensus);
    }

    #[tokio::test]
    async fn simple_tier_without_local_fails() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("remote", BackendKind::Remote)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let err = policy
            .plan("list things", &spec("list things"), ComplexityTier::Simple)
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::NoBackendAvailable { .. }));
    }

    #[tokio::test]
    async fn complex_tier_prefers_remote_with_local_fallback() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("remote", BackendKind::Remote)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let plan = policy
            .plan("deep dive", &spec("deep dive"), ComplexityTier::Complex)
            .await
            .unwrap();
        let names: Vec<&str> = plan
            .calls
            .iter()
            .map(|c| c.descriptor.name.as_str())
            .collect();
        assert_eq!(names, vec!["remote", "local"]);
        assert!(plan.calls[0].reservation.is_some());
        assert!(plan.calls[1].reservation.is_none());
    }

    #[tokio::test]
    async fn critical_tier_forces_consensus() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("remote-a", BackendKind::Remote)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("remote-b", BackendKind::Remote)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let request = spec("production incident");
        assert!(!request.require_consensus);
        let plan = policy
            .plan(&request.prompt, &request, ComplexityTier::Critical)
            .await
            .unwrap();

        assert!(plan.consensus);
        assert!(plan.calls.len() >= 2 && plan.calls.len() <= 3);
        assert!(plan.calls.iter().all(|c| c.reservation.is_some()));
        // Remotes rank before the local for critical work.
        assert!(plan.calls[0].descriptor.kind == BackendKind::Remote);
    }

    #[tokio::test]
    async fn forced_backend_bypasses_selection() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("special", BackendKind::Remote)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let request = spec("anything").with_force_backend("special");
        let plan = policy
            .plan(&request.prompt, &request, ComplexityTier::Medium)
            .await
            .unwrap();
        assert_eq!(plan.calls.len(), 1);
        assert_eq!(plan.calls[0].descriptor.name, "special");
    }

    #[tokio::test]
    async fn forced_backend_with_open_circuit_falls_back() {
        let mut registry = BackendRegistry::new(CircuitSettings {
            failure_threshold: 1,
            cooldown: std::time::Duration::from_secs(60),
            max_cooldown: std::time::Duration::from_secs(600),
        });
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("broken", BackendKind::Remote)))
            .unwrap();
        registry.report_outcome("broken", false);
        assert!(registry.is_open("broken"));
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let request = spec("anything").with_force_backend("broken");
        let plan = policy
            .plan(&request.prompt, &request, ComplexityTier::Medium)
            .await
            .unwrap();
        assert_eq!(plan.calls[0].descriptor.name, "local");
    }

    #[tokio::test]
    async fn budget_exhaustion_demotes_to_local() {
        // Scenario A: $1.00 budget, $0.95 spent, remote estimate ~$0.10.
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(
                MockBackend::named("remote", BackendKind::Remote).with_pricing(0.05, 0.08),
            ))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        let ledger = ledger_with(1.0, 0.95).await;
        let policy = policy(registry, ledger.clone());

        let plan = policy
            .plan("analyze this", &spec("analyze this"), ComplexityTier::Complex)
            .await
            .unwrap();
        assert_eq!(plan.calls[0].descriptor.name, "local");
        assert_eq!(plan.estimated_cost_usd, 0.0);
        // The remote stays as an (unfunded) late fallback.
        assert!(plan.calls.iter().any(|c| c.descriptor.name == "remote"));
    }

    #[tokio::test]
    async fn all_circuits_open_yields_no_backend() {
        // Scenario C: several backends, every circuit open.
        let mut registry = BackendRegistry::new(CircuitSettings {
            failure_threshold: 1,
            cooldown: std::time::Duration::from_secs(60),
            max_cooldown: std::time::Duration::from_secs(600),
        });
        registry
            .register(Arc::new(MockBackend::named("a", BackendKind::Local)))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("b", BackendKind::Remote)))
            .unwrap();
        registry.report_outcome("a", false);
        registry.report_outcome("b", false);
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let err = policy
            .plan("question", &spec("question"), ComplexityTier::Medium)
            .await
            .unwrap_err();
        assert!(matches!(err, QuorumError::NoBackendAvailable { .. }));
    }

    #[tokio::test]
    async fn sole_open_backend_admitted_as_last_resort() {
        let mut registry = BackendRegistry::new(CircuitSettings {
            failure_threshold: 1,
            cooldown: std::time::Duration::from_secs(60),
            max_cooldown: std::time::Duration::from_secs(600),
        });
        registry
            .register(Arc::new(MockBackend::named("only", BackendKind::Local)))
            .unwrap();
        registry.report_outcome("only", false);
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let plan = policy
            .plan("question", &spec("question"), ComplexityTier::Medium)
            .await
            .unwrap();
        assert_eq!(plan.calls[0].descriptor.name, "only");
    }

    #[tokio::test]
    async fn per_call_cost_cap_filters_expensive_backends() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(
                MockBackend::named("pricey", BackendKind::Remote).with_pricing(1.0, 1.0),
            ))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        let policy = policy(registry, ledger_with(100.0, 0.0).await);

        let request = spec("analyze").with_max_cost_usd(0.01);
        let plan = policy
            .plan(&request.prompt, &request, ComplexityTier::Complex)
            .await
            .unwrap();
        assert!(plan.calls.iter().all(|c| c.descriptor.name != "pricey"));
    }

    #[tokio::test]
    async fn context_window_filters_small_backends() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(
                MockBackend::named("tiny", BackendKind::Local).with_max_context(10),
            ))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("roomy", BackendKind::Local)))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let long_prompt = "words ".repeat(100); // ~150 tokens
        let plan = policy
            .plan(&long_prompt, &spec(&long_prompt), ComplexityTier::Medium)
            .await
            .unwrap();
        assert!(plan.calls.iter().all(|c| c.descriptor.name != "tiny"));
    }

    #[tokio::test]
    async fn capability_overlap_ranks_first() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(
                MockBackend::named("generalist", BackendKind::Local)
                    .with_capabilities(&["general"]),
            ))
            .unwrap();
        registry
            .register(Arc::new(
                MockBackend::named("coder", BackendKind::Local).with_capabilities(&["code"]),
            ))
            .unwrap();
        let policy = policy(registry, ledger_with(10.0, 0.0).await);

        let prompt = "debug this function";
        let plan = policy
            .plan(prompt, &spec(prompt), ComplexityTier::Medium)
            .await
            .unwrap();
        assert_eq!(plan.calls[0].descriptor.name, "coder");
    }

    #[tokio::test]
    async fn consensus_degrades_to_single_when_underfunded() {
        // Only the free local participant can be funded.
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(
                MockBackend::named("remote-a", BackendKind::Remote).with_pricing(1.0, 1.0),
            ))
            .unwrap();
        registry
            .register(Arc::new(MockBackend::named("local", BackendKind::Local)))
            .unwrap();
        let ledger = ledger_with(0.001, 0.0).await;
        let policy = policy(registry, ledger.clone());

        let request = spec("merge opinions").with_consensus();
        let plan = policy
            .plan(&request.prompt, &request, ComplexityTier::Medium)
            .await
            .unwrap();
        assert!(!plan.consensus);
        assert_eq!(plan.calls[0].descriptor.name, "local");
        // No leaked holds beyond the single primary (a free reservation).
        assert_eq!(ledger.outstanding_usd(), 0.0);
    }
}
