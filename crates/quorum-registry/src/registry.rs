// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend registry: configured adapters plus their running health state.
//!
//! Registration is explicit and static at startup -- no runtime discovery
//! or plugin scanning. Adapters are keyed by their descriptor name and the
//! registry is the sole mutator of health state; concurrent
//! `report_outcome` calls serialize per backend name through the dashmap
//! entry lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use quorum_core::{BackendAdapter, BackendDescriptor, QuorumError};
use tracing::{info, warn};

use crate::health::{BackendHealth, CircuitSettings};

/// Read-only health view handed to the routing policy.
#[derive(Debug, Clone, Copy)]
pub struct HealthSnapshot {
    pub circuit_open: bool,
    pub consecutive_failures: u32,
    pub success_rate: f64,
}

/// Holds all configured backend adapters and their health state.
pub struct BackendRegistry {
    adapters: HashMap<String, Arc<dyn BackendAdapter>>,
    health: DashMap<String, BackendHealth>,
    circuit: CircuitSettings,
}

impl BackendRegistry {
    /// Create an empty registry with the given circuit breaker settings.
    pub fn new(circuit: CircuitSettings) -> Self {
        Self {
            adapters: HashMap::new(),
            health: DashMap::new(),
            circuit,
        }
    }

    /// Register an adapter. Duplicate names are rejected; registration
    /// happens once at startup, before the registry is shared.
    pub fn register(&mut self, adapter: Arc<dyn BackendAdapter>) -> Result<(), QuorumError> {
        let name = adapter.descriptor().name.clone();
        if self.adapters.contains_key(&name) {
            return Err(QuorumError::Config(format!(
                "backend `{name}` already registered"
            )));
        }
        info!(
            backend = %name,
            kind = %adapter.descriptor().kind,
            model = %adapter.descriptor().model_id,
            "backend registered"
        );
        self.adapters.insert(name, adapter);
        Ok(())
    }

    /// Descriptors of all registered backends, sorted by name.
    pub fn all(&self) -> Vec<BackendDescriptor> {
        let mut descriptors: Vec<BackendDescriptor> = self
            .adapters
            .values()
            .map(|a| a.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Descriptors of backends advertising the given capability tag.
    pub fn by_capability(&self, tag: &str) -> Vec<BackendDescriptor> {
        self.all()
            .into_iter()
            .filter(|d| d.has_capability(tag))
            .collect()
    }

    /// Look up an adapter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn BackendAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// Record a call outcome, updating health and the circuit breaker.
    ///
    /// This is the sole mutator of health state. Outcomes for unknown
    /// names are ignored (the backend may have been registered under a
    /// different configuration in a past process).
    pub fn report_outcome(&self, name: &str, success: bool) {
        if !self.adapters.contains_key(name) {
            return;
        }
        let mut health = self.health.entry(name.to_string()).or_default();
        if success {
            health.record_success();
        } else if let Some(cooldown) = health.record_failure(&self.circuit) {
            warn!(
                backend = %name,
                cooldown_secs = cooldown.as_secs(),
                "circuit opened after repeated failures"
            );
        }
    }

    /// True while the backend's circuit is open.
    pub fn is_open(&self, name: &str) -> bool {
        self.health.get(name).is_some_and(|h| h.is_open())
    }

    /// Fraction of the backend's lifetime calls that succeeded.
    pub fn success_rate(&self, name: &str) -> f64 {
        self.health.get(name).map_or(1.0, |h| h.success_rate())
    }

    /// Point-in-time health view for one backend.
    pub fn health_snapshot(&self, name: &str) -> HealthSnapshot {
        self.health
            .get(name)
            .map(|h| HealthSnapshot {
                circuit_open: h.is_open(),
                consecutive_failures: h.consecutive_failures(),
                success_rate: h.success_rate(),
            })
            .unwrap_or(HealthSnapshot {
                circuit_open: false,
                consecutive_failures: 0,
                success_rate: 1.0,
            })
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// True when no backends are registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::BackendKind;
    use quorum_test_utils::MockBackend;
    use std::time::Duration;

    fn registry_with(names: &[(&str, BackendKind)]) -> BackendRegistry {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        for (name, kind) in names {
            registry
                .register(Arc::new(MockBackend::named(*name, *kind)))
                .unwrap();
        }
        registry
    }

    #[test]
    fn register_and_lookup() {
        let registry = registry_with(&[
            ("ollama", BackendKind::Local),
            ("claude", BackendKind::Remote),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("ollama").is_some());
        assert!(registry.get("missing").is_none());

        // all() is sorted by name.
        let names: Vec<String> = registry.all().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["claude", "ollama"]);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        registry
            .register(Arc::new(MockBackend::named("dup", BackendKind::Local)))
            .unwrap();
        let err = registry
            .register(Arc::new(MockBackend::named("dup", BackendKind::Local)))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn by_capability_filters() {
        let mut registry = BackendRegistry::new(CircuitSettings::default());
        let coder = MockBackend::named("coder", BackendKind::Local)
            .with_capabilities(&["code", "general"]);
        let writer =
            MockBackend::named("writer", BackendKind::Remote).with_capabilities(&["creative"]);
        registry.register(Arc::new(coder)).unwrap();
        registry.register(Arc::new(writer)).unwrap();

        let code = registry.by_capability("code");
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].name, "coder");
        assert!(registry.by_capability("vision").is_empty());
    }

    #[test]
    fn failures_open_circuit_and_success_closes_it() {
        let registry = registry_with(&[("flaky", BackendKind::Remote)]);

        registry.report_outcome("flaky", false);
        registry.report_outcome("flaky", false);
        assert!(!registry.is_open("flaky"));

        registry.report_outcome("flaky", false);
        assert!(registry.is_open("flaky"));

        registry.report_outcome("flaky", true);
        assert!(!registry.is_open("flaky"));
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_becomes_eligible_after_cooldown() {
        let settings = CircuitSettings {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
            max_cooldown: Duration::from_secs(600),
        };
        let mut registry = BackendRegistry::new(settings);
        registry
            .register(Arc::new(MockBackend::named("flaky", BackendKind::Remote)))
            .unwrap();

        registry.report_outcome("flaky", false);
        assert!(registry.is_open("flaky"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!registry.is_open("flaky"));
    }

    #[test]
    fn unknown_backend_outcomes_ignored() {
        let registry = registry_with(&[("real", BackendKind::Local)]);
        registry.report_outcome("ghost", false);
        assert!(!registry.is_open("ghost"));
        assert_eq!(registry.success_rate("ghost"), 1.0);
    }

    #[test]
    fn success_rate_tracks_history() {
        let registry = registry_with(&[("b", BackendKind::Remote)]);
        registry.report_outcome("b", true);
        registry.report_outcome("b", true);
        registry.report_outcome("b", false);
        let snapshot = registry.health_snapshot("b");
        assert!((snapshot.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!(!snapshot.circuit_open);
    }
}
