// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-backend health tracking and circuit breaking.
//!
//! Health state is in-memory only and resets on process restart. The
//! circuit opens after a configured run of consecutive failures and stays
//! open for a cooldown window that doubles on repeated opens, up to a
//! ceiling. A success closes the circuit immediately.

use std::time::Duration;

use quorum_config::CircuitConfig;
use tokio::time::Instant;

/// Circuit breaker settings derived from [`CircuitConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitSettings {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Initial cooldown once the circuit opens.
    pub cooldown: Duration,
    /// Cooldown ceiling under repeated opens.
    pub max_cooldown: Duration,
}

impl CircuitSettings {
    pub fn from_config(config: &CircuitConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            cooldown: Duration::from_secs(config.cooldown_secs),
            max_cooldown: Duration::from_secs(config.max_cooldown_secs),
        }
    }

    /// Cooldown for the Nth open (0-based): `cooldown * 2^n`, capped.
    fn cooldown_for(&self, opens: u32) -> Duration {
        let factor = 2u32.saturating_pow(opens.min(16));
        self.cooldown
            .saturating_mul(factor)
            .min(self.max_cooldown)
    }
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self::from_config(&CircuitConfig::default())
    }
}

/// Mutable health state for one backend name.
#[derive(Debug, Default)]
pub struct BackendHealth {
    /// Failures since the last success.
    consecutive_failures: u32,
    /// When set and in the future, the backend is excluded from routing.
    circuit_open_until: Option<Instant>,
    /// Consecutive circuit opens without an intervening success.
    opens: u32,
    /// Lifetime successful calls.
    successes: u64,
    /// Lifetime failed calls.
    failures: u64,
}

impl BackendHealth {
    /// Record a successful call: reset the failure run and close the circuit.
    pub fn record_success(&mut self) {
        self.successes += 1;
        self.consecutive_failures = 0;
        self.circuit_open_until = None;
        self.opens = 0;
    }

    /// Record a failed call, opening the circuit when the threshold is hit.
    ///
    /// A failure observed after the cooldown elapsed (a failed half-open
    /// probe) re-opens immediately with the next, longer cooldown.
    ///
    /// Returns the cooldown applied when the circuit opened.
    pub fn record_failure(&mut self, settings: &CircuitSettings) -> Option<Duration> {
        self.failures += 1;
        self.consecutive_failures += 1;

        let failed_probe = self
            .circuit_open_until
            .is_some_and(|until| Instant::now() >= until);

        if failed_probe || self.consecutive_failures >= settings.failure_threshold {
            let cooldown = settings.cooldown_for(self.opens);
            self.circuit_open_until = Some(Instant::now() + cooldown);
            self.opens = self.opens.saturating_add(1);
            self.consecutive_failures = 0;
            return Some(cooldown);
        }
        None
    }

    /// True while the circuit is open. An elapsed deadline reads as closed.
    pub fn is_open(&self) -> bool {
        self.circuit_open_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Fraction of lifetime calls that succeeded; 1.0 with no history.
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            1.0
        } else {
            self.successes as f64 / total as f64
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
