// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling monthly budget ledger with reserve/commit/release accounting.
//!
//! Every paid call reserves its *estimated* cost before the network call
//! and reconciles with the *actual* token-based cost afterwards.
//! Outstanding reservations count against the budget, so concurrent
//! callers cannot jointly overshoot by more than a single reservation's
//! worth. The period rolls over when the clock crosses one month past the
//! period start; spend resets to zero and the new state is persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Months, Utc};
use quorum_core::{LedgerStore, PersistedLedger, QuorumError};
use tracing::{info, warn};

/// Handle for one budget reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(u64);

#[derive(Debug)]
struct LedgerInner {
    period_start: DateTime<Utc>,
    spent_usd: f64,
    reservations: HashMap<u64, f64>,
    reserved_usd: f64,
    next_id: u64,
}

impl LedgerInner {
    /// Reset spend and advance the period start when a month has elapsed.
    /// Returns true when a rollover happened.
    fn maybe_rollover(&mut self, now: DateTime<Utc>) -> bool {
        let mut rolled = false;
        while let Some(next_start) = self.period_start.checked_add_months(Months::new(1)) {
            if now < next_start {
                break;
            }
            self.period_start = next_start;
            rolled = true;
        }
        if rolled {
            info!(
                period_start = %self.period_start,
                previous_spend_usd = self.spent_usd,
                "billing period rolled over, spend reset"
            );
            self.spent_usd = 0.0;
        }
        rolled
    }

    fn snapshot(&self) -> PersistedLedger {
        PersistedLedger {
            period_start: self.period_start,
            spent_usd: self.spent_usd,
        }
    }
}

/// Process-wide cost ledger enforcing a hard monthly budget.
///
/// Shared across requests behind an `Arc`; the internal mutex is the one
/// synchronization point for all budget accounting. Persistence goes
/// through the injected [`LedgerStore`] on every commit and rollover.
pub struct CostLedger {
    inner: Mutex<LedgerInner>,
    monthly_budget_usd: f64,
    store: Arc<dyn LedgerStore>,
}

impl CostLedger {
    /// Open the ledger, hydrating spend and period start from the store.
    /// A missing persisted state starts a fresh period now.
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        monthly_budget_usd: f64,
    ) -> Result<Self, QuorumError> {
        let persisted = store.load().await?.unwrap_or(PersistedLedger {
            period_start: Utc::now(),
            spent_usd: 0.0,
        });
        Ok(Self {
            inner: Mutex::new(LedgerInner {
                period_start: persisted.period_start,
                spent_usd: persisted.spent_usd,
                reservations: HashMap::new(),
                reserved_usd: 0.0,
                next_id: 1,
            }),
            monthly_budget_usd,
            store,
        })
    }

    /// Reserve an estimated amount against the budget.
    ///
    /// Returns `None` when the reservation would push committed spend plus
    /// outstanding reservations past the monthly budget. Zero-cost
    /// reservations (local backends) always succeed, so a request is never
    /// starved of a free backend by budget state.
    pub async fn try_reserve(
        &self,
        amount_usd: f64,
    ) -> Result<Option<ReservationId>, QuorumError> {
        let (granted, rollover_state) = {
            let mut inner = self.inner.lock().map_err(poisoned)?;
            let rolled = inner.maybe_rollover(Utc::now());

            let fits = amount_usd <= 0.0
                || inner.spent_usd + inner.reserved_usd + amount_usd
                    <= self.monthly_budget_usd + f64::EPSILON;

            let granted = if fits {
                let id = inner.next_id;
                inner.next_id += 1;
                let amount = amount_usd.max(0.0);
                inner.reservations.insert(id, amount);
                inner.reserved_usd += amount;
                Some(ReservationId(id))
            } else {
                None
            };
            (granted, rolled.then(|| inner.snapshot()))
        };

        if let Some(state) = rollover_state {
            self.store.save(&state).await?;
        }
        Ok(granted)
    }

    /// Commit a reservation with the actual cost of the completed call.
    ///
    /// The delta between estimate and actual reconciles automatically
    /// (the estimate is dropped, the actual is added). Committing an
    /// unknown or already-settled reservation is a no-op.
    pub async fn commit(&self, id: ReservationId, actual_usd: f64) -> Result<(), QuorumError> {
        let state = {
            let mut inner = self.inner.lock().map_err(poisoned)?;
            match inner.reservations.remove(&id.0) {
                Some(estimated) => {
                    inner.reserved_usd = (inner.reserved_usd - estimated).max(0.0);
                    inner.spent_usd += actual_usd.max(0.0);
                    if inner.spent_usd > self.monthly_budget_usd {
                        warn!(
                            spent_usd = inner.spent_usd,
                            budget_usd = self.monthly_budget_usd,
                            "monthly budget exceeded by in-flight call"
                        );
                    }
                    Some(inner.snapshot())
                }
                None => None,
            }
        };

        if let Some(state) = state {
            self.store.save(&state).await?;
        }
        Ok(())
    }

    /// Release a reservation that will not be spent. Idempotent: releasing
    /// twice (or after commit) has no additional effect.
    pub fn release(&self, id: ReservationId) {
        if let Ok(mut inner) = self.inner.lock()
            && let Some(estimated) = inner.reservations.remove(&id.0)
        {
            inner.reserved_usd = (inner.reserved_usd - estimated).max(0.0);
        }
    }

    /// Committed spend within the current period.
    pub fn spent_usd(&self) -> f64 {
        self.inner.lock().map(|i| i.spent_usd).unwrap_or(0.0)
    }

    /// Sum of outstanding (uncommitted, unreleased) reservations.
    pub fn outstanding_usd(&self) -> f64 {
        self.inner.lock().map(|i| i.reserved_usd).unwrap_or(0.0)
    }

    /// The configured monthly budget.
    pub fn budget_usd(&self) -> f64 {
        self.monthly_budget_usd
    }

    /// Committed spend as a fraction of the budget (0 when unbudgeted).
    pub fn utilization(&self) -> f64 {
        if self.monthly_budget_usd <= 0.0 {
            0.0
        } else {
            self.spent_usd() / self.monthly_budget_usd
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> QuorumError {
    QuorumError::Internal("cost ledger mutex poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use quorum_test_utils::MemoryLedgerStore;

    async fn ledger(budget: f64) -> (Arc<MemoryLedgerStore>, CostLedger) {
        let store = Arc::new(MemoryLedgerStore::new());
        let ledger = CostLedger::open(store.clone(), budget).await.unwrap();
        (store, ledger)
    }

    #[tokio::test]
    async fn reserve_within_budget_succeeds() {
        let (_, ledger) = ledger(1.0).await;
        let id = ledger.try_reserve(0.5).await.unwrap();
        assert!(id.is_some());
        assert_eq!(ledger.outstanding_usd(), 0.5);
    }

    #[tokio::test]
    async fn reserve_over_budget_fails() {
        let (_, ledger) = ledger(1.0).await;
        assert!(ledger.try_reserve(0.95).await.unwrap().is_some());
        assert!(ledger.try_reserve(0.10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_cost_reservation_always_succeeds() {
        let store = Arc::new(MemoryLedgerStore::with_state(PersistedLedger {
            period_start: Utc::now(),
            spent_usd: 99.0,
        }));
        let ledger = CostLedger::open(store, 10.0).await.unwrap();
        // Over budget already, but a free local call must still be allowed.
        assert!(ledger.try_reserve(0.0).await.unwrap().is_some());
        assert!(ledger.try_reserve(0.01).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_reconciles_estimate_with_actual() {
        let (store, ledger) = ledger(1.0).await;
        let id = ledger.try_reserve(0.10).await.unwrap().unwrap();
        ledger.commit(id, 0.07).await.unwrap();

        assert!((ledger.spent_usd() - 0.07).abs() < 1e-12);
        assert_eq!(ledger.outstanding_usd(), 0.0);
        assert_eq!(store.save_count(), 1);
        assert!((store.current().unwrap().spent_usd - 0.07).abs() < 1e-12);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let (_, ledger) = ledger(1.0).await;
        let id = ledger.try_reserve(0.6).await.unwrap().unwrap();
        ledger.release(id);
        assert_eq!(ledger.outstanding_usd(), 0.0);

        // Double release: no double refund, outstanding stays at zero.
        ledger.release(id);
        assert_eq!(ledger.outstanding_usd(), 0.0);

        // The freed headroom is usable exactly once.
        assert!(ledger.try_reserve(0.9).await.unwrap().is_some());
        assert!(ledger.try_reserve(0.9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_unknown_reservation_is_noop() {
        let (store, ledger) = ledger(1.0).await;
        let id = ledger.try_reserve(0.2).await.unwrap().unwrap();
        ledger.release(id);
        ledger.commit(id, 0.2).await.unwrap();
        assert_eq!(ledger.spent_usd(), 0.0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn period_rollover_resets_spend() {
        let old_start = Utc::now() - ChronoDuration::days(45);
        let store = Arc::new(MemoryLedgerStore::with_state(PersistedLedger {
            period_start: old_start,
            spent_usd: 9.99,
        }));
        let ledger = CostLedger::open(store.clone(), 10.0).await.unwrap();
        assert!((ledger.spent_usd() - 9.99).abs() < 1e-12);

        // First operation after the month boundary triggers the rollover.
        let id = ledger.try_reserve(5.0).await.unwrap();
        assert!(id.is_some());
        assert_eq!(ledger.spent_usd(), 0.0);

        let persisted = store.current().unwrap();
        assert!(persisted.period_start > old_start);
        assert_eq!(persisted.spent_usd, 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_respect_budget() {
        let (_, ledger) = ledger(1.0).await;
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger.try_reserve(0.3).await.unwrap().is_some()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        // 0.3 each against a 1.0 budget: at most 3 can ever be outstanding.
        assert!(granted <= 3, "granted {granted} reservations");
        assert!(ledger.outstanding_usd() <= 1.0 + f64::EPSILON);
    }
}
