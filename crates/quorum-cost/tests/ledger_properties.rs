// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for the bounded-overshoot guarantee of the cost ledger.

use std::sync::Arc;

use proptest::prelude::*;
use quorum_cost::CostLedger;
use quorum_test_utils::MemoryLedgerStore;

const BUDGET_USD: f64 = 1.0;
const MAX_RESERVATION_USD: f64 = 0.6;

#[derive(Debug, Clone)]
enum Op {
    /// Reserve this estimated amount.
    Reserve(f64),
    /// Commit the oldest outstanding reservation at `estimate * factor`.
    Commit(f64),
    /// Release the oldest outstanding reservation.
    Release,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0.0..MAX_RESERVATION_USD).prop_map(Op::Reserve),
        (0.0..=1.0f64).prop_map(Op::Commit),
        Just(Op::Release),
    ]
}

proptest! {
    /// For all sequences of reserve/commit/release, committed spend never
    /// exceeds the budget by more than one reservation's worth, and
    /// double releases never refund twice.
    #[test]
    fn spend_never_exceeds_budget_plus_one_reservation(
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        rt.block_on(async move {
            let store = Arc::new(MemoryLedgerStore::new());
            let ledger = CostLedger::open(store, BUDGET_USD).await.unwrap();

            let mut outstanding = Vec::new();
            for op in ops {
                match op {
                    Op::Reserve(amount) => {
                        if let Some(id) = ledger.try_reserve(amount).await.unwrap() {
                            outstanding.push((id, amount));
                        }
                    }
                    Op::Commit(factor) => {
                        if !outstanding.is_empty() {
                            let (id, estimate) = outstanding.remove(0);
                            ledger.commit(id, estimate * factor).await.unwrap();
                        }
                    }
                    Op::Release => {
                        if !outstanding.is_empty() {
                            let (id, _) = outstanding.remove(0);
                            ledger.release(id);
                            // Exercise idempotence on every release.
                            ledger.release(id);
                        }
                    }
                }

                prop_assert!(
                    ledger.spent_usd() <= BUDGET_USD + MAX_RESERVATION_USD + 1e-9,
                    "spent {} exceeded bound",
                    ledger.spent_usd()
                );
                prop_assert!(ledger.outstanding_usd() >= -1e-9);
            }
            Ok(())
        })?;
    }
}
