// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost estimation, budget reservations, and ledger persistence for the
//! Quorum routing engine.

pub mod ledger;
pub mod pricing;
pub mod store;

pub use ledger::{CostLedger, ReservationId};
pub use store::SqliteLedgerStore;
