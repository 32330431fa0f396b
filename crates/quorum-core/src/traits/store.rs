// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External persistence collaborator for the usage ledger.

use async_trait::async_trait;

use crate::error::QuorumError;
use crate::types::PersistedLedger;

/// Durable get/set of the ledger counters.
///
/// The cost ledger reads once at startup and writes on every commit and
/// period rollover; the storage medium behind this trait is not part of
/// the engine.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Loads the persisted state, or `None` on first run.
    async fn load(&self) -> Result<Option<PersistedLedger>, QuorumError>;

    /// Overwrites the persisted state.
    async fn save(&self, state: &PersistedLedger) -> Result<(), QuorumError>;
}
