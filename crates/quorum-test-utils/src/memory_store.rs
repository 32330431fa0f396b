// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory ledger store for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quorum_core::{LedgerStore, PersistedLedger, QuorumError};

/// A `LedgerStore` backed by a mutex-guarded value, with a save counter
/// for asserting persistence behavior.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<Option<PersistedLedger>>,
    saves: AtomicUsize,
}

impl MemoryLedgerStore {
    /// An empty store (first-run behavior).
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with persisted state.
    pub fn with_state(state: PersistedLedger) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls observed.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The currently persisted state.
    pub fn current(&self) -> Option<PersistedLedger> {
        *self.state.lock().unwrap()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> Result<Option<PersistedLedger>, QuorumError> {
        Ok(*self.state.lock().unwrap())
    }

    async fn save(&self, state: &PersistedLedger) -> Result<(), QuorumError> {
        *self.state.lock().unwrap() = Some(*state);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
