// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Quorum workspace: scripted mock backends and
//! in-memory stand-ins for the external collaborators.

pub mod memory_store;
pub mod mock_backend;
pub mod static_context;

pub use memory_store::MemoryLedgerStore;
pub use mock_backend::{MockBackend, MockOutcome};
pub use static_context::StaticContext;
