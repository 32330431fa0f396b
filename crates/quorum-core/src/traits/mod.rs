// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for backend adapters and external collaborators.

pub mod adapter;
pub mod context;
pub mod store;

pub use adapter::BackendAdapter;
pub use context::ContextSource;
pub use store::LedgerStore;
