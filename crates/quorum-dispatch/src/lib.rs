// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request dispatch, failover, and consensus synthesis for the Quorum
//! routing engine.
//!
//! The [`Dispatcher`] is the engine's single inbound capability: callers
//! construct one per process (owning one registry and one ledger) and
//! call [`Dispatcher::complete`] per request.

pub mod consensus;
pub mod dispatcher;
pub mod metrics;

pub use consensus::{SynthesisOutcome, Synthesizer};
pub use dispatcher::Dispatcher;
