// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend registry and circuit breaking for the Quorum routing engine.

pub mod health;
pub mod registry;

pub use health::{BackendHealth, CircuitSettings};
pub use registry::{BackendRegistry, HealthSnapshot};
