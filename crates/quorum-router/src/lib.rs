// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Complexity classification and routing policy for the Quorum engine.

pub mod classifier;
pub mod policy;

pub use classifier::{Classifier, capability_signals};
pub use policy::{PlannedCall, RoutingPlan, RoutingPolicy};
