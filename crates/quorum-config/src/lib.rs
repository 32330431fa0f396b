// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Quorum routing engine.
//!
//! TOML files merged through the XDG hierarchy with `QUORUM_*` environment
//! overrides, deserialized into [`model::QuorumConfig`], then semantically
//! validated into collected [`diagnostic::ConfigError`]s.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BackendEntry, BudgetConfig, CircuitConfig, ClassifierConfig, DispatchConfig, QuorumConfig,
    RoutingConfig, StorageConfig,
};
pub use validation::validate_config;
