// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Quorum routing engine.

use thiserror::Error;

/// The primary error type used across all Quorum crates.
///
/// The three backend-call variants (`RateLimited`, `Unavailable`,
/// `InvalidRequest`) carry the failure classification that drives the
/// dispatcher's retry decisions: rate-limited calls are retried on a
/// *different* backend, unavailable calls are transient, and invalid
/// requests are never retried.
#[derive(Debug, Error)]
pub enum QuorumError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Every candidate backend was filtered out; the request cannot be served.
    #[error("no backend available: {reason}")]
    NoBackendAvailable { reason: String },

    /// No reservation was possible and no free local backend could serve.
    #[error("budget exceeded: {message}")]
    BudgetExceeded { message: String },

    /// The backend rejected the call with a rate limit; retryable elsewhere.
    #[error("backend `{backend}` rate limited: {message}")]
    RateLimited { backend: String, message: String },

    /// The backend is transiently unavailable (5xx, connect failure, timeout).
    #[error("backend `{backend}` unavailable: {message}")]
    Unavailable { backend: String, message: String },

    /// The request itself is malformed; never retried.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Every participant of a consensus fan-out failed.
    #[error("all {participants} consensus backends failed: {message}")]
    ConsensusAllFailed {
        participants: usize,
        message: String,
    },

    /// The caller cancelled the request; unused reservations were released.
    #[error("request cancelled")]
    Cancelled,

    /// Ledger persistence errors (database open, read, write).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QuorumError {
    /// True for errors the dispatcher may absorb by advancing to the next
    /// candidate in the plan.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QuorumError::RateLimited { .. } | QuorumError::Unavailable { .. }
        )
    }

    /// The backend a call-level error originated from, if any.
    pub fn backend(&self) -> Option<&str> {
        match self {
            QuorumError::RateLimited { backend, .. }
            | QuorumError::Unavailable { backend, .. } => Some(backend),
            _ => None,
        }
    }
}
