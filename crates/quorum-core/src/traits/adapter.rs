// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The uniform backend adapter contract.

use async_trait::async_trait;

use crate::error::QuorumError;
use crate::types::{BackendDescriptor, BackendReply, CallParams};

/// Uniform capability wrapping one concrete model backend.
///
/// Adapters translate the uniform call into their backend's wire format
/// and classify failures into `RateLimited`, `Unavailable`, or
/// `InvalidRequest`. They are stateless, safe for unlimited concurrent
/// use, and never mutate shared state; retry policy belongs to the
/// dispatcher, not here.
#[async_trait]
pub trait BackendAdapter: Send + Sync + 'static {
    /// The immutable identity of this backend.
    fn descriptor(&self) -> &BackendDescriptor;

    /// Sends one completion request and returns the text plus token counts.
    async fn invoke(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<BackendReply, QuorumError>;
}
