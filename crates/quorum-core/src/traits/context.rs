// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External memory/context lookup collaborator.

use async_trait::async_trait;

use crate::error::QuorumError;

/// Supplies relevant prior text for a prompt.
///
/// The dispatcher prepends lookup results to the prompt before
/// classification and dispatch; the lookup implementation itself (vector
/// search, conversation history, etc.) lives outside this engine.
#[async_trait]
pub trait ContextSource: Send + Sync + 'static {
    /// Returns snippets of prior text relevant to the prompt, most
    /// relevant first. An empty vector means nothing to prepend.
    async fn lookup(&self, prompt: &str) -> Result<Vec<String>, QuorumError>;
}
