// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned context source for tests.

use async_trait::async_trait;
use quorum_core::{ContextSource, QuorumError};

/// A `ContextSource` returning the same snippets for every prompt.
pub struct StaticContext {
    snippets: Vec<String>,
}

impl StaticContext {
    pub fn new(snippets: Vec<String>) -> Self {
        Self { snippets }
    }

    /// A source that never returns anything.
    pub fn empty() -> Self {
        Self {
            snippets: Vec::new(),
        }
    }
}

#[async_trait]
impl ContextSource for StaticContext {
    async fn lookup(&self, _prompt: &str) -> Result<Vec<String>, QuorumError> {
        Ok(self.snippets.clone())
    }
}
