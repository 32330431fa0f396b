// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama generate API request/response types.

use serde::{Deserialize, Serialize};

/// A request to `/api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g., "mistral:7b").
    pub model: String,

    /// The prompt text.
    pub prompt: String,

    /// Always false; the engine consumes complete responses.
    pub stream: bool,

    /// Sampling options.
    pub options: GenerateOptions,
}

/// Sampling options for a generate request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    /// Sampling temperature.
    pub temperature: f32,

    /// Output token budget (`num_predict` in Ollama terms).
    pub num_predict: u32,
}

/// A complete (non-streamed) generate response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// The generated text.
    pub response: String,

    /// Prompt tokens evaluated; absent on cache hits.
    #[serde(default)]
    pub prompt_eval_count: u32,

    /// Output tokens generated.
    #[serde(default)]
    pub eval_count: u32,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}
