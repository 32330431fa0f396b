// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API request/response types.

use serde::{Deserialize, Serialize};

/// A request to the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    /// Model identifier (e.g., "claude-sonnet-4-20250514").
    pub model: String,

    /// Conversation messages; a single user turn for this engine.
    pub messages: Vec<ApiMessage>,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    /// "user" or "assistant".
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// A successful Messages API response.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    /// Response identifier.
    pub id: String,
    /// Content blocks; text blocks are concatenated into the reply.
    pub content: Vec<ContentBlock>,
    /// Token accounting for the call.
    pub usage: Usage,
}

/// One content block within a response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    /// Block type (e.g., "text").
    #[serde(rename = "type")]
    pub block_type: String,
    /// Text payload for text blocks.
    #[serde(default)]
    pub text: Option<String>,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail within the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Error type (e.g., "rate_limit_error").
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}
