// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Chat Completions API request/response types.

use serde::{Deserialize, Serialize};

/// A request to the Chat Completions API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-4-turbo").
    pub model: String,

    /// Conversation messages; a single user turn for this engine.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user", "assistant", or "system".
    pub role: String,
    /// Plain text content.
    pub content: String,
}

/// A successful Chat Completions response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Response identifier.
    pub id: String,
    /// Generated choices; the first carries the reply.
    pub choices: Vec<Choice>,
    /// Token accounting for the call.
    pub usage: Usage,
}

/// One generated choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

/// Error detail within the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Error type (e.g., "insufficient_quota").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub message: String,
}
