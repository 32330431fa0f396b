// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Chat Completions API backend adapter.
//!
//! Translates the uniform invoke call into the chat wire format and
//! classifies HTTP outcomes into the engine's three error kinds. No
//! adapter-level retry; failover policy belongs to the dispatcher.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use quorum_core::{
    BackendAdapter, BackendDescriptor, BackendReply, CallParams, QuorumError, TokenUsage,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatMessage, ChatRequest, ChatResponse};

/// Default base URL for the OpenAI API.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Outer HTTP safety net; the dispatcher enforces the real per-call timeout.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Backend adapter for the OpenAI Chat Completions API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    descriptor: BackendDescriptor,
    base_url: String,
}

impl OpenAiBackend {
    /// Create an adapter for the given descriptor and API key.
    pub fn new(descriptor: BackendDescriptor, api_key: &str) -> Result<Self, QuorumError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {api_key}");
        headers.insert(
            "authorization",
            HeaderValue::from_str(&bearer)
                .map_err(|e| QuorumError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| QuorumError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            descriptor,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the base URL (for testing and proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn classify_error(&self, status: StatusCode, body: &str) -> QuorumError {
        let name = self.descriptor.name.clone();
        let message = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(envelope) => match envelope.error.kind {
                Some(kind) => format!("{kind}: {}", envelope.error.message),
                None => envelope.error.message,
            },
            Err(_) => format!("HTTP {status}: {body}"),
        };

        match status.as_u16() {
            429 => QuorumError::RateLimited {
                backend: name,
                message,
            },
            400 | 401 | 403 | 404 | 422 => QuorumError::InvalidRequest { message },
            _ => QuorumError::Unavailable {
                backend: name,
                message,
            },
        }
    }
}

#[async_trait]
impl BackendAdapter for OpenAiBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<BackendReply, QuorumError> {
        let request = ChatRequest {
            model: self.descriptor.model_id.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
            max_tokens: params.max_output_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        debug!(backend = %self.descriptor.name, status = %status, "chat response received");

        let body = response
            .text()
            .await
            .map_err(|e| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(self.classify_error(status, &body));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: format!("failed to parse API response: {e}"),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: "response contained no choices".to_string(),
            })?;

        Ok(BackendReply {
            content: choice.message.content,
            usage: TokenUsage::new(parsed.usage.prompt_tokens, parsed.usage.completion_tokens),
        })
    }
}
