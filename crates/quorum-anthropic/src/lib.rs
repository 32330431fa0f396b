// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API backend adapter.
//!
//! Translates the uniform invoke call into the Messages wire format and
//! classifies HTTP outcomes into the engine's three error kinds. The
//! adapter never retries; failover policy belongs to the dispatcher.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use quorum_core::{
    BackendAdapter, BackendDescriptor, BackendReply, CallParams, QuorumError, TokenUsage,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ApiMessage, MessageRequest, MessageResponse};

/// Default base URL for the Anthropic API.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Outer HTTP safety net; the dispatcher enforces the real per-call timeout.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Backend adapter for the Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    descriptor: BackendDescriptor,
    base_url: String,
}

impl AnthropicBackend {
    /// Create an adapter for the given descriptor and API key.
    pub fn new(descriptor: BackendDescriptor, api_key: &str) -> Result<Self, QuorumError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| QuorumError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(API_VERSION),
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
            Ok(envelope) => format!("{}: {}", envelope.error.kind, envelope.error.message),
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
impl BackendAdapter for AnthropicBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<BackendReply, QuorumError> {
        let request = MessageRequest {
            model: self.descriptor.model_id.clone(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: params.max_output_tokens,
            temperature: params.temperature,
        };

        let url = format!("{}/v1/messages", self.base_url);
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
        debug!(backend = %self.descriptor.name, status = %status, "messages response received");

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

        let parsed: MessageResponse =
            serde_json::from_str(&body).map_err(|e| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: format!("failed to parse API response: {e}"),
            })?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(BackendReply {
            content,
            usage: TokenUsage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
        })
    }
}
