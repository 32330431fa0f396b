// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama local inference backend adapter.
//!
//! Talks to a local Ollama daemon over `/api/generate` with streaming
//! disabled. Local inference is free; the descriptor carries zero token
//! prices and the ledger reserves nothing for these calls. A refused
//! connection (daemon not running) classifies as `Unavailable`.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use quorum_core::{
    BackendAdapter, BackendDescriptor, BackendReply, CallParams, QuorumError, TokenUsage,
};
use reqwest::StatusCode;
use tracing::debug;

use crate::types::{ApiErrorResponse, GenerateOptions, GenerateRequest, GenerateResponse};

/// Default Ollama daemon endpoint.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Outer HTTP safety net; the dispatcher enforces the real per-call timeout.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Backend adapter for a local Ollama daemon.
pub struct OllamaBackend {
    client: reqwest::Client,
    descriptor: BackendDescriptor,
    base_url: String,
}

impl OllamaBackend {
    /// Create an adapter for the given descriptor, talking to the default
    /// local daemon endpoint.
    pub fn new(descriptor: BackendDescriptor) -> Result<Self, QuorumError> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| QuorumError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            descriptor,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the daemon endpoint (for testing or remote daemons).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn classify_error(&self, status: StatusCode, body: &str) -> QuorumError {
        let name = self.descriptor.name.clone();
        let message = match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(envelope) => envelope.error,
            Err(_) => format!("HTTP {status}: {body}"),
        };

        match status.as_u16() {
            // 404 from the daemon means the model is not pulled.
            400 | 404 => QuorumError::InvalidRequest { message },
            429 => QuorumError::RateLimited {
                backend: name,
                message,
            },
            _ => QuorumError::Unavailable {
                backend: name,
                message,
            },
        }
    }
}

#[async_trait]
impl BackendAdapter for OllamaBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        prompt: &str,
        params: &CallParams,
    ) -> Result<BackendReply, QuorumError> {
        let request = GenerateRequest {
            model: self.descriptor.model_id.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                num_predict: params.max_output_tokens,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
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
        debug!(backend = %self.descriptor.name, status = %status, "generate response received");

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

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message: format!("failed to parse API response: {e}"),
            })?;

        Ok(BackendReply {
            content: parsed.response.trim().to_string(),
            usage: TokenUsage::new(parsed.prompt_eval_count, parsed.eval_count),
        })
    }
}
