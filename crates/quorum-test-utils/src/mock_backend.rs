// SPDX-FileCopyrightText: 2026 Quorum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock backend adapter for deterministic testing.
//!
//! `MockBackend` implements `BackendAdapter` with pre-scripted outcomes,
//! enabling fast, CI-runnable tests of routing, failover, and consensus
//! without external services.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quorum_core::{
    BackendAdapter, BackendDescriptor, BackendKind, BackendReply, CallParams, QuorumError,
    TokenUsage,
};

/// One scripted call outcome, popped FIFO per invoke.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed with the given text and usage.
    Reply { text: String, usage: TokenUsage },
    /// Fail classified as rate-limited.
    RateLimited(String),
    /// Fail classified as transiently unavailable.
    Unavailable(String),
    /// Fail classified as an invalid request.
    Invalid(String),
    /// Sleep before succeeding; used to exercise call timeouts.
    Slow { delay: Duration, text: String },
}

impl MockOutcome {
    /// A successful reply with the default 10-in/20-out usage.
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply {
            text: text.into(),
            usage: TokenUsage::new(10, 20),
        }
    }

    /// A successful reply with explicit token usage.
    pub fn reply_with_usage(text: impl Into<String>, input: u32, output: u32) -> Self {
        Self::Reply {
            text: text.into(),
            usage: TokenUsage::new(input, output),
        }
    }

    /// A reply delivered only after the given delay.
    pub fn slow(delay: Duration, text: impl Into<String>) -> Self {
        Self::Slow {
            delay,
            text: text.into(),
        }
    }
}

/// A mock backend that replays pre-scripted outcomes.
///
/// When the outcome queue is empty, invoke succeeds with a default
/// "mock reply" text.
pub struct MockBackend {
    descriptor: BackendDescriptor,
    outcomes: Mutex<VecDeque<MockOutcome>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockBackend {
    /// Create a mock backend with a plausible descriptor for the kind:
    /// local backends are free, remote ones carry Sonnet-like pricing.
    pub fn named(name: impl Into<String>, kind: BackendKind) -> Self {
        let (input_price, output_price) = match kind {
            BackendKind::Local => (0.0, 0.0),
            BackendKind::Remote => (0.003, 0.015),
        };
        Self {
            descriptor: BackendDescriptor {
                name: name.into(),
                kind,
                model_id: "mock-model".to_string(),
                cost_per_kilo_input_usd: input_price,
                cost_per_kilo_output_usd: output_price,
                max_context_tokens: 8_192,
                capability_tags: vec!["general".to_string()],
            },
            outcomes: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Replace the capability tags.
    pub fn with_capabilities(mut self, tags: &[&str]) -> Self {
        self.descriptor.capability_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Override the per-kilotoken pricing.
    pub fn with_pricing(mut self, input: f64, output: f64) -> Self {
        self.descriptor.cost_per_kilo_input_usd = input;
        self.descriptor.cost_per_kilo_output_usd = output;
        self
    }

    /// Override the context window.
    pub fn with_max_context(mut self, tokens: u32) -> Self {
        self.descriptor.max_context_tokens = tokens;
        self
    }

    /// Pre-load scripted outcomes.
    pub fn with_outcomes(self, outcomes: Vec<MockOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = VecDeque::from(outcomes);
        self
    }

    /// Append an outcome to the script.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Number of invocations observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompt of the most recent invocation.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> MockOutcome {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockOutcome::reply("mock reply"))
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        prompt: &str,
        _params: &CallParams,
    ) -> Result<BackendReply, QuorumError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        match self.next_outcome() {
            MockOutcome::Reply { text, usage } => Ok(BackendReply {
                content: text,
                usage,
            }),
            MockOutcome::Slow { delay, text } => {
                tokio::time::sleep(delay).await;
                Ok(BackendReply {
                    content: text,
                    usage: TokenUsage::new(10, 20),
                })
            }
            MockOutcome::RateLimited(message) => Err(QuorumError::RateLimited {
                backend: self.descriptor.name.clone(),
                message,
            }),
            MockOutcome::Unavailable(message) => Err(QuorumError::Unavailable {
                backend: self.descriptor.name.clone(),
                message,
            }),
            MockOutcome::Invalid(message) => Err(QuorumError::InvalidRequest { message }),
        }
    }
}
