// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Seam between the offline runner and the inference library
//!
//! `InferenceBackend` builds an engine for a model; `InferenceEngine`
//! completes a batch of prompts. The llama.cpp implementation lives in
//! `engine.rs`; tests substitute recording stubs.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{EngineOptions, ModelSelection, SamplingConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// An end-of-generation token was sampled
    Stop,
    /// `max_tokens` was reached
    Length,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutput {
    pub index: usize,
    pub text: String,
    pub token_count: usize,
    pub finish_reason: FinishReason,
}

/// Completions for one prompt, candidates in index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub prompt: String,
    pub outputs: Vec<CompletionOutput>,
}

impl GenerationResult {
    pub fn first_text(&self) -> Option<&str> {
        self.outputs.first().map(|o| o.text.as_str())
    }
}

#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Complete every prompt, returning one result per prompt in input order
    async fn generate(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<GenerationResult>>;
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    type Engine: InferenceEngine;

    /// Apply process-wide settings that must precede engine construction
    fn configure_process(&self, options: &EngineOptions) {
        options.publish_to_env();
    }

    async fn load(
        &self,
        selection: &ModelSelection,
        options: &EngineOptions,
    ) -> Result<Self::Engine>;
}
