// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types raised while resolving, loading and running a model

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    /// Model identifier is neither a local GGUF file nor a repo reference
    #[error("Invalid model identifier: {0}")]
    InvalidModelId(String),

    /// Fetching the model from the Hugging Face hub failed
    #[error("Failed to fetch {filename} from {repo_id}: {reason}")]
    ModelFetchFailed {
        repo_id: String,
        filename: String,
        reason: String,
    },

    #[error("Failed to create Hugging Face client: {0}")]
    HubClient(String),

    /// Repository has no GGUF file to load
    #[error("No GGUF file found in repository {0}")]
    NoGgufFile(String),

    #[error("Failed to initialize backend: {0}")]
    BackendInit(String),

    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Invalid parallelism degree: {0} (must be at least 1)")]
    InvalidParallelism(u32),

    #[error("Invalid sampling parameter {name}: {reason}")]
    InvalidSampling { name: &'static str, reason: String },

    #[error("Failed to tokenize prompt: {0}")]
    Tokenize(String),

    /// Prompt and completion do not fit in the context window
    #[error("Prompt of {prompt_tokens} tokens plus {max_tokens} new tokens exceeds context size {context_size}")]
    ContextOverflow {
        prompt_tokens: usize,
        max_tokens: usize,
        context_size: usize,
    },

    #[error("Failed to create context: {0}")]
    ContextCreate(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Generation worker panicked")]
    WorkerPanicked,
}
