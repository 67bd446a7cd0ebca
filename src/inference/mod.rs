// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod backend;
pub mod engine;
pub mod error;
pub mod format;

// Re-export main types for convenience
pub use backend::{
    CompletionOutput, FinishReason, GenerationResult, InferenceBackend, InferenceEngine,
};
pub use engine::{LlamaCppBackend, LlmEngine};
pub use error::InferenceError;
pub use format::{repr, OutputFormat, ResultFormatter};
