// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod inference;
pub mod logging;
pub mod models;
pub mod runner;
pub mod version;

pub use config::{EngineOptions, ModelSelection, RunConfig, SamplingConfig};
pub use inference::{
    GenerationResult, InferenceBackend, InferenceEngine, InferenceError, LlamaCppBackend,
    ResultFormatter,
};
pub use runner::OfflineRunner;
