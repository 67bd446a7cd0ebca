// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod model;
pub mod sampling;

pub use model::{EngineOptions, ModelSelection, BATCH_INVARIANT_ENV, DEFAULT_MODEL};
pub use sampling::{SamplingConfig, SamplingConfigBuilder};

/// Prompts completed by a default run
pub const DEFAULT_PROMPTS: [&str; 3] = [
    "The future of AI is",
    "Machine learning enables",
    "Deep learning models can",
];

pub fn default_prompts() -> Vec<String> {
    DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
}

/// Everything a single offline run needs
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub prompts: Vec<String>,
    pub sampling: SamplingConfig,
    pub selection: ModelSelection,
    pub engine: EngineOptions,
}

impl RunConfig {
    /// The hard-coded run: default prompts, sampling, model and engine options
    pub fn standard() -> Self {
        Self {
            prompts: default_prompts(),
            ..Self::default()
        }
    }
}
