// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

/// Hugging Face repository and GGUF file loaded when nothing else is given
pub const DEFAULT_MODEL: &str =
    "bartowski/Meta-Llama-3.1-8B-Instruct-GGUF:Meta-Llama-3.1-8B-Instruct-Q4_K_M.gguf";

pub const DEFAULT_PARALLELISM: u32 = 1;

/// Environment variable published before the engine initializes
pub const BATCH_INVARIANT_ENV: &str = "BATCH_INVARIANT";

/// Which model to load and over how many execution units to spread it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub model: String,
    pub parallelism_degree: u32,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            parallelism_degree: DEFAULT_PARALLELISM,
        }
    }
}

/// Engine-level settings handed to the backend at construction
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Results must not depend on how prompts are grouped
    pub batch_invariant: bool,
    pub context_size: usize,
    pub gpu_layers: u32,
    pub batch_size: usize,
    pub thread_count: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            batch_invariant: true,
            context_size: 4096,
            gpu_layers: 35,
            batch_size: 2048,
            thread_count: None,
        }
    }
}

impl EngineOptions {
    /// Value written to `BATCH_INVARIANT_ENV`
    pub fn batch_invariant_env_value(&self) -> &'static str {
        if self.batch_invariant {
            "1"
        } else {
            "0"
        }
    }

    /// Publish the determinism flag to the process environment.
    ///
    /// Must run before the inference engine is constructed; native code may
    /// read it once during initialization.
    pub fn publish_to_env(&self) {
        std::env::set_var(BATCH_INVARIANT_ENV, self.batch_invariant_env_value());
        tracing::debug!(
            "{}={} published",
            BATCH_INVARIANT_ENV,
            self.batch_invariant_env_value()
        );
    }
}
