// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use offline_inference::config::{EngineOptions, ModelSelection, SamplingConfig};
use offline_inference::inference::{
    CompletionOutput, FinishReason, GenerationResult, InferenceBackend, InferenceEngine,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ConfigureProcess { batch_invariant: bool },
    Load { model: String, parallelism_degree: u32 },
    Generate { prompts: Vec<String>, sampling: SamplingConfig },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Backend double that records every call and echoes `<stub-PROMPT>`
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: CallLog,
    pub fail_load: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }
}

pub struct EchoEngine {
    calls: CallLog,
}

#[async_trait]
impl InferenceEngine for EchoEngine {
    async fn generate(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<GenerationResult>> {
        self.calls.lock().unwrap().push(Call::Generate {
            prompts: prompts.to_vec(),
            sampling: sampling.clone(),
        });

        Ok(prompts
            .iter()
            .map(|prompt| GenerationResult {
                prompt: prompt.clone(),
                outputs: (0..sampling.n())
                    .map(|index| CompletionOutput {
                        index,
                        text: format!("<stub-{}>", prompt),
                        token_count: 1,
                        finish_reason: FinishReason::Stop,
                    })
                    .collect(),
            })
            .collect())
    }
}

#[async_trait]
impl InferenceBackend for RecordingBackend {
    type Engine = EchoEngine;

    fn configure_process(&self, options: &EngineOptions) {
        self.calls.lock().unwrap().push(Call::ConfigureProcess {
            batch_invariant: options.batch_invariant,
        });
    }

    async fn load(&self, selection: &ModelSelection, _options: &EngineOptions) -> Result<EchoEngine> {
        self.calls.lock().unwrap().push(Call::Load {
            model: selection.model.clone(),
            parallelism_degree: selection.parallelism_degree,
        });
        if self.fail_load {
            return Err(anyhow!("model not found: {}", selection.model));
        }
        Ok(EchoEngine {
            calls: self.calls.clone(),
        })
    }
}
