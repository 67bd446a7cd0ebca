// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use async_trait::async_trait;
use llama_cpp_2::{
    context::params::LlamaContextParams,
    llama_backend::LlamaBackend,
    llama_batch::LlamaBatch,
    model::{params::LlamaModelParams, AddBos, LlamaModel, Special},
    sampling::LlamaSampler,
    token::LlamaToken,
};
use std::num::NonZeroU32;
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

use super::backend::{
    CompletionOutput, FinishReason, GenerationResult, InferenceBackend, InferenceEngine,
};
use super::error::InferenceError;
use crate::config::{EngineOptions, ModelSelection, SamplingConfig};
use crate::models::ModelResolver;

/// Micro-batch size pinned in batch-invariant mode
const INVARIANT_UBATCH: u32 = 512;

/// Sanitize prompt text for tokenization
///
/// Removes characters that cause issues with C string handling in llama.cpp:
/// - Null bytes (\0) - C strings use null as terminator
/// - Other control characters that may cause issues
fn sanitize_prompt_for_tokenizer(prompt: &str) -> String {
    prompt
        .chars()
        .filter(|c| {
            // Keep: tab (0x09), newline (0x0A), carriage return (0x0D)
            *c != '\0' && (*c >= ' ' || *c == '\t' || *c == '\n' || *c == '\r')
        })
        .collect()
}

/// Split `len` prompts into at most `workers` contiguous, ordered ranges
pub(crate) fn shard_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let base = len / workers;
    let extra = len % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

fn validate_sampling(sampling: &SamplingConfig) -> Result<(), InferenceError> {
    if !sampling.temperature().is_finite() {
        return Err(InferenceError::InvalidSampling {
            name: "temperature",
            reason: format!("{} is not finite", sampling.temperature()),
        });
    }
    if !(sampling.top_p() > 0.0 && sampling.top_p() <= 1.0) {
        return Err(InferenceError::InvalidSampling {
            name: "top_p",
            reason: format!("{} is outside (0, 1]", sampling.top_p()),
        });
    }
    if sampling.max_tokens() == 0 {
        return Err(InferenceError::InvalidSampling {
            name: "max_tokens",
            reason: "must be at least 1".to_string(),
        });
    }
    if sampling.n() == 0 {
        return Err(InferenceError::InvalidSampling {
            name: "n",
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Backend that resolves GGUF weights and serves them through llama.cpp
pub struct LlamaCppBackend {
    resolver: ModelResolver,
}

impl LlamaCppBackend {
    pub fn new(resolver: ModelResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl InferenceBackend for LlamaCppBackend {
    type Engine = LlmEngine;

    async fn load(&self, selection: &ModelSelection, options: &EngineOptions) -> Result<LlmEngine> {
        if selection.parallelism_degree == 0 {
            return Err(InferenceError::InvalidParallelism(selection.parallelism_degree).into());
        }

        let model_path = self.resolver.resolve(&selection.model).await?;
        LlmEngine::load(&model_path, selection.parallelism_degree, options.clone())
    }
}

pub struct LlmEngine {
    backend: LlamaBackend,
    model: LlamaModel,
    options: EngineOptions,
    workers: usize,
    threads_per_worker: i32,
}

impl LlmEngine {
    pub fn load(model_path: &Path, parallelism_degree: u32, options: EngineOptions) -> Result<Self> {
        let backend =
            LlamaBackend::init().map_err(|e| InferenceError::BackendInit(format!("{:?}", e)))?;

        let model_params = LlamaModelParams::default().with_n_gpu_layers(options.gpu_layers);

        tracing::info!(
            "📦 Loading model {} (gpu_layers={}, parallelism={})",
            model_path.display(),
            options.gpu_layers,
            parallelism_degree
        );
        let model = LlamaModel::load_from_file(&backend, model_path, &model_params).map_err(|e| {
            InferenceError::ModelLoad {
                path: model_path.to_path_buf(),
                reason: format!("{:?}", e),
            }
        })?;

        // Thread count depends only on configuration, never on how many prompts arrive
        let workers = parallelism_degree as usize;
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let threads_per_worker = options
            .thread_count
            .unwrap_or_else(|| (available / workers).max(1)) as i32;

        tracing::info!(
            "✅ Model loaded: workers={}, threads_per_worker={}, batch_invariant={}",
            workers,
            threads_per_worker,
            options.batch_invariant
        );

        Ok(Self {
            backend,
            model,
            options,
            workers,
            threads_per_worker,
        })
    }

    fn complete_prompt(&self, prompt: &str, sampling: &SamplingConfig) -> Result<GenerationResult> {
        let sanitized = sanitize_prompt_for_tokenizer(prompt);
        if sanitized.len() != prompt.len() {
            tracing::warn!(
                "🧹 Sanitized prompt: removed {} problematic bytes (original: {}, sanitized: {})",
                prompt.len() - sanitized.len(),
                prompt.len(),
                sanitized.len()
            );
        }

        let prompt_tokens = self
            .model
            .str_to_token(&sanitized, AddBos::Always)
            .map_err(|e| InferenceError::Tokenize(format!("{:?}", e)))?;
        if prompt_tokens.is_empty() {
            return Err(InferenceError::Tokenize("prompt produced no tokens".to_string()).into());
        }

        let needed = prompt_tokens.len() + sampling.max_tokens();
        if needed > self.options.context_size {
            return Err(InferenceError::ContextOverflow {
                prompt_tokens: prompt_tokens.len(),
                max_tokens: sampling.max_tokens(),
                context_size: self.options.context_size,
            }
            .into());
        }

        let outputs = (0..sampling.n())
            .map(|index| self.decode_candidate(&prompt_tokens, sampling, index))
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationResult {
            prompt: prompt.to_string(),
            outputs,
        })
    }

    fn context_params(&self, n_batch: usize) -> LlamaContextParams {
        let params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.options.context_size as u32))
            .with_n_batch(n_batch as u32)
            .with_n_threads(self.threads_per_worker)
            .with_n_threads_batch(self.threads_per_worker);

        if self.options.batch_invariant {
            params.with_n_ubatch(INVARIANT_UBATCH.min(n_batch as u32))
        } else {
            params
        }
    }

    fn sampler(sampling: &SamplingConfig, index: usize) -> LlamaSampler {
        if sampling.temperature() <= 0.0 {
            return LlamaSampler::greedy();
        }
        LlamaSampler::chain_simple([
            LlamaSampler::temp(sampling.temperature()),
            LlamaSampler::top_p(sampling.top_p(), 1),
            LlamaSampler::dist(sampling.candidate_seed(index)),
        ])
    }

    /// Decode one candidate in a fresh context
    fn decode_candidate(
        &self,
        prompt_tokens: &[LlamaToken],
        sampling: &SamplingConfig,
        index: usize,
    ) -> Result<CompletionOutput> {
        let start_time = Instant::now();
        let n_batch = self.options.batch_size.max(prompt_tokens.len());

        let mut context = self
            .model
            .new_context(&self.backend, self.context_params(n_batch))
            .map_err(|e| InferenceError::ContextCreate(format!("{:?}", e)))?;

        let mut batch = LlamaBatch::new(n_batch, 1);
        let last = prompt_tokens.len() - 1;
        for (i, &token) in prompt_tokens.iter().enumerate() {
            batch
                .add(token, i as i32, &[0], i == last)
                .map_err(|e| InferenceError::Decode(format!("{:?}", e)))?;
        }
        context
            .decode(&mut batch)
            .map_err(|e| InferenceError::Decode(format!("{:?}", e)))?;

        let mut sampler = Self::sampler(sampling, index);
        let mut bytes: Vec<u8> = Vec::new();
        let mut n_cur = prompt_tokens.len();
        let limit = prompt_tokens.len() + sampling.max_tokens();
        let mut finish_reason = FinishReason::Length;

        while n_cur < limit {
            let token = sampler.sample(&context, -1);

            if self.model.is_eog_token(token) {
                finish_reason = FinishReason::Stop;
                break;
            }

            // Multi-byte characters may span tokens; decode the whole buffer at the end
            match self.model.token_to_bytes(token, Special::Plaintext) {
                Ok(piece) => bytes.extend_from_slice(&piece),
                Err(e) => {
                    tracing::warn!(token_id = token.0, "Token has no text piece: {:?}", e);
                }
            }

            batch.clear();
            batch
                .add(token, n_cur as i32, &[0], true)
                .map_err(|e| InferenceError::Decode(format!("{:?}", e)))?;
            context
                .decode(&mut batch)
                .map_err(|e| InferenceError::Decode(format!("{:?}", e)))?;

            n_cur += 1;
        }

        let token_count = n_cur - prompt_tokens.len();
        tracing::debug!(
            "🏁 Candidate {} ended: tokens={}, finish_reason={}, elapsed={:?}",
            index,
            token_count,
            finish_reason.as_str(),
            start_time.elapsed()
        );

        Ok(CompletionOutput {
            index,
            text: String::from_utf8_lossy(&bytes).into_owned(),
            token_count,
            finish_reason,
        })
    }
}

#[async_trait]
impl InferenceEngine for LlmEngine {
    async fn generate(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<GenerationResult>> {
        validate_sampling(sampling)?;

        let start_time = Instant::now();
        let shards = shard_ranges(prompts.len(), self.workers);
        tracing::info!(
            "🚀 Starting generation: prompts={}, shards={}, max_tokens={}",
            prompts.len(),
            shards.len(),
            sampling.max_tokens()
        );

        let per_shard = std::thread::scope(|scope| {
            let handles: Vec<_> = shards
                .into_iter()
                .map(|range| {
                    scope.spawn(move || {
                        prompts[range]
                            .iter()
                            .map(|prompt| self.complete_prompt(prompt, sampling))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(shard) => shard,
                    Err(_) => Err(InferenceError::WorkerPanicked.into()),
                })
                .collect::<Result<Vec<Vec<GenerationResult>>>>()
        })?;

        let results: Vec<GenerationResult> = per_shard.into_iter().flatten().collect();
        tracing::info!(
            "🏁 Generation finished: results={}, elapsed={:?}",
            results.len(),
            start_time.elapsed()
        );
        Ok(results)
    }
}
