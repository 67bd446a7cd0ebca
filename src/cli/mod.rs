// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    default_prompts,
    model::DEFAULT_PARALLELISM,
    sampling::{
        DEFAULT_CANDIDATES, DEFAULT_MAX_TOKENS, DEFAULT_SEED, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
    },
    EngineOptions, ModelSelection, RunConfig, SamplingConfig, DEFAULT_MODEL,
};
use crate::inference::{LlamaCppBackend, OutputFormat, ResultFormatter};
use crate::models::{ModelResolver, ResolverConfig};
use crate::runner::OfflineRunner;

/// Offline batch text generation
///
/// With no arguments, completes the built-in prompts with temperature 0.7,
/// top-p 0.95, 100 new tokens and seed 42.
#[derive(Parser, Debug)]
#[command(name = "offline-inference")]
#[command(version)]
#[command(about = "Generate completions for a fixed prompt list with deterministic sampling", long_about = None)]
pub struct Cli {
    /// Local .gguf path, `owner/repo:file.gguf`, or `owner/repo`
    #[arg(long, env = "OFFLINE_INFERENCE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Number of execution units the engine spreads work over
    #[arg(
        long,
        env = "OFFLINE_INFERENCE_TENSOR_PARALLEL_SIZE",
        default_value_t = DEFAULT_PARALLELISM
    )]
    pub tensor_parallel_size: u32,

    /// Prompt to complete; repeat for several (defaults to the built-in list)
    #[arg(long = "prompt")]
    pub prompts: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    #[arg(long, default_value_t = DEFAULT_TOP_P)]
    pub top_p: f32,

    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: usize,

    /// Sampling seed; 4294967295 is reserved by llama.cpp for "random"
    #[arg(
        long,
        default_value_t = DEFAULT_SEED,
        value_parser = clap::value_parser!(u32).range(0..i64::from(u32::MAX))
    )]
    pub seed: u32,

    /// Candidate completions per prompt
    #[arg(short = 'n', long = "num-candidates", default_value_t = DEFAULT_CANDIDATES)]
    pub n: usize,

    /// Allow results to depend on how prompts are grouped
    #[arg(long)]
    pub no_batch_invariant: bool,

    #[arg(long, env = "MAX_CONTEXT_LENGTH", default_value_t = 4096)]
    pub context_size: usize,

    #[arg(long, env = "GPU_LAYERS", default_value_t = 35)]
    pub gpu_layers: u32,

    #[arg(long, env = "LLAMA_BATCH_SIZE", default_value_t = 2048)]
    pub batch_size: usize,

    /// Threads per worker (defaults to available cores / parallelism)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output format: text or jsonl
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Hugging Face cache directory
    #[arg(long, env = "HF_HUB_CACHE")]
    pub cache_dir: Option<PathBuf>,

    /// Hugging Face access token for gated repositories
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Show download progress bars
    #[arg(long)]
    pub progress: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        let prompts = if self.prompts.is_empty() {
            default_prompts()
        } else {
            self.prompts.clone()
        };

        RunConfig {
            prompts,
            sampling: SamplingConfig::builder()
                .temperature(self.temperature)
                .top_p(self.top_p)
                .max_tokens(self.max_tokens)
                .seed(self.seed)
                .n(self.n)
                .build(),
            selection: ModelSelection {
                model: self.model.clone(),
                parallelism_degree: self.tensor_parallel_size,
            },
            engine: EngineOptions {
                batch_invariant: !self.no_batch_invariant,
                context_size: self.context_size,
                gpu_layers: self.gpu_layers,
                batch_size: self.batch_size,
                thread_count: self.threads,
            },
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            cache_dir: self.cache_dir.clone(),
            token: self.hf_token.clone(),
            show_progress: self.progress,
        }
    }
}

/// Execute an offline run and print to stdout
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.run_config();
    tracing::info!(
        "Running {} prompts on {} (parallelism={}, batch_invariant={})",
        config.prompts.len(),
        config.selection.model,
        config.selection.parallelism_degree,
        config.engine.batch_invariant
    );

    let backend = LlamaCppBackend::new(ModelResolver::new(cli.resolver_config()));
    let runner = OfflineRunner::new(backend, ResultFormatter::new(cli.format));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    runner
        .run(&config, &mut out)
        .await
        .map_err(|e| anyhow!("{:#}", e))?;
    Ok(())
}
