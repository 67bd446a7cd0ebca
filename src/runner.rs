// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! One offline run: configure, load, generate once, print, done

use anyhow::{bail, Context, Result};
use std::io::Write;

use crate::config::RunConfig;
use crate::inference::{GenerationResult, InferenceBackend, InferenceEngine, ResultFormatter};

pub struct OfflineRunner<B> {
    backend: B,
    formatter: ResultFormatter,
}

impl<B: InferenceBackend> OfflineRunner<B> {
    pub fn new(backend: B, formatter: ResultFormatter) -> Self {
        Self { backend, formatter }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the model and complete every prompt with a single engine call
    pub async fn generate(&self, config: &RunConfig) -> Result<Vec<GenerationResult>> {
        // Process-wide flags have to be in place before the engine exists
        self.backend.configure_process(&config.engine);

        let engine = self
            .backend
            .load(&config.selection, &config.engine)
            .await
            .with_context(|| format!("Failed to load model {}", config.selection.model))?;

        let results = engine.generate(&config.prompts, &config.sampling).await?;
        if results.len() != config.prompts.len() {
            bail!(
                "Engine returned {} results for {} prompts",
                results.len(),
                config.prompts.len()
            );
        }
        Ok(results)
    }

    /// Generate and write every result to `out`; returns the number printed
    pub async fn run<W: Write>(&self, config: &RunConfig, out: &mut W) -> Result<usize> {
        let results = self.generate(config).await?;
        let printed = self.formatter.write_all(&results, out)?;
        tracing::info!("Printed {} results", printed);
        Ok(printed)
    }
}
