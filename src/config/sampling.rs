// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Sampling configuration shared by every prompt of a run
//!
//! A `SamplingConfig` is assembled once through `SamplingConfigBuilder` and
//! is read-only afterwards. No range checks happen here; the inference
//! engine rejects values it cannot use.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_TOKENS: usize = 100;
pub const DEFAULT_SEED: u32 = 42;

/// llama.cpp reads this seed as "pick one at random"
const RANDOM_SEED_SENTINEL: u32 = u32::MAX;
pub const DEFAULT_CANDIDATES: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    seed: u32,
    n: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfigBuilder::default().build()
    }
}

impl SamplingConfig {
    pub fn builder() -> SamplingConfigBuilder {
        SamplingConfigBuilder::default()
    }

    /// Softmax temperature; 0 or below selects greedy decoding
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Nucleus-sampling probability mass
    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of candidate completions per prompt
    pub fn n(&self) -> usize {
        self.n
    }

    /// Seed for candidate `index` of a prompt.
    ///
    /// Candidate 0 uses the configured seed, so a single-candidate run
    /// samples with exactly that seed for every prompt. Seeds wrap within
    /// `0..u32::MAX` and never hit the random-seed sentinel.
    pub fn candidate_seed(&self, index: usize) -> u32 {
        let modulus = u64::from(RANDOM_SEED_SENTINEL);
        ((u64::from(self.seed) + (index as u64 % modulus)) % modulus) as u32
    }
}

#[derive(Debug, Clone)]
pub struct SamplingConfigBuilder {
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    seed: u32,
    n: usize,
}

impl Default for SamplingConfigBuilder {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
            seed: DEFAULT_SEED,
            n: DEFAULT_CANDIDATES,
        }
    }
}

impl SamplingConfigBuilder {
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    pub fn build(self) -> SamplingConfig {
        SamplingConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            seed: self.seed,
            n: self.n,
        }
    }
}
