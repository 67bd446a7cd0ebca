// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turning a model identifier into a local GGUF path
//!
//! Accepted identifiers:
//! - a path to a `.gguf` file on disk
//! - `owner/repo:file.gguf` for a specific file on the Hugging Face hub
//! - `owner/repo`, in which case the repository's GGUF files are listed and
//!   a 4-bit K-quant is preferred

use anyhow::Result;
use hf_hub::api::tokio::{Api, ApiBuilder};
use std::path::{Path, PathBuf};

use crate::inference::InferenceError;

/// Quantization suffixes tried in order when a repo has several GGUF files
const PREFERRED_QUANTS: [&str; 3] = ["Q4_K_M", "Q4_K_S", "Q8_0"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Local(PathBuf),
    HuggingFace {
        repo_id: String,
        filename: Option<String>,
    },
}

fn is_repo_id(s: &str) -> bool {
    let mut parts = s.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

impl ModelSource {
    pub fn parse(id: &str) -> Result<Self, InferenceError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(InferenceError::InvalidModelId(id.to_string()));
        }

        let path = Path::new(id);
        if path.is_file() {
            return Ok(Self::Local(path.to_path_buf()));
        }

        if let Some((repo_id, filename)) = id.rsplit_once(':') {
            if is_repo_id(repo_id) && filename.ends_with(".gguf") {
                return Ok(Self::HuggingFace {
                    repo_id: repo_id.to_string(),
                    filename: Some(filename.to_string()),
                });
            }
            return Err(InferenceError::InvalidModelId(id.to_string()));
        }

        if id.ends_with(".gguf") {
            return Ok(Self::Local(path.to_path_buf()));
        }

        if is_repo_id(id) {
            return Ok(Self::HuggingFace {
                repo_id: id.to_string(),
                filename: None,
            });
        }

        Err(InferenceError::InvalidModelId(id.to_string()))
    }
}

/// Pick the GGUF file to load from a repository listing
pub fn select_gguf<'a>(files: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut ggufs: Vec<&str> = files
        .into_iter()
        .filter(|f| f.ends_with(".gguf"))
        .collect();
    ggufs.sort_unstable();

    PREFERRED_QUANTS
        .iter()
        .find_map(|quant| ggufs.iter().find(|f| f.contains(quant)).copied())
        .or_else(|| ggufs.first().copied())
}

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Overrides the hub cache directory
    pub cache_dir: Option<PathBuf>,
    pub token: Option<String>,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ModelResolver {
    config: ResolverConfig,
}

impl ModelResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    fn api(&self) -> Result<Api, InferenceError> {
        let mut builder = ApiBuilder::new().with_progress(self.config.show_progress);
        if let Some(dir) = &self.config.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        if self.config.token.is_some() {
            builder = builder.with_token(self.config.token.clone());
        }
        builder
            .build()
            .map_err(|e| InferenceError::HubClient(e.to_string()))
    }

    /// Resolve `id` to a GGUF file on disk, downloading it when needed
    pub async fn resolve(&self, id: &str) -> Result<PathBuf> {
        match ModelSource::parse(id)? {
            ModelSource::Local(path) => {
                if !path.is_file() {
                    return Err(InferenceError::ModelLoad {
                        path,
                        reason: "file does not exist".to_string(),
                    }
                    .into());
                }
                tracing::info!("Using local model {}", path.display());
                Ok(path)
            }
            ModelSource::HuggingFace { repo_id, filename } => {
                let api = self.api()?;
                let repo = api.model(repo_id.clone());

                let filename = match filename {
                    Some(name) => name,
                    None => {
                        let info = repo.info().await.map_err(|e| {
                            InferenceError::ModelFetchFailed {
                                repo_id: repo_id.clone(),
                                filename: "repository listing".to_string(),
                                reason: e.to_string(),
                            }
                        })?;
                        select_gguf(info.siblings.iter().map(|s| s.rfilename.as_str()))
                            .map(str::to_string)
                            .ok_or_else(|| InferenceError::NoGgufFile(repo_id.clone()))?
                    }
                };

                tracing::info!("📥 Fetching {} from {}", filename, repo_id);
                let path = repo
                    .get(&filename)
                    .await
                    .map_err(|e| InferenceError::ModelFetchFailed {
                        repo_id: repo_id.clone(),
                        filename: filename.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(path)
            }
        }
    }
}
