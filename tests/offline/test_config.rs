// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use offline_inference::config::{default_prompts, RunConfig, SamplingConfig, DEFAULT_MODEL};
use offline_inference::models::ModelSource;

#[test]
fn test_standard_run_config() {
    let config = RunConfig::standard();

    assert_eq!(
        config.prompts,
        vec![
            "The future of AI is".to_string(),
            "Machine learning enables".to_string(),
            "Deep learning models can".to_string(),
        ]
    );
    assert_eq!(config.sampling, SamplingConfig::default());
    assert_eq!(config.selection.model, DEFAULT_MODEL);
    assert_eq!(config.selection.parallelism_degree, 1);
    assert!(config.engine.batch_invariant);
}

#[test]
fn test_sampling_config_is_shared_by_value() {
    let config = RunConfig::standard();
    let copy = config.sampling.clone();
    assert_eq!(copy, config.sampling);
    assert_eq!(default_prompts().len(), 3);
}

#[test]
fn test_default_model_points_at_hub_gguf() {
    match ModelSource::parse(DEFAULT_MODEL).unwrap() {
        ModelSource::HuggingFace { repo_id, filename } => {
            assert!(repo_id.contains("Llama-3.1-8B-Instruct"));
            assert!(filename.unwrap().ends_with(".gguf"));
        }
        other => panic!("unexpected source: {:?}", other),
    }
}
