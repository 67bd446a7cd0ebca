// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::stub::{Call, EchoEngine, RecordingBackend};
use anyhow::Result;
use async_trait::async_trait;
use offline_inference::config::{
    EngineOptions, ModelSelection, RunConfig, SamplingConfig, BATCH_INVARIANT_ENV,
};
use offline_inference::inference::{InferenceBackend, OutputFormat, ResultFormatter};
use offline_inference::OfflineRunner;
use std::sync::Mutex;

fn config_for(prompts: &[&str]) -> RunConfig {
    RunConfig {
        prompts: prompts.iter().map(|p| p.to_string()).collect(),
        ..RunConfig::standard()
    }
}

async fn run_to_string(backend: RecordingBackend, config: &RunConfig) -> (String, usize) {
    let runner = OfflineRunner::new(backend, ResultFormatter::default());
    let mut out = Vec::new();
    let printed = runner.run(config, &mut out).await.expect("run failed");
    (String::from_utf8(out).unwrap(), printed)
}

#[tokio::test]
async fn test_stub_echo_two_prompts() {
    let (output, printed) = run_to_string(RecordingBackend::new(), &config_for(&["a", "b"])).await;

    assert_eq!(printed, 2);
    assert_eq!(
        output,
        "Prompt: 'a'\nGenerated: '<stub-a>'\n\nPrompt: 'b'\nGenerated: '<stub-b>'\n\n"
    );
}

#[tokio::test]
async fn test_prints_one_block_per_prompt_in_order() {
    let prompts = ["first", "second", "third", "fourth", "fifth"];
    let (output, printed) = run_to_string(RecordingBackend::new(), &config_for(&prompts)).await;

    assert_eq!(printed, prompts.len());
    let printed_prompts: Vec<&str> = output
        .lines()
        .filter_map(|line| line.strip_prefix("Prompt: "))
        .collect();
    let expected: Vec<String> = prompts.iter().map(|p| format!("'{}'", p)).collect();
    assert_eq!(printed_prompts, expected);
    assert_eq!(output.matches("Generated: ").count(), prompts.len());
}

#[tokio::test]
async fn test_standard_run_sends_fixed_sampling_values() {
    let backend = RecordingBackend::new();
    let calls = backend.calls.clone();
    let (_, printed) = run_to_string(backend, &RunConfig::standard()).await;
    assert_eq!(printed, 3);

    let calls = calls.lock().unwrap();
    let sampling = calls
        .iter()
        .find_map(|call| match call {
            Call::Generate { sampling, .. } => Some(sampling.clone()),
            _ => None,
        })
        .expect("generate was never called");

    assert!((sampling.temperature() - 0.7).abs() < f32::EPSILON);
    assert!((sampling.top_p() - 0.95).abs() < f32::EPSILON);
    assert_eq!(sampling.max_tokens(), 100);
    assert_eq!(sampling.seed(), 42);
}

#[tokio::test]
async fn test_flag_configured_before_engine_constructed() {
    let backend = RecordingBackend::new();
    let calls = backend.calls.clone();
    run_to_string(backend, &config_for(&["a"])).await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], Call::ConfigureProcess { batch_invariant: true });
    assert!(matches!(
        &calls[1],
        Call::Load { parallelism_degree: 1, .. }
    ));
    assert!(matches!(&calls[2], Call::Generate { prompts, .. } if prompts == &["a".to_string()]));
}

#[tokio::test]
async fn test_generate_called_exactly_once() {
    let backend = RecordingBackend::new();
    let calls = backend.calls.clone();
    run_to_string(backend, &config_for(&["a", "b", "c"])).await;

    let generate_calls = calls
        .lock()
        .unwrap()
        .iter()
        .filter(|call| matches!(call, Call::Generate { .. }))
        .count();
    assert_eq!(generate_calls, 1);
}

#[tokio::test]
async fn test_two_runs_print_identical_output() {
    let config = RunConfig::standard();
    let (first, _) = run_to_string(RecordingBackend::new(), &config).await;
    let (second, _) = run_to_string(RecordingBackend::new(), &config).await;
    assert_eq!(first, second);

    // Reusing one runner must not leak state between runs either
    let runner = OfflineRunner::new(RecordingBackend::new(), ResultFormatter::default());
    let mut a = Vec::new();
    let mut b = Vec::new();
    runner.run(&config, &mut a).await.unwrap();
    runner.run(&config, &mut b).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_load_failure_propagates_and_prints_nothing() {
    let backend = RecordingBackend::failing();
    let calls = backend.calls.clone();
    let runner = OfflineRunner::new(backend, ResultFormatter::default());

    let mut out = Vec::new();
    let err = runner
        .run(&RunConfig::standard(), &mut out)
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("model not found"));
    assert!(out.is_empty());
    assert!(!calls
        .lock()
        .unwrap()
        .iter()
        .any(|call| matches!(call, Call::Generate { .. })));
}

#[tokio::test]
async fn test_json_lines_output() {
    let runner = OfflineRunner::new(
        RecordingBackend::new(),
        ResultFormatter::new(OutputFormat::JsonLines),
    );
    let mut out = Vec::new();
    runner.run(&config_for(&["a", "b"]), &mut out).await.unwrap();

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["prompt"], "b");
    assert_eq!(lines[1]["outputs"][0]["text"], "<stub-b>");
}

#[tokio::test]
async fn test_only_first_candidate_printed() {
    let config = RunConfig {
        prompts: vec!["a".to_string()],
        sampling: SamplingConfig::builder().n(3).build(),
        ..RunConfig::standard()
    };
    let (output, printed) = run_to_string(RecordingBackend::new(), &config).await;
    assert_eq!(printed, 1);
    assert_eq!(output.matches("Generated: ").count(), 1);
}

/// Uses the default `configure_process` and checks the environment at load time
struct EnvProbeBackend {
    seen_at_load: Mutex<Option<String>>,
    inner: RecordingBackend,
}

#[async_trait]
impl InferenceBackend for EnvProbeBackend {
    type Engine = EchoEngine;

    async fn load(&self, selection: &ModelSelection, options: &EngineOptions) -> Result<EchoEngine> {
        *self.seen_at_load.lock().unwrap() = std::env::var(BATCH_INVARIANT_ENV).ok();
        self.inner.load(selection, options).await
    }
}

#[tokio::test]
async fn test_default_configure_publishes_env_before_load() {
    let runner = OfflineRunner::new(
        EnvProbeBackend {
            seen_at_load: Mutex::new(None),
            inner: RecordingBackend::new(),
        },
        ResultFormatter::default(),
    );
    let mut out = Vec::new();
    runner.run(&config_for(&["a"]), &mut out).await.unwrap();

    assert_eq!(
        runner.backend().seen_at_load.lock().unwrap().as_deref(),
        Some("1")
    );
}
