// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for offline-inference

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Backend the engine is built on
pub const BACKEND: &str = "llama.cpp";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "batch-invariant",
    "seeded-sampling",
    "hf-hub-models",
    "jsonl-output",
];

pub fn get_version_string() -> String {
    format!("offline-inference v{} ({})", VERSION_NUMBER, BACKEND)
}
