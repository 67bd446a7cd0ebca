// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Rendering of generation results for standard output
//!
//! The text format prints, per result, the quoted prompt and the quoted
//! first candidate followed by a blank line. Quoting follows Python's
//! `repr` for strings so output stays byte-comparable across runs and
//! tools.

use anyhow::{anyhow, Result};
use serde_json::json;
use std::fmt::Write as _;
use std::io::Write;
use std::str::FromStr;
use unicode_general_category::{get_general_category, GeneralCategory};

use super::backend::GenerationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per result
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "jsonl" | "json-lines" | "ndjson" => Ok(Self::JsonLines),
            _ => Err(format!("unknown output format '{}'", s)),
        }
    }
}

/// Whether Python prints `c` as-is inside a string literal.
///
/// Separators, control, format, surrogate, private-use and unassigned
/// code points are escaped; the ASCII space is the one exception.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::SpaceSeparator
    )
}

/// Quote `text` the way Python's `repr` quotes a `str`
pub fn repr(text: &str) -> String {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => {
                let code = c as u32;
                // write! on a String cannot fail
                let _ = if code < 0x100 {
                    write!(out, "\\x{:02x}", code)
                } else if code < 0x10000 {
                    write!(out, "\\u{:04x}", code)
                } else {
                    write!(out, "\\U{:08x}", code)
                };
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[derive(Debug, Clone, Default)]
pub struct ResultFormatter {
    format: OutputFormat,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &GenerationResult) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.format_text(result)),
            OutputFormat::JsonLines => self.format_json_line(result),
        }
    }

    fn format_text(&self, result: &GenerationResult) -> String {
        format!(
            "Prompt: {}\nGenerated: {}\n\n",
            repr(&result.prompt),
            repr(result.first_text().unwrap_or_default())
        )
    }

    fn format_json_line(&self, result: &GenerationResult) -> Result<String> {
        let output = json!({
            "prompt": result.prompt,
            "outputs": result.outputs,
        });
        let line = serde_json::to_string(&output)
            .map_err(|e| anyhow!("Failed to serialize JSON: {}", e))?;
        Ok(format!("{}\n", line))
    }

    /// Write every result in order; returns the number of results written
    pub fn write_all<W: Write>(&self, results: &[GenerationResult], out: &mut W) -> Result<usize> {
        for result in results {
            out.write_all(self.format(result)?.as_bytes())?;
        }
        out.flush()?;
        Ok(results.len())
    }
}
