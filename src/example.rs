//! Labeled time intervals and datum-file parsing.
//!
//! A datum file has one example per line:
//!
//! ```text
//! label  start  end  [extra columns…]
//! ```
//!
//! `start`/`end` are sample indices into the conversation's raw signal and
//! may be written as floats (`1024.0`); they are truncated toward zero.
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// One labeled interval `[start, end]` in samples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Example {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl Example {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self { label: label.into(), start, end }
    }
}

/// Examples whose `end` lies strictly before `trimmed_len`.
///
/// The boundary is exclusive: `end == trimmed_len` is dropped.
pub fn filter_trimmed(examples: &[Example], trimmed_len: usize) -> Vec<Example> {
    examples
        .iter()
        .filter(|e| e.end < trimmed_len)
        .cloned()
        .collect()
}

/// Parse datum text, dropping labels found in `exclude_words`.
pub fn parse_datum(text: &str, exclude_words: &HashSet<String>) -> Result<Vec<Example>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(label), Some(start), Some(end)) = (fields.next(), fields.next(), fields.next())
        else {
            bail!("line {}: expected `label start end`, got {line:?}", lineno + 1);
        };
        if exclude_words.contains(label) {
            continue;
        }
        let start = parse_index(start).with_context(|| format!("line {}: start", lineno + 1))?;
        let end = parse_index(end).with_context(|| format!("line {}: end", lineno + 1))?;
        if end < start {
            bail!("line {}: end {end} precedes start {start}", lineno + 1);
        }
        out.push(Example::new(label, start, end));
    }
    Ok(out)
}

/// Read and parse a datum file.
pub fn read_datum(path: &Path, exclude_words: &HashSet<String>) -> Result<Vec<Example>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading datum {}", path.display()))?;
    parse_datum(&text, exclude_words).with_context(|| format!("parsing datum {}", path.display()))
}

fn parse_index(field: &str) -> Result<usize> {
    let v: f64 = field
        .parse()
        .with_context(|| format!("{field:?} is not a number"))?;
    if !v.is_finite() || v < 0.0 {
        bail!("{field:?} is not a valid sample index");
    }
    Ok(v.trunc() as usize)
}
