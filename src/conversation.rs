//! Conversation descriptors and the conversation list file.
//!
//! Each line of the list describes one recording session:
//!
//! ```text
//! path , suffix , electrode ids , electrode names
//! /data/NY717/conv_01 , _datum.txt , 1 2 3 , LGA1 LGA2 LGA3
//! ```
//!
//! The field separator is [`BuildConfig::delimiter`](crate::BuildConfig::delimiter);
//! ids and names are separated by whitespace. Names are optional.
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// One recording session as seen by the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// Conversation path; also the prefix of the datum-file pattern.
    pub path: PathBuf,
    /// Appended to `path` to glob for the datum file, e.g. `"*_datum*.txt"`.
    pub suffix: String,
    /// 1-based electrode ids to extract.
    pub electrodes: Vec<usize>,
    pub electrode_names: Vec<String>,
}

impl Conversation {
    pub fn new(path: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            suffix: suffix.into(),
            electrodes: vec![],
            electrode_names: vec![],
        }
    }

    pub fn with_electrodes(mut self, electrodes: Vec<usize>, names: Vec<String>) -> Self {
        self.electrodes = electrodes;
        self.electrode_names = names;
        self
    }

    /// Last path component, used in diagnostics.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Glob pattern for the datum file: `path` immediately followed by `suffix`.
    pub fn datum_pattern(&self) -> String {
        format!("{}{}", self.path.display(), self.suffix)
    }

    /// First path matching [`Conversation::datum_pattern`], in glob order.
    ///
    /// Returns `None` when nothing matches or the pattern is invalid. A match
    /// that turns out not to be a readable file fails later, when the
    /// example source opens it.
    pub fn resolve_datum(&self) -> Option<PathBuf> {
        let pattern = self.datum_pattern();
        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("{}: invalid datum pattern {pattern:?}: {e}", self.name());
                return None;
            }
        };
        paths.filter_map(|p| p.ok()).next()
    }
}

/// Parse a conversation list; see the module docs for the format.
pub fn parse_conversation_list(text: &str, delimiter: char) -> Result<Vec<Conversation>> {
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).map(str::trim).collect();
        if fields.len() < 3 || fields.len() > 4 {
            bail!(
                "line {}: expected 3 or 4 {delimiter:?}-separated fields, got {}",
                lineno + 1,
                fields.len()
            );
        }
        if fields[0].is_empty() {
            bail!("line {}: empty conversation path", lineno + 1);
        }
        let electrodes = fields[2]
            .split_whitespace()
            .map(|id| {
                id.parse::<usize>()
                    .with_context(|| format!("line {}: electrode id {id:?}", lineno + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        let names: Vec<String> = fields
            .get(3)
            .map(|f| f.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        if !names.is_empty() && names.len() != electrodes.len() {
            bail!(
                "line {}: {} electrode names for {} electrodes",
                lineno + 1,
                names.len(),
                electrodes.len()
            );
        }
        out.push(Conversation::new(fields[0], fields[1]).with_electrodes(electrodes, names));
    }
    Ok(out)
}

/// Read and parse a conversation list file.
pub fn read_conversation_list(path: &Path, delimiter: char) -> Result<Vec<Conversation>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading conversation list {}", path.display()))?;
    parse_conversation_list(&text, delimiter)
        .with_context(|| format!("parsing conversation list {}", path.display()))
}
