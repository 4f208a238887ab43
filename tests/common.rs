//! Shared fixtures: in-memory signals and on-disk datum files.
#![allow(dead_code)]
use anyhow::Result;
use ndarray::Array2;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tfspkl::{Conversation, SignalSource};

pub const SUFFIX: &str = "_datum.txt";

/// Signals keyed by conversation path. Unknown paths load as empty.
#[derive(Default)]
pub struct MemorySignals {
    pub signals: HashMap<PathBuf, Array2<f32>>,
}

impl SignalSource for MemorySignals {
    fn load_signal(&self, conversation: &Conversation) -> Result<Array2<f32>> {
        Ok(self
            .signals
            .get(&conversation.path)
            .cloned()
            .unwrap_or_else(|| Array2::zeros((0, conversation.electrodes.len()))))
    }
}

/// Temporary directory holding datum files plus the matching signals.
pub struct Fixture {
    pub dir: TempDir,
    pub signals: MemorySignals,
    pub conversations: Vec<Conversation>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            signals: MemorySignals::default(),
            conversations: vec![],
        }
    }

    /// Add a conversation with a datum file and a signal.
    pub fn add(&mut self, name: &str, signal: Array2<f32>, datum: &str) -> &mut Self {
        let path = self.dir.path().join(name);
        write_datum(&path, datum);
        let n_ch = signal.ncols();
        self.signals.signals.insert(path.clone(), signal);
        self.conversations.push(
            Conversation::new(path, SUFFIX).with_electrodes((1..=n_ch).collect(), vec![]),
        );
        self
    }

    /// Add a conversation whose datum file does not exist.
    pub fn add_without_datum(&mut self, name: &str, signal: Array2<f32>) -> &mut Self {
        let path = self.dir.path().join(name);
        let n_ch = signal.ncols();
        self.signals.signals.insert(path.clone(), signal);
        self.conversations.push(
            Conversation::new(path, SUFFIX).with_electrodes((1..=n_ch).collect(), vec![]),
        );
        self
    }
}

pub fn write_datum(conversation: &Path, datum: &str) {
    let mut name = conversation.as_os_str().to_owned();
    name.push(SUFFIX);
    std::fs::write(PathBuf::from(name), datum).unwrap();
}

/// [T, C] signal where sample `t` of electrode `c` is `t + 1000·c`.
pub fn ramp(n_t: usize, n_ch: usize) -> Array2<f32> {
    Array2::from_shape_fn((n_t, n_ch), |(t, c)| (t + 1000 * c) as f32)
}
