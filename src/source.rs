//! Collaborator contracts for the build, with file-backed implementations.
//!
//! [`SignalSource`] yields a conversation's `[T, C]` signal, [`ExampleSource`]
//! its labeled intervals. The build only depends on the traits; callers with
//! their own storage implement them directly.
use anyhow::Result;
use ndarray::{Array2, Axis};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::conversation::Conversation;
use crate::example::{read_datum, Example};
use crate::io::read_tensor_2d;

pub trait SignalSource {
    /// Signal of `conversation` restricted to its electrodes, shape `[T, C]`.
    ///
    /// "No data" is an empty matrix, not an error. `Err` is reserved for
    /// failures the caller should see (corrupt files, I/O errors).
    fn load_signal(&self, conversation: &Conversation) -> Result<Array2<f32>>;
}

pub trait ExampleSource {
    /// Examples from the resolved datum file, without `exclude_words` labels.
    fn load_examples(&self, datum: &Path, exclude_words: &HashSet<String>) -> Result<Vec<Example>>;
}

/// Reads `<conversation path>/<file_name>`, tensor `signal` of shape
/// `[T, all electrodes]`, and keeps the conversation's 1-based electrode ids.
#[derive(Debug, Clone)]
pub struct SafetensorsSignalSource {
    pub file_name: PathBuf,
    pub key: String,
}

impl Default for SafetensorsSignalSource {
    fn default() -> Self {
        Self {
            file_name: PathBuf::from("signal.safetensors"),
            key: "signal".into(),
        }
    }
}

impl SafetensorsSignalSource {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn signal_path(&self, conversation: &Conversation) -> PathBuf {
        conversation.path.join(&self.file_name)
    }
}

impl SignalSource for SafetensorsSignalSource {
    fn load_signal(&self, conversation: &Conversation) -> Result<Array2<f32>> {
        let n_sel = conversation.electrodes.len();
        let path = self.signal_path(conversation);
        if !path.is_file() {
            log::warn!("{}: no signal file at {}", conversation.name(), path.display());
            return Ok(Array2::zeros((0, n_sel)));
        }
        let all = read_tensor_2d(&path, &self.key)?;

        let n_avail = all.ncols();
        let mut columns = Vec::with_capacity(n_sel);
        for &id in &conversation.electrodes {
            if id == 0 || id > n_avail {
                log::warn!(
                    "{}: electrode {id} outside 1..={n_avail} in {}",
                    conversation.name(),
                    path.display()
                );
                return Ok(Array2::zeros((0, n_sel)));
            }
            columns.push(id - 1);
        }
        Ok(all.select(Axis(1), &columns))
    }
}

/// Parses whitespace-separated `label start end` datum files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatumExampleSource;

impl ExampleSource for DatumExampleSource {
    fn load_examples(&self, datum: &Path, exclude_words: &HashSet<String>) -> Result<Vec<Example>> {
        read_datum(datum, exclude_words)
    }
}
