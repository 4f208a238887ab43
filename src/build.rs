//! Stitching conversations into design matrices.
//!
//! Every conversation that passes the guard clauses contributes three
//! representations, stacked along the time axis in input order:
//!
//! ```text
//! raw      [L,      C]   unmodified signal
//! trimmed  [L',     C]   L' = L − (L mod B)
//! binned   [L' / B, C]   mean of each B-row block
//! ```
//!
//! Each representation gets its own [`StitchIndex`].
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use std::collections::HashSet;

use crate::binning::{bin_average, trim};
use crate::config::BuildConfig;
use crate::conversation::Conversation;
use crate::error::BuildError;
use crate::example::{filter_trimmed, Example};
use crate::source::{ExampleSource, SignalSource};
use crate::stitch::StitchIndex;

/// Which stitched array to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Full,
    Trimmed,
    Binned,
}

/// Result of [`build_design_matrices`].
///
/// Fields up to `electrode_names` follow the order of the classic
/// 12-tuple output; the last two are additional bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrices {
    /// Raw signals of all surviving conversations, [Σ L, C].
    pub full_signal: Array2<f32>,
    pub full_stitch_index: StitchIndex,
    /// Trimmed signals, [Σ L', C].
    pub trimmed_signal: Array2<f32>,
    pub trimmed_stitch_index: StitchIndex,
    /// Bin-averaged signals, [Σ L' / B, C].
    pub binned_signal: Array2<f32>,
    pub bin_stitch_index: StitchIndex,
    /// Per conversation, every example from the source.
    pub all_examples: Vec<Vec<Example>>,
    /// Per conversation, the examples ending before the trimmed length.
    pub trimmed_examples: Vec<Vec<Example>>,
    pub all_example_counts: Vec<usize>,
    pub trimmed_example_counts: Vec<usize>,
    /// Electrode selection of the last conversation iterated, skipped or not.
    pub electrodes: Vec<usize>,
    pub electrode_names: Vec<String>,
    /// Names of the surviving conversations, in stitch order.
    pub conversations: Vec<String>,
    /// Cumulative `max_electrodes` with a leading zero.
    pub electrode_offsets: Vec<usize>,
}

impl DesignMatrices {
    /// Number of conversations stitched together.
    pub fn n_conversations(&self) -> usize {
        self.conversations.len()
    }

    pub fn signal(&self, repr: Representation) -> &Array2<f32> {
        match repr {
            Representation::Full => &self.full_signal,
            Representation::Trimmed => &self.trimmed_signal,
            Representation::Binned => &self.binned_signal,
        }
    }

    pub fn stitch_index(&self, repr: Representation) -> &StitchIndex {
        match repr {
            Representation::Full => &self.full_stitch_index,
            Representation::Trimmed => &self.trimmed_stitch_index,
            Representation::Binned => &self.bin_stitch_index,
        }
    }

    /// Rows contributed by conversation `i` to the chosen representation.
    pub fn rows(&self, repr: Representation, i: usize) -> Option<ArrayView2<'_, f32>> {
        let range = self.stitch_index(repr).bounds(i)?;
        Some(self.signal(repr).slice_axis(Axis(0), range.into()))
    }
}

/// Per-conversation accumulators, finalized once the loop is done.
#[derive(Default)]
struct Accumulator {
    full: Vec<Array2<f32>>,
    trimmed: Vec<Array2<f32>>,
    binned: Vec<Array2<f32>>,
    all_examples: Vec<Vec<Example>>,
    trimmed_examples: Vec<Vec<Example>>,
    names: Vec<String>,
}

impl Accumulator {
    fn push(&mut self, name: String, signal: Array2<f32>, examples: Vec<Example>, bin_size: usize) {
        let raw_len = signal.nrows();
        let trimmed = trim(&signal, bin_size);
        let binned = bin_average(trimmed.view(), bin_size);
        let kept = filter_trimmed(&examples, trimmed.nrows());

        log::info!(
            "{name}: raw={raw_len} examples={} trimmed={} kept={} binned={}",
            examples.len(),
            trimmed.nrows(),
            kept.len(),
            binned.nrows()
        );

        self.full.push(signal);
        self.trimmed.push(trimmed);
        self.binned.push(binned);
        self.all_examples.push(examples);
        self.trimmed_examples.push(kept);
        self.names.push(name);
    }

    fn stack(parts: &[Array2<f32>]) -> Result<(Array2<f32>, StitchIndex), BuildError> {
        let views: Vec<ArrayView2<'_, f32>> = parts.iter().map(|a| a.view()).collect();
        let stacked = concatenate(Axis(0), &views)?;
        let index = StitchIndex::from_lengths(parts.iter().map(|a| a.nrows()));
        Ok((stacked, index))
    }

    fn finish(
        self,
        attempted: usize,
        electrodes: Vec<usize>,
        electrode_names: Vec<String>,
        electrode_offsets: Vec<usize>,
    ) -> Result<DesignMatrices, BuildError> {
        if self.full.is_empty() {
            return Err(BuildError::EmptyDataset { attempted });
        }
        let (full_signal, full_stitch_index) = Self::stack(&self.full)?;
        let (trimmed_signal, trimmed_stitch_index) = Self::stack(&self.trimmed)?;
        let (binned_signal, bin_stitch_index) = Self::stack(&self.binned)?;

        Ok(DesignMatrices {
            full_signal,
            full_stitch_index,
            trimmed_signal,
            trimmed_stitch_index,
            binned_signal,
            bin_stitch_index,
            all_example_counts: self.all_examples.iter().map(Vec::len).collect(),
            trimmed_example_counts: self.trimmed_examples.iter().map(Vec::len).collect(),
            all_examples: self.all_examples,
            trimmed_examples: self.trimmed_examples,
            electrodes,
            electrode_names,
            conversations: self.names,
            electrode_offsets,
        })
    }
}

/// Build stitched design matrices from `conversations`, in order.
///
/// For every conversation:
///
/// 1. Resolve the datum file (`path` + `suffix` glob); skip if none matches.
/// 2. Load the signal; skip if it is empty or shorter than one bin.
/// 3. Load the examples from the datum file.
/// 4. Trim, bin-average and filter examples to the trimmed length.
///
/// Skipped conversations are logged at `warn` level and contribute nothing to
/// any output. Electrode metadata is last-writer-wins unless
/// [`BuildConfig::strict_electrodes`] is set.
///
/// # Errors
///
/// * [`BuildError::InvalidConfig`] if `cfg` fails validation.
/// * [`BuildError::Source`] if a source returns an error.
/// * [`BuildError::ElectrodeMismatch`] in strict mode.
/// * [`BuildError::EmptyDataset`] if no conversation survives.
/// * [`BuildError::Shape`] if survivors have different electrode counts.
///
/// # Examples
///
/// ```no_run
/// use tfspkl::{build_design_matrices, read_conversation_list, BuildConfig};
/// use tfspkl::source::{DatumExampleSource, SafetensorsSignalSource};
/// use std::path::Path;
///
/// let cfg = BuildConfig::default();
/// let convs = read_conversation_list(Path::new("conversations.csv"), cfg.delimiter).unwrap();
/// let dm = build_design_matrices(
///     &cfg,
///     &convs,
///     &SafetensorsSignalSource::default(),
///     &DatumExampleSource,
/// ).unwrap();
/// println!("{} bins over {} conversations", dm.binned_signal.nrows(), dm.n_conversations());
/// ```
pub fn build_design_matrices<S, E>(
    cfg: &BuildConfig,
    conversations: &[Conversation],
    signals: &S,
    examples: &E,
) -> Result<DesignMatrices, BuildError>
where
    S: SignalSource + ?Sized,
    E: ExampleSource + ?Sized,
{
    cfg.validate()?;
    let bin_size = cfg.bin_size();
    let exclude: HashSet<String> = cfg.exclude_words.iter().cloned().collect();
    log::debug!(
        "bin_size={bin_size} fs={} aug_shift_samples={:?} (not applied)",
        cfg.fs,
        cfg.aug_shift_samples()
    );

    let mut acc = Accumulator::default();
    let mut electrodes: Option<(&[usize], &[String])> = None;

    for conv in conversations {
        let name = conv.name();

        if let Some((prev, _)) = electrodes {
            if prev != conv.electrodes.as_slice() {
                if cfg.strict_electrodes {
                    return Err(BuildError::ElectrodeMismatch { conversation: name });
                }
                log::warn!("{name}: electrode selection differs from the previous conversation");
            }
        }
        electrodes = Some((conv.electrodes.as_slice(), conv.electrode_names.as_slice()));

        let Some(datum) = conv.resolve_datum() else {
            log::warn!("{name}: no datum file matches {}", conv.datum_pattern());
            continue;
        };

        let signal = signals
            .load_signal(conv)
            .map_err(|e| BuildError::source_failed(&name, e))?;
        if signal.is_empty() {
            log::warn!("{name}: empty signal, skipping");
            continue;
        }
        if signal.nrows() < bin_size {
            log::warn!(
                "{name}: signal of {} samples is shorter than one bin ({bin_size}), skipping",
                signal.nrows()
            );
            continue;
        }

        let all = examples
            .load_examples(&datum, &exclude)
            .map_err(|e| BuildError::source_failed(&name, e))?;

        acc.push(name, signal, all, bin_size);
    }

    let (electrodes, electrode_names) = electrodes
        .map(|(ids, names)| (ids.to_vec(), names.to_vec()))
        .unwrap_or_default();
    acc.finish(
        conversations.len(),
        electrodes,
        electrode_names,
        cfg.electrode_offsets(),
    )
}
