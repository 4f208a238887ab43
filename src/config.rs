//! Batch configuration.
//!
//! [`BuildConfig`] is constructed once at the call boundary and passed by
//! reference into [`build_design_matrices`](crate::build_design_matrices).
//! All fields have defaults matching a 512 Hz capture with 62.5 ms bins.

use crate::error::BuildError;

/// Configuration for one design-matrix build.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use tfspkl::BuildConfig;
///
/// let cfg = BuildConfig {
///     fs: 1024.0,          // 1 kHz capture
///     bin_ms: 31.25,       // still 32 samples per bin
///     ..BuildConfig::default()
/// };
/// assert_eq!(cfg.bin_size(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Labels dropped by the example source before any filtering.
    ///
    /// Default: `["sp", "{lg}", "{ns}", "{inaudible}"]`.
    pub exclude_words: Vec<String>,

    /// Per-conversation electrode budget.
    ///
    /// Only used to compute [`BuildConfig::electrode_offsets`], which is
    /// returned alongside the matrices for downstream consumers.
    ///
    /// Default: `[]`.
    pub max_electrodes: Vec<usize>,

    /// Capture frame rate in Hz.
    ///
    /// Default: `512.0`.
    pub fs: f64,

    /// Duration of one averaging bin in milliseconds.
    ///
    /// The bin size in samples is `round(bin_ms · fs / 1000)`, so the two are
    /// always configured together.
    ///
    /// Default: `62.5` ms (32 samples at 512 Hz).
    pub bin_ms: f64,

    /// Field separator of the conversation list.
    ///
    /// Default: `','`.
    pub delimiter: char,

    /// Time shifts for data augmentation, in milliseconds.
    ///
    /// Accepted and validated, but not applied by the build.
    ///
    /// Default: `[-500, -250, 250]`.
    pub aug_shift_ms: Vec<i32>,

    /// Fail the batch when conversations disagree on their electrode
    /// selection instead of keeping the last one seen.
    ///
    /// Default: `false`.
    pub strict_electrodes: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            exclude_words: ["sp", "{lg}", "{ns}", "{inaudible}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_electrodes: vec![],
            fs: 512.0,
            bin_ms: 62.5,
            delimiter: ',',
            aug_shift_ms: vec![-500, -250, 250],
            strict_electrodes: false,
        }
    }
}

impl BuildConfig {
    /// Number of samples averaged into one bin.
    ///
    /// ```
    /// use tfspkl::BuildConfig;
    /// assert_eq!(BuildConfig::default().bin_size(), 32);
    /// ```
    pub fn bin_size(&self) -> usize {
        (self.bin_ms * self.fs / 1000.0).round() as usize
    }

    /// Cumulative electrode offsets with a leading zero.
    ///
    /// `max_electrodes = [64, 32]` gives `[0, 64, 96]`.
    pub fn electrode_offsets(&self) -> Vec<usize> {
        std::iter::once(0)
            .chain(self.max_electrodes.iter().scan(0, |acc, &n| {
                *acc += n;
                Some(*acc)
            }))
            .collect()
    }

    /// Augmentation shifts converted to sample offsets at [`BuildConfig::fs`].
    pub fn aug_shift_samples(&self) -> Vec<i64> {
        self.aug_shift_ms
            .iter()
            .map(|&ms| (ms as f64 * self.fs / 1000.0).round() as i64)
            .collect()
    }

    /// Check every field before a build starts.
    pub fn validate(&self) -> Result<(), BuildError> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(BuildError::InvalidConfig(format!(
                "fs must be a positive frame rate, got {}",
                self.fs
            )));
        }
        if !self.bin_ms.is_finite() || self.bin_ms <= 0.0 {
            return Err(BuildError::InvalidConfig(format!(
                "bin_ms must be positive, got {}",
                self.bin_ms
            )));
        }
        if self.bin_size() == 0 {
            return Err(BuildError::InvalidConfig(format!(
                "{} ms at {} Hz is shorter than one sample",
                self.bin_ms, self.fs
            )));
        }
        if self.delimiter.is_whitespace() && self.delimiter != '\t' {
            return Err(BuildError::InvalidConfig(format!(
                "delimiter {:?} collides with the electrode list separator",
                self.delimiter
            )));
        }
        let mut shifts = self.aug_shift_ms.clone();
        shifts.sort_unstable();
        if shifts.windows(2).any(|w| w[0] == w[1]) {
            return Err(BuildError::InvalidConfig(format!(
                "aug_shift_ms contains duplicates: {:?}",
                self.aug_shift_ms
            )));
        }
        Ok(())
    }
}
