//! Fixed-size binning along the time axis.
//!
//! Signals are `[T, C]`: one row per sample, one column per electrode.
//! [`trim`] drops the trailing incomplete bin, [`bin_average`] collapses every
//! `bin_size` rows into their per-electrode mean.
use ndarray::{s, Array2, ArrayView2};

/// Length after dropping the trailing `n_samples % bin_size` rows.
///
/// ```
/// use tfspkl::binning::trimmed_len;
/// assert_eq!(trimmed_len(100, 32), 96);
/// assert_eq!(trimmed_len(64, 32), 64);
/// ```
///
/// # Panics
///
/// Panics if `bin_size` is zero.
pub fn trimmed_len(n_samples: usize, bin_size: usize) -> usize {
    assert!(bin_size > 0, "bin_size must be non-zero");
    n_samples - n_samples % bin_size
}

/// Truncate `signal` ([T, C]) to a whole number of bins.
/// Trailing samples that don't fill a complete bin are discarded, never padded.
///
/// # Panics
///
/// Panics if `bin_size` is zero.
pub fn trim(signal: &Array2<f32>, bin_size: usize) -> Array2<f32> {
    let keep = trimmed_len(signal.nrows(), bin_size);
    signal.slice(s![..keep, ..]).to_owned()
}

/// Average non-overlapping blocks of `bin_size` rows of `signal` ([T, C]).
///
/// Returns `[T / bin_size, C]`. Any trailing incomplete block is ignored, so
/// calling this on an untrimmed signal gives the same result as on
/// [`trim`]'s output. Sums are accumulated in `f64`.
///
/// # Panics
///
/// Panics if `bin_size` is zero.
pub fn bin_average(signal: ArrayView2<'_, f32>, bin_size: usize) -> Array2<f32> {
    assert!(bin_size > 0, "bin_size must be non-zero");
    let (n_t, n_ch) = signal.dim();
    let n_bins = n_t / bin_size;

    let mut out = Array2::<f32>::zeros((n_bins, n_ch));
    for (b, mut row) in out.outer_iter_mut().enumerate() {
        let start = b * bin_size;
        let block = signal.slice(s![start..start + bin_size, ..]);
        for (dst, col) in row.iter_mut().zip(block.columns()) {
            let sum: f64 = col.iter().map(|&v| v as f64).sum();
            *dst = (sum / bin_size as f64) as f32;
        }
    }
    out
}
