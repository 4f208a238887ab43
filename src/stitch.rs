//! Stitch indices: cumulative row boundaries of conversations inside a
//! concatenated array.
//!
//! Entry `i` is the exclusive end row of conversation `i`; its start is entry
//! `i - 1` (or `0`).
use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchIndex(Vec<usize>);

impl StitchIndex {
    /// Cumulative sum of per-conversation row counts.
    ///
    /// ```
    /// use tfspkl::StitchIndex;
    /// let idx = StitchIndex::from_lengths([100, 70]);
    /// assert_eq!(idx.as_slice(), &[100, 170]);
    /// ```
    pub fn from_lengths<I: IntoIterator<Item = usize>>(lengths: I) -> Self {
        let mut total = 0;
        Self(
            lengths
                .into_iter()
                .map(|n| {
                    total += n;
                    total
                })
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of stitched conversations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total row count, i.e. the last boundary.
    pub fn total(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    /// Half-open row range of conversation `i`.
    pub fn bounds(&self, i: usize) -> Option<Range<usize>> {
        let end = *self.0.get(i)?;
        let start = if i == 0 { 0 } else { self.0[i - 1] };
        Some(start..end)
    }

    /// Per-conversation row counts, undoing the cumulative sum.
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(0)
            .chain(self.0.iter().copied())
            .zip(self.0.iter().copied())
            .map(|(start, end)| end - start)
    }

    /// Index of the conversation containing `row`.
    pub fn conversation_of(&self, row: usize) -> Option<usize> {
        if row >= self.total() {
            return None;
        }
        Some(self.0.partition_point(|&end| end <= row))
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }
}

impl AsRef<[usize]> for StitchIndex {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}
