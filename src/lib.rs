//! # tfspkl — stitched design matrices from conversation recordings
//!
//! `tfspkl` turns a list of per-conversation ECoG recordings and their word
//! annotations into single concatenated arrays ready for modeling, keeping the
//! conversation boundaries as cumulative *stitch indices*.
//!
//! ## Pipeline overview
//!
//! ```text
//! conversations.csv
//!   │
//!   ├─ read_conversation_list()   path, datum suffix, electrodes, names
//!   │
//!   └─ for each conversation (in order)
//!        ├─ resolve datum file     glob(path + suffix)   → skip if none
//!        ├─ SignalSource           [T, C] f32            → skip if empty / T < B
//!        ├─ ExampleSource          (label, start, end)   minus exclude_words
//!        ├─ trim                   T' = T − T mod B
//!        ├─ bin_average            [T'/B, C], mean of each B-row block
//!        └─ filter_trimmed         keep end < T'
//!   │
//!   └─ concatenate along time + cumulative-sum row counts
//!        │
//!        └─→ DesignMatrices { full / trimmed / binned signal + stitch index, … }
//! ```
//!
//! `B` is the bin size, 32 samples (62.5 ms at 512 Hz) by default.
//!
//! ## Quick start
//!
//! ```no_run
//! use tfspkl::{build_design_matrices, read_conversation_list, BuildConfig};
//! use tfspkl::source::{DatumExampleSource, SafetensorsSignalSource};
//! use std::path::Path;
//!
//! let cfg = BuildConfig::default();
//! let convs = read_conversation_list(Path::new("conversations.csv"), cfg.delimiter).unwrap();
//!
//! let dm = build_design_matrices(
//!     &cfg,
//!     &convs,
//!     &SafetensorsSignalSource::default(),
//!     &DatumExampleSource,
//! ).unwrap();
//!
//! for i in 0..dm.n_conversations() {
//!     let rows = dm.bin_stitch_index.bounds(i).unwrap();
//!     println!("{}: bins {rows:?}", dm.conversations[i]);
//! }
//! ```
//!
//! ## Running individual steps
//!
//! ```
//! use tfspkl::binning::{bin_average, trim};
//! use tfspkl::StitchIndex;
//! use ndarray::Array2;
//!
//! let signal: Array2<f32> = Array2::zeros((100, 2)); // [T, C]
//! let trimmed = trim(&signal, 32);                   // [96, 2]
//! let binned = bin_average(trimmed.view(), 32);      // [3, 2]
//! assert_eq!(binned.nrows(), 3);
//!
//! let idx = StitchIndex::from_lengths([100, 70]);
//! assert_eq!(idx.as_slice(), &[100, 170]);
//! ```

pub mod binning;
pub mod build;
pub mod config;
pub mod conversation;
pub mod error;
pub mod example;
pub mod io;
pub mod source;
pub mod stitch;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// build
pub use build::{build_design_matrices, DesignMatrices, Representation};

// config / error
pub use config::BuildConfig;
pub use error::BuildError;

// conversation / example
pub use conversation::{parse_conversation_list, read_conversation_list, Conversation};
pub use example::{filter_trimmed, parse_datum, read_datum, Example};

// binning / stitch
pub use binning::{bin_average, trim, trimmed_len};
pub use stitch::StitchIndex;

// sources
pub use source::{DatumExampleSource, ExampleSource, SafetensorsSignalSource, SignalSource};

// io
pub use io::{read_tensor_2d, write_design_matrices, StWriter};
