/// build_matrices: stitch every conversation in a list into design matrices
/// and write them to one safetensors file.
///
/// Output keys: see `tfspkl::io::write_design_matrices`.
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use tfspkl::{
    build_design_matrices, read_conversation_list, write_design_matrices, BuildConfig,
    DatumExampleSource, SafetensorsSignalSource,
};

#[derive(Parser, Debug)]
#[command(name = "build_matrices", about = "Stitch conversation recordings into design matrices")]
struct Args {
    /// Conversation list: path, datum suffix, electrode ids, electrode names.
    #[arg(long)]
    conversations: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Signal file inside each conversation directory.
    #[arg(long, default_value = "signal.safetensors")]
    signal_file: PathBuf,

    /// Capture frame rate (Hz).
    #[arg(long, default_value_t = 512.0)]
    fs: f64,

    /// Bin duration (ms).
    #[arg(long, default_value_t = 62.5)]
    bin_ms: f64,

    /// Labels to drop (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "sp,{lg},{ns},{inaudible}")]
    exclude_words: Vec<String>,

    /// Per-conversation electrode budget (comma-separated).
    #[arg(long, value_delimiter = ',')]
    max_electrodes: Vec<usize>,

    /// Field separator of the conversation list.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Augmentation shifts in ms (comma-separated, not applied).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "-500,-250,250")]
    aug_shift_ms: Vec<i32>,

    /// Fail when conversations use different electrode selections.
    #[arg(long)]
    strict_electrodes: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = BuildConfig {
        exclude_words: args.exclude_words,
        max_electrodes: args.max_electrodes,
        fs: args.fs,
        bin_ms: args.bin_ms,
        delimiter: args.delimiter,
        aug_shift_ms: args.aug_shift_ms,
        strict_electrodes: args.strict_electrodes,
    };

    let conversations = read_conversation_list(&args.conversations, cfg.delimiter)?;
    println!("Loaded {} conversations, bin size {} samples", conversations.len(), cfg.bin_size());

    let signals = SafetensorsSignalSource::new(args.signal_file);
    let dm = build_design_matrices(&cfg, &conversations, &signals, &DatumExampleSource)?;

    println!(
        "Stitched {} conversations: full {:?}, trimmed {:?}, binned {:?}",
        dm.n_conversations(),
        dm.full_signal.dim(),
        dm.trimmed_signal.dim(),
        dm.binned_signal.dim()
    );
    println!(
        "Examples: {} total, {} within trimmed signals",
        dm.all_example_counts.iter().sum::<usize>(),
        dm.trimmed_example_counts.iter().sum::<usize>()
    );

    write_design_matrices(&dm, &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
