mod common;
use common::{ramp, write_datum};
use std::path::Path;
use tfspkl::{
    build_design_matrices, parse_conversation_list, read_tensor_2d, write_design_matrices,
    BuildConfig, DatumExampleSource, SafetensorsSignalSource, StWriter,
};

fn write_signal(conv_dir: &Path, n_t: usize, n_ch: usize) {
    std::fs::create_dir_all(conv_dir).unwrap();
    let mut w = StWriter::new();
    w.add_f32("signal", &ramp(n_t, n_ch));
    w.write(&conv_dir.join("signal.safetensors")).unwrap();
}

fn read_header(path: &Path) -> serde_json::Value {
    let bytes = std::fs::read(path).unwrap();
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    serde_json::from_slice(&bytes[8..8 + n]).unwrap()
}

#[test]
fn file_backed_build_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    write_signal(&root.join("conv_a"), 100, 4);
    write_datum(&root.join("conv_a"), "hello 10 40\nworld 60 97\n");
    write_signal(&root.join("conv_b"), 70, 4);
    write_datum(&root.join("conv_b"), "again 0 63\n");

    let list = format!(
        "{a}, _datum.txt, 2 4, LGA2 LGA4\n{b}, _datum.txt, 2 4, LGA2 LGA4\n",
        a = root.join("conv_a").display(),
        b = root.join("conv_b").display(),
    );
    let convs = parse_conversation_list(&list, ',').unwrap();

    let dm = build_design_matrices(
        &BuildConfig::default(),
        &convs,
        &SafetensorsSignalSource::default(),
        &DatumExampleSource,
    )
    .unwrap();

    assert_eq!(dm.full_signal.dim(), (170, 2));
    // Column 0 is electrode 2 → ramp value t + 1000.
    assert_eq!(dm.full_signal[[100, 0]], 1000.0);
    assert_eq!(dm.full_signal[[100, 1]], 3000.0);
    assert_eq!(dm.trimmed_example_counts, vec![1, 1]);
    assert_eq!(dm.electrode_names, vec!["LGA2", "LGA4"]);

    let out = root.join("matrices.safetensors");
    write_design_matrices(&dm, &out).unwrap();

    assert_eq!(read_tensor_2d(&out, "full_signal").unwrap(), dm.full_signal);
    assert_eq!(read_tensor_2d(&out, "binned_signal").unwrap(), dm.binned_signal);

    let header = read_header(&out);
    assert_eq!(header["bin_stitch_index"]["dtype"], "I64");
    assert_eq!(header["bin_stitch_index"]["shape"], serde_json::json!([2]));
    let trimmed: serde_json::Value =
        serde_json::from_str(header["__metadata__"]["trimmed_examples"].as_str().unwrap()).unwrap();
    assert_eq!(trimmed, serde_json::json!([[["hello", 10, 40]], [["again", 0, 63]]]));
}

#[test]
fn missing_signal_file_skips_conversation() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_datum(&root.join("conv_a"), "");
    write_datum(&root.join("conv_b"), "");
    write_signal(&root.join("conv_b"), 64, 1);

    let list = format!(
        "{}, _datum.txt, 1\n{}, _datum.txt, 1\n",
        root.join("conv_a").display(),
        root.join("conv_b").display(),
    );
    let convs = parse_conversation_list(&list, ',').unwrap();
    let dm = build_design_matrices(
        &BuildConfig::default(),
        &convs,
        &SafetensorsSignalSource::default(),
        &DatumExampleSource,
    )
    .unwrap();
    assert_eq!(dm.conversations, vec!["conv_b"]);
}
