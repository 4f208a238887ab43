//! Safetensors I/O.
//!
//! Reader: 2-D `F32`/`F64` tensors by key (per-conversation signals).
//! Writer: [`StWriter`] and [`write_design_matrices`] for the batch result.
use anyhow::{bail, Context, Result};
use ndarray::{Array2, ArrayBase, Data, Dimension};
use std::collections::HashMap;
use std::path::Path;

use crate::build::DesignMatrices;
use crate::example::Example;

// ── Low-level safetensors parser (raw bytes → ndarray, no tensor crate) ─────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = u64::from_le_bytes(len) as usize;
    let end = 8usize
        .checked_add(n)
        .filter(|&end| end <= bytes.len())
        .context("safetensors header length exceeds file size")?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry has no shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer dimension"))
        .collect()
}

fn data_range(entry: &serde_json::Value, data_start: usize, total: usize) -> Result<(usize, usize)> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry has no data_offsets")?;
    let (Some(s), Some(e)) = (
        offsets.first().and_then(|v| v.as_u64()),
        offsets.get(1).and_then(|v| v.as_u64()),
    ) else {
        bail!("malformed data_offsets");
    };
    let at = |off: u64| {
        usize::try_from(off)
            .ok()
            .and_then(|off| data_start.checked_add(off))
            .with_context(|| format!("data offset {off} overflows"))
    };
    let (s, e) = (at(s)?, at(e)?);
    if s > e || e > total {
        bail!("data_offsets [{s}, {e}) out of bounds ({total} bytes)");
    }
    Ok((s, e))
}

fn decode_f32(raw: &[u8], dtype: &str) -> Result<Vec<f32>> {
    Ok(match dtype {
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        other => bail!("unsupported dtype {other}, expected F32 or F64"),
    })
}

/// Read the 2-D tensor `key` from a safetensors file as `f32`.
pub fn read_tensor_2d(path: &Path, key: &str) -> Result<Array2<f32>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let entry = header
        .get(key)
        .with_context(|| format!("missing {key:?} tensor in {}", path.display()))?;
    let shape = shape_of(entry)?;
    if shape.len() != 2 {
        bail!("{key:?} has shape {shape:?}, expected 2-D");
    }
    let dtype = entry["dtype"].as_str().context("tensor entry has no dtype")?;
    let (s, e) = data_range(entry, data_start, bytes.len())?;
    let values = decode_f32(&bytes[s..e], dtype)?;
    Array2::from_shape_vec((shape[0], shape[1]), values)
        .with_context(|| format!("{key:?}: byte length does not match shape {shape:?}"))
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// One tensor queued for writing: little-endian payload plus header fields.
struct Tensor {
    name: String,
    dtype: &'static str,
    shape: Vec<usize>,
    bytes: Vec<u8>,
}

/// Simple safetensors file writer for F32 and I64 tensors plus string metadata.
///
/// Usage:
/// ```rust,no_run
/// use tfspkl::io::StWriter;
/// use ndarray::array;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("signal", &array![[1.0f32], [2.0], [3.0]]);
/// w.add_usize_vec("stitch", &[3]);
/// w.add_metadata("note", "three samples");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    tensors: Vec<Tensor>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `F32` tensor with the array's shape, elements in row-major order.
    pub fn add_f32<S, D>(&mut self, name: &str, arr: &ArrayBase<S, D>)
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        self.tensors.push(Tensor {
            name: name.to_string(),
            dtype: "F32",
            shape: arr.shape().to_vec(),
            bytes: arr.iter().flat_map(|v| v.to_le_bytes()).collect(),
        });
    }

    /// 1-D `I64` tensor from indices or counts.
    pub fn add_usize_vec(&mut self, name: &str, data: &[usize]) {
        self.tensors.push(Tensor {
            name: name.to_string(),
            dtype: "I64",
            shape: vec![data.len()],
            bytes: data.iter().flat_map(|&v| (v as i64).to_le_bytes()).collect(),
        });
    }

    /// String entry in the `__metadata__` header map.
    pub fn add_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata
            .insert(key.to_string(), serde_json::Value::String(value.into()));
    }

    fn header(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert(
                "__metadata__".into(),
                serde_json::Value::Object(self.metadata.clone()),
            );
        }
        let mut offset: usize = 0;
        for t in &self.tensors {
            header_map.insert(t.name.clone(), serde_json::json!({
                "dtype": t.dtype,
                "shape": t.shape,
                "data_offsets": [offset, offset + t.bytes.len()],
            }));
            offset += t.bytes.len();
        }
        let mut bytes = serde_json::to_vec(&header_map)?;
        // Data section starts on an 8-byte boundary.
        bytes.resize(bytes.len().next_multiple_of(8), b' ');
        Ok(bytes)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header()?;
        let mut f = std::io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        f.write_all(&(header.len() as u64).to_le_bytes())?;
        f.write_all(&header)?;
        for t in &self.tensors {
            f.write_all(&t.bytes)?;
        }
        f.flush()?;
        Ok(())
    }
}

// ── Design-matrix writer ──────────────────────────────────────────────────────

fn examples_json(per_conversation: &[Vec<Example>]) -> String {
    let value: Vec<Vec<serde_json::Value>> = per_conversation
        .iter()
        .map(|examples| {
            examples
                .iter()
                .map(|e| serde_json::json!([e.label, e.start, e.end]))
                .collect()
        })
        .collect();
    serde_json::Value::from(value).to_string()
}

/// Write a finished build to a safetensors file.
///
/// Tensors: `full_signal`, `trimmed_signal`, `binned_signal` (`F32`, [T, C]);
/// `full_stitch_index`, `trimmed_stitch_index`, `bin_stitch_index`,
/// `all_example_counts`, `trimmed_example_counts`, `electrodes`,
/// `electrode_offsets` (`I64`).
/// Metadata (JSON strings): `all_examples`, `trimmed_examples` as
/// `[[label, start, end], …]` per conversation, `electrode_names`,
/// `conversations`.
pub fn write_design_matrices(dm: &DesignMatrices, path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    w.add_f32("full_signal", &dm.full_signal);
    w.add_usize_vec("full_stitch_index", dm.full_stitch_index.as_slice());
    w.add_f32("trimmed_signal", &dm.trimmed_signal);
    w.add_usize_vec("trimmed_stitch_index", dm.trimmed_stitch_index.as_slice());
    w.add_f32("binned_signal", &dm.binned_signal);
    w.add_usize_vec("bin_stitch_index", dm.bin_stitch_index.as_slice());
    w.add_usize_vec("all_example_counts", &dm.all_example_counts);
    w.add_usize_vec("trimmed_example_counts", &dm.trimmed_example_counts);
    w.add_usize_vec("electrodes", &dm.electrodes);
    w.add_usize_vec("electrode_offsets", &dm.electrode_offsets);

    w.add_metadata("all_examples", examples_json(&dm.all_examples));
    w.add_metadata("trimmed_examples", examples_json(&dm.trimmed_examples));
    w.add_metadata("electrode_names", serde_json::json!(dm.electrode_names).to_string());
    w.add_metadata("conversations", serde_json::json!(dm.conversations).to_string());
    w.write(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    /// Hand-built file: length prefix, `header` JSON, then `payload`.
    fn write_raw(path: &Path, header: &serde_json::Value, payload: &[u8]) {
        let hdr = serde_json::to_vec(header).unwrap();
        let mut bytes = (hdr.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(&hdr);
        bytes.extend_from_slice(payload);
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn writer_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signal.safetensors");
        let arr = Array2::from_shape_fn((5, 3), |(t, c)| (t * 10 + c) as f32);
        let mut w = StWriter::new();
        w.add_usize_vec("lengths", &[5]);
        w.add_f32("signal", &arr);
        w.add_metadata("source", "unit test");
        w.write(&path).unwrap();

        assert_eq!(read_tensor_2d(&path, "signal").unwrap(), arr);
    }

    #[test]
    fn transposed_view_is_written_in_logical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.safetensors");
        let arr = array![[1.0_f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut w = StWriter::new();
        w.add_f32("signal", &arr.t());
        w.write(&path).unwrap();
        assert_eq!(read_tensor_2d(&path, "signal").unwrap(), arr.t().to_owned());
    }

    #[test]
    fn header_is_eight_byte_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let mut w = StWriter::new();
        w.add_f32("x", &array![[1.0_f32]]);
        w.write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let n = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(n % 8, 0);
    }

    #[test]
    fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let mut w = StWriter::new();
        w.add_f32("other", &array![[1.0_f32]]);
        w.write(&path).unwrap();
        let err = read_tensor_2d(&path, "signal").unwrap_err();
        assert!(err.to_string().contains("signal"), "{err}");
    }

    #[test]
    fn rejects_non_2d_tensors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let mut w = StWriter::new();
        w.add_f32("flat", &Array1::from(vec![1.0_f32, 2.0]));
        w.write(&path).unwrap();
        assert!(read_tensor_2d(&path, "flat").is_err());
    }

    #[test]
    fn rejects_integer_dtype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let header = serde_json::json!({
            "ints": {"dtype": "I64", "shape": [1, 2], "data_offsets": [0, 16]},
        });
        write_raw(&path, &header, &[0u8; 16]);
        let err = read_tensor_2d(&path, "ints").unwrap_err();
        assert!(err.to_string().contains("I64"), "{err}");
    }

    #[test]
    fn truncated_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        std::fs::write(&path, [255u8, 0, 0, 0, 0, 0, 0, 0, b'{']).unwrap();
        assert!(read_tensor_2d(&path, "signal").is_err());
    }

    #[test]
    fn huge_offsets_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let header = serde_json::json!({
            "signal": {"dtype": "F32", "shape": [1, 1], "data_offsets": [u64::MAX, u64::MAX]},
        });
        write_raw(&path, &header, &[0u8; 4]);
        let err = read_tensor_2d(&path, "signal").unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
    }

    #[test]
    fn offsets_past_end_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.safetensors");
        let header = serde_json::json!({
            "signal": {"dtype": "F32", "shape": [1, 1], "data_offsets": [0, 4096]},
        });
        write_raw(&path, &header, &[0u8; 4]);
        assert!(read_tensor_2d(&path, "signal").is_err());
    }
}
