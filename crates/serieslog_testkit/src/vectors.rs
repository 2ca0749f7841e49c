//! Layout vectors for serieslog.
//!
//! These pin the exact bytes writers produce, so readers in other
//! processes can rely on them. [`vectors_json`] exports the set for
//! readers maintained outside this workspace.

use crate::inspect::raw_head;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use serieslog_codec::models::{DeltaModel, RunLengthModel};
use serieslog_codec::{crc32, Fixed, ModelCodec};
use serieslog_core::layout::{node_size, FileHeader};
use serieslog_core::{LogFile, Series, SeriesConfig};

/// A layout vector that can be shared with external readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Expected bytes (hex-encoded).
    pub expected_hex: String,
}

impl TestVector {
    fn new(id: &str, description: &str, expected_hex: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            expected_hex: expected_hex.into(),
        }
    }
}

/// Every layout vector.
pub fn layout_vectors() -> Vec<TestVector> {
    vec![
        TestVector::new(
            "file_header_v1",
            "Header of an empty version 1 file",
            "534c4f4701000000000000000000000000000000000000000000000000000000",
        ),
        TestVector::new(
            "fixed_u32",
            "u32 0x01020304, little-endian",
            "04030201",
        ),
        TestVector::new(
            "fixed_tuple",
            "(u8, u16, i32) = (1, 0x0203, -1), packed in field order",
            "010302ffffffff",
        ),
        TestVector::new(
            "delta_u64",
            "Delta model over [100, 101, 103, 103, 90]",
            "c80102040019",
        ),
        TestVector::new(
            "run_length_bool",
            "Run-length model over [true, true, true, false]",
            "03010100",
        ),
        TestVector::new(
            "raw_node_u16",
            "Full raw node of u16 with batch size 2 holding [7, 8]",
            "020000000000000007000800000000000000000000000000",
        ),
        TestVector::new(
            "crc32_check",
            "CRC32 of \"123456789\"",
            "cbf43926",
        ),
    ]
}

/// Serializes every layout vector as pretty JSON.
pub fn vectors_json() -> String {
    serde_json::to_string_pretty(&layout_vectors()).unwrap_or_default()
}

/// Produces the bytes a vector describes, hex-encoded.
///
/// Returns `None` for an unknown id.
pub fn produce(id: &str) -> Option<String> {
    let bytes = match id {
        "file_header_v1" => FileHeader::new(1).to_bytes().to_vec(),
        "fixed_u32" => fixed(&0x0102_0304u32),
        "fixed_tuple" => fixed(&(1u8, 0x0203u16, -1i32)),
        "delta_u64" => model::<u64>(&DeltaModel::<u64>::new(), &[100, 101, 103, 103, 90]),
        "run_length_bool" => {
            model::<bool>(&RunLengthModel::<bool>::new(), &[true, true, true, false])
        }
        "raw_node_u16" => raw_node(),
        "crc32_check" => return Some(format!("{:08x}", crc32(b"123456789"))),
        _ => return None,
    };
    Some(hex_encode(&bytes))
}

fn fixed<T: Fixed>(value: &T) -> Vec<u8> {
    let mut buf = vec![0u8; T::SIZE];
    value.write_to(&mut buf);
    buf
}

fn model<T>(codec: &dyn ModelCodec<T>, values: &[T]) -> Vec<u8> {
    let mut state = vec![0u8; codec.model_size()];
    let mut out = BytesMut::new();
    codec.prepare(&mut state).expect("Failed to prepare model");
    for value in values {
        codec
            .encode(&mut out, &mut state, value)
            .expect("Failed to encode");
    }
    codec.dispose(&mut out, &mut state).expect("Failed to dispose");
    out.to_vec()
}

fn raw_node() -> Vec<u8> {
    let file = LogFile::open_in_memory().expect("Failed to open log");
    let series = Series::<u16>::with_config(&file, "v", SeriesConfig::raw(2))
        .expect("Failed to create series");
    series.record(&7, false).expect("Failed to record");
    series.record(&8, false).expect("Failed to record");

    let head = raw_head(&file, "v").expect("Failed to find head");
    file.read_at(head, node_size(2, 2)).expect("Failed to read node")
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
