//! On-disk layout of a saved index.
//!
//! A saved index is a directory holding:
//! - `manifest.json`: header checked before anything else is deserialized
//! - `chunks.json`: the chunk payloads, in vector order
//! - `vectors.bin`: `count * dim` little-endian `f32`
//!
//! The manifest is written last, so a directory without one is never treated as an index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use erpqa_core::error::{Error, Result};

pub const MAGIC: &str = "erpqa-index";
pub const FORMAT_VERSION: u32 = 1;
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const VECTORS_FILE: &str = "vectors.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub magic: String,
    pub format_version: u32,
    pub embedder_id: String,
    pub dim: usize,
    pub count: usize,
    pub chunks_blake3: String,
    pub vectors_blake3: String,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(embedder_id: &str, dim: usize, count: usize, chunks_json: &[u8], vectors_bin: &[u8]) -> Self {
        Self {
            magic: MAGIC.to_string(),
            format_version: FORMAT_VERSION,
            embedder_id: embedder_id.to_string(),
            dim,
            count,
            chunks_blake3: checksum(chunks_json),
            vectors_blake3: checksum(vectors_bin),
            created_at: Utc::now(),
        }
    }

    /// Read the manifest of `dir`; a missing directory or manifest is `IndexNotFound`.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !dir.is_dir() || !path.is_file() {
            return Err(Error::IndexNotFound(dir.to_path_buf()));
        }
        let bytes = std::fs::read(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::format(dir, format!("unreadable manifest: {e}")))
    }

    /// Header checks that need no data files.
    pub fn check_header(&self, dir: &Path, embedder_id: &str, dim: usize) -> Result<()> {
        if self.magic != MAGIC {
            return Err(Error::format(dir, format!("bad magic '{}'", self.magic)));
        }
        if self.format_version != FORMAT_VERSION {
            return Err(Error::format(
                dir,
                format!("format version {} (supported: {})", self.format_version, FORMAT_VERSION),
            ));
        }
        if self.embedder_id != embedder_id {
            return Err(Error::format(
                dir,
                format!("built with embedder '{}', current embedder is '{}'", self.embedder_id, embedder_id),
            ));
        }
        if self.dim != dim {
            return Err(Error::format(dir, format!("dimension {} does not match embedder dimension {}", self.dim, dim)));
        }
        Ok(())
    }
}

pub fn checksum(bytes: &[u8]) -> String { blake3::hash(bytes).to_hex().to_string() }

pub fn encode_vectors(vectors: &[Vec<f32>]) -> Vec<u8> {
    vectors.iter().flat_map(|v| v.iter().flat_map(|x| x.to_le_bytes())).collect()
}

/// Split `bytes` into `dim`-sized vectors. The caller checks that the length is exact.
pub fn decode_vectors(bytes: &[u8], dim: usize) -> Vec<Vec<f32>> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect::<Vec<f32>>()
        .chunks(dim.max(1))
        .map(<[f32]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_survive_encoding() {
        let vectors = vec![vec![0.6f32, 0.8], vec![1.0, 0.0], vec![-0.5, 0.25]];
        let bytes = encode_vectors(&vectors);
        assert_eq!(bytes.len(), 3 * 2 * 4);
        assert_eq!(decode_vectors(&bytes, 2), vectors);
    }

    #[test]
    fn header_rejects_foreign_embedder() {
        let m = Manifest::new("hash:xxh64:d8", 8, 1, b"[]", b"");
        let dir = Path::new("/tmp/idx");
        assert!(m.check_header(dir, "hash:xxh64:d8", 8).is_ok());
        assert!(matches!(m.check_header(dir, "model:minilm:d384", 8), Err(Error::IndexFormat { .. })));
        assert!(matches!(m.check_header(dir, "hash:xxh64:d8", 16), Err(Error::IndexFormat { .. })));
    }
}
