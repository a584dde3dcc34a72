use indicatif::ProgressBar;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use erpqa_core::config::IndexSettings;
use erpqa_core::error::{EmptyCorpus, Error, Result};
use erpqa_core::traits::Embedder;
use erpqa_core::types::Chunk;
use erpqa_embed::l2_normalize;

use crate::format::{checksum, decode_vectors, encode_vectors, Manifest, CHUNKS_FILE, MANIFEST_FILE, VECTORS_FILE};

/// Whether serialized index data may be deserialized.
///
/// Loading is a trust decision: with `Verified` a saved index is accepted only after its
/// manifest header and checksums match; `Disabled` refuses every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    #[default]
    Verified,
    Disabled,
}

impl LoadPolicy {
    pub fn from_settings(settings: &IndexSettings) -> Self {
        if settings.allow_load { Self::Verified } else { Self::Disabled }
    }
}

/// A stored chunk and its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Cosine distance between unit vectors, clamped to `[0, 1]`.
///
/// Anti-correlated vectors are as far as unrelated ones, which keeps
/// `1 - distance` a valid relevance score.
pub fn cosine_distance(cos: f32) -> f32 { 1.0 - cos.clamp(0.0, 1.0) }

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

/// Flat (exhaustive) cosine index over unit-length embeddings.
///
/// Immutable once built; share it behind an `Arc` for concurrent reads.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    embedder_id: String,
    dim: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn build(embedder: &dyn Embedder, chunks: &[Chunk], batch_size: usize) -> Result<Self> {
        Self::build_with_progress(embedder, chunks, batch_size, &ProgressBar::hidden())
    }

    pub fn build_with_progress(embedder: &dyn Embedder, chunks: &[Chunk], batch_size: usize, progress: &ProgressBar) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus(EmptyCorpus::NoChunks));
        }
        let kept: Vec<&Chunk> = chunks.iter().filter(|c| !c.text.trim().is_empty()).collect();
        if kept.is_empty() {
            return Err(Error::EmptyCorpus(EmptyCorpus::AllBlank { given: chunks.len() }));
        }
        if kept.len() < chunks.len() {
            debug!("Skipping {} blank chunks", chunks.len() - kept.len());
        }

        let dim = embedder.dim();
        progress.set_length(kept.len() as u64);
        let mut stored = Vec::with_capacity(kept.len());
        let mut vectors = Vec::with_capacity(kept.len());
        for batch in kept.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder.embed_batch(&texts).map_err(|e| Error::Embedding(format!("{e:#}")))?;
            if embedded.len() != texts.len() {
                return Err(Error::Embedding(format!("embedder returned {} vectors for {} texts", embedded.len(), texts.len())));
            }
            for (chunk, mut v) in batch.iter().zip(embedded) {
                check_dim(&v, dim)?;
                // Zero vectors cannot be normalized.
                if l2_normalize(&mut v) <= f32::EPSILON {
                    warn!(chunk_id = %chunk.chunk_id, "Skipping chunk with a zero embedding");
                    continue;
                }
                stored.push((*chunk).clone());
                vectors.push(v);
            }
            progress.inc(batch.len() as u64);
            debug!("Embedded batch of {} chunks", batch.len());
        }
        if vectors.is_empty() {
            return Err(Error::EmptyCorpus(EmptyCorpus::AllBlank { given: chunks.len() }));
        }

        info!("Vector index built with {} vectors (dim {})", vectors.len(), dim);
        Ok(Self { embedder_id: embedder.id().to_string(), dim, chunks: stored, vectors })
    }

    /// Embed `text` and return at most `k` chunks, closest first.
    pub fn query(&self, embedder: &dyn Embedder, text: &str, k: usize) -> Result<Vec<Neighbor>> {
        if embedder.id() != self.embedder_id {
            return Err(Error::Embedding(format!(
                "index was built with '{}' but queried with '{}'",
                self.embedder_id,
                embedder.id()
            )));
        }
        let mut q = embedder.embed(text).map_err(|e| Error::Embedding(format!("{e:#}")))?;
        check_dim(&q, self.dim)?;
        l2_normalize(&mut q);
        Ok(self.search(&q, k))
    }

    /// Nearest neighbours of a unit-length query vector. Equal similarities keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<(usize, f32)> = self.vectors.iter().enumerate().map(|(i, v)| (i, dot(query, v))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, cos)| Neighbor { chunk: self.chunks[i].clone(), distance: cosine_distance(cos) })
            .collect()
    }

    pub fn len(&self) -> usize { self.vectors.len() }
    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }
    pub fn dim(&self) -> usize { self.dim }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let chunks_json = serde_json::to_vec(&self.chunks)?;
        let vectors_bin = encode_vectors(&self.vectors);
        let manifest = Manifest::new(&self.embedder_id, self.dim, self.len(), &chunks_json, &vectors_bin);

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }
        fs::write(dir.join(CHUNKS_FILE), &chunks_json)?;
        fs::write(dir.join(VECTORS_FILE), &vectors_bin)?;
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
        info!("Vector store saved to {}", dir.display());
        Ok(())
    }

    /// Load a saved index, rejecting anything whose header, sizes or checksums do not match
    /// what `embedder` would have produced.
    pub fn load(dir: &Path, embedder: &dyn Embedder, policy: LoadPolicy) -> Result<Self> {
        if policy == LoadPolicy::Disabled {
            return Err(Error::IndexLoadDisabled(dir.to_path_buf()));
        }
        let manifest = Manifest::read(dir)?;
        manifest.check_header(dir, embedder.id(), embedder.dim())?;

        let chunks_json = read_data_file(dir, CHUNKS_FILE)?;
        if checksum(&chunks_json) != manifest.chunks_blake3 {
            return Err(Error::format(dir, format!("{CHUNKS_FILE} checksum mismatch")));
        }
        let vectors_bin = read_data_file(dir, VECTORS_FILE)?;
        if checksum(&vectors_bin) != manifest.vectors_blake3 {
            return Err(Error::format(dir, format!("{VECTORS_FILE} checksum mismatch")));
        }
        let expected_len = manifest
            .count
            .checked_mul(manifest.dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| Error::format(dir, format!("{} vectors of dim {} overflow", manifest.count, manifest.dim)))?;
        if vectors_bin.len() != expected_len {
            return Err(Error::format(dir, format!("{VECTORS_FILE} holds {} bytes, expected {}", vectors_bin.len(), expected_len)));
        }
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks_json)
            .map_err(|e| Error::format(dir, format!("unreadable {CHUNKS_FILE}: {e}")))?;
        if chunks.len() != manifest.count {
            return Err(Error::format(dir, format!("{} chunks for {} vectors", chunks.len(), manifest.count)));
        }
        let vectors = decode_vectors(&vectors_bin, manifest.dim);

        info!("Vector store loaded from {} ({} vectors)", dir.display(), vectors.len());
        Ok(Self { embedder_id: manifest.embedder_id, dim: manifest.dim, chunks, vectors })
    }
}

fn check_dim(v: &[f32], dim: usize) -> Result<()> {
    if v.len() != dim {
        return Err(Error::Embedding(format!("embedding has {} components, expected {}", v.len(), dim)));
    }
    Ok(())
}

fn read_data_file(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(Error::format(dir, format!("missing {name}")));
    }
    Ok(fs::read(path)?)
}
