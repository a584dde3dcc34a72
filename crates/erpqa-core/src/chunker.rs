use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, RawDocument};

/// Smallest window, in words, that is worth embedding.
pub const MIN_CHUNK_WORDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, overlap: 100, min_chunk_words: MIN_CHUNK_WORDS }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunk_size must be greater than zero".into()));
        }
        if self.chunk_size <= self.overlap {
            return Err(Error::Configuration(format!(
                "chunk_size ({}) must be greater than overlap ({})",
                self.chunk_size, self.overlap
            )));
        }
        if self.min_chunk_words == 0 || self.min_chunk_words > self.chunk_size {
            return Err(Error::Configuration(format!(
                "min_chunk_words ({}) must be between 1 and chunk_size ({})",
                self.min_chunk_words, self.chunk_size
            )));
        }
        Ok(())
    }

    pub fn step(&self) -> usize { self.chunk_size - self.overlap }
}

/// Chunks produced for a batch of documents, plus the documents that yielded nothing.
#[derive(Debug, Clone, Default)]
pub struct ChunkBatch {
    pub chunks: Vec<Chunk>,
    pub dropped: Vec<String>,
}

/// Splits documents into overlapping word windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    /// Fails with [`Error::Configuration`] when `chunk_size <= overlap`.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    pub fn chunk(&self, document: &RawDocument) -> Vec<Chunk> {
        let words: Vec<&str> = document.text.split_whitespace().collect();
        let windows = self.windows(&words);
        let total_chunks = windows.len();
        windows
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| Chunk {
                text,
                source: document.source.clone(),
                chunk_id: format!("{}_chunk_{}", document.source, chunk_index),
                metadata: ChunkMetadata { source_file: document.source.clone(), chunk_index, total_chunks },
            })
            .collect()
    }

    pub fn chunk_all(&self, documents: &[RawDocument]) -> ChunkBatch {
        let mut batch = ChunkBatch::default();
        for document in documents {
            let chunks = self.chunk(document);
            if chunks.is_empty() {
                warn!(source = %document.source, "document too short to chunk; dropped from retrieval");
                batch.dropped.push(document.source.clone());
                continue;
            }
            debug!(source = %document.source, chunks = chunks.len(), "chunked document");
            batch.chunks.extend(chunks);
        }
        info!("Created {} chunks from {} documents", batch.chunks.len(), documents.len());
        batch
    }

    // One window per step offset; windows below the minimum are dropped, so `total_chunks`
    // is known once this returns.
    fn windows(&self, words: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.config.chunk_size).min(words.len());
            let window = &words[start..end];
            if window.len() >= self.config.min_chunk_words {
                out.push(window.join(" "));
            }
            start += self.config.step();
        }
        out
    }
}
