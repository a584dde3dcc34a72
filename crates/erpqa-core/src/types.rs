//! Domain types shared by the chunker, the vector index and the answer pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type ChunkId = String;

/// A cleaned source document, as produced by ingestion.
///
/// - `source`: document identifier (the file name)
/// - `text`: normalized full text
/// - `path`: where the document was read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub source: String,
    pub text: String,
    pub path: PathBuf,
}

impl RawDocument {
    pub fn new(source: impl Into<String>, text: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), text: text.into(), path: path.into() }
    }
}

/// Provenance of a chunk within its parent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_file: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A window of a document's words that is independently embedded and retrieved.
///
/// `chunk_id` is `"{source}_chunk_{chunk_index}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub chunk_id: ChunkId,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn word_count(&self) -> usize { self.text.split_whitespace().count() }
}

/// One retrieved chunk with its relevance score.
///
/// `score` is `1 - distance`; with the cosine metric used by the index it lies in `[0, 1]`
/// and higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub source: String,
    pub chunk_id: ChunkId,
    pub score: f32,
    pub metadata: ChunkMetadata,
}

impl RetrievalResult {
    pub fn from_chunk(chunk: Chunk, score: f32) -> Self {
        Self { text: chunk.text, source: chunk.source, chunk_id: chunk.chunk_id, score, metadata: chunk.metadata }
    }
}

/// The answer handed to the presentation layer.
///
/// `sources` keep retrieval order, so `sources[i]` is cited as `[Source i+1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub sources: Vec<RetrievalResult>,
    pub confidence: f32,
    pub query: String,
}

impl AnswerRecord {
    /// An answer that was produced without consulting any source.
    pub fn ungrounded(answer: impl Into<String>, query: impl Into<String>) -> Self {
        Self { answer: answer.into(), sources: Vec::new(), confidence: 0.0, query: query.into() }
    }
}
