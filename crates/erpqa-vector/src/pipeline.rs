//! Corpus indexing: ingest -> chunk -> embed -> publish -> save.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use erpqa_core::chunker::Chunker;
use erpqa_core::error::{EmptyCorpus, Error, Result};
use erpqa_core::ingest::DocumentIngester;
use erpqa_core::types::RawDocument;

use crate::handle::IndexHandle;
use crate::index::VectorIndex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    pub documents: usize,
    pub chunks: usize,
    pub vectors: usize,
    /// Documents that produced no chunk.
    pub dropped: Vec<String>,
}

/// Progress bar in the style used for chunk indexing.
pub fn chunk_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Chunk `documents` and publish a freshly built index into `handle`.
///
/// Zero chunks across all documents is fatal; individual documents without chunks are reported.
pub fn index_documents(documents: &[RawDocument], chunker: &Chunker, handle: &IndexHandle, progress: &ProgressBar) -> Result<IndexingReport> {
    build_and_publish(documents, chunker, handle, progress).map(|(report, _)| report)
}

fn build_and_publish(
    documents: &[RawDocument],
    chunker: &Chunker,
    handle: &IndexHandle,
    progress: &ProgressBar,
) -> Result<(IndexingReport, Arc<VectorIndex>)> {
    let batch = chunker.chunk_all(documents);
    if batch.chunks.is_empty() {
        warn!("No chunks produced from {} documents", documents.len());
        return Err(Error::EmptyCorpus(EmptyCorpus::NoChunks));
    }
    let index = handle.build_with_progress(&batch.chunks, progress)?;
    let report = IndexingReport { documents: documents.len(), chunks: batch.chunks.len(), vectors: index.len(), dropped: batch.dropped };
    Ok((report, index))
}

/// Index every supported document under `raw_dir`, then save to `index_dir` when given.
pub fn index_directory(
    raw_dir: &Path,
    chunker: &Chunker,
    handle: &IndexHandle,
    index_dir: Option<&Path>,
    progress: &ProgressBar,
) -> Result<IndexingReport> {
    let documents = DocumentIngester::new(raw_dir).ingest_all()?;
    if documents.is_empty() {
        warn!("No documents found in {}", raw_dir.display());
        return Err(Error::EmptyCorpus(EmptyCorpus::NoChunks));
    }
    let (report, index) = build_and_publish(&documents, chunker, handle, progress)?;
    // Save this build's index, not whatever is live by now.
    if let Some(dir) = index_dir {
        index.save(dir)?;
    }
    info!("Indexed {} documents into {} vectors", report.documents, report.vectors);
    Ok(report)
}
