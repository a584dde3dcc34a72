use std::sync::Arc;
use tracing::debug;

use erpqa_core::error::Result;
use erpqa_core::traits::Retriever;
use erpqa_core::types::RetrievalResult;

use crate::handle::IndexHandle;

/// Retriever over the live vector index. Scores are `1 - distance`.
#[derive(Clone)]
pub struct VectorRetriever {
    index: Arc<IndexHandle>,
}

impl VectorRetriever {
    pub fn new(index: Arc<IndexHandle>) -> Self { Self { index } }

    pub fn index(&self) -> &Arc<IndexHandle> { &self.index }
}

impl Retriever for VectorRetriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let neighbors = self.index.query(query, top_k)?;
        debug!("Retrieved {} chunks for query", neighbors.len());
        Ok(neighbors
            .into_iter()
            .map(|n| RetrievalResult::from_chunk(n.chunk, 1.0 - n.distance))
            .collect())
    }
}
