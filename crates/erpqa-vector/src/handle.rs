use indicatif::ProgressBar;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use erpqa_core::error::{Error, Result};
use erpqa_core::traits::Embedder;
use erpqa_core::types::Chunk;

use crate::index::{LoadPolicy, Neighbor, VectorIndex};

/// Owner of the live index.
///
/// A (re)build happens entirely off to the side and the finished index is swapped in,
/// so concurrent queries see either the previous index or the new one, never a mix.
/// A failed build leaves the previous index in place.
pub struct IndexHandle {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    load_policy: LoadPolicy,
    current: RwLock<Option<Arc<VectorIndex>>>,
}

impl IndexHandle {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder, batch_size: 32, load_policy: LoadPolicy::default(), current: RwLock::new(None) }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Build from `chunks` and publish. Returns the number of indexed vectors.
    pub fn build(&self, chunks: &[Chunk]) -> Result<usize> {
        Ok(self.build_with_progress(chunks, &ProgressBar::hidden())?.len())
    }

    /// Build from `chunks` and publish, returning the index that was published.
    ///
    /// The returned `Arc` stays this build's index even if another build publishes later.
    pub fn build_with_progress(&self, chunks: &[Chunk], progress: &ProgressBar) -> Result<Arc<VectorIndex>> {
        let index = Arc::new(VectorIndex::build_with_progress(self.embedder.as_ref(), chunks, self.batch_size, progress)?);
        self.publish(index.clone());
        Ok(index)
    }

    /// Make `index` the live one, returning whatever it replaced.
    pub fn publish(&self, index: impl Into<Arc<VectorIndex>>) -> Option<Arc<VectorIndex>> {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        slot.replace(index.into())
    }

    /// The live index; queries keep using this snapshot even if a rebuild publishes meanwhile.
    pub fn snapshot(&self) -> Result<Arc<VectorIndex>> {
        self.current().ok_or(Error::IndexNotBuilt)
    }

    pub fn is_built(&self) -> bool { self.current().is_some() }

    pub fn query(&self, text: &str, k: usize) -> Result<Vec<Neighbor>> {
        self.snapshot()?.query(self.embedder.as_ref(), text, k)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let index = self.current().ok_or(Error::NoIndexToSave)?;
        index.save(dir)
    }

    /// Load a saved index and publish it. Returns the number of loaded vectors.
    pub fn load(&self, dir: &Path) -> Result<usize> {
        let index = VectorIndex::load(dir, self.embedder.as_ref(), self.load_policy)?;
        let count = index.len();
        self.publish(index);
        info!("Index with {} vectors is live", count);
        Ok(count)
    }

    fn current(&self) -> Option<Arc<VectorIndex>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
