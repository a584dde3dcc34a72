use crate::error::{GenerationError, Result};
use crate::types::RetrievalResult;

/// Text embedding capability used by the vector index.
///
/// Implementations must be deterministic for identical input and return vectors of
/// exactly `dim()` components. `id()` is persisted with a saved index so that an index is
/// never queried with a different model than the one that built it.
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Text generation capability used by the answer synthesizer.
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}

/// Semantic lookup of the chunks most relevant to a query.
///
/// Results come back ordered by descending `score`, at most `top_k` of them.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>>;
}
