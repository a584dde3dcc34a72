use anyhow::Result;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use twox_hash::XxHash64;

use erpqa_core::config::{EmbeddingProvider, EmbeddingSettings};
use erpqa_core::traits::Embedder;

#[cfg(feature = "model")]
mod device;
#[cfg(feature = "model")]
mod model;
#[cfg(feature = "model")]
mod pool;
#[cfg(feature = "model")]
mod tokenize;

#[cfg(feature = "model")]
pub use model::SentenceEmbedder;
#[cfg(feature = "model")]
pub use pool::masked_mean_l2;

/// Scale `v` to unit length in place and return its original norm.
/// Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) -> f32 {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() { *x /= norm; }
    }
    norm
}

/// Feature-hashed bag-of-words embedder.
///
/// Tokens are lowercased alphanumeric runs; each one adds a positive weight to the
/// bucket its xxHash64 selects. All components are non-negative, so the cosine of two
/// embeddings always lies in `[0, 1]`. Deterministic across runs and platforms.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        anyhow::ensure!(dim > 0, "hash embedder dimension must be positive");
        Ok(Self { dim, id: format!("hash:xxh64:d{}", dim) })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + 0.5 * (((h >> 32) as u32) as f32 / u32::MAX as f32);
        }
        l2_normalize(&mut v);
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Build the embedder selected by `embedding.provider`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider {
        EmbeddingProvider::Hash => {
            tracing::info!("Using hash embedder (dim {})", settings.dim);
            Ok(Arc::new(HashEmbedder::new(settings.dim)?))
        }
        EmbeddingProvider::Model => load_model_embedder(settings),
    }
}

#[cfg(feature = "model")]
fn load_model_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dir = model::resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Arc::new(SentenceEmbedder::load(&dir)?))
}

#[cfg(not(feature = "model"))]
fn load_model_embedder(_settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    anyhow::bail!("embedding.provider = \"model\" requires erpqa-embed to be built with the `model` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_lowercased_alphanumeric_runs() {
        let t: Vec<String> = tokens("Purchase-Order #42, APPROVED!").collect();
        assert_eq!(t, vec!["purchase", "order", "42", "approved"]);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut v = vec![0.0f32; 4];
        assert_eq!(l2_normalize(&mut v), 0.0);
        assert!(v.iter().all(|x| *x == 0.0));

        let mut w = vec![3.0f32, 4.0];
        assert!((l2_normalize(&mut w) - 5.0).abs() < 1e-6);
        assert!((w[0] - 0.6).abs() < 1e-6 && (w[1] - 0.8).abs() < 1e-6);
    }
}
