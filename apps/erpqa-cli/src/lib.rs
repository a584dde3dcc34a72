//! Wiring shared by the `erpqa` binaries: settings, logging, index and answer pipeline setup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use erpqa_answer::{AnswerSynthesizer, OllamaGenerator};
use erpqa_core::chunker::Chunker;
use erpqa_core::config::{Config, Settings};
use erpqa_core::error::Error;
use erpqa_core::types::RetrievalResult;
use erpqa_embed::get_default_embedder;
use erpqa_vector::pipeline::chunk_progress_bar;
use erpqa_vector::{index_directory, IndexHandle, IndexingReport, LoadPolicy, VectorRetriever};

/// Log to stderr; `RUST_LOG` wins over the default level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings plus the directory relative paths resolve against.
pub struct Workspace {
    pub settings: Settings,
    pub base: PathBuf,
}

impl Workspace {
    pub fn load() -> Result<Self> {
        let config = Config::load().context("loading configuration")?;
        let settings = config.settings()?;
        let base = std::env::current_dir().context("resolving working directory")?;
        Ok(Self { settings, base })
    }

    pub fn from_settings(settings: Settings, base: impl Into<PathBuf>) -> Self {
        Self { settings, base: base.into() }
    }

    pub fn raw_dir(&self) -> PathBuf { self.settings.paths.raw_dir(&self.base) }
    pub fn index_dir(&self) -> PathBuf { self.settings.paths.index_dir(&self.base) }

    /// An empty index handle configured from settings.
    pub fn index_handle(&self) -> Result<Arc<IndexHandle>> {
        let embedder = get_default_embedder(&self.settings.embedding)?;
        Ok(Arc::new(
            IndexHandle::new(embedder)
                .with_batch_size(self.settings.embedding.batch_size)
                .with_load_policy(LoadPolicy::from_settings(&self.settings.index)),
        ))
    }

    /// A handle with the saved index loaded.
    pub fn open_index(&self) -> Result<Arc<IndexHandle>> {
        let handle = self.index_handle()?;
        let dir = self.index_dir();
        match handle.load(&dir) {
            Ok(_) => Ok(handle),
            Err(e @ Error::IndexNotFound(_)) => {
                Err(anyhow::Error::new(e).context("no saved index; run `erpqa index` first"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Index `dir` (default: `paths.raw_dir`) and save to `paths.index_dir`.
    pub fn index_corpus(&self, dir: Option<&Path>, handle: &IndexHandle) -> Result<IndexingReport> {
        let raw_dir = dir.map(Path::to_path_buf).unwrap_or_else(|| self.raw_dir());
        let chunker = Chunker::new(self.settings.chunking.clone())?;
        let progress = chunk_progress_bar(0);
        let report = index_directory(&raw_dir, &chunker, handle, Some(self.index_dir().as_path()), &progress)
            .with_context(|| format!("indexing {}", raw_dir.display()))?;
        progress.finish_with_message("✅ Indexing completed!");
        Ok(report)
    }

    pub fn generator(&self) -> Result<OllamaGenerator> { Ok(OllamaGenerator::new(&self.settings.ollama)?) }

    pub fn synthesizer(&self, handle: Arc<IndexHandle>) -> Result<AnswerSynthesizer> {
        let retriever = Arc::new(VectorRetriever::new(handle));
        Ok(AnswerSynthesizer::new(retriever, Arc::new(self.generator()?)).with_min_score(self.settings.retrieval.min_score))
    }
}

pub fn print_results(query: &str, results: &[RetrievalResult]) {
    println!("\n🔍 Found {} results for: \"{}\"", results.len(), query);
    for (i, r) in results.iter().enumerate() {
        println!(
            "\n  {}. score={:.4}  id={}  chunk {}/{}",
            i + 1,
            r.score,
            r.chunk_id,
            r.metadata.chunk_index + 1,
            r.metadata.total_chunks
        );
        println!("     📝 {}", r.text);
    }
}

pub fn print_report(report: &IndexingReport) {
    println!("\n📊 Indexed {} documents into {} chunks ({} vectors)", report.documents, report.chunks, report.vectors);
    if !report.dropped.is_empty() {
        println!("⚠️  {} documents were too short to index:", report.dropped.len());
        for source in &report.dropped {
            println!("   - {}", source);
        }
    }
}
