use std::sync::Arc;
use tracing::{info, warn};

use erpqa_core::error::{GenerationError, Result};
use erpqa_core::traits::{Generator, Retriever};
use erpqa_core::types::{AnswerRecord, RetrievalResult};

use crate::prompt::{build_context, render_prompt};

pub const INVALID_QUERY_ANSWER: &str = "Please enter a question about the ERP documentation.";
pub const NO_INFORMATION_ANSWER: &str = "I couldn't find relevant information in the ERP documentation.";
pub const GENERATION_FAILED_ANSWER: &str = "Error generating answer. Please check Ollama is running.";

/// Mean score of `results`; 0.0 when there are none.
pub fn mean_score(results: &[RetrievalResult]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32
}

fn failure_kind(err: &GenerationError) -> &'static str {
    match err {
        GenerationError::Unavailable(_) => "unavailable",
        GenerationError::Status { .. } => "http_status",
        GenerationError::Malformed(_) => "malformed",
        GenerationError::EmptyResponse => "empty",
    }
}

/// Retrieval-augmented answering: retrieve, build a cited prompt, generate.
pub struct AnswerSynthesizer {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    min_score: Option<f32>,
}

impl AnswerSynthesizer {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self { retriever, generator, min_score: None }
    }

    /// Drop retrieved chunks scoring below `min_score` before they reach the prompt.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn generator(&self) -> &Arc<dyn Generator> { &self.generator }

    /// Answer `query` from at most `top_k` retrieved chunks.
    ///
    /// Generation failures never surface as errors: the record then carries a fixed
    /// fallback answer with the sources and confidence that were retrieved.
    pub fn answer(&self, query: &str, top_k: usize) -> Result<AnswerRecord> {
        if query.trim().is_empty() {
            return Ok(AnswerRecord::ungrounded(INVALID_QUERY_ANSWER, query));
        }

        let mut sources = self.retriever.retrieve(query, top_k)?;
        if let Some(min) = self.min_score {
            let before = sources.len();
            sources.retain(|r| r.score >= min);
            if sources.len() < before {
                info!("Dropped {} results below min_score {}", before - sources.len(), min);
            }
        }
        if sources.is_empty() {
            return Ok(AnswerRecord::ungrounded(NO_INFORMATION_ANSWER, query));
        }
        info!("Found {} relevant chunks", sources.len());

        let prompt = render_prompt(&build_context(&sources), query);
        let answer = match self.generator.generate(&prompt) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(kind = failure_kind(&e), generator = self.generator.name(), "Generation error: {}", e);
                GENERATION_FAILED_ANSWER.to_string()
            }
        };

        let confidence = mean_score(&sources);
        Ok(AnswerRecord { answer, sources, confidence, query: query.to_string() })
    }
}
