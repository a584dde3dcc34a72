use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use erpqa_answer::{
    build_context, format_answer, render_prompt, AnswerSynthesizer, GENERATION_FAILED_ANSWER, INVALID_QUERY_ANSWER,
    NO_INFORMATION_ANSWER,
};
use erpqa_core::error::{Error, GenerationError, Result};
use erpqa_core::traits::{Generator, Retriever};
use erpqa_core::types::{AnswerRecord, Chunk, ChunkMetadata, RetrievalResult};
use erpqa_embed::HashEmbedder;
use erpqa_vector::{IndexHandle, VectorRetriever};

fn result(source: &str, text: &str, score: f32) -> RetrievalResult {
    RetrievalResult {
        text: text.to_string(),
        source: source.to_string(),
        chunk_id: format!("{}_chunk_0", source),
        score,
        metadata: ChunkMetadata { source_file: source.to_string(), chunk_index: 0, total_chunks: 1 },
    }
}

struct StubRetriever {
    results: Vec<RetrievalResult>,
    calls: AtomicUsize,
}

impl StubRetriever {
    fn returning(results: Vec<RetrievalResult>) -> Arc<Self> { Arc::new(Self { results, calls: AtomicUsize::new(0) }) }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Retriever for StubRetriever {
    fn retrieve(&self, _query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(top_k).cloned().collect())
    }
}

struct UnbuiltRetriever;

impl Retriever for UnbuiltRetriever {
    fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<RetrievalResult>> { Err(Error::IndexNotBuilt) }
}

/// Records prompts and replies with a fixed outcome.
struct SpyGenerator {
    reply: fn() -> std::result::Result<String, GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl SpyGenerator {
    fn new(reply: fn() -> std::result::Result<String, GenerationError>) -> Arc<Self> {
        Arc::new(Self { reply, prompts: Mutex::new(Vec::new()) })
    }
    fn calls(&self) -> usize { self.prompts.lock().expect("lock").len() }
    fn last_prompt(&self) -> String { self.prompts.lock().expect("lock").last().cloned().unwrap_or_default() }
}

impl Generator for SpyGenerator {
    fn name(&self) -> &str { "spy" }
    fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        (self.reply)()
    }
}

fn ok_reply() -> std::result::Result<String, GenerationError> {
    Ok("  Department heads approve purchase orders [Source 1].\n".to_string())
}

fn erp_results() -> Vec<RetrievalResult> {
    vec![
        result("procurement.pdf", "Purchase orders must be approved by department heads.", 0.92),
        result("finance.docx", "Invoices above 10000 need CFO sign-off.", 0.85),
        result("handbook.txt", "Vendors are paid on net 30 terms.", 0.78),
    ]
}

#[test]
fn blank_query_touches_neither_retriever_nor_generator() {
    let retriever = StubRetriever::returning(erp_results());
    let generator = SpyGenerator::new(ok_reply);
    let synth = AnswerSynthesizer::new(retriever.clone(), generator.clone());

    for query in ["", "   ", "\n\t"] {
        let record = synth.answer(query, 5).expect("answer");
        assert_eq!(record.answer, INVALID_QUERY_ANSWER);
        assert!(record.sources.is_empty());
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.query, query);
    }
    assert_eq!(retriever.calls(), 0);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn no_results_skip_generation() {
    let retriever = StubRetriever::returning(Vec::new());
    let generator = SpyGenerator::new(ok_reply);
    let synth = AnswerSynthesizer::new(retriever.clone(), generator.clone());

    let record = synth.answer("What is the refund policy?", 5).expect("answer");
    assert_eq!(record.answer, NO_INFORMATION_ANSWER);
    assert!(record.sources.is_empty());
    assert_eq!(record.confidence, 0.0);
    assert_eq!(retriever.calls(), 1);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn grounded_answer_is_trimmed_with_mean_confidence() {
    let generator = SpyGenerator::new(ok_reply);
    let synth = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), generator.clone());

    let record = synth.answer("Who approves purchase orders?", 5).expect("answer");
    assert_eq!(record.answer, "Department heads approve purchase orders [Source 1].");
    assert!((record.confidence - 0.85).abs() < 1e-5, "confidence {}", record.confidence);
    let sources: Vec<&str> = record.sources.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["procurement.pdf", "finance.docx", "handbook.txt"]);
    assert_eq!(record.query, "Who approves purchase orders?");

    let prompt = generator.last_prompt();
    assert!(prompt.contains("[Source 1: procurement.pdf]\nPurchase orders must be approved by department heads."));
    assert!(prompt.contains("[Source 3: handbook.txt]"));
    assert!(prompt.contains("USER QUESTION: Who approves purchase orders?"));
    assert!(prompt.ends_with("ANSWER:"));
}

#[test]
fn generation_failures_fall_back_but_keep_sources() {
    fn unavailable() -> std::result::Result<String, GenerationError> {
        Err(GenerationError::Unavailable("connection refused".into()))
    }
    fn status() -> std::result::Result<String, GenerationError> {
        Err(GenerationError::Status { status: 404, body: "model 'llama3.2' not found".into() })
    }
    fn empty() -> std::result::Result<String, GenerationError> { Err(GenerationError::EmptyResponse) }

    let replies: [fn() -> std::result::Result<String, GenerationError>; 3] = [unavailable, status, empty];
    for reply in replies {
        let generator = SpyGenerator::new(reply);
        let synth = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), generator.clone());
        let record = synth.answer("Who approves purchase orders?", 2).expect("failure is contained");
        assert_eq!(record.answer, GENERATION_FAILED_ANSWER);
        assert_eq!(record.sources.len(), 2);
        assert!((record.confidence - (0.92 + 0.85) / 2.0).abs() < 1e-5);
        assert_eq!(generator.calls(), 1, "never retried");
    }
}

#[test]
fn min_score_filters_only_when_set() {
    let unfiltered = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), SpyGenerator::new(ok_reply));
    assert_eq!(unfiltered.answer("payment terms", 5).expect("answer").sources.len(), 3);

    let filtered = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), SpyGenerator::new(ok_reply))
        .with_min_score(Some(0.8));
    let record = filtered.answer("payment terms", 5).expect("answer");
    assert_eq!(record.sources.len(), 2);
    assert!((record.confidence - 0.885).abs() < 1e-5);

    let generator = SpyGenerator::new(ok_reply);
    let strict = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), generator.clone()).with_min_score(Some(0.95));
    let record = strict.answer("payment terms", 5).expect("answer");
    assert_eq!(record.answer, NO_INFORMATION_ANSWER);
    assert_eq!(generator.calls(), 0);
}

#[test]
fn structural_errors_propagate() {
    let synth = AnswerSynthesizer::new(Arc::new(UnbuiltRetriever), SpyGenerator::new(ok_reply));
    assert!(matches!(synth.answer("anything", 5), Err(Error::IndexNotBuilt)));
}

#[test]
fn context_and_prompt_layout() {
    let results = erp_results();
    let context = build_context(&results[..2]);
    assert_eq!(
        context,
        "\n[Source 1: procurement.pdf]\nPurchase orders must be approved by department heads.\n\
         \n[Source 2: finance.docx]\nInvoices above 10000 need CFO sign-off.\n"
    );
    let prompt = render_prompt("CTX", "Q?");
    assert!(prompt.starts_with("You are an ERP system expert assistant."));
    assert!(prompt.contains("CONTEXT FROM ERP DOCUMENTATION:\nCTX\n\nINSTRUCTIONS:"));
    assert!(prompt.contains("say \"I don't have that information in the provided documents\""));
    assert!(prompt.contains("USER QUESTION: Q?\n\nANSWER:"));
}

#[test]
fn formatted_answer_lists_sources_with_relevance() {
    let synth = AnswerSynthesizer::new(StubRetriever::returning(erp_results()), SpyGenerator::new(ok_reply));
    let record = synth.answer("Who approves purchase orders?", 5).expect("answer");
    let text = format_answer(&record);
    assert!(text.starts_with("**Answer:**\nDepartment heads approve"));
    assert!(text.contains("**Sources:**\n1. procurement.pdf (Relevance: 92.00%)"));
    assert!(text.contains("3. handbook.txt (Relevance: 78.00%)"));
    assert!(text.ends_with("**Confidence:** 85.00%"));

    let empty = format_answer(&AnswerRecord::ungrounded(NO_INFORMATION_ANSWER, "q"));
    assert!(!empty.contains("**Sources:**"));
    assert!(empty.ends_with("**Confidence:** 0.00%"));
}

#[test]
fn end_to_end_over_hash_index() {
    let chunk = |source: &str, text: &str| Chunk {
        text: text.to_string(),
        source: source.to_string(),
        chunk_id: format!("{}_chunk_0", source),
        metadata: ChunkMetadata { source_file: source.to_string(), chunk_index: 0, total_chunks: 1 },
    };
    let handle = Arc::new(IndexHandle::new(Arc::new(HashEmbedder::new(256).expect("embedder"))));
    handle
        .build(&[
            chunk("procurement.pdf", "purchase orders must be approved by department heads before payment"),
            chunk("warehouse.txt", "stock transfers between warehouses require a transfer note"),
        ])
        .expect("build");

    let generator = SpyGenerator::new(ok_reply);
    let synth = AnswerSynthesizer::new(Arc::new(VectorRetriever::new(handle)), generator.clone());
    let record = synth.answer("who approves purchase orders", 1).expect("answer");
    assert_eq!(record.sources.len(), 1);
    assert_eq!(record.sources[0].source, "procurement.pdf");
    assert!((0.0..=1.0).contains(&record.confidence));
    assert!(generator.last_prompt().contains("[Source 1: procurement.pdf]"));
}
