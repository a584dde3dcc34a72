use erpqa_core::types::{AnswerRecord, RetrievalResult};

const PREVIEW_CHARS: usize = 150;

/// Numbered context block; `[Source N]` in the answer refers to `results[N - 1]`.
pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("\n[Source {}: {}]\n{}\n", i + 1, r.source, r.text))
        .collect()
}

/// The grounded-answer instruction prompt.
pub fn render_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an ERP system expert assistant. Answer the question using ONLY the context provided below.\n\
         \n\
         CONTEXT FROM ERP DOCUMENTATION:\n\
         {context}\n\
         \n\
         INSTRUCTIONS:\n\
         1. Answer directly and concisely\n\
         2. Cite sources using [Source 1], [Source 2] format after each claim\n\
         3. If information is missing, say \"I don't have that information in the provided documents\"\n\
         4. Use bullet points for procedural questions\n\
         5. Be specific and factual\n\
         \n\
         USER QUESTION: {query}\n\
         \n\
         ANSWER:"
    )
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect::<String>().replace('\n', " ")
}

/// Render an answer for a terminal or chat window.
pub fn format_answer(record: &AnswerRecord) -> String {
    let mut out = format!("**Answer:**\n{}\n\n", record.answer);
    if !record.sources.is_empty() {
        out.push_str("**Sources:**\n");
        for (i, source) in record.sources.iter().enumerate() {
            out.push_str(&format!("{}. {} (Relevance: {:.2}%)\n", i + 1, source.source, source.score * 100.0));
            out.push_str(&format!("   └─ {}...\n\n", preview(&source.text)));
        }
    }
    out.push_str(&format!("**Confidence:** {:.2}%", record.confidence * 100.0));
    out
}
