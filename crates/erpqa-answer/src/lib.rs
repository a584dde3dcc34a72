pub mod ollama;
pub mod prompt;
pub mod synthesizer;

pub use ollama::OllamaGenerator;
pub use prompt::{build_context, format_answer, render_prompt};
pub use synthesizer::{AnswerSynthesizer, GENERATION_FAILED_ANSWER, INVALID_QUERY_ANSWER, NO_INFORMATION_ANSWER};
