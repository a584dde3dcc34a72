use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use erpqa_answer::{format_answer, AnswerSynthesizer};
use erpqa_cli::{init_tracing, print_report, print_results, Workspace};
use erpqa_core::traits::Retriever;
use erpqa_vector::format::Manifest;
use erpqa_vector::VectorRetriever;

#[derive(Parser)]
#[command(name = "erpqa", version, about = "Question answering over ERP documentation")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest documents and build the vector index
    Index {
        /// Document directory (defaults to paths.raw_dir)
        dir: Option<PathBuf>,
    },
    /// Answer one question
    Ask {
        question: String,
        /// Number of chunks to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Interactive question loop
    Chat {
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Retrieval only, no generation
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Describe the saved index
    Status,
    /// Show configuration and check the generation backend
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ws = Workspace::load().map_err(|e| { eprintln!("Error loading config: {:#}", e); e })?;
    let default_k = ws.settings.retrieval.top_k;

    match cli.command {
        Command::Index { dir } => {
            println!("ERP Document Indexer\n====================");
            let handle = ws.index_handle()?;
            let report = ws.index_corpus(dir.as_deref(), &handle)?;
            print_report(&report);
            println!("💾 Saved index to {}", ws.index_dir().display());
        }
        Command::Ask { question, top_k } => {
            let synth = ws.synthesizer(ws.open_index()?)?;
            ask(&synth, &question, top_k.unwrap_or(default_k))?;
        }
        Command::Chat { top_k } => {
            let synth = ws.synthesizer(ws.open_index()?)?;
            chat(&synth, top_k.unwrap_or(default_k))?;
        }
        Command::Search { query, top_k } => {
            let retriever = VectorRetriever::new(ws.open_index()?);
            let results = retriever.retrieve(&query, top_k.unwrap_or(default_k))?;
            print_results(&query, &results);
        }
        Command::Status => status(&ws)?,
        Command::Check => check(&ws)?,
    }
    Ok(())
}

fn ask(synth: &AnswerSynthesizer, question: &str, top_k: usize) -> Result<()> {
    println!("\n🔍 Searching for: '{}'", question);
    let record = synth.answer(question, top_k)?;
    println!("\n{}\n", format_answer(&record));
    Ok(())
}

fn chat(synth: &AnswerSynthesizer, top_k: usize) -> Result<()> {
    println!("💬 Ask about the ERP documentation (type 'exit' to quit)");
    let stdin = io::stdin();
    loop {
        print!("\n> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if matches!(question, "exit" | "quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }
        ask(synth, question, top_k)?;
    }
    Ok(())
}

fn status(ws: &Workspace) -> Result<()> {
    let dir = ws.index_dir();
    println!("📁 Index directory: {}", dir.display());
    match Manifest::read(&dir) {
        Ok(m) => {
            println!("   Format:   {} v{}", m.magic, m.format_version);
            println!("   Embedder: {} (dim {})", m.embedder_id, m.dim);
            println!("   Chunks:   {}", m.count);
            println!("   Built:    {}", m.created_at.to_rfc3339());
        }
        Err(e) => println!("⚠️  {}", e),
    }
    Ok(())
}

fn check(ws: &Workspace) -> Result<()> {
    let s = &ws.settings;
    println!("\n{}\nERP QA CONFIGURATION\n{}", "=".repeat(60), "=".repeat(60));
    println!("\n📚 Stack:");
    println!("  • Embeddings: {:?} (dim {})", s.embedding.provider, s.embedding.dim);
    println!("  • LLM: Ollama ({}) at {}", s.ollama.model, s.ollama.base_url);
    println!("\n⚙️  Settings:");
    println!("  • Chunk size: {} words (overlap {})", s.chunking.chunk_size, s.chunking.overlap);
    println!("  • Top-K: {}", s.retrieval.top_k);
    match s.retrieval.min_score {
        Some(min) => println!("  • Min score: {}", min),
        None => println!("  • Min score: off"),
    }
    println!("  • Raw documents: {}", ws.raw_dir().display());
    println!("  • Index: {}", ws.index_dir().display());
    println!();

    let generator = ws.generator()?;
    match generator.has_model() {
        Ok(true) => println!("✓ Ollama is running at {} with {}", generator.base_url(), generator.model()),
        Ok(false) => {
            println!("⚠️  Ollama is running but {} is not installed", generator.model());
            println!("   Pull it with: ollama pull {}", generator.model());
        }
        Err(e) => {
            println!("⚠️  Ollama not responding at {}: {}", generator.base_url(), e);
            println!("   Start with: ollama serve");
        }
    }
    Ok(())
}
