use clap::Parser;
use std::path::PathBuf;

use erpqa_cli::{init_tracing, print_results, Workspace};
use erpqa_core::traits::Retriever;
use erpqa_vector::VectorRetriever;

#[derive(Parser)]
#[command(name = "erpqa-search", about = "Semantic search over the saved index")]
struct Args {
    query: String,

    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Index directory (defaults to paths.index_dir)
    index_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(false);
    let mut ws = Workspace::load()?;
    if let Some(dir) = &args.index_dir {
        ws.settings.paths.index_dir = dir.to_string_lossy().to_string();
    }

    println!("🔍 erpqa-search\n==============");
    println!("Query: {}", args.query);
    println!("Index: {}", ws.index_dir().display());

    let retriever = VectorRetriever::new(ws.open_index()?);
    let results = retriever.retrieve(&args.query, args.limit)?;
    print_results(&args.query, &results);
    Ok(())
}
