use clap::Parser;
use std::path::PathBuf;

use erpqa_cli::{init_tracing, print_report, Workspace};

#[derive(Parser)]
#[command(name = "erpqa-indexer", about = "Build the ERP document index")]
struct Args {
    /// Document directory (defaults to paths.raw_dir)
    dir: Option<PathBuf>,

    /// Write the index here instead of paths.index_dir
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let mut ws = Workspace::load().map_err(|e| { eprintln!("Error loading config: {:#}", e); e })?;
    if let Some(out) = &args.out {
        ws.settings.paths.index_dir = out.to_string_lossy().to_string();
    }

    let data_dir = args.dir.clone().unwrap_or_else(|| ws.raw_dir());
    println!("ERP Document Indexer\n====================");
    println!("Data directory: {}", data_dir.display());
    println!("Index directory: {}", ws.index_dir().display());

    let handle = ws.index_handle()?;
    let report = ws.index_corpus(Some(data_dir.as_path()), &handle)?;
    print_report(&report);
    println!("\n✅ Indexing completed successfully!");
    println!("\n💡 To search, use: cargo run --bin erpqa-search '<query>'");
    println!("💡 To ask a question, use: cargo run --bin erpqa -- ask '<question>'");
    Ok(())
}
