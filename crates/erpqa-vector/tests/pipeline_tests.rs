use std::fs;
use std::sync::Arc;
use indicatif::ProgressBar;
use tempfile::TempDir;

use erpqa_core::chunker::{Chunker, ChunkingConfig};
use erpqa_core::error::{EmptyCorpus, Error};
use erpqa_core::types::RawDocument;
use erpqa_embed::HashEmbedder;
use erpqa_vector::{index_directory, index_documents, IndexHandle};

fn words(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect::<Vec<_>>().join(" ")
}

fn handle() -> IndexHandle { IndexHandle::new(Arc::new(HashEmbedder::new(128).expect("embedder"))) }

#[test]
fn directory_is_indexed_saved_and_reloadable() {
    let tmp = TempDir::new().expect("tmp");
    let raw = tmp.path().join("raw");
    fs::create_dir_all(raw.join("finance")).expect("mkdir");
    fs::write(raw.join("procurement.txt"), words("po", 60)).expect("write");
    fs::write(raw.join("finance/closing.md"), words("gl", 30)).expect("write");
    fs::write(raw.join("memo.txt"), "too short to index").expect("write");
    fs::write(raw.join("notes.csv"), words("csv", 40)).expect("write");

    let chunker = Chunker::new(ChunkingConfig::new(40, 10)).expect("chunker");
    let index_dir = tmp.path().join("embeddings");
    let h = handle();
    let report = index_directory(&raw, &chunker, &h, Some(index_dir.as_path()), &ProgressBar::hidden()).expect("index");

    assert_eq!(report.documents, 3, "csv is not a supported format");
    // 60 words at 40/10 -> windows [0,40) and [30,60); 30 words -> one window.
    assert_eq!(report.chunks, 3);
    assert_eq!(report.vectors, 3);
    assert_eq!(report.dropped, vec!["memo.txt".to_string()]);

    let reloaded = handle();
    assert_eq!(reloaded.load(&index_dir).expect("load"), 3);
    let hits = reloaded.query("gl3 gl4 gl5", 1).expect("query");
    assert_eq!(hits[0].chunk.source, "closing.md");
}

#[test]
fn corpus_without_chunks_is_fatal_and_keeps_index_unbuilt() {
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    let docs = vec![
        RawDocument::new("a.txt", "only five words in here", "/raw/a.txt"),
        RawDocument::new("b.txt", "also short", "/raw/b.txt"),
    ];
    let h = handle();
    let err = index_documents(&docs, &chunker, &h, &ProgressBar::hidden()).expect_err("no chunks");
    assert!(matches!(err, Error::EmptyCorpus(EmptyCorpus::NoChunks)));
    assert!(!h.is_built());
}

#[test]
fn empty_directory_is_fatal_and_nothing_is_saved() {
    let tmp = TempDir::new().expect("tmp");
    let raw = tmp.path().join("raw");
    fs::create_dir_all(&raw).expect("mkdir");
    let index_dir = tmp.path().join("embeddings");
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");

    let err = index_directory(&raw, &chunker, &handle(), Some(index_dir.as_path()), &ProgressBar::hidden()).expect_err("empty");
    assert!(matches!(err, Error::EmptyCorpus(_)));
    assert!(!index_dir.exists());
}

#[test]
fn missing_directory_is_an_io_error() {
    let tmp = TempDir::new().expect("tmp");
    let chunker = Chunker::new(ChunkingConfig::default()).expect("chunker");
    let err = index_directory(&tmp.path().join("absent"), &chunker, &handle(), None, &ProgressBar::hidden())
        .expect_err("missing dir");
    assert!(matches!(err, Error::Io(_)));
}
