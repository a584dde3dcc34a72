use std::fs;
use tempfile::TempDir;

use erpqa_cli::Workspace;
use erpqa_core::config::Settings;
use erpqa_core::error::Error;
use erpqa_core::traits::Retriever;
use erpqa_vector::VectorRetriever;

fn workspace(tmp: &TempDir) -> Workspace {
    let mut settings = Settings::default();
    settings.chunking.chunk_size = 50;
    settings.chunking.overlap = 10;
    settings.embedding.dim = 128;
    Workspace::from_settings(settings, tmp.path())
}

fn seed_documents(ws: &Workspace) {
    let raw = ws.raw_dir();
    fs::create_dir_all(&raw).expect("mkdir");
    let po = "Purchase orders above the department budget must be approved by the finance controller \
              before they are released to the vendor. Approved orders are archived for seven years.";
    let inv = "Inventory cycle counts run every Friday. Variances above two percent are escalated to the \
               warehouse manager who reconciles the stock ledger before month end closing.";
    fs::write(raw.join("procurement.txt"), po).expect("write");
    fs::write(raw.join("inventory.md"), inv).expect("write");
}

#[test]
fn index_then_reopen_and_search() {
    let tmp = TempDir::new().expect("tmp");
    let ws = workspace(&tmp);
    seed_documents(&ws);

    let handle = ws.index_handle().expect("handle");
    let report = ws.index_corpus(None, &handle).expect("index");
    assert_eq!(report.documents, 2);
    assert_eq!(report.vectors, 2);
    assert!(ws.index_dir().join("manifest.json").is_file());

    let reopened = ws.open_index().expect("open");
    let results = VectorRetriever::new(reopened).retrieve("who approves purchase orders", 1).expect("retrieve");
    assert_eq!(results[0].source, "procurement.txt");
}

#[test]
fn open_without_index_points_to_index_command() {
    let tmp = TempDir::new().expect("tmp");
    let err = workspace(&tmp).open_index().err().expect("no index yet");
    assert!(format!("{err:#}").contains("erpqa index"), "{err:#}");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::IndexNotFound(_))));
}

#[test]
fn disabled_loading_is_respected() {
    let tmp = TempDir::new().expect("tmp");
    let mut ws = workspace(&tmp);
    seed_documents(&ws);
    ws.index_corpus(None, &ws.index_handle().expect("handle")).expect("index");

    ws.settings.index.allow_load = false;
    let err = ws.open_index().err().expect("loading disabled");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::IndexLoadDisabled(_))));
}
