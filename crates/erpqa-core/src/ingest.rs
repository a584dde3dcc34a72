//! Directory ingestion: finds supported files, extracts their text and normalizes it.
//!
//! Supported: `.pdf` (pdf-extract), `.docx` (text runs of `word/document.xml`),
//! `.txt` and `.md`. Unreadable or empty files are skipped with a warning so one bad
//! file never fails the batch.

use anyhow::{anyhow, Context};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;
use crate::normalize::normalize;
use crate::types::RawDocument;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

pub struct DocumentIngester {
    root: PathBuf,
}

impl DocumentIngester {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    pub fn ingest_all(&self) -> Result<Vec<RawDocument>> {
        if !self.root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("document directory {} does not exist", self.root.display()),
            )
            .into());
        }
        let files = self.list_supported_files();
        let mut documents = Vec::new();
        for file_path in &files {
            match self.process_file(file_path) {
                Ok(Some(doc)) => {
                    info!("Processed: {}", doc.source);
                    documents.push(doc);
                }
                Ok(None) => warn!("Skipping empty file: {}", file_path.display()),
                Err(e) => warn!("Error processing {}: {:#}", file_path.display(), e),
            }
        }
        info!("Total documents ingested: {} (of {} files)", documents.len(), files.len());
        Ok(documents)
    }

    fn process_file(&self, file_path: &Path) -> anyhow::Result<Option<RawDocument>> {
        let raw = extract_text(file_path)?;
        let cleaned = normalize(&raw);
        if cleaned.is_empty() {
            return Ok(None);
        }
        let source = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("path has no file name"))?;
        Ok(Some(RawDocument::new(source, cleaned, file_path)))
    }

    fn list_supported_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_supported(p))
            .collect();
        files.sort();
        files
    }
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Raw (not yet normalized) text of a supported file.
pub fn extract_text(file_path: &Path) -> anyhow::Result<String> {
    let ext = file_path.extension().and_then(|s| s.to_str()).unwrap_or("").to_lowercase();
    match ext.as_str() {
        "pdf" => pdf_extract::extract_text(file_path)
            .map_err(|e| anyhow!("failed to extract PDF text from {}: {}", file_path.display(), e)),
        "docx" => extract_docx_text(file_path),
        "txt" | "md" => read_lossy(file_path),
        other => Err(anyhow!("unsupported file type '{}'", other)),
    }
}

fn read_lossy(file_path: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn extract_docx_text(file_path: &Path) -> anyhow::Result<String> {
    let file = fs::File::open(file_path)?;
    let mut archive = zip::ZipArchive::new(file).context("invalid DOCX archive")?;
    let mut document_xml = archive.by_name("word/document.xml").context("no word/document.xml in DOCX")?;
    let mut xml = String::new();
    document_xml.read_to_string(&mut xml)?;
    Ok(docx_xml_to_text(&xml))
}

/// Text of the `<w:t>` runs, one line per `<w:p>` paragraph.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    let mut chars = xml.chars();
    while let Some(c) = chars.next() {
        if c == '<' {
            let tag: String = chars.by_ref().take_while(|&tc| tc != '>').collect();
            let self_closing = tag.ends_with('/');
            if is_tag(&tag, "w:t") && !self_closing {
                in_text = true;
            } else if tag == "/w:t" {
                in_text = false;
            } else if is_tag(&tag, "w:p") && !self_closing && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        } else if in_text {
            out.push(c);
        }
    }
    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// `w:t` must not match `w:tab` or `w:tbl`.
fn is_tag(tag: &str, name: &str) -> bool {
    tag.strip_prefix(name).is_some_and(|rest| rest.is_empty() || rest.starts_with(' ') || rest.starts_with('/'))
}
