// Document discovery and plain-text extraction for the ingestion pipeline


mod csv_table;
mod docx;

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{GurujiError, Result};

/// File formats the extractor understands, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Csv,
    Json,
    Docx,
    Pdf,
    Unsupported,
}

impl FileKind {
    #[inline]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("txt") => Self::Text,
            Some("csv") => Self::Csv,
            Some("json") => Self::Json,
            Some("docx") => Self::Docx,
            Some("pdf") => Self::Pdf,
            _ => Self::Unsupported,
        }
    }
}

/// A file and the text extracted from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

/// Outcome of extracting every file under a folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Files that produced non-blank text, in path order
    pub documents: Vec<Document>,
    /// Files that produced no text, including unsupported and unreadable ones
    pub skipped: Vec<PathBuf>,
}

impl ExtractionReport {
    #[inline]
    pub fn processed(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// All regular files below `root`, symlinks followed, sorted by path
#[inline]
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), error);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();

    files.sort();
    debug!("Found {} files under {}", files.len(), root.display());
    files
}

/// Extract a file's text, logging failures and returning an empty string
#[inline]
pub fn extract_text(path: &Path) -> String {
    match try_extract_text(path) {
        Ok(text) => text,
        Err(error) => {
            warn!("Error reading {}: {}", path.display(), error);
            String::new()
        }
    }
}

/// Extract a file's text; unsupported formats yield an empty string
#[inline]
pub fn try_extract_text(path: &Path) -> Result<String> {
    let result = match FileKind::from_path(path) {
        FileKind::Text => fs::read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .context("Failed to read text file"),
        FileKind::Csv => csv_table::extract_csv(path),
        FileKind::Json => extract_json(path),
        FileKind::Docx => docx::extract_docx(path),
        FileKind::Pdf => extract_pdf(path),
        FileKind::Unsupported => {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            info!("Unsupported file type: {} ({})", extension, path.display());
            return Ok(String::new());
        }
    };

    result.map_err(|e| GurujiError::Extraction(format!("{:#}", e)))
}

/// Walk `root` and extract every file, keeping the ones with text
#[inline]
pub fn extract_documents(root: &Path) -> ExtractionReport {
    let mut report = ExtractionReport::default();

    for path in walk_files(root) {
        let text = extract_text(&path);
        if text.trim().is_empty() {
            warn!("No text extracted from {}", path.display());
            report.skipped.push(path);
        } else {
            debug!("Extracted {} characters from {}", text.len(), path.display());
            report.documents.push(Document { path, text });
        }
    }

    info!(
        "Extracted text from {} files, skipped {}",
        report.processed(),
        report.skipped.len()
    );
    report
}

fn extract_json(path: &Path) -> anyhow::Result<String> {
    let content = fs::read_to_string(path).context("Failed to read JSON file")?;
    let value: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse JSON")?;
    serde_json::to_string_pretty(&value).context("Failed to format JSON")
}

fn extract_pdf(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).context("Failed to read PDF file")?;

    // pdf-extract panics on some malformed inputs
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
        .map_err(|_| anyhow::anyhow!("PDF parser panicked"))?;

    extracted.map_err(|e| anyhow::anyhow!("Failed to extract PDF text: {}", e))
}
