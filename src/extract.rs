//! Document loading and per-page text extraction.
//!
//! Turns a file path into plain UTF-8 text, one string per logical page.
//! PDFs go through `pdf-extract`; Markdown and plain text are read
//! directly. Page boundaries are form feeds (`\u{0C}`), which is what
//! `pdf-extract` emits between PDF pages; a file without form feeds is a
//! single page.

use std::path::Path;

use tracing::debug;

use crate::error::{RagError, Result};
use crate::models::Page;

/// Load a document and extract its pages.
///
/// Fails `DocumentNotFound` if the path does not exist and
/// `UnreadableDocument` if reading or parsing fails. Blank pages are
/// dropped; a document may therefore extract to zero pages.
pub fn extract_pages(path: &Path) -> Result<Vec<Page>> {
    if !path.exists() {
        return Err(RagError::DocumentNotFound {
            path: path.to_path_buf(),
        });
    }

    let text = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => extract_pdf(path)?,
        _ => std::fs::read_to_string(path).map_err(|e| RagError::UnreadableDocument {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
    };

    let pages = split_pages(&text);
    debug!(path = %path.display(), pages = pages.len(), "extracted document");
    Ok(pages)
}

/// The document identifier used for provenance: the file name.
pub fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| RagError::UnreadableDocument {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| RagError::UnreadableDocument {
        path: path.to_path_buf(),
        message: format!("PDF extraction failed: {}", e),
    })
}

/// Split extracted text on form feeds, numbering pages from 1.
///
/// Whitespace-only pages are skipped but keep their page numbers, so
/// provenance stays aligned with the source document.
fn split_pages(text: &str) -> Vec<Page> {
    text.split('\u{0C}')
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(i, t)| Page {
            number: i + 1,
            text: t.to_string(),
        })
        .collect()
}
