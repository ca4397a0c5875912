use std::path::Path;

use thiserror::Error;

use crate::document::{Document, Page};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("not a readable PDF: {0}")]
    InvalidPdf(String),
    #[error("no extractable text layer in {0} (scanned-image PDFs are not supported)")]
    NoTextLayer(String),
}

/// Loads a PDF from disk into a `Document` with one `Page` per physical page.
pub fn load_pdf(path: impl AsRef<Path>) -> Result<Document, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound(path.display().to_string()));
    }

    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let raw_pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| LoadError::InvalidPdf(format!("{}: {}", path.display(), e)))?;

    build_document(&source_file, raw_pages)
}

/// Loads a PDF from an in-memory byte stream, e.g. an upload handed over by a front-end.
pub fn load_pdf_bytes(bytes: &[u8], source_file: &str) -> Result<Document, LoadError> {
    let raw_pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| LoadError::InvalidPdf(format!("{}: {}", source_file, e)))?;

    build_document(source_file, raw_pages)
}

fn build_document(source_file: &str, raw_pages: Vec<String>) -> Result<Document, LoadError> {
    let pages: Vec<Page> = raw_pages
        .into_iter()
        .enumerate()
        .map(|(i, raw)| Page {
            number: (i + 1) as u32,
            text: normalize_text(&raw),
        })
        .collect();

    if pages.iter().all(|p| p.text.is_empty()) {
        return Err(LoadError::NoTextLayer(source_file.to_string()));
    }

    let document = Document {
        id: document_id(source_file),
        source_file: source_file.to_string(),
        pages,
    };

    log::info!(
        "loaded {} ({} pages, {} chars)",
        document.source_file,
        document.pages.len(),
        document.char_count()
    );

    Ok(document)
}

/// Stable document identifier derived from the filename stem.
pub fn document_id(source_file: &str) -> String {
    let stem = source_file
        .rsplit('/')
        .next()
        .unwrap_or(source_file)
        .trim_end_matches(".pdf")
        .trim_end_matches(".PDF");
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.replace("\r\n", "\n").replace('\r', "\n").lines() {
        let line = line.trim_end();
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_filesystem_safe() {
        assert_eq!(document_id("Truecaller 2023 ESG.pdf"), "truecaller_2023_esg");
        assert_eq!(document_id("reports/acme.PDF"), "acme");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_pdf("does/not/exist.pdf").unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn empty_pages_mean_no_text_layer() {
        let err = build_document("scan.pdf", vec!["  \n".to_string(), String::new()]).unwrap_err();
        assert!(matches!(err, LoadError::NoTextLayer(_)));
    }

    #[test]
    fn normalization_keeps_page_order() {
        let doc = build_document(
            "r.pdf",
            vec!["first page\r\n".to_string(), "second page  \n".to_string()],
        )
        .unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.pages[1].text, "second page");
    }
}
