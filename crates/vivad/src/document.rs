//! Plain-text extraction from uploaded documents.

use tracing::{debug, warn};
use viva_common::VivaError;

/// Turns uploaded bytes into text for document-mode sessions.
pub trait DocumentExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, VivaError>;
}

/// PDF extractor reading at most `max_pages` pages.
pub struct PdfExtractor {
    max_pages: usize,
}

impl PdfExtractor {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, VivaError> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| {
            warn!("Rejected upload: {}", e);
            VivaError::Extraction(e.to_string())
        })?;

        let pages: Vec<u32> = document
            .get_pages()
            .keys()
            .copied()
            .take(self.max_pages)
            .collect();
        debug!("Extracting text from {} pages", pages.len());

        let mut text = String::new();
        for page in pages {
            let page_text = document.extract_text(&[page]).map_err(|e| {
                warn!("Text extraction failed on page {}: {}", page, e);
                VivaError::Extraction(format!("page {}: {}", page, e))
            })?;
            text.push_str(&page_text);
        }

        if text.trim().is_empty() {
            return Err(VivaError::Extraction(format!(
                "no extractable text in the first {} pages",
                self.max_pages
            )));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_an_extraction_error() {
        let extractor = PdfExtractor::new(5);
        let err = extractor.extract(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, VivaError::Extraction(_)));
    }

    #[test]
    fn test_empty_upload_is_an_extraction_error() {
        let extractor = PdfExtractor::new(5);
        assert!(matches!(
            extractor.extract(&[]),
            Err(VivaError::Extraction(_))
        ));
    }
}
