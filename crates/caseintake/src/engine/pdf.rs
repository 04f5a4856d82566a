//! Native PDF text extraction backed by `lopdf`.

use lopdf::Document;

use crate::engine::{page_window, NativeText, TextEngine};
use crate::error::EngineError;

/// Reads the embedded text layer of a PDF page window.
///
/// Scanned documents typically carry no text layer; callers treat a short
/// result as the cue to fall back to rasterized OCR.
#[derive(Default)]
pub struct PdfTextEngine;

impl PdfTextEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TextEngine for PdfTextEngine {
    fn extract_text(
        &self,
        bytes: &[u8],
        start_page: u32,
        max_pages: u32,
    ) -> Result<NativeText, EngineError> {
        let _span = tracing::info_span!("engine.pdf_text", start_page, max_pages).entered();

        let doc = Document::load_mem(bytes)
            .map_err(|e| EngineError::PdfText(format!("Failed to load PDF: {}", e)))?;

        let total_pages = doc.get_pages().len() as u32;
        let Some((start, end)) = page_window(total_pages, start_page, max_pages) else {
            return Ok(NativeText {
                text: String::new(),
                total_pages,
                processed_pages: 0,
            });
        };

        let mut combined = String::new();
        for page_num in start..=end {
            let page_text = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(page = page_num, "No extractable text on page: {}", e);
                    continue;
                }
            };
            let trimmed = page_text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !combined.is_empty() {
                combined.push_str("\n\n");
            }
            combined.push_str(&format!("[Page {}]\n{}", page_num, trimmed));
        }

        Ok(NativeText {
            text: combined,
            total_pages,
            processed_pages: end - start + 1,
        })
    }
}
