//! Narrow adapters over the external text-extraction engines.
//!
//! The pipeline talks to exactly two seams: a [`TextEngine`] for documents
//! with an embedded text layer, and a [`RasterEngine`] that renders pages
//! and recognizes text on them. Concrete engines implement these traits;
//! nothing else about them leaks into the pipeline.

pub mod ocr;
pub mod pdf;

pub use ocr::TesseractOcr;
pub use pdf::PdfTextEngine;

use crate::error::EngineError;

/// Native text pulled from a page window of an embedded-text document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeText {
    pub text: String,
    pub total_pages: u32,
    pub processed_pages: u32,
}

/// One rendered page, ready for recognition.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number within the source document.
    pub page_number: u32,
    /// Encoded image bytes (any format the `image` crate can decode).
    pub bytes: Vec<u8>,
}

/// A rendered page window of a PDF.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub pages: Vec<PageImage>,
    pub total_pages: u32,
    pub processed_pages: u32,
}

/// Recognition output for a single page or image.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognized {
    pub text: String,
    /// Normalized to [0, 1].
    pub confidence: f32,
}

/// Extracts the embedded text layer of a document, when one exists.
pub trait TextEngine: Send + Sync {
    /// Extracts text for up to `max_pages` pages starting at the 1-based
    /// `start_page`. A start past the end of the document is clamped to the
    /// last page.
    fn extract_text(
        &self,
        bytes: &[u8],
        start_page: u32,
        max_pages: u32,
    ) -> Result<NativeText, EngineError>;
}

/// Renders document pages to raster images and recognizes text on them.
pub trait RasterEngine: Send + Sync {
    fn render(
        &self,
        bytes: &[u8],
        start_page: u32,
        max_pages: u32,
        scale: f32,
    ) -> Result<RenderedPdf, EngineError>;

    /// Recognizes text on one page. `progress` receives intra-page progress
    /// in [0, 1]; implementations may report coarsely.
    fn recognize(
        &self,
        page: &PageImage,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Recognized, EngineError>;
}

/// Clamps a requested page window to a document's page count. Returns the
/// inclusive 1-based `(start, end)` range, or `None` when the document has
/// no pages or the window is empty.
pub(crate) fn page_window(total_pages: u32, start_page: u32, max_pages: u32) -> Option<(u32, u32)> {
    if total_pages == 0 || max_pages == 0 {
        return None;
    }
    let start = start_page.clamp(1, total_pages);
    let end = total_pages.min(start + max_pages - 1);
    Some((start, end))
}
