//! Shared scripted engines and fixtures for caseintake integration tests.
//!
//! The engines here stand in for the real PDF and OCR backends so tests can
//! drive the pipeline end to end with deterministic text and page counts.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use caseintake::engine::{NativeText, PageImage, Recognized, RenderedPdf};
use caseintake::{
    BlobStore, EngineError, FileMetadata, IntakeConfig, MemoryBlobStore, OcrResult, Pipeline,
    RasterEngine, ResultStore, TextEngine,
};

/// A document with no embedded text layer; every extraction attempt fails
/// so the pipeline falls through to the raster engine.
pub struct NoTextLayer;

impl TextEngine for NoTextLayer {
    fn extract_text(
        &self,
        _bytes: &[u8],
        _start_page: u32,
        _max_pages: u32,
    ) -> Result<NativeText, EngineError> {
        Err(EngineError::PdfText("no text layer".to_string()))
    }
}

/// Scripted scanner: renders the requested window of a fixed page count and
/// recognizes every page with `page_text(page_number)`.
pub struct ScriptedScan {
    pub total_pages: u32,
    pub page_text: fn(u32) -> String,
    pub confidence: f32,
}

impl RasterEngine for ScriptedScan {
    fn render(
        &self,
        _bytes: &[u8],
        start_page: u32,
        max_pages: u32,
        _scale: f32,
    ) -> Result<RenderedPdf, EngineError> {
        let start = start_page.clamp(1, self.total_pages);
        let end = self.total_pages.min(start + max_pages - 1);
        let pages: Vec<PageImage> = (start..=end)
            .map(|page_number| PageImage {
                page_number,
                bytes: Vec::new(),
            })
            .collect();
        Ok(RenderedPdf {
            processed_pages: pages.len() as u32,
            pages,
            total_pages: self.total_pages,
        })
    }

    fn recognize(
        &self,
        page: &PageImage,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Recognized, EngineError> {
        progress(1.0);
        Ok(Recognized {
            text: (self.page_text)(page.page_number),
            confidence: self.confidence,
        })
    }
}

/// Recognizer for single uploaded images: recognition succeeds with a canned
/// result, rendering refuses.
pub struct ImageOnly {
    pub text: String,
    pub confidence: f32,
}

impl RasterEngine for ImageOnly {
    fn render(
        &self,
        _bytes: &[u8],
        _start_page: u32,
        _max_pages: u32,
        _scale: f32,
    ) -> Result<RenderedPdf, EngineError> {
        Err(EngineError::Raster("not a pdf".to_string()))
    }

    fn recognize(
        &self,
        _page: &PageImage,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Recognized, EngineError> {
        progress(1.0);
        Ok(Recognized {
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

/// Spawns a pipeline over the given scripted engines, wiring a fresh
/// in-memory blob store to `store`.
pub fn scripted_pipeline(
    store: Arc<ResultStore>,
    text_engine: Arc<dyn TextEngine>,
    raster_engine: Arc<dyn RasterEngine>,
    config: &IntakeConfig,
) -> (Pipeline, Arc<MemoryBlobStore>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let pipeline = Pipeline::new(
        store,
        Arc::clone(&blobs) as Arc<dyn BlobStore>,
        text_engine,
        raster_engine,
        config,
    );
    (pipeline, blobs)
}

/// Registers an upload and stores placeholder bytes for it.
pub fn register_upload(
    store: &ResultStore,
    blobs: &MemoryBlobStore,
    file_id: &str,
    name: &str,
    mime: &str,
) {
    register_upload_sized(store, blobs, file_id, name, mime, 4096);
}

pub fn register_upload_sized(
    store: &ResultStore,
    blobs: &MemoryBlobStore,
    file_id: &str,
    name: &str,
    mime: &str,
    size_bytes: u64,
) {
    store.register(FileMetadata {
        file_id: file_id.to_string(),
        name: name.to_string(),
        mime_type: Some(mime.to_string()),
        size_bytes: Some(size_bytes),
        assignment_id: "case-81".to_string(),
        node_id: "intake-documents".to_string(),
        legacy_field_id: None,
    });
    blobs.put(file_id, vec![0u8; 64]);
}

/// Polls the store until `predicate` holds for the record, panicking after
/// five seconds.
pub fn wait_for(
    store: &ResultStore,
    file_id: &str,
    predicate: impl Fn(&OcrResult) -> bool,
) -> OcrResult {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(result) = store.get(file_id) {
            if predicate(&result) {
                return result;
            }
        }
        assert!(Instant::now() < deadline, "timed out waiting on {file_id}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Waits until the record reaches a terminal status.
pub fn wait_for_terminal(store: &ResultStore, file_id: &str) -> OcrResult {
    wait_for(store, file_id, |result| result.status.is_terminal())
}

/// Paystub text explicit enough to classify and extract from.
pub fn paystub_page_text() -> String {
    "EARNINGS STATEMENT\n\
     Employer: Lakeshore Logistics\n\
     Pay Period: 02/01/2026 - 02/14/2026\n\
     Gross Pay: $2,400.00\n\
     Net Pay: $1,812.40\n\
     YTD Gross: $12,000.00"
        .to_string()
}

/// Bank-statement text for one scanned page.
pub fn statement_page_text(page: u32) -> String {
    format!(
        "Statement Period 02/01/2026 - 02/28/2026 page {page} \
         Account Summary Ending Balance: $4,300.00"
    )
}
