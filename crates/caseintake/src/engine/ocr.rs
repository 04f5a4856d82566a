//! Rasterization and OCR backed by poppler (`pdftoppm`) and Tesseract.

use std::io::Cursor;
use std::process::Command;

use crate::engine::{page_window, PageImage, RasterEngine, Recognized, RenderedPdf};
use crate::error::EngineError;

/// PDF user space is 72 units per inch; the requested render scale
/// multiplies this base to pick the raster DPI.
const RENDER_BASE_DPI: f32 = 72.0;

/// Raster engine shelling out to `pdftoppm` for page rendering and running
/// Tesseract (via `leptess`) for recognition.
pub struct TesseractOcr {
    languages: String,
}

impl TesseractOcr {
    pub fn new(languages: &[String]) -> Self {
        let languages = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };
        Self { languages }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn dpi_for_scale(scale: f32) -> u32 {
    ((RENDER_BASE_DPI * scale).round() as u32).max(1)
}

impl RasterEngine for TesseractOcr {
    fn render(
        &self,
        bytes: &[u8],
        start_page: u32,
        max_pages: u32,
        scale: f32,
    ) -> Result<RenderedPdf, EngineError> {
        let _span = tracing::info_span!("engine.render", start_page, max_pages).entered();

        let total_pages = count_pdf_pages(bytes)? as u32;
        let Some((start, end)) = page_window(total_pages, start_page, max_pages) else {
            return Ok(RenderedPdf {
                pages: Vec::new(),
                total_pages,
                processed_pages: 0,
            });
        };

        let dpi = dpi_for_scale(scale);
        let mut pages = Vec::with_capacity((end - start + 1) as usize);
        for page_num in start..=end {
            let rendered = render_pdf_page(bytes, page_num, dpi)?;
            pages.push(PageImage {
                page_number: page_num,
                bytes: rendered,
            });
        }

        Ok(RenderedPdf {
            pages,
            total_pages,
            processed_pages: end - start + 1,
        })
    }

    fn recognize(
        &self,
        page: &PageImage,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Recognized, EngineError> {
        let _span = tracing::info_span!("engine.ocr", page = page.page_number).entered();
        progress(0.0);

        // Normalize to PNG in memory; uploads arrive in assorted formats.
        let img = image::load_from_memory(&page.bytes)
            .map_err(|e| EngineError::Ocr(format!("Failed to load image: {}", e)))?;
        let mut png_data = Vec::new();
        let mut cursor = Cursor::new(&mut png_data);
        img.write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| EngineError::Ocr(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.languages)
            .map_err(|e| EngineError::Ocr(format!("Failed to initialize Tesseract: {}", e)))?;
        lt.set_image_from_mem(&png_data)
            .map_err(|e| EngineError::Ocr(format!("Failed to set image for OCR: {}", e)))?;
        let text = lt
            .get_utf8_text()
            .map_err(|e| EngineError::Ocr(format!("Text recognition failed: {}", e)))?;

        // Tesseract reports mean confidence in percent.
        let confidence = (lt.mean_text_conf() as f32 / 100.0).clamp(0.0, 1.0);

        progress(1.0);
        Ok(Recognized { text, confidence })
    }
}

/// Page count via `pdfinfo` (poppler-utils). Falls back to 1 when the count
/// line is missing, matching poppler's own behavior for degenerate files.
fn count_pdf_pages(pdf_bytes: &[u8]) -> Result<usize, EngineError> {
    let temp_dir = std::env::temp_dir();
    let pdf_path = temp_dir.join(format!("caseintake_pagecount_{}.pdf", uuid::Uuid::new_v4()));

    std::fs::write(&pdf_path, pdf_bytes)
        .map_err(|e| EngineError::Raster(format!("Failed to write temp PDF: {}", e)))?;

    let output = Command::new("pdfinfo").arg(&pdf_path).output().map_err(|e| {
        let _ = std::fs::remove_file(&pdf_path);
        EngineError::Raster(format!(
            "Failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
            e
        ))
    })?;

    let _ = std::fs::remove_file(&pdf_path);

    if !output.status.success() {
        return Err(EngineError::Raster(format!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        if let Some(count_str) = line.strip_prefix("Pages:") {
            if let Ok(count) = count_str.trim().parse::<usize>() {
                return Ok(count);
            }
        }
    }

    Ok(1)
}

fn render_pdf_page(pdf_bytes: &[u8], page_num: u32, dpi: u32) -> Result<Vec<u8>, EngineError> {
    let temp_dir = std::env::temp_dir();
    let pdf_path = temp_dir.join(format!("caseintake_render_{}.pdf", uuid::Uuid::new_v4()));
    let output_prefix = temp_dir.join(format!("caseintake_page_{}", uuid::Uuid::new_v4()));

    std::fs::write(&pdf_path, pdf_bytes)
        .map_err(|e| EngineError::Raster(format!("Failed to write temp PDF: {}", e)))?;

    let output = Command::new("pdftoppm")
        .args(["-png", "-r", &dpi.to_string()])
        .args(["-f", &page_num.to_string(), "-l", &page_num.to_string()])
        .arg(&pdf_path)
        .arg(&output_prefix)
        .output()
        .map_err(|e| {
            let _ = std::fs::remove_file(&pdf_path);
            EngineError::Raster(format!(
                "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

    let _ = std::fs::remove_file(&pdf_path);

    if !output.status.success() {
        return Err(EngineError::Raster(format!(
            "pdftoppm failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    // pdftoppm pads the page-number suffix depending on the page count.
    let candidates = [
        format!("{}-{}.png", output_prefix.display(), page_num),
        format!("{}-{:02}.png", output_prefix.display(), page_num),
        format!("{}-{:03}.png", output_prefix.display(), page_num),
    ];
    let image_path = candidates
        .iter()
        .find(|p| std::path::Path::new(p).exists())
        .ok_or_else(|| EngineError::Raster("Failed to find rendered page image".to_string()))?;

    let image_data = std::fs::read(image_path)
        .map_err(|e| EngineError::Raster(format!("Failed to read rendered image: {}", e)))?;

    let _ = std::fs::remove_file(image_path);

    Ok(image_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_join() {
        let engine = TesseractOcr::new(&["eng".to_string(), "deu".to_string()]);
        assert_eq!(engine.languages(), "eng+deu");
    }

    #[test]
    fn test_default_language() {
        let engine = TesseractOcr::new(&[]);
        assert_eq!(engine.languages(), "eng");
    }

    #[test]
    fn test_dpi_for_scale() {
        assert_eq!(dpi_for_scale(1.0), 72);
        assert_eq!(dpi_for_scale(1.6), 115);
        // Degenerate scales never produce a zero DPI.
        assert_eq!(dpi_for_scale(0.0), 1);
    }

    #[test]
    fn test_recognize_rejects_invalid_image_data() {
        let engine = TesseractOcr::default();
        let page = PageImage {
            page_number: 1,
            bytes: b"not valid image data".to_vec(),
        };

        let result = engine.recognize(&page, &mut |_| {});
        match result {
            Err(EngineError::Ocr(msg)) => assert!(msg.contains("Failed to load image")),
            other => panic!("Expected Ocr error, got {:?}", other),
        }
    }

    #[test]
    fn test_recognize_rejects_empty_image_data() {
        let engine = TesseractOcr::default();
        let page = PageImage {
            page_number: 1,
            bytes: Vec::new(),
        };

        assert!(engine.recognize(&page, &mut |_| {}).is_err());
    }
}
