//! Executes one queued job from pre-flight checks to its terminal status,
//! then runs the owner and reconciliation passes over the finished record.
//!
//! The runner never mutates anything directly; every observable effect is a
//! patch against the result store, so subscribers see the same transitions
//! the worker produced, in order.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use log::{debug, warn};
use tracing::info_span;

use crate::blobstore::BlobStore;
use crate::config::PipelineConfig;
use crate::engine::{PageImage, RasterEngine, TextEngine};
use crate::error::EngineError;
use crate::extract::{classify_doc, extract_from_text};
use crate::model::{
    DocType, DocumentExtraction, OcrResult, OcrStatus, Ownership, PdfPages, ReviewFlag,
    ReviewReason,
};
use crate::ownership::{detect_ownership, CaseContext, DocumentNames};
use crate::reconcile::{CanonicalSnapshot, Reconciler};
use crate::store::{Patch, ResultPatch, ResultStore};

use super::{ProcessingJob, ProcessingMode};

/// Executes jobs on behalf of the worker thread. Engines and the store are
/// shared with the host; the case context and canonical snapshot are swapped
/// in as intake answers change.
pub(super) struct JobRunner {
    pub(super) store: Arc<ResultStore>,
    pub(super) blobs: Arc<dyn BlobStore>,
    pub(super) text_engine: Arc<dyn TextEngine>,
    pub(super) raster_engine: Arc<dyn RasterEngine>,
    pub(super) config: PipelineConfig,
    pub(super) reconciler: Reconciler,
    pub(super) case_context: RwLock<Option<CaseContext>>,
    pub(super) canonical: RwLock<Option<CanonicalSnapshot>>,
}

impl JobRunner {
    pub(super) fn set_case_context(&self, context: Option<CaseContext>) {
        *write_guard(&self.case_context) = context;
    }

    pub(super) fn set_canonical(&self, canonical: Option<CanonicalSnapshot>) {
        *write_guard(&self.canonical) = canonical;
    }

    /// Runs one job to a terminal status. A file id with no registered
    /// record is dropped silently; registration belongs to the uploader.
    pub(super) fn run(&self, job: &ProcessingJob) {
        let _span = info_span!("process_job", file_id = %job.file_id).entered();

        let Some(existing) = self.store.get(&job.file_id) else {
            debug!("No record registered for {}; dropping job", job.file_id);
            return;
        };

        if job.mode == ProcessingMode::Auto {
            let size = existing.size_bytes.unwrap_or(0);
            if size > self.config.max_auto_size_bytes {
                let megabytes = (size as f64 / (1024.0 * 1024.0)).round() as u64;
                self.fail(
                    &job.file_id,
                    OcrStatus::NotProcessed,
                    ReviewFlag::with_detail(
                        true,
                        ReviewReason::TooLarge,
                        format!("File is {megabytes}MB."),
                    ),
                );
                return;
            }
        }

        let is_pdf = looks_like_pdf(&existing);
        if !is_pdf && !looks_like_image(&existing) {
            self.fail(
                &job.file_id,
                OcrStatus::Unsupported,
                ReviewFlag::with_detail(true, ReviewReason::Unsupported, "Unsupported file type."),
            );
            return;
        }

        let mut mark = ResultPatch::new(&job.file_id);
        mark.status = Some(OcrStatus::Processing);
        mark.progress = Patch::Set(0.0);
        mark.processed_at = Patch::Clear;
        mark.review = Patch::Clear;
        self.store.upsert(mark);

        let bytes = match self.blobs.get(&job.file_id) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.fail_missing_blob(&job.file_id);
                return;
            }
            Err(err) => {
                warn!("Blob read failed for {}: {err}", job.file_id);
                self.fail_missing_blob(&job.file_id);
                return;
            }
        };

        let outcome = if is_pdf {
            self.process_pdf(job, &existing, &bytes)
        } else {
            self.process_image(job, &existing, &bytes)
        };

        match outcome {
            Ok(done) => {
                let done = self.apply_ownership(done);
                self.apply_reconciliation(&done);
            }
            Err(err) => {
                warn!("Recognition failed for {}: {err}", job.file_id);
                self.fail(
                    &job.file_id,
                    OcrStatus::Error,
                    ReviewFlag::with_detail(true, ReviewReason::Unreadable, err.to_string()),
                );
            }
        }
    }

    /// Single-shot recognition for image uploads. The blob itself is the
    /// page; intra-page progress maps straight onto job progress.
    fn process_image(
        &self,
        job: &ProcessingJob,
        existing: &OcrResult,
        bytes: &[u8],
    ) -> Result<OcrResult, EngineError> {
        let _span = info_span!("process_image", file_id = %job.file_id).entered();

        let page = PageImage {
            page_number: 1,
            bytes: bytes.to_vec(),
        };
        let recognized = self.raster_engine.recognize(&page, &mut |p| {
            self.report_progress(&job.file_id, clamp01(p));
        })?;
        Ok(self.finish(
            &job.file_id,
            existing.legacy_field_id.as_deref(),
            &recognized.text,
            recognized.confidence,
            None,
        ))
    }

    /// Native-text-first PDF recognition with page-window resume. Raster
    /// OCR only runs when the embedded text layer is missing or too thin
    /// to trust.
    fn process_pdf(
        &self,
        job: &ProcessingJob,
        existing: &OcrResult,
        bytes: &[u8],
    ) -> Result<OcrResult, EngineError> {
        let _span = info_span!("process_pdf", file_id = %job.file_id).entered();

        let previously_processed = existing.pdf.as_ref().map_or(0, |pdf| pdf.processed_pages);
        let continue_from = if job.continue_pdf {
            previously_processed + 1
        } else {
            1
        };
        let max_pages = match job.mode {
            ProcessingMode::Auto => self.config.max_pages_auto,
            ProcessingMode::Manual => self.config.max_pages_manual,
        };
        let hint = existing.legacy_field_id.as_deref();

        match self
            .text_engine
            .extract_text(bytes, continue_from, max_pages)
        {
            Ok(native) => {
                let trimmed = native.text.trim();
                if trimmed.chars().count() >= self.config.min_native_text_chars {
                    let pages = PdfPages {
                        total_pages: native.total_pages,
                        processed_pages: u32::min(
                            native.total_pages,
                            previously_processed + native.processed_pages,
                        ),
                    };
                    let combined = if job.continue_pdf {
                        join_text(existing.raw_text.as_deref(), trimmed)
                    } else {
                        trimmed.to_string()
                    };
                    return Ok(self.finish(&job.file_id, hint, &combined, 1.0, Some(pages)));
                }
                debug!(
                    "Native text layer of {} too thin ({} chars); rasterizing",
                    job.file_id,
                    trimmed.chars().count()
                );
            }
            Err(err) => debug!("No native text layer for {}: {err}", job.file_id),
        }

        let rendered =
            self.raster_engine
                .render(bytes, continue_from, max_pages, self.config.pdf_scale)?;
        let page_count = rendered.pages.len();
        let mut combined = if job.continue_pdf {
            existing.raw_text.clone().unwrap_or_default()
        } else {
            String::new()
        };
        let mut confidence_sum = 0.0_f32;
        let mut recognized_pages = 0_u32;

        for (index, page) in rendered.pages.iter().enumerate() {
            let recognized = self.raster_engine.recognize(page, &mut |p| {
                let overall = (index as f32 + clamp01(p)) / page_count.max(1) as f32;
                self.report_progress(&job.file_id, clamp01(overall));
            })?;
            let text = recognized.text.trim();
            if !text.is_empty() {
                let joined = format!("{combined}\n\n[Page {}]\n{text}", page.page_number);
                combined = joined.trim().to_string();
            }
            if recognized.confidence > 0.0 {
                confidence_sum += recognized.confidence;
                recognized_pages += 1;
            }
        }

        // Pages that produced nothing carry no confidence signal.
        let confidence = if recognized_pages > 0 {
            confidence_sum / recognized_pages as f32
        } else {
            0.0
        };
        let pages = PdfPages {
            total_pages: rendered.total_pages,
            processed_pages: u32::min(
                rendered.total_pages,
                previously_processed + rendered.processed_pages,
            ),
        };
        Ok(self.finish(&job.file_id, hint, &combined, confidence, Some(pages)))
    }

    /// Classifies and extracts over the final text, derives the completion
    /// review flag, and writes the terminal `done` record.
    fn finish(
        &self,
        file_id: &str,
        hint: Option<&str>,
        text: &str,
        confidence: f32,
        pdf: Option<PdfPages>,
    ) -> OcrResult {
        let trimmed = text.trim();
        let doc_type = classify_doc(trimmed, hint);
        let fields = extract_from_text(doc_type, trimmed);
        let review = completion_review(
            doc_type,
            trimmed,
            confidence,
            pdf.as_ref(),
            self.config.min_readable_chars,
            self.reconciler.low_confidence_cutoff(),
        );

        let mut patch = ResultPatch::new(file_id);
        patch.status = Some(OcrStatus::Done);
        patch.progress = Patch::Set(1.0);
        patch.processed_at = Patch::Set(Utc::now());
        patch.ocr_confidence = Some(confidence);
        patch.raw_text = Some(trimmed.to_string());
        patch.doc_type = Some(doc_type);
        patch.extracted = Some(DocumentExtraction { doc_type, fields });
        patch.pdf = pdf;
        patch.review = match review {
            Some(flag) => Patch::Set(flag),
            None => Patch::Clear,
        };
        self.store.upsert(patch)
    }

    /// Attributes the finished document to an owner once the case context
    /// is known. Ambiguous detections leave the owner unset; asking the
    /// client beats a silent guess.
    fn apply_ownership(&self, record: OcrResult) -> OcrResult {
        let Some(context) = read_guard(&self.case_context).clone() else {
            return record;
        };

        let names = DocumentNames {
            account_holder_name: text_field(&record, "accountHolderName"),
            employee_name: text_field(&record, "employeeName"),
        };
        let detection = detect_ownership(
            &record.name,
            &names,
            &context,
            record.legacy_field_id.as_deref(),
        );
        if detection.requires_client_clarification || detection.ownership == Ownership::Unknown {
            debug!(
                "Leaving owner of {} unset (confidence {:.2} from {} signals)",
                record.file_id,
                detection.confidence,
                detection.signals.len()
            );
            return record;
        }

        let mut patch = ResultPatch::new(&record.file_id);
        patch.belongs_to = Patch::Set(detection.ownership);
        self.store.upsert(patch)
    }

    /// Re-checks the finished record against canonical intake values. Only
    /// an actual flag change writes, so repeat runs stay quiet.
    fn apply_reconciliation(&self, record: &OcrResult) {
        let Some(canonical) = *read_guard(&self.canonical) else {
            return;
        };
        let Some(flag) = self.reconciler.reconcile(&canonical, record) else {
            return;
        };
        if record.review.as_ref() == Some(&flag) {
            return;
        }

        let mut patch = ResultPatch::new(&record.file_id);
        patch.review = Patch::Set(flag);
        self.store.upsert(patch);
    }

    fn report_progress(&self, file_id: &str, progress: f32) {
        let mut patch = ResultPatch::new(file_id);
        patch.status = Some(OcrStatus::Processing);
        patch.progress = Patch::Set(progress);
        self.store.upsert(patch);
    }

    fn fail(&self, file_id: &str, status: OcrStatus, flag: ReviewFlag) {
        let mut patch = ResultPatch::new(file_id);
        patch.status = Some(status);
        patch.progress = Patch::Clear;
        patch.processed_at = if status == OcrStatus::Error {
            Patch::Set(Utc::now())
        } else {
            Patch::Clear
        };
        patch.review = Patch::Set(flag);
        self.store.upsert(patch);
    }

    fn fail_missing_blob(&self, file_id: &str) {
        self.fail(
            file_id,
            OcrStatus::Error,
            ReviewFlag::with_detail(
                true,
                ReviewReason::MissingBlob,
                "Re-upload required (file bytes missing).",
            ),
        );
    }
}

/// The review flag a freshly completed document should carry, before any
/// reconciliation against intake answers. Rules run in order; the first
/// that applies wins.
fn completion_review(
    doc_type: DocType,
    text: &str,
    confidence: f32,
    pdf: Option<&PdfPages>,
    min_readable_chars: usize,
    low_confidence_cutoff: f32,
) -> Option<ReviewFlag> {
    if let Some(pages) = pdf {
        if pages.is_partial() {
            return Some(ReviewFlag::with_detail(
                false,
                ReviewReason::PartialPdf,
                format!(
                    "Processed {}/{} pages.",
                    pages.processed_pages, pages.total_pages
                ),
            ));
        }
    }
    if text.chars().count() < min_readable_chars {
        return Some(ReviewFlag::with_detail(
            true,
            ReviewReason::Unreadable,
            "OCR text is empty or too short.",
        ));
    }
    if doc_type == DocType::Unknown {
        return Some(ReviewFlag::with_detail(
            false,
            ReviewReason::UnknownType,
            "Could not classify document type.",
        ));
    }
    if confidence > 0.0 && confidence < low_confidence_cutoff {
        return Some(ReviewFlag::with_detail(
            true,
            ReviewReason::LowConfidence,
            "Low OCR confidence.",
        ));
    }
    None
}

fn looks_like_pdf(record: &OcrResult) -> bool {
    let mime = record
        .mime_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    if mime == "application/pdf" || mime.ends_with("/pdf") {
        return true;
    }
    record.name.to_ascii_lowercase().ends_with(".pdf")
}

/// The declared MIME type decides when present; absent one, the file name
/// extension is consulted instead.
fn looks_like_image(record: &OcrResult) -> bool {
    let mime = record
        .mime_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();
    if !mime.is_empty() {
        return mime.starts_with("image/");
    }
    mime_guess::from_path(&record.name)
        .first()
        .is_some_and(|guessed| guessed.type_() == mime_guess::mime::IMAGE)
}

/// Appends this run's text to what earlier runs produced.
fn join_text(previous: Option<&str>, new_text: &str) -> String {
    let previous = previous.unwrap_or("").trim();
    format!("{previous}\n\n{new_text}").trim().to_string()
}

fn text_field(record: &OcrResult, name: &str) -> Option<String> {
    record
        .extracted_field(name)
        .and_then(|field| field.value.as_str())
        .map(str::to_string)
}

fn clamp01(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Runner state lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Runner state lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
