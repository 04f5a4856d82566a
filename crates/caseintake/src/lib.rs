pub mod blobstore;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fieldmap;
pub mod model;
pub mod ownership;
pub mod petition;
pub mod pipeline;
pub mod reconcile;
pub mod store;

pub use blobstore::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use config::{load_config, IntakeConfig, PipelineConfig, ReconcileConfig, StoreConfig};
pub use engine::{PdfTextEngine, RasterEngine, TesseractOcr, TextEngine};
pub use error::{BlobError, ConfigError, EngineError, IntakeError, Result, StoreError};
pub use model::{
    DocType, DocumentExtraction, ExtractedField, FieldValue, OcrResult, OcrStatus, Ownership,
    PdfPages, ReviewFlag, ReviewReason,
};
pub use ownership::{detect_ownership, CaseContext, DocumentNames, OwnershipDetection};
pub use petition::{parse_petition_text, PetitionFields};
pub use pipeline::{EnqueueOptions, Pipeline, ProcessingMode};
pub use reconcile::{CanonicalSnapshot, Reconciler};
pub use store::{FileMetadata, Patch, ResultPatch, ResultStore, StoreEvent, SubscriberId};
