//! The ingestion pipeline: a FIFO queue drained by a single worker thread
//! that drives uploaded documents through recognition, field extraction,
//! ownership attribution, and reconciliation against the intake record.
//!
//! Jobs are fire-and-forget. Every observable effect lands in the
//! [`ResultStore`], so callers follow progress by subscribing there rather
//! than by awaiting the queue.

mod runner;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::blobstore::BlobStore;
use crate::config::IntakeConfig;
use crate::engine::{RasterEngine, TextEngine};
use crate::ownership::CaseContext;
use crate::reconcile::{CanonicalSnapshot, Reconciler};
use crate::store::ResultStore;

use runner::JobRunner;

const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ─── Job types ───────────────────────────────────────────────────────────────

/// How a job entered the queue. Automatic jobs respect the upload size
/// ceiling and the smaller page window; manual jobs skip the ceiling and
/// get the larger window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    #[default]
    Auto,
    Manual,
}

/// Options for [`Pipeline::enqueue`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub mode: ProcessingMode,
    /// Resume a partially processed PDF from its next unprocessed page,
    /// appending new text to what earlier runs produced.
    pub continue_pdf: bool,
}

/// One queued unit of work. Jobs are ephemeral and never persisted; anything
/// durable about a file lives in its store record.
#[derive(Debug, Clone)]
struct ProcessingJob {
    file_id: String,
    mode: ProcessingMode,
    continue_pdf: bool,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Owns the queue and its worker thread. Dropping the pipeline signals the
/// worker and joins it; the job in flight finishes first.
pub struct Pipeline {
    job_tx: Sender<ProcessingJob>,
    worker: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    runner: Arc<JobRunner>,
}

impl Pipeline {
    /// Spawns the worker thread. The engines are taken as trait objects so
    /// tests can substitute scripted ones.
    pub fn new(
        store: Arc<ResultStore>,
        blobs: Arc<dyn BlobStore>,
        text_engine: Arc<dyn TextEngine>,
        raster_engine: Arc<dyn RasterEngine>,
        config: &IntakeConfig,
    ) -> Self {
        let runner = Arc::new(JobRunner {
            store,
            blobs,
            text_engine,
            raster_engine,
            config: config.pipeline.clone(),
            reconciler: Reconciler::new(config.reconcile.clone()),
            case_context: RwLock::new(None),
            canonical: RwLock::new(None),
        });

        let (job_tx, job_rx) = unbounded::<ProcessingJob>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_runner = Arc::clone(&runner);
        let worker_shutdown = Arc::clone(&shutdown);
        let worker = thread::spawn(move || {
            run_worker(job_rx, worker_shutdown, worker_runner);
        });

        Self {
            job_tx,
            worker: Some(worker),
            shutdown,
            runner,
        }
    }

    /// Queues a file for processing. Returns immediately; progress and the
    /// final outcome are observable through the store. Enqueuing a file id
    /// with no registered record is a no-op.
    pub fn enqueue(&self, file_id: impl Into<String>, options: EnqueueOptions) {
        let job = ProcessingJob {
            file_id: file_id.into(),
            mode: options.mode,
            continue_pdf: options.continue_pdf,
        };
        if self.shutdown.load(Ordering::Relaxed) {
            warn!("Ignoring job for {} after shutdown", job.file_id);
            return;
        }
        if self.job_tx.send(job).is_err() {
            warn!("Ingestion queue is closed; dropping job");
        }
    }

    /// Supplies debtor and spouse names for ownership attribution. Until a
    /// context is set, completed documents keep whatever owner they had.
    pub fn set_case_context(&self, context: Option<CaseContext>) {
        self.runner.set_case_context(context);
    }

    /// Supplies canonical intake values for reconciliation. Until a snapshot
    /// is set, completed documents carry only their base quality flag.
    pub fn set_canonical(&self, canonical: Option<CanonicalSnapshot>) {
        self.runner.set_canonical(canonical);
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> Arc<ResultStore> {
        Arc::clone(&self.runner.store)
    }

    /// Signals the worker to stop after the job in flight. Queued jobs that
    /// have not started are discarded.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Ingestion worker panicked during shutdown");
            }
        }
    }
}

fn run_worker(job_rx: Receiver<ProcessingJob>, shutdown: Arc<AtomicBool>, runner: Arc<JobRunner>) {
    debug!("Ingestion worker started");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Ingestion worker received shutdown signal");
            break;
        }
        match job_rx.recv_timeout(WORKER_POLL_INTERVAL) {
            Ok(job) => {
                debug!("Processing {}", job.file_id);
                runner.run(&job);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Ingestion queue disconnected");
                break;
            }
        }
    }
    debug!("Ingestion worker stopped");
}
