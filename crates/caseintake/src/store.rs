//! In-memory result store with observer notifications and a debounced
//! snapshot mirror on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use std::{fs, io};

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{
    DocType, DocumentExtraction, OcrResult, OcrStatus, Ownership, PdfPages, ReviewFlag,
};

/// Bump whenever the persisted record shape changes non-additively. A
/// snapshot written under a different version is discarded wholesale on
/// load; there is no migration path.
const SCHEMA_VERSION: u32 = 1;

// ─── Patches ────────────────────────────────────────────────────────────────

/// Three-way patch for optional record fields: leave alone, unset, or set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    fn apply(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Clear => *slot = None,
            Patch::Set(value) => *slot = Some(value),
        }
    }
}

/// One upsert against a result record. Fields left at their defaults are
/// not touched, so rapid progress updates only carry what changed.
///
/// Fields the pipeline needs to unset (progress, review, processed-at,
/// ownership) use [`Patch`]; the rest only ever move forward and use
/// plain `Option`.
#[derive(Debug, Clone, Default)]
pub struct ResultPatch {
    pub file_id: String,
    pub status: Option<OcrStatus>,
    pub progress: Patch<f32>,
    pub processed_at: Patch<DateTime<Utc>>,
    pub belongs_to: Patch<Ownership>,
    pub review: Patch<ReviewFlag>,
    pub pdf: Option<PdfPages>,
    pub ocr_confidence: Option<f32>,
    pub raw_text: Option<String>,
    pub doc_type: Option<DocType>,
    pub extracted: Option<DocumentExtraction>,
    pub notified_issue_key: Option<String>,
}

impl ResultPatch {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            ..Self::default()
        }
    }
}

/// Upload metadata registered before any processing happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignment_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_field_id: Option<String>,
}

// ─── Events & observers ─────────────────────────────────────────────────────

/// Change notification delivered to store observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// One record was created or patched.
    Updated(String),
    /// One record was dropped.
    Removed(String),
    /// All records were dropped.
    Cleared,
}

/// Token returned by [`ResultStore::subscribe`]; pass it back to stop
/// receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Observer = Box<dyn Fn(&StoreEvent) + Send + Sync>;

// ─── Persistence plumbing ───────────────────────────────────────────────────

enum PersistCmd {
    Dirty,
    Cancel,
    Shutdown,
}

struct PersistHandle {
    tx: Sender<PersistCmd>,
    worker: Option<JoinHandle<()>>,
}

/// Disk snapshot wire shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    schema_version: u32,
    results_by_file_id: HashMap<String, OcrResult>,
}

// ─── ResultStore ────────────────────────────────────────────────────────────

struct StoreInner {
    results: RwLock<HashMap<String, OcrResult>>,
    observers: RwLock<Vec<(SubscriberId, Observer)>>,
    next_observer_id: AtomicU64,
    max_raw_text_chars: usize,
}

/// The single shared collection of [`OcrResult`] records, keyed by file id.
///
/// All writes go through patch-style upserts; every upsert notifies all
/// observers exactly once. When a snapshot path is configured, writes are
/// mirrored to disk by a background worker after a short debounce window,
/// so bursts of progress updates collapse into one write.
///
/// Observers run on the writing thread and must not subscribe or
/// unsubscribe from inside the callback.
pub struct ResultStore {
    inner: Arc<StoreInner>,
    snapshot_path: Option<PathBuf>,
    persist: Option<PersistHandle>,
}

impl ResultStore {
    /// Opens the store, loading any durable snapshot at the configured
    /// path. A missing, unparseable, or version-mismatched snapshot is
    /// discarded and the store starts empty.
    pub fn new(config: StoreConfig) -> Self {
        let results = match &config.snapshot_path {
            Some(path) => load_snapshot(path),
            None => HashMap::new(),
        };

        let inner = Arc::new(StoreInner {
            results: RwLock::new(results),
            observers: RwLock::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
            max_raw_text_chars: config.max_raw_text_chars,
        });

        let persist = config.snapshot_path.as_ref().and_then(|path| {
            spawn_persist_worker(
                &inner,
                path.clone(),
                Duration::from_millis(config.persist_debounce_ms),
            )
        });

        Self {
            inner,
            snapshot_path: config.snapshot_path,
            persist,
        }
    }

    /// A store with no durable mirror; everything stays in memory.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Returns a copy of one record.
    pub fn get(&self, file_id: &str) -> Option<OcrResult> {
        self.results_read().get(file_id).cloned()
    }

    /// Returns all records, newest upload first.
    pub fn get_all(&self) -> Vec<OcrResult> {
        let mut records: Vec<OcrResult> = self.results_read().values().cloned().collect();
        records.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        records
    }

    /// Registers an uploaded file, creating a fresh `queued` record.
    /// Re-registering a file id resets its record; new bytes invalidate any
    /// prior recognition state.
    pub fn register(&self, metadata: FileMetadata) -> OcrResult {
        let mut record = OcrResult::new(metadata.file_id);
        record.name = metadata.name;
        record.mime_type = metadata.mime_type;
        record.size_bytes = metadata.size_bytes;
        record.assignment_id = metadata.assignment_id;
        record.node_id = metadata.node_id;
        record.legacy_field_id = metadata.legacy_field_id;

        self.results_write()
            .insert(record.file_id.clone(), record.clone());

        self.mark_dirty();
        self.notify(&StoreEvent::Updated(record.file_id.clone()));
        record
    }

    /// Applies a patch to the record for `patch.file_id`, creating the
    /// record if it does not exist. Raw text is truncated to the configured
    /// cap on every write. Returns the record after the patch.
    pub fn upsert(&self, patch: ResultPatch) -> OcrResult {
        let updated = {
            let mut results = self.results_write();
            let record = results
                .entry(patch.file_id.clone())
                .or_insert_with(|| OcrResult::new(patch.file_id.clone()));

            if let Some(status) = patch.status {
                record.status = status;
            }
            patch.progress.apply(&mut record.progress);
            patch.processed_at.apply(&mut record.processed_at);
            patch.belongs_to.apply(&mut record.belongs_to);
            patch.review.apply(&mut record.review);
            if let Some(pdf) = patch.pdf {
                record.pdf = Some(pdf);
            }
            if let Some(confidence) = patch.ocr_confidence {
                record.ocr_confidence = Some(confidence);
            }
            if let Some(raw_text) = patch.raw_text {
                record.raw_text = Some(raw_text);
            }
            if let Some(doc_type) = patch.doc_type {
                record.doc_type = Some(doc_type);
            }
            if let Some(extracted) = patch.extracted {
                record.extracted = Some(extracted);
            }
            if let Some(key) = patch.notified_issue_key {
                record.notified_issue_key = Some(key);
            }

            if let Some(raw_text) = record.raw_text.as_mut() {
                truncate_chars(raw_text, self.inner.max_raw_text_chars);
            }

            record.clone()
        };

        self.mark_dirty();
        self.notify(&StoreEvent::Updated(updated.file_id.clone()));
        updated
    }

    /// Drops one record, typically after its upload was deleted. Removing
    /// an unknown id is a no-op and notifies nobody.
    pub fn remove(&self, file_id: &str) {
        if self.results_write().remove(file_id).is_none() {
            return;
        }
        self.mark_dirty();
        self.notify(&StoreEvent::Removed(file_id.to_string()));
    }

    /// Registers an observer for change notifications.
    pub fn subscribe(&self, observer: impl Fn(&StoreEvent) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId(self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.observers_write().push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.observers_write().retain(|(oid, _)| *oid != id);
    }

    /// Drops every record, cancels any pending snapshot write, and deletes
    /// the snapshot file.
    pub fn clear(&self) {
        self.results_write().clear();

        if let Some(handle) = &self.persist {
            let _ = handle.tx.send(PersistCmd::Cancel);
        }
        if let Some(path) = &self.snapshot_path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    log::warn!("Failed to remove result snapshot {}: {}", path.display(), err);
                }
            }
        }

        self.notify(&StoreEvent::Cleared);
    }

    /// Writes the snapshot synchronously, bypassing the debounce. A no-op
    /// when no snapshot path is configured.
    pub fn flush(&self) -> Result<(), StoreError> {
        match &self.snapshot_path {
            Some(path) => write_snapshot(&self.inner, path),
            None => Ok(()),
        }
    }

    fn mark_dirty(&self) {
        if let Some(handle) = &self.persist {
            let _ = handle.tx.send(PersistCmd::Dirty);
        }
    }

    fn notify(&self, event: &StoreEvent) {
        let observers = self.observers_read();
        for (_, observer) in observers.iter() {
            observer(event);
        }
    }

    fn results_read(&self) -> RwLockReadGuard<'_, HashMap<String, OcrResult>> {
        match self.inner.results.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Result store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn results_write(&self) -> RwLockWriteGuard<'_, HashMap<String, OcrResult>> {
        match self.inner.results.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Result store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn observers_read(&self) -> RwLockReadGuard<'_, Vec<(SubscriberId, Observer)>> {
        match self.inner.observers.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Observer list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn observers_write(&self) -> RwLockWriteGuard<'_, Vec<(SubscriberId, Observer)>> {
        match self.inner.observers.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Observer list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Drop for ResultStore {
    fn drop(&mut self) {
        if let Some(handle) = self.persist.take() {
            let _ = handle.tx.send(PersistCmd::Shutdown);
            if let Some(worker) = handle.worker {
                let _ = worker.join();
            }
        }
    }
}

// ─── Snapshot I/O ───────────────────────────────────────────────────────────

fn load_snapshot(path: &Path) -> HashMap<String, OcrResult> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return HashMap::new(),
        Err(err) => {
            log::warn!("Failed to read result snapshot {}: {}", path.display(), err);
            return HashMap::new();
        }
    };

    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) if snapshot.schema_version == SCHEMA_VERSION => snapshot.results_by_file_id,
        Ok(snapshot) => {
            log::warn!(
                "Discarding result snapshot with schema version {} (expected {})",
                snapshot.schema_version,
                SCHEMA_VERSION
            );
            HashMap::new()
        }
        Err(err) => {
            log::warn!("Discarding unparseable result snapshot: {}", err);
            HashMap::new()
        }
    }
}

fn write_snapshot(inner: &StoreInner, path: &Path) -> Result<(), StoreError> {
    let results = match inner.results.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => {
            log::warn!("Result store lock was poisoned, recovering");
            poisoned.into_inner().clone()
        }
    };

    let snapshot = Snapshot {
        schema_version: SCHEMA_VERSION,
        results_by_file_id: results,
    };
    let json = serde_json::to_string(&snapshot)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StoreError::WriteSnapshot {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, json).map_err(|source| StoreError::WriteSnapshot {
        path: path.to_path_buf(),
        source,
    })
}

fn spawn_persist_worker(
    inner: &Arc<StoreInner>,
    path: PathBuf,
    debounce: Duration,
) -> Option<PersistHandle> {
    let (tx, rx) = unbounded();
    let worker_inner = Arc::clone(inner);
    let worker = thread::spawn(move || persist_worker(rx, worker_inner, path, debounce));
    Some(PersistHandle {
        tx,
        worker: Some(worker),
    })
}

/// Drains dirty marks into debounced snapshot writes. A dirty mark opens a
/// debounce window; further marks inside the window extend it, so a burst
/// of upserts ends in a single write once the store goes quiet.
fn persist_worker(
    rx: Receiver<PersistCmd>,
    inner: Arc<StoreInner>,
    path: PathBuf,
    debounce: Duration,
) {
    loop {
        match rx.recv() {
            Ok(PersistCmd::Dirty) => {}
            Ok(PersistCmd::Cancel) => continue,
            Ok(PersistCmd::Shutdown) | Err(_) => return,
        }

        let mut write_pending = true;
        loop {
            match rx.recv_timeout(debounce) {
                Ok(PersistCmd::Dirty) => continue,
                Ok(PersistCmd::Cancel) => {
                    write_pending = false;
                    break;
                }
                Ok(PersistCmd::Shutdown) => {
                    write_now(&inner, &path);
                    return;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    write_now(&inner, &path);
                    return;
                }
            }
        }

        if write_pending {
            write_now(&inner, &path);
        }
    }
}

fn write_now(inner: &StoreInner, path: &Path) {
    if let Err(err) = write_snapshot(inner, path) {
        log::error!("Failed to persist result snapshot: {}", err);
    }
}

/// Truncates in place to at most `max_chars` characters, respecting UTF-8
/// boundaries.
fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn metadata(file_id: &str) -> FileMetadata {
        FileMetadata {
            file_id: file_id.to_string(),
            name: format!("{file_id}.pdf"),
            mime_type: Some("application/pdf".to_string()),
            size_bytes: Some(1024),
            ..FileMetadata::default()
        }
    }

    #[test]
    fn test_register_creates_queued_record() {
        let store = ResultStore::in_memory();
        let record = store.register(metadata("file-1"));

        assert_eq!(record.status, OcrStatus::Queued);
        assert_eq!(record.name, "file-1.pdf");
        assert_eq!(store.get("file-1").unwrap(), record);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_upsert_creates_missing_record() {
        let store = ResultStore::in_memory();
        let record = store.upsert(ResultPatch {
            status: Some(OcrStatus::Processing),
            ..ResultPatch::new("fresh")
        });

        assert_eq!(record.file_id, "fresh");
        assert_eq!(record.status, OcrStatus::Processing);
    }

    #[test]
    fn test_patch_leaves_unspecified_fields_alone() {
        let store = ResultStore::in_memory();
        store.register(metadata("file-1"));
        store.upsert(ResultPatch {
            raw_text: Some("recognized text".to_string()),
            ocr_confidence: Some(0.8),
            ..ResultPatch::new("file-1")
        });

        let record = store.upsert(ResultPatch {
            status: Some(OcrStatus::Done),
            ..ResultPatch::new("file-1")
        });

        assert_eq!(record.status, OcrStatus::Done);
        assert_eq!(record.raw_text.as_deref(), Some("recognized text"));
        assert_eq!(record.ocr_confidence, Some(0.8));
        assert_eq!(record.name, "file-1.pdf");
    }

    #[test]
    fn test_patch_clear_unsets_fields() {
        let store = ResultStore::in_memory();
        store.upsert(ResultPatch {
            progress: Patch::Set(0.5),
            review: Patch::Set(ReviewFlag::new(true, crate::model::ReviewReason::LowConfidence)),
            ..ResultPatch::new("file-1")
        });

        let record = store.upsert(ResultPatch {
            progress: Patch::Clear,
            review: Patch::Clear,
            ..ResultPatch::new("file-1")
        });

        assert_eq!(record.progress, None);
        assert_eq!(record.review, None);
    }

    #[test]
    fn test_raw_text_truncated_to_cap() {
        let config = StoreConfig {
            max_raw_text_chars: 10,
            ..StoreConfig::default()
        };
        let store = ResultStore::new(config);

        let record = store.upsert(ResultPatch {
            raw_text: Some("abcdefghijklmnop".to_string()),
            ..ResultPatch::new("file-1")
        });
        assert_eq!(record.raw_text.as_deref(), Some("abcdefghij"));

        // A no-op upsert leaves the truncated text unchanged.
        let record = store.upsert(ResultPatch::new("file-1"));
        assert_eq!(record.raw_text.as_deref(), Some("abcdefghij"));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let config = StoreConfig {
            max_raw_text_chars: 3,
            ..StoreConfig::default()
        };
        let store = ResultStore::new(config);

        let record = store.upsert(ResultPatch {
            raw_text: Some("αβγδε".to_string()),
            ..ResultPatch::new("file-1")
        });
        assert_eq!(record.raw_text.as_deref(), Some("αβγ"));
    }

    #[test]
    fn test_observers_notified_once_per_upsert() {
        let store = ResultStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        // Several fields in one patch still produce exactly one event.
        store.upsert(ResultPatch {
            status: Some(OcrStatus::Processing),
            progress: Patch::Set(0.0),
            raw_text: Some("text".to_string()),
            ..ResultPatch::new("file-1")
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.unsubscribe(id);
        store.upsert(ResultPatch::new("file-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_drops_records_and_notifies() {
        let store = ResultStore::in_memory();
        store.register(metadata("file-1"));
        store.register(metadata("file-2"));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        store.clear();

        assert!(store.get_all().is_empty());
        assert_eq!(events.lock().unwrap().as_slice(), &[StoreEvent::Cleared]);
    }

    #[test]
    fn test_remove_drops_one_record_and_notifies() {
        let store = ResultStore::in_memory();
        store.register(metadata("file-1"));
        store.register(metadata("file-2"));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        store.remove("file-1");
        store.remove("file-1");
        store.remove("never-registered");

        assert!(store.get("file-1").is_none());
        assert!(store.get("file-2").is_some());
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[StoreEvent::Removed("file-1".to_string())]
        );
    }

    #[test]
    fn test_get_all_sorts_newest_first() {
        let store = ResultStore::in_memory();
        store.register(metadata("a"));
        store.register(metadata("b"));
        store.register(metadata("c"));

        let all = store.get_all();
        assert_eq!(all.len(), 3);
        for pair in all.windows(2) {
            assert!(pair[0].uploaded_at >= pair[1].uploaded_at);
        }
    }

    #[test]
    fn test_snapshot_roundtrip_via_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let config = StoreConfig {
            snapshot_path: Some(path.clone()),
            ..StoreConfig::default()
        };

        let store = ResultStore::new(config.clone());
        store.register(metadata("file-1"));
        store.upsert(ResultPatch {
            status: Some(OcrStatus::Done),
            raw_text: Some("hello".to_string()),
            ..ResultPatch::new("file-1")
        });
        store.flush().unwrap();
        drop(store);

        let reopened = ResultStore::new(config);
        let record = reopened.get("file-1").unwrap();
        assert_eq!(record.status, OcrStatus::Done);
        assert_eq!(record.raw_text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_drop_flushes_pending_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let config = StoreConfig {
            snapshot_path: Some(path.clone()),
            // Long debounce so the write is still pending when we drop.
            persist_debounce_ms: 60_000,
            ..StoreConfig::default()
        };

        let store = ResultStore::new(config.clone());
        store.register(metadata("file-1"));
        drop(store);

        assert!(path.exists());
        let reopened = ResultStore::new(config);
        assert!(reopened.get("file-1").is_some());
    }

    #[test]
    fn test_version_mismatch_discards_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(
            &path,
            r#"{"schemaVersion":2,"resultsByFileId":{"x":{"fileId":"x"}}}"#,
        )
        .unwrap();

        let store = ResultStore::new(StoreConfig {
            snapshot_path: Some(path),
            ..StoreConfig::default()
        });
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "not json at all").unwrap();

        let store = ResultStore::new(StoreConfig {
            snapshot_path: Some(path),
            ..StoreConfig::default()
        });
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn test_clear_removes_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let config = StoreConfig {
            snapshot_path: Some(path.clone()),
            ..StoreConfig::default()
        };

        let store = ResultStore::new(config.clone());
        store.register(metadata("file-1"));
        store.flush().unwrap();
        assert!(path.exists());

        store.clear();
        assert!(!path.exists());
        drop(store);

        let reopened = ResultStore::new(config);
        assert!(reopened.get_all().is_empty());
    }

    #[test]
    fn test_debounced_write_lands_without_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let store = ResultStore::new(StoreConfig {
            snapshot_path: Some(path.clone()),
            persist_debounce_ms: 10,
            ..StoreConfig::default()
        });

        store.register(metadata("file-1"));
        // Generous margin over the 10ms debounce.
        std::thread::sleep(Duration::from_millis(500));
        assert!(path.exists());
    }
}
