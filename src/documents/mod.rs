//! Local mirror of the server's document set.
//!
//! The set is never patched in place: every mutation raises an invalidation,
//! and the store answers it by re-fetching the whole list. Each fetch takes a
//! generation number and only the most recently issued one may apply its
//! result, so a slow, older fetch can never overwrite a newer one.

pub mod upload;

use crate::api::{Document, RagBackend, TransportError};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use upload::{FileCandidate, PdfFile, UploadError, UploadStatus, Uploader, ValidationError};

const LOAD_FAILED: &str = "Failed to load documents";
const DELETE_FAILED: &str = "Failed to delete document";

/// Monotonic change counter shared by everything that mutates documents.
#[derive(Debug, Clone)]
pub struct Invalidator {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for Invalidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Invalidator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Bump the counter and return the new token.
    pub fn request(&self) -> u64 {
        let mut token = 0;
        self.tx.send_modify(|n| {
            *n += 1;
            token = *n;
        });
        log::debug!("[documents] invalidation {}", token);
        token
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSet {
    pub documents: Vec<Document>,
    pub status: SyncStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer refresh was issued while this one was in flight.
    Superseded,
    Failed,
    /// The store was unmounted before the result arrived.
    Discarded,
}

struct StoreState {
    documents: Vec<Document>,
    status: SyncStatus,
    error: Option<String>,
    issued: u64,
    mounted: bool,
}

impl StoreState {
    fn view(&self) -> DocumentSet {
        DocumentSet {
            documents: self.documents.clone(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

struct StoreInner {
    backend: Arc<dyn RagBackend>,
    invalidator: Invalidator,
    state: Mutex<StoreState>,
    view_tx: watch::Sender<DocumentSet>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = listener.take() {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

impl DocumentStore {
    /// Create the store and start listening for invalidations. The first
    /// refresh starts immediately, so the store begins in `Loading`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(backend: Arc<dyn RagBackend>, invalidator: Invalidator) -> Self {
        let state = StoreState {
            documents: Vec::new(),
            status: SyncStatus::Loading,
            error: None,
            issued: 0,
            mounted: true,
        };
        let (view_tx, _) = watch::channel(state.view());
        let mut changes = invalidator.subscribe();
        changes.borrow_and_update();

        let store = Self {
            inner: Arc::new(StoreInner {
                backend,
                invalidator,
                state: Mutex::new(state),
                view_tx,
                listener: Mutex::new(None),
            }),
        };

        let weak = Arc::downgrade(&store.inner);
        let handle = tokio::spawn(listen(weak, changes));
        *store.lock_listener() = Some(handle);
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &StoreState) {
        self.inner.view_tx.send_replace(state.view());
    }

    pub fn snapshot(&self) -> DocumentSet {
        self.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentSet> {
        self.inner.view_tx.subscribe()
    }

    pub fn invalidator(&self) -> &Invalidator {
        &self.inner.invalidator
    }

    /// Fetch the full set and replace the local copy with it.
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = {
            let mut state = self.lock();
            if !state.mounted {
                return RefreshOutcome::Discarded;
            }
            state.issued += 1;
            state.status = SyncStatus::Loading;
            state.error = None;
            self.publish(&state);
            state.issued
        };

        let result = self.inner.backend.list_documents().await;

        let mut state = self.lock();
        if !state.mounted {
            log::debug!("[documents] dropping refresh {} after unmount", generation);
            return RefreshOutcome::Discarded;
        }
        if generation != state.issued {
            log::debug!(
                "[documents] refresh {} superseded by {}",
                generation,
                state.issued
            );
            return RefreshOutcome::Superseded;
        }

        let outcome = match result {
            Ok(documents) => {
                log::info!("[documents] loaded {} documents", documents.len());
                state.documents = documents;
                state.status = SyncStatus::Idle;
                state.error = None;
                RefreshOutcome::Applied
            }
            Err(e) => {
                // Keep the last-known-good set on screen.
                log::error!("[documents] refresh failed: {}", e);
                state.status = SyncStatus::Error;
                state.error = Some(LOAD_FAILED.to_string());
                RefreshOutcome::Failed
            }
        };
        self.publish(&state);
        outcome
    }

    pub fn request_invalidation(&self) -> u64 {
        self.inner.invalidator.request()
    }

    pub async fn delete(&self, id: &str) -> Result<(), TransportError> {
        match self.inner.backend.delete_document(id).await {
            Ok(()) => {
                log::info!("[documents] deleted {}", id);
                self.request_invalidation();
                Ok(())
            }
            Err(e) => {
                log::error!("[documents] delete of {} failed: {}", id, e);
                let mut state = self.lock();
                if state.mounted {
                    state.status = SyncStatus::Error;
                    state.error = Some(DELETE_FAILED.to_string());
                    self.publish(&state);
                }
                Err(e)
            }
        }
    }

    /// Stop reacting to invalidations. Fetches still in flight finish but
    /// their results are ignored.
    pub fn unmount(&self) {
        self.lock().mounted = false;
        if let Some(handle) = self.lock_listener().take() {
            handle.abort();
        }
    }
}

/// Runs one refresh up front, then one per observed invalidation. Refreshes
/// are spawned rather than awaited so a slow fetch never delays the next.
async fn listen(store: Weak<StoreInner>, mut changes: watch::Receiver<u64>) {
    loop {
        let Some(inner) = store.upgrade() else {
            break;
        };
        let store = DocumentStore { inner };
        tokio::spawn(async move {
            store.refresh().await;
        });

        if changes.changed().await.is_err() {
            break;
        }
        let token = *changes.borrow_and_update();
        log::debug!("[documents] refreshing for invalidation {}", token);
    }
}
