//! Single JSON document store.
//!
//! The whole application state lives in one file. It is loaded once, kept in
//! memory, and every mutation re-serializes the entire document. Mutations run
//! under one lock, so the load-mutate-save sequence of a request never
//! interleaves with another request's.
//!
//! Saves are debounced when a non-zero window is configured: the background
//! flusher writes the latest state once per window and intermediate states are
//! never written. A crash inside the window loses those writes; call
//! [`Store::flush`] before shutting down.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;

use crate::models::{AdminCredential, Document, DEFAULT_ADMIN_PASSWORD};
use crate::services::auth as auth_service;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to build seed document: {0}")]
    Seed(String),
}

struct Inner {
    doc: Option<Document>,
    dirty: bool,
}

pub struct Store {
    path: Option<PathBuf>,
    debounce: Duration,
    inner: Mutex<Inner>,
    dirty_signal: Notify,
}

impl Store {
    /// Open the store backed by `path`, loading it eagerly.
    pub fn open<P: AsRef<Path>>(path: P, debounce: Duration) -> Result<Self, StoreError> {
        let store = Self {
            path: Some(path.as_ref().to_path_buf()),
            debounce,
            inner: Mutex::new(Inner { doc: None, dirty: false }),
            dirty_signal: Notify::new(),
        };
        store.read(|_| ())?;
        Ok(store)
    }

    /// A store without a backing file, seeded like a first run.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            path: None,
            debounce: Duration::ZERO,
            inner: Mutex::new(Inner {
                doc: Some(seed_document()?),
                dirty: false,
            }),
            dirty_signal: Notify::new(),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the cached document.
    pub fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Document) -> T,
    {
        let mut inner = self.lock();
        let doc = self.ensure_loaded(&mut inner)?;
        Ok(f(doc))
    }

    /// Run `f` against the cached document and persist the result.
    ///
    /// When `f` fails the document is restored to what it was before the
    /// call. With a zero debounce window the save happens before returning
    /// and a save failure is returned (and the mutation undone); otherwise
    /// the background flusher is notified.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut inner = self.lock();
        let doc = self.ensure_loaded(&mut inner)?;
        let before = doc.clone();

        let value = match f(doc) {
            Ok(value) => value,
            Err(e) => {
                *doc = before;
                return Err(e);
            }
        };

        if self.debounce.is_zero() {
            if let Err(e) = self.persist(doc) {
                log::error!("Failed to save data file: {}", e);
                *doc = before;
                return Err(e.into());
            }
        } else {
            inner.dirty = true;
            self.dirty_signal.notify_one();
        }

        Ok(value)
    }

    /// Write the document now if there are unsaved changes.
    pub fn flush(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.persist_if_dirty(&mut inner)
    }

    /// Drop the cache so the next access re-reads the backing file.
    /// Pending writes are saved first, under the same lock, so no write can
    /// land between the save and the drop.
    pub fn invalidate(&self) -> Result<(), StoreError> {
        if self.path.is_none() {
            return Ok(());
        }

        let mut inner = self.lock();
        self.persist_if_dirty(&mut inner)?;
        inner.doc = None;
        log::info!("Data file cache dropped, next access reloads it");
        Ok(())
    }

    /// Debounced save loop; runs until the process exits.
    pub async fn run_flusher(self: Arc<Self>) {
        if self.debounce.is_zero() {
            return;
        }

        log::info!("Data file flusher started with a {}ms window", self.debounce.as_millis());

        loop {
            self.dirty_signal.notified().await;
            tokio::time::sleep(self.debounce).await;

            if let Err(e) = self.flush() {
                log::error!("Failed to save data file, will retry: {}", e);
                self.dirty_signal.notify_one();
            }
        }
    }

    fn persist_if_dirty(&self, inner: &mut Inner) -> Result<(), StoreError> {
        if !inner.dirty {
            return Ok(());
        }
        if let Some(doc) = inner.doc.as_ref() {
            self.persist(doc)?;
        }
        inner.dirty = false;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_loaded<'a>(&self, inner: &'a mut Inner) -> Result<&'a mut Document, StoreError> {
        if inner.doc.is_none() {
            inner.doc = Some(self.load()?);
            inner.dirty = false;
        }
        inner
            .doc
            .as_mut()
            .ok_or_else(|| StoreError::Seed("document missing after load".to_string()))
    }

    fn load(&self) -> Result<Document, StoreError> {
        let Some(path) = self.path.as_ref() else {
            return seed_document();
        };

        if !path.exists() {
            log::info!("Data file {} not found, starting with default content", path.display());
            return seed_document();
        }

        let parsed = fs::read_to_string(path)
            .map_err(StoreError::from)
            .and_then(|content| serde_json::from_str::<Document>(&content).map_err(StoreError::from));

        match parsed {
            Ok(mut doc) => {
                if !auth_service::is_argon2_hash(&doc.admin.password_hash) {
                    log::warn!(
                        "Admin credential in {} is not an argon2 hash, resetting it to the default password",
                        path.display()
                    );
                    doc.admin = default_admin()?;
                }
                log::debug!("Loaded data file {}", path.display());
                Ok(doc)
            }
            Err(e) => {
                // The next save replaces the file, keep what was there.
                let backup = path.with_extension("json.bak");
                fs::copy(path, &backup)?;
                log::warn!(
                    "Failed to load {}, starting with default content (old file kept as {}): {}",
                    path.display(),
                    backup.display(),
                    e
                );
                seed_document()
            }
        }
    }

    fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(doc)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;

        log::debug!("Saved data file {}", path.display());
        Ok(())
    }
}

fn default_admin() -> Result<AdminCredential, StoreError> {
    let password_hash = auth_service::hash_password(DEFAULT_ADMIN_PASSWORD)
        .map_err(|e| StoreError::Seed(e.to_string()))?;
    Ok(AdminCredential { password_hash })
}

fn seed_document() -> Result<Document, StoreError> {
    Ok(Document::seed(default_admin()?))
}
