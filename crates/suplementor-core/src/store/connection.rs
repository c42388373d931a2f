//! # Lazy Shared Connection
//!
//! The store handle shared by every request. It is opened on first use and
//! then reused for the lifetime of the process.
//!
//! Initialization is double-checked: the fast path is a lock-free read of a
//! [`OnceLock`]; only callers that find it empty take the init mutex, and they
//! re-check before connecting. Concurrent first calls therefore open exactly
//! one store. A failed connect leaves the handle empty, so the next call tries
//! again; nothing here retries on its own.

use super::SharedStore;
use crate::types::SuplementorError;
use std::sync::{Arc, Mutex, OnceLock};

type Connector = Box<dyn Fn() -> Result<SharedStore, SuplementorError> + Send + Sync>;

/// A lazily-opened, process-wide store handle.
pub struct LazyConnection {
    store: OnceLock<SharedStore>,
    init: Mutex<()>,
    connector: Connector,
}

impl std::fmt::Debug for LazyConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyConnection")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl LazyConnection {
    /// Create a handle that runs `connector` on first use.
    pub fn new(
        connector: impl Fn() -> Result<SharedStore, SuplementorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            store: OnceLock::new(),
            init: Mutex::new(()),
            connector: Box::new(connector),
        }
    }

    /// Create a handle around an already-open store.
    #[must_use]
    pub fn ready(store: SharedStore) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(store);
        Self {
            store: cell,
            init: Mutex::new(()),
            connector: Box::new(|| {
                Err(SuplementorError::StoreError(
                    "pre-initialized connection has no connector".to_string(),
                ))
            }),
        }
    }

    /// True once a store has been opened.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.store.get().is_some()
    }

    /// Return the shared store, opening it if this is the first call.
    ///
    /// Repeated calls return the same `Arc`.
    pub fn get(&self) -> Result<SharedStore, SuplementorError> {
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }

        let _guard = self
            .init
            .lock()
            .map_err(|_| SuplementorError::StoreError("connection lock poisoned".to_string()))?;

        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }

        tracing::info!("opening content store");
        let store = (self.connector)()?;
        // Only the guard holder sets the cell, so this cannot already be set.
        let _ = self.store.set(Arc::clone(&store));
        Ok(store)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn connects_once_across_threads() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let connection = Arc::new(LazyConnection::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryStore::new()) as SharedStore)
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let connection = Arc::clone(&connection);
                std::thread::spawn(move || {
                    connection
                        .get()
                        .map(|s| Arc::as_ptr(&s).cast::<()>() as usize)
                })
            })
            .collect();
        let ptrs: Vec<usize> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert!(ptrs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn failed_connect_leaves_handle_empty() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let connection = LazyConnection::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SuplementorError::StoreError("disk not mounted".into()))
            } else {
                Ok(Arc::new(MemoryStore::new()) as SharedStore)
            }
        });

        assert!(connection.get().is_err());
        assert!(!connection.is_connected());
        assert!(connection.get().is_ok());
        assert!(connection.is_connected());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn ready_handle_never_calls_connector() {
        let connection = LazyConnection::ready(Arc::new(MemoryStore::new()));
        assert!(connection.is_connected());
        assert!(connection.get().is_ok());
    }
}
