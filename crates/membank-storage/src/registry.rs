//! Per-project-root client registry with at-most-once initialisation.

use crate::StoreClient;
use membank_core::MemBankError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

/// Maps each project root to a lazily-created, cached [`StoreClient`].
///
/// Concurrent callers for the same cold root wait on one in-flight
/// initialisation; exactly one open/schema-install runs per root. A failed
/// initialisation propagates to all current waiters and clears the slot so
/// later calls may retry.
pub struct ClientRegistry {
    clients: Mutex<HashMap<PathBuf, RootEntry>>,
    db_filename: String,
}

#[derive(Clone)]
enum RootEntry {
    Ready(Arc<StoreClient>),
    Pending(Arc<PendingInit>),
}

/// Initialisation rendezvous for one root. `result` is `None` while the
/// opener is still running.
struct PendingInit {
    result: Mutex<Option<Result<Arc<StoreClient>, String>>>,
    done: Condvar,
}

impl ClientRegistry {
    pub fn new(db_filename: impl Into<String>) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            db_filename: db_filename.into(),
        }
    }

    /// The database directory for a project root.
    pub fn db_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.db_filename)
    }

    /// Resolve the client for `project_root`, initialising it on first use.
    pub fn get_client(&self, project_root: &Path) -> Result<Arc<StoreClient>, MemBankError> {
        let root = project_root.to_path_buf();

        let pending = {
            let mut clients = self.clients.lock().expect("registry mutex poisoned");
            match clients.get(&root) {
                Some(RootEntry::Ready(client)) => return Ok(Arc::clone(client)),
                Some(RootEntry::Pending(pending)) => {
                    // Another caller is initialising this root: wait on it.
                    let pending = Arc::clone(pending);
                    drop(clients);
                    return Self::wait_for(&pending);
                }
                None => {
                    let pending = Arc::new(PendingInit {
                        result: Mutex::new(None),
                        done: Condvar::new(),
                    });
                    clients.insert(root.clone(), RootEntry::Pending(Arc::clone(&pending)));
                    pending
                }
            }
        };

        // We own the initialisation for this root. No registry lock is held
        // while the engine opens.
        let opened = StoreClient::open(&self.db_dir(&root)).map(Arc::new);

        {
            let mut clients = self.clients.lock().expect("registry mutex poisoned");
            match &opened {
                Ok(client) => {
                    clients.insert(root, RootEntry::Ready(Arc::clone(client)));
                }
                Err(e) => {
                    tracing::warn!("store init failed for {}: {e}", root.display());
                    // Clear the slot so subsequent calls retry.
                    clients.remove(&root);
                }
            }
        }

        let shared = opened
            .as_ref()
            .map(Arc::clone)
            .map_err(|e| e.to_string());
        *pending.result.lock().expect("pending mutex poisoned") = Some(shared);
        pending.done.notify_all();

        opened
    }

    fn wait_for(pending: &PendingInit) -> Result<Arc<StoreClient>, MemBankError> {
        let mut result = pending.result.lock().expect("pending mutex poisoned");
        while result.is_none() {
            result = pending
                .done
                .wait(result)
                .expect("pending mutex poisoned");
        }
        match result.as_ref().unwrap() {
            Ok(client) => Ok(Arc::clone(client)),
            Err(msg) => Err(MemBankError::Engine(msg.clone())),
        }
    }

    /// Drop every cached client, releasing engine resources.
    pub fn shutdown(&self) {
        let mut clients = self.clients.lock().expect("registry mutex poisoned");
        clients.clear();
    }

    /// Number of ready clients (diagnostics).
    pub fn cached_count(&self) -> usize {
        let clients = self.clients.lock().expect("registry mutex poisoned");
        clients
            .values()
            .filter(|entry| matches!(entry, RootEntry::Ready(_)))
            .count()
    }
}
