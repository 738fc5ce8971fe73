//! Service façade: resolves the store client and scope for each request.

use membank_core::{
    graph_unique_id, split_graph_unique_id, MemBankError, ServerConfig,
};
use membank_storage::{ClientRegistry, StoreClient};
use std::path::Path;
use std::sync::Arc;

/// Process-wide entry point. All mutable state hangs off the registry;
/// the façade itself is plain composition with no per-request state.
pub struct MemoryService {
    registry: Arc<ClientRegistry>,
}

impl MemoryService {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            registry: Arc::new(ClientRegistry::new(config.db_filename.clone())),
        }
    }

    /// Resolve (lazily initialising) the client for a project root.
    pub fn client_for(&self, project_root: &Path) -> Result<Arc<StoreClient>, MemBankError> {
        self.registry.get_client(project_root)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Close every cached store client.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}

/// Request-scoped view: one store client plus the (repository, branch)
/// every operation in the request works against.
pub struct ToolScope {
    pub client: Arc<StoreClient>,
    pub repository: String,
    pub branch: String,
}

impl ToolScope {
    /// Primary key of a logical id within this scope.
    pub fn gid(&self, id: &str) -> String {
        graph_unique_id(&self.repository, &self.branch, id)
    }

    /// Accept either a logical id or a full `graph_unique_id`.
    ///
    /// A full id naming a different (repository, branch) is a `Conflict`:
    /// cross-branch references are rejected before they can materialise
    /// edges.
    pub fn resolve_scoped_id(&self, raw: &str) -> Result<String, MemBankError> {
        match split_graph_unique_id(raw) {
            Some((repository, branch, _)) => {
                if repository != self.repository || branch != self.branch {
                    return Err(MemBankError::Conflict(format!(
                        "id '{raw}' belongs to ({repository}, {branch}), request scope is ({}, {})",
                        self.repository, self.branch
                    )));
                }
                Ok(raw.to_string())
            }
            None => Ok(self.gid(raw)),
        }
    }
}
