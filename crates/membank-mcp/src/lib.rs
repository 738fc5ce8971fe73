//! membank-mcp: MCP server for the membank graph memory service.
//!
//! Tools cover entity upserts, associations, traversal and governance
//! queries, whole-graph analytics, catalog introspection, and bulk deletes,
//! all scoped by (project root, repository, branch).
//!
//! Transports: newline-delimited JSON-RPC over stdio (one implicit session
//! per connection) and HTTP with SSE notifications (session id in the
//! `mcp-session-id` header). All logging goes to stderr; stdout is reserved
//! for JSON-RPC on the stdio transport.

use membank_core::{CancelToken, MemBankError, ServerConfig};
use serde_json::{json, Value};

mod args;
mod definitions;
pub mod http;
mod progress;
mod protocol;
mod service;
mod session;
pub mod stdio;
mod tools_analytics;
mod tools_associate;
mod tools_bulk;
mod tools_entity;
mod tools_introspect;
mod tools_query;

pub use progress::{LineProgress, NoopProgress, ProgressEvent, ProgressSink, SseProgress};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolContent, ToolResult};
pub use service::{MemoryService, ToolScope};
pub use session::{Session, SessionBinding, SessionManager};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server: tool dispatch over a session table and the service façade.
pub struct McpServer {
    pub name: String,
    pub version: String,
    config: ServerConfig,
    service: MemoryService,
    pub sessions: SessionManager,
}

impl McpServer {
    pub fn new(config: ServerConfig) -> Self {
        let service = MemoryService::new(&config);
        Self {
            name: "membank".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            service,
            sessions: SessionManager::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &MemoryService {
        &self.service
    }

    /// Handle a notification (no response expected).
    pub fn handle_notification(&self, session_key: &str, method: &str) {
        match method {
            "notifications/initialized" => {
                tracing::info!("client initialized, membank MCP server ready");
            }
            "notifications/cancelled" => {
                if let Some(token) = self.sessions.cancel_token(session_key) {
                    token.cancel();
                }
            }
            _ => {
                tracing::debug!("unknown notification: {method}");
            }
        }
    }

    /// Handle one JSON-RPC request and produce the response.
    pub fn handle_request(
        &self,
        session_key: &str,
        method: &str,
        params: Option<&Value>,
        id: Value,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> JsonRpcResponse {
        match method {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(session_key, id, params, progress, cancel),
            "ping" => JsonRpcResponse::success(id, json!({})),
            _ => JsonRpcResponse::error(id, -32601, format!("Method not found: {method}")),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": self.name,
                    "version": self.version
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": definitions::tool_definitions() }))
    }

    fn handle_tools_call(
        &self,
        session_key: &str,
        id: Value,
        params: Option<&Value>,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };
        let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        let result = self.dispatch_tool(session_key, tool_name, &arguments, progress, cancel);

        match serde_json::to_value(result) {
            Ok(v) => JsonRpcResponse::success(id, v),
            Err(e) => JsonRpcResponse::error(id, -32603, format!("Serialization error: {e}")),
        }
    }

    // ── Tool Dispatch ───────────────────────────────────────────────────────

    /// Look up and invoke the handler for a named tool.
    ///
    /// This is the single translation point from [`MemBankError`] to the
    /// response envelope: any error becomes `{content, isError: true}`.
    pub fn dispatch_tool(
        &self,
        session_key: &str,
        name: &str,
        args: &Value,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> ToolResult {
        if name == "init-memory-bank" {
            return match self.tool_init_memory_bank(session_key, args) {
                Ok(v) => ToolResult::structured(v),
                Err(e) => ToolResult::tool_error(e.to_string()),
            };
        }

        let scope = match self.resolve_scope(session_key, args) {
            Ok(scope) => scope,
            Err(e) => return ToolResult::tool_error(e.to_string()),
        };

        let outcome = match name {
            // Entity upserts and reads
            "upsert-component" => self.tool_upsert_component(&scope, args),
            "upsert-decision" => self.tool_upsert_decision(&scope, args),
            "upsert-rule" => self.tool_upsert_rule(&scope, args),
            "upsert-metadata" => self.tool_upsert_metadata(&scope, args),
            "upsert-file" => self.tool_upsert_file(&scope, args),
            "upsert-tag" => self.tool_upsert_tag(&scope, args),
            "add-context" => self.tool_add_context(&scope, args),
            "get-component" => self.tool_get_component(&scope, args),
            "get-metadata" => self.tool_get_metadata(&scope, args),
            "delete-entity" => self.tool_delete_entity(&scope, args),
            // Associations
            "associate-file-with-component" => {
                self.tool_associate_file_with_component(&scope, args)
            }
            "tag-item" => self.tool_tag_item(&scope, args),
            // Queries
            "get-component-dependencies" => self.tool_component_dependencies(&scope, args),
            "get-component-dependents" => self.tool_component_dependents(&scope, args),
            "get-governing-items" => self.tool_governing_items(&scope, args),
            "get-item-contextual-history" => self.tool_contextual_history(&scope, args),
            "get-related-items" => self.tool_related_items(&scope, args),
            "shortest-path" => self.tool_shortest_path(&scope, args),
            "get-decisions-by-date-range" => self.tool_decisions_by_date_range(&scope, args),
            "get-active-rules" => self.tool_active_rules(&scope),
            // Analytics
            "pagerank" => self.tool_pagerank(&scope, args, progress, cancel),
            "louvain-community-detection" => self.tool_louvain(&scope, args, progress, cancel),
            "k-core-decomposition" => self.tool_k_core(&scope, progress, cancel),
            "strongly-connected-components" => self.tool_scc(&scope, progress, cancel),
            "weakly-connected-components" => self.tool_wcc(&scope, progress, cancel),
            // Introspection
            "labels" => self.tool_labels(&scope),
            "count" => self.tool_count(&scope),
            "properties" => self.tool_properties(&scope, args),
            "indexes" => self.tool_indexes(&scope),
            "memory-bank-stats" => self.tool_stats(&scope),
            // Bulk deletes
            "bulk-delete-by-type" => self.tool_bulk_delete_by_type(&scope, args),
            "bulk-delete-by-tag" => self.tool_bulk_delete_by_tag(&scope, args),
            "bulk-delete-by-branch" => self.tool_bulk_delete_by_branch(&scope, args),
            "bulk-delete-by-repository" => self.tool_bulk_delete_by_repository(&scope, args),
            _ => Err(MemBankError::InvalidArgument(format!("unknown tool: {name}"))),
        };

        match outcome {
            Ok(v) => ToolResult::structured(v),
            Err(e) => ToolResult::tool_error(e.to_string()),
        }
    }

    /// Bind the session scope from `init-memory-bank` arguments and make
    /// sure a store client exists for the project root.
    fn tool_init_memory_bank(
        &self,
        session_key: &str,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let project_root = match args::opt_str(args, "projectRoot") {
            Some(p) => std::path::PathBuf::from(p),
            None => std::env::current_dir()?,
        };
        let repository = args::require_str(args, "repository")?;
        let branch = args::opt_str(args, "branch").unwrap_or_else(|| "main".to_string());

        let client = self.service.client_for(&project_root)?;
        let repo = membank_storage::gateways::RepositoryGateway::new(&client)
            .ensure(&repository, &branch)?;

        if !self.sessions.exists(session_key) {
            self.sessions.create(session_key);
        }
        self.sessions.bind(
            session_key,
            SessionBinding {
                project_root: project_root.clone(),
                repository: repository.clone(),
                branch: branch.clone(),
            },
        )?;

        Ok(json!({
            "success": true,
            "projectRoot": project_root.display().to_string(),
            "repository": repository,
            "branch": branch,
            "repositoryNodeId": repo.id,
        }))
    }

    /// Resolve the scope for a non-init tool call.
    ///
    /// The session binding supplies defaults; per-call `repository`,
    /// `branch`, and `projectRoot` arguments override them.
    fn resolve_scope(&self, session_key: &str, args: &Value) -> Result<ToolScope, MemBankError> {
        let binding = self.sessions.binding(session_key)?;
        let project_root = args::opt_str(args, "projectRoot")
            .map(std::path::PathBuf::from)
            .unwrap_or(binding.project_root);
        let repository = args::opt_str(args, "repository").unwrap_or(binding.repository);
        let branch = args::opt_str(args, "branch").unwrap_or(binding.branch);

        let client = self.service.client_for(&project_root)?;
        Ok(ToolScope {
            client,
            repository,
            branch,
        })
    }
}
