//! Catalog introspection tools: pure reads against the engine catalog.

use crate::args::require_str;
use crate::service::ToolScope;
use crate::McpServer;
use membank_core::MemBankError;
use serde_json::{json, Value};

impl McpServer {
    pub(crate) fn tool_labels(&self, scope: &ToolScope) -> Result<Value, MemBankError> {
        let labels = scope.client.catalog_labels()?;
        Ok(json!({ "labels": labels }))
    }

    pub(crate) fn tool_count(&self, scope: &ToolScope) -> Result<Value, MemBankError> {
        let counts = scope.client.catalog_counts()?;
        let total: i64 = counts
            .iter()
            .filter(|(label, _)| label.as_str() != "_edges")
            .map(|(_, count)| count)
            .sum();
        Ok(json!({
            "total": total,
            "byLabel": counts,
        }))
    }

    pub(crate) fn tool_properties(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let label = require_str(args, "label")?;
        let properties = scope.client.catalog_properties(&label)?;
        Ok(json!({
            "label": label,
            "properties": properties,
        }))
    }

    pub(crate) fn tool_indexes(&self, scope: &ToolScope) -> Result<Value, MemBankError> {
        let indexes = scope.client.catalog_indexes()?;
        Ok(json!({ "indexes": indexes }))
    }

    /// Database-wide stats: node counts per label and total edges.
    pub(crate) fn tool_stats(&self, scope: &ToolScope) -> Result<Value, MemBankError> {
        let counts = scope.client.catalog_counts()?;
        let edges = counts.get("_edges").copied().unwrap_or(0);
        let nodes: i64 = counts
            .iter()
            .filter(|(label, _)| label.as_str() != "_edges")
            .map(|(_, count)| count)
            .sum();
        Ok(json!({
            "nodeCount": nodes,
            "edgeCount": edges,
            "byLabel": counts,
            "repository": scope.repository,
            "branch": scope.branch,
        }))
    }
}
