//! Bulk delete tools: match a set by scope, report or detach-delete it.

use crate::args::{opt_bool, require_str};
use crate::service::ToolScope;
use crate::McpServer;
use membank_core::{EntityLabel, EntityRecord, MemBankError};
use membank_storage::gateways::TagGateway;
use serde_json::{json, Value};

/// Deleting more than this many entities requires `force: true`.
const FORCE_THRESHOLD: usize = 10;

impl McpServer {
    /// Delete every entity of one type in the scope.
    pub(crate) fn tool_bulk_delete_by_type(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let label: EntityLabel = require_str(args, "entityType")?.parse()?;
        if !label.is_scoped() {
            return Err(MemBankError::InvalidArgument(format!(
                "bulk-delete-by-type operates on scoped entities, not {label}"
            )));
        }

        let matched: Vec<EntityRecord> = scope
            .client
            .scan_scope(label, &scope.repository, &scope.branch)?
            .into_iter()
            .map(|row| row.into_entity_record())
            .collect::<Result<_, _>>()?;

        self.finish_bulk_delete(scope, matched, args, Vec::new())
    }

    /// Delete every entity carrying a tag. The tag itself survives.
    pub(crate) fn tool_bulk_delete_by_tag(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let tag_id = require_str(args, "tagId")?;
        let gateway = TagGateway::new(&scope.client);
        if gateway.find_by_id(&tag_id)?.is_none() {
            return Err(MemBankError::NotFound(format!("tag {tag_id}")));
        }

        let matched = gateway.find_tagged_items(&tag_id)?;
        let warnings = if matched.iter().any(|item| {
            item.repository.as_deref() != Some(scope.repository.as_str())
                || item.branch.as_deref() != Some(scope.branch.as_str())
        }) {
            vec!["tagged items span multiple (repository, branch) scopes".to_string()]
        } else {
            Vec::new()
        };

        self.finish_bulk_delete(scope, matched, args, warnings)
    }

    /// Delete every scoped entity on one branch, including its Repository
    /// node.
    pub(crate) fn tool_bulk_delete_by_branch(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let mut matched: Vec<EntityRecord> = scope
            .client
            .scan_scoped_entities(&scope.repository, &scope.branch)?
            .into_iter()
            .map(|row| row.into_entity_record())
            .collect::<Result<_, _>>()?;

        let repo_node_id = membank_core::repository_node_id(&scope.repository, &scope.branch);
        if let Some(row) = scope
            .client
            .get_node_labeled(&repo_node_id, EntityLabel::Repository)?
        {
            matched.push(row.into_entity_record()?);
        }

        self.finish_bulk_delete(scope, matched, args, Vec::new())
    }

    /// Delete all entities and Repository nodes across every branch of the
    /// repository name. Tags are never removed.
    pub(crate) fn tool_bulk_delete_by_repository(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let matched: Vec<EntityRecord> = scope
            .client
            .scan_repository_entities(&scope.repository)?
            .into_iter()
            .map(|row| row.into_entity_record())
            .collect::<Result<_, _>>()?;

        self.finish_bulk_delete(scope, matched, args, Vec::new())
    }

    /// Shared tail: apply the dry-run and force rules, then detach-delete.
    fn finish_bulk_delete(
        &self,
        scope: &ToolScope,
        matched: Vec<EntityRecord>,
        args: &Value,
        warnings: Vec<String>,
    ) -> Result<Value, MemBankError> {
        let dry_run = opt_bool(args, "dryRun");
        let force = opt_bool(args, "force");

        let entities: Vec<Value> = matched
            .iter()
            .map(|record| {
                json!({
                    "nodeId": record.node_id,
                    "label": record.label.to_string(),
                    "id": record.id,
                    "name": record.name,
                })
            })
            .collect();

        if dry_run {
            return Ok(json!({
                "count": matched.len(),
                "entities": entities,
                "warnings": warnings,
                "dryRun": true,
                "deleted": false,
            }));
        }

        if matched.len() > FORCE_THRESHOLD && !force {
            return Err(MemBankError::InvalidArgument(format!(
                "refusing to delete {} entities without force (threshold {FORCE_THRESHOLD})",
                matched.len()
            )));
        }

        for record in &matched {
            scope.client.delete_node(&record.node_id)?;
        }

        Ok(json!({
            "count": matched.len(),
            "entities": entities,
            "warnings": warnings,
            "dryRun": false,
            "deleted": true,
        }))
    }
}
