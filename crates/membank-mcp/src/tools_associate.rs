//! Association tools: soft-failure edge creation between existing nodes.

use crate::args::{opt_str, require_str};
use crate::service::ToolScope;
use crate::tools_entity::item_label;
use crate::McpServer;
use membank_core::{EntityLabel, MemBankError, RelationshipType};
use serde_json::{json, Value};

impl McpServer {
    /// `associate-file-with-component`: MERGE a CONTAINS_FILE edge.
    ///
    /// Returns `{success: false, message}` when either endpoint is absent;
    /// that is a soft result, not an error. Re-running is idempotent.
    pub(crate) fn tool_associate_file_with_component(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let component_gid = scope.resolve_scoped_id(&require_str(args, "componentId")?)?;
        let file_gid = scope.resolve_scoped_id(&require_str(args, "fileId")?)?;

        if scope
            .client
            .get_node_labeled(&component_gid, EntityLabel::Component)?
            .is_none()
        {
            return Ok(association_missing("component", &component_gid));
        }
        if scope
            .client
            .get_node_labeled(&file_gid, EntityLabel::File)?
            .is_none()
        {
            return Ok(association_missing("file", &file_gid));
        }

        scope
            .client
            .merge_edge(&component_gid, RelationshipType::ContainsFile, &file_gid)?;

        Ok(json!({
            "success": true,
            "message": format!("{component_gid} CONTAINS_FILE {file_gid}"),
        }))
    }

    /// `tag-item`: MERGE an IS_TAGGED_WITH edge from a scoped item (or
    /// context) to a global tag.
    pub(crate) fn tool_tag_item(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let tag_id = require_str(args, "tagId")?;
        let item_type = opt_str(args, "itemType").unwrap_or_else(|| "component".to_string());
        let label = item_label(&item_type)?;
        let item_gid = scope.resolve_scoped_id(&require_str(args, "itemId")?)?;

        if scope.client.get_node_labeled(&item_gid, label)?.is_none() {
            return Ok(association_missing(&item_type, &item_gid));
        }
        if scope
            .client
            .get_node_labeled(&tag_id, EntityLabel::Tag)?
            .is_none()
        {
            return Ok(association_missing("tag", &tag_id));
        }

        scope
            .client
            .merge_edge(&item_gid, RelationshipType::IsTaggedWith, &tag_id)?;

        Ok(json!({
            "success": true,
            "message": format!("{item_gid} IS_TAGGED_WITH {tag_id}"),
        }))
    }
}

fn association_missing(what: &str, id: &str) -> Value {
    json!({
        "success": false,
        "message": format!("{what} '{id}' does not exist"),
    })
}
