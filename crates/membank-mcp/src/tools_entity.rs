//! Entity upsert, read, and delete tools.

use crate::args::{opt_date, opt_i64, opt_str, require_str, str_list};
use crate::service::ToolScope;
use crate::McpServer;
use membank_core::{EntityLabel, MemBankError, RelationshipType};
use membank_storage::gateways::{
    ComponentGateway, ComponentUpsert, ContextGateway, ContextUpsert, DecisionGateway,
    DecisionUpsert, FileGateway, FileUpsert, MetadataGateway, MetadataUpsert, RepositoryGateway,
    RuleGateway, RuleUpsert, TagGateway, TagUpsert,
};
use membank_storage::StoreClient;
use serde_json::{json, Value};

impl McpServer {
    pub(crate) fn tool_upsert_component(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let input = ComponentUpsert {
            id: require_str(args, "id")?,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            name: require_str(args, "name")?,
            kind: opt_str(args, "kind"),
            status: opt_str(args, "status")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(membank_core::ComponentStatus::Active),
            depends_on: str_list(args, "dependsOn"),
        };

        let component = ComponentGateway::new(&scope.client).upsert(&input)?;
        let gid = component.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        // Materialise DEPENDS_ON edges for listed dependencies that exist
        // in the same scope; dangling listings stay listed without an edge.
        let mut resolved = Vec::new();
        let mut dangling = Vec::new();
        for dep in &component.depends_on {
            let dep_gid = scope.resolve_scoped_id(dep)?;
            if scope
                .client
                .get_node_labeled(&dep_gid, EntityLabel::Component)?
                .is_some()
            {
                scope
                    .client
                    .merge_edge(&gid, RelationshipType::DependsOn, &dep_gid)?;
                resolved.push(dep.clone());
            } else {
                dangling.push(dep.clone());
            }
        }

        Ok(json!({
            "component": component,
            "graphUniqueId": gid,
            "resolvedDependencies": resolved,
            "danglingDependencies": dangling,
        }))
    }

    pub(crate) fn tool_upsert_decision(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let input = DecisionUpsert {
            id: require_str(args, "id")?,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            name: require_str(args, "name")?,
            date: crate::args::require_date(args, "date")?,
            context: opt_str(args, "context"),
            status: opt_str(args, "status")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(membank_core::DecisionStatus::Proposed),
        };

        let decision = DecisionGateway::new(&scope.client).upsert(&input)?;
        let gid = decision.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        // Optional link to the component the decision governs.
        let mut linked = false;
        if let Some(component_id) = opt_str(args, "componentId") {
            let comp_gid = scope.resolve_scoped_id(&component_id)?;
            if scope
                .client
                .get_node_labeled(&comp_gid, EntityLabel::Component)?
                .is_some()
            {
                scope
                    .client
                    .merge_edge(&gid, RelationshipType::DecisionOn, &comp_gid)?;
                linked = true;
            }
        }

        Ok(json!({
            "decision": decision,
            "graphUniqueId": gid,
            "componentLinked": linked,
        }))
    }

    pub(crate) fn tool_upsert_rule(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let input = RuleUpsert {
            id: require_str(args, "id")?,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            name: require_str(args, "name")?,
            created: crate::args::require_date(args, "created")?,
            content: require_str(args, "content")?,
            triggers: str_list(args, "triggers"),
            status: opt_str(args, "status")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or(membank_core::RuleStatus::Active),
        };

        let rule = RuleGateway::new(&scope.client).upsert(&input)?;
        let gid = rule.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        Ok(json!({
            "rule": rule,
            "graphUniqueId": gid,
        }))
    }

    pub(crate) fn tool_upsert_metadata(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        // Content may arrive as a JSON object or a pre-encoded string.
        let content = match args.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(v) if !v.is_null() => v.to_string(),
            _ => {
                return Err(MemBankError::InvalidArgument(
                    "missing 'content' parameter".into(),
                ))
            }
        };
        let input = MetadataUpsert {
            id: require_str(args, "id")?,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            name: require_str(args, "name")?,
            content,
        };

        let metadata = MetadataGateway::new(&scope.client).upsert(&input)?;
        let gid = metadata.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        Ok(json!({
            "metadata": metadata,
            "graphUniqueId": gid,
        }))
    }

    pub(crate) fn tool_upsert_file(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        // Inline content takes priority for hash and size; otherwise the
        // caller-supplied values are stored as given.
        let (content_hash, size_bytes) = match opt_str(args, "content") {
            Some(content) => (
                Some(StoreClient::content_hash(&content)),
                Some(content.len() as i64),
            ),
            None => (opt_str(args, "contentHash"), opt_i64(args, "sizeBytes")),
        };

        let input = FileUpsert {
            id: require_str(args, "id")?,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            name: require_str(args, "name")?,
            path: require_str(args, "path")?,
            language: opt_str(args, "language"),
            metrics: args.get("metrics").filter(|v| !v.is_null()).cloned(),
            content_hash,
            mime_type: opt_str(args, "mimeType"),
            size_bytes,
        };

        let file = FileGateway::new(&scope.client).upsert(&input)?;
        let gid = file.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        Ok(json!({
            "file": file,
            "graphUniqueId": gid,
        }))
    }

    pub(crate) fn tool_upsert_tag(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let input = TagUpsert {
            id: require_str(args, "id")?,
            name: require_str(args, "name")?,
            color: opt_str(args, "color"),
            description: opt_str(args, "description"),
        };
        let tag = TagGateway::new(&scope.client).upsert(&input)?;
        Ok(json!({ "tag": tag }))
    }

    pub(crate) fn tool_add_context(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let id = opt_str(args, "id")
            .unwrap_or_else(|| format!("ctx-{}", uuid::Uuid::new_v4()));
        let date = opt_date(args, "date")?
            .unwrap_or_else(|| chrono::Utc::now().date_naive());
        let input = ContextUpsert {
            id,
            repository: scope.repository.clone(),
            branch: scope.branch.clone(),
            agent: require_str(args, "agent")?,
            summary: require_str(args, "summary")?,
            observation: require_str(args, "observation")?,
            date,
            issue: opt_str(args, "issue"),
        };

        let context = ContextGateway::new(&scope.client).upsert(&input)?;
        let gid = context.graph_unique_id();
        self.attach_to_repository(scope, &gid)?;

        // Optional CONTEXT_OF link to a component, decision, or rule.
        let mut linked = false;
        if let Some(item_id) = opt_str(args, "itemId") {
            let label = context_target_label(&opt_str(args, "itemType").unwrap_or_default())?;
            let item_gid = scope.resolve_scoped_id(&item_id)?;
            if scope.client.get_node_labeled(&item_gid, label)?.is_some() {
                scope
                    .client
                    .merge_edge(&gid, RelationshipType::ContextOf, &item_gid)?;
                linked = true;
            }
        }

        Ok(json!({
            "context": context,
            "graphUniqueId": gid,
            "itemLinked": linked,
        }))
    }

    pub(crate) fn tool_get_component(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let gid = scope.resolve_scoped_id(&require_str(args, "id")?)?;
        let component = ComponentGateway::new(&scope.client)
            .find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::NotFound(format!("component {gid}")))?;
        Ok(json!({ "component": component }))
    }

    pub(crate) fn tool_get_metadata(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let gid = scope.resolve_scoped_id(&require_str(args, "id")?)?;
        let metadata = MetadataGateway::new(&scope.client)
            .find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::NotFound(format!("metadata {gid}")))?;
        Ok(json!({ "metadata": metadata }))
    }

    pub(crate) fn tool_delete_entity(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let raw_type = require_str(args, "entityType")?;
        let label: EntityLabel = raw_type.parse()?;
        let id = require_str(args, "id")?;

        let deleted = match label {
            EntityLabel::Tag => TagGateway::new(&scope.client).delete(&id)?,
            EntityLabel::Repository => {
                return Err(MemBankError::InvalidArgument(
                    "repositories are removed via bulk-delete-by-repository".into(),
                ))
            }
            EntityLabel::Component => {
                ComponentGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
            EntityLabel::Decision => {
                DecisionGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
            EntityLabel::Rule => {
                RuleGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
            EntityLabel::File => {
                FileGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
            EntityLabel::Context => {
                ContextGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
            EntityLabel::Metadata => {
                MetadataGateway::new(&scope.client).delete(&scope.resolve_scoped_id(&id)?)?
            }
        };

        Ok(json!({ "deleted": deleted, "id": id, "entityType": raw_type }))
    }

    /// Ensure the scope's Repository node exists and the entity carries a
    /// PART_OF edge to it.
    fn attach_to_repository(
        &self,
        scope: &ToolScope,
        entity_gid: &str,
    ) -> Result<(), MemBankError> {
        let repo =
            RepositoryGateway::new(&scope.client).ensure(&scope.repository, &scope.branch)?;
        scope
            .client
            .merge_edge(entity_gid, RelationshipType::PartOf, &repo.id)?;
        Ok(())
    }
}

/// Labels a CONTEXT_OF edge may target.
fn context_target_label(raw: &str) -> Result<EntityLabel, MemBankError> {
    let label: EntityLabel = raw.parse()?;
    match label {
        EntityLabel::Component | EntityLabel::Decision | EntityLabel::Rule => Ok(label),
        _ => Err(MemBankError::InvalidArgument(format!(
            "contexts attach to components, decisions, or rules, not {label}"
        ))),
    }
}

/// Labels a tag or history lookup may target.
pub(crate) fn item_label(raw: &str) -> Result<EntityLabel, MemBankError> {
    let label: EntityLabel = raw.parse()?;
    match label {
        EntityLabel::Component
        | EntityLabel::Decision
        | EntityLabel::Rule
        | EntityLabel::File
        | EntityLabel::Context
        | EntityLabel::Metadata => Ok(label),
        _ => Err(MemBankError::InvalidArgument(format!(
            "items of type {label} cannot be targeted"
        ))),
    }
}
