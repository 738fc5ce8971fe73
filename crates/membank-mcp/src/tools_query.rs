//! Traversal and governance query tools.

use crate::args::{opt_usize, require_date, require_str, str_list};
use crate::service::ToolScope;
use crate::tools_entity::item_label;
use crate::McpServer;
use membank_core::{EntityLabel, MemBankError, RelationshipType};
use membank_graph::{ScopeGraph, TraverseDirection};
use membank_storage::gateways::{ComponentGateway, ContextGateway, DecisionGateway, RuleGateway};
use serde_json::{json, Value};

impl McpServer {
    /// BFS over DEPENDS_ON up to `depth` hops, deduplicated, ascending id.
    pub(crate) fn tool_component_dependencies(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        self.traverse_components(scope, args, TraverseDirection::Outgoing)
    }

    /// Inverse traversal: components that depend on the given one.
    pub(crate) fn tool_component_dependents(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        self.traverse_components(scope, args, TraverseDirection::Incoming)
    }

    fn traverse_components(
        &self,
        scope: &ToolScope,
        args: &Value,
        direction: TraverseDirection,
    ) -> Result<Value, MemBankError> {
        let gid = scope.resolve_scoped_id(&require_str(args, "componentId")?)?;
        let depth = opt_usize(args, "depth").unwrap_or(1);

        let gateway = ComponentGateway::new(&scope.client);
        if gateway.find_by_graph_id(&gid)?.is_none() {
            return Err(MemBankError::NotFound(format!("component {gid}")));
        }

        let graph = ScopeGraph::load_components(&scope.client, &scope.repository, &scope.branch)?;
        let mut components = Vec::new();
        for reached in graph.reachable(&gid, depth, direction) {
            if let Some(component) = gateway.find_by_graph_id(&reached)? {
                components.push(component);
            }
        }

        Ok(json!({
            "componentId": gid,
            "depth": depth,
            "components": components,
        }))
    }

    /// `{decisions, rules, contextHistory}` governing a component.
    pub(crate) fn tool_governing_items(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let gid = scope.resolve_scoped_id(&require_str(args, "componentId")?)?;
        if scope
            .client
            .get_node_labeled(&gid, EntityLabel::Component)?
            .is_none()
        {
            return Err(MemBankError::NotFound(format!("component {gid}")));
        }

        let decision_gateway = DecisionGateway::new(&scope.client);
        let mut decisions = Vec::new();
        for src in scope
            .client
            .in_neighbors(&gid, RelationshipType::DecisionOn)?
        {
            if let Some(decision) = decision_gateway.find_by_graph_id(&src)? {
                decisions.push(decision);
            }
        }

        let rules = RuleGateway::new(&scope.client).find_active(&scope.repository, &scope.branch)?;
        let context_history = ContextGateway::new(&scope.client).find_for_item(&gid)?;

        Ok(json!({
            "componentId": gid,
            "decisions": decisions,
            "rules": rules,
            "contextHistory": context_history,
        }))
    }

    /// Context nodes linked to an item, newest first.
    pub(crate) fn tool_contextual_history(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let label = item_label(&require_str(args, "itemType")?)?;
        let gid = scope.resolve_scoped_id(&require_str(args, "itemId")?)?;
        if scope.client.get_node_labeled(&gid, label)?.is_none() {
            return Err(MemBankError::NotFound(format!("{label} {gid}")));
        }

        let history = ContextGateway::new(&scope.client).find_for_item(&gid)?;
        Ok(json!({
            "itemId": gid,
            "contextHistory": history,
        }))
    }

    /// Breadth-limited neighborhood filtered by relationship types.
    pub(crate) fn tool_related_items(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let gid = scope.resolve_scoped_id(&require_str(args, "itemId")?)?;
        let depth = opt_usize(args, "depth").unwrap_or(1);
        let relationships: Vec<RelationshipType> = str_list(args, "relationships")
            .iter()
            .map(|s| s.parse())
            .collect::<Result<_, _>>()?;

        if scope.client.get_node(&gid)?.is_none() {
            return Err(MemBankError::NotFound(format!("item {gid}")));
        }

        let filter = if relationships.is_empty() {
            None
        } else {
            Some(relationships.as_slice())
        };
        let graph = ScopeGraph::load(&scope.client, &scope.repository, &scope.branch, None, filter)?;

        let mut items = Vec::new();
        for reached in graph.reachable(&gid, depth, TraverseDirection::Undirected) {
            if let Some(row) = scope.client.get_node(&reached)? {
                items.push(row.into_entity_record()?);
            }
        }

        Ok(json!({
            "itemId": gid,
            "depth": depth,
            "relationships": relationships,
            "items": items,
        }))
    }

    /// Shortest undirected path within the scope.
    pub(crate) fn tool_shortest_path(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let start = scope.resolve_scoped_id(&require_str(args, "startId")?)?;
        let end = scope.resolve_scoped_id(&require_str(args, "endId")?)?;

        for gid in [&start, &end] {
            if scope.client.get_node(gid)?.is_none() {
                return Err(MemBankError::NotFound(format!("node {gid}")));
            }
        }

        let graph = ScopeGraph::load(&scope.client, &scope.repository, &scope.branch, None, None)?;
        match graph.shortest_path(&start, &end) {
            Some(path) => Ok(json!({
                "found": true,
                "length": path.len().saturating_sub(1),
                "path": path,
            })),
            None => Ok(json!({
                "found": false,
                "length": Value::Null,
                "path": [],
            })),
        }
    }

    /// Decisions within an inclusive calendar-day range.
    pub(crate) fn tool_decisions_by_date_range(
        &self,
        scope: &ToolScope,
        args: &Value,
    ) -> Result<Value, MemBankError> {
        let start = require_date(args, "startDate")?;
        let end = require_date(args, "endDate")?;
        if start > end {
            return Err(MemBankError::InvalidArgument(format!(
                "startDate {start} is after endDate {end}"
            )));
        }

        let decisions = DecisionGateway::new(&scope.client).find_by_date_range(
            &scope.repository,
            &scope.branch,
            start,
            end,
        )?;
        Ok(json!({
            "startDate": start.to_string(),
            "endDate": end.to_string(),
            "decisions": decisions,
        }))
    }

    /// Active rules in the scope.
    pub(crate) fn tool_active_rules(&self, scope: &ToolScope) -> Result<Value, MemBankError> {
        let rules = RuleGateway::new(&scope.client).find_active(&scope.repository, &scope.branch)?;
        Ok(json!({ "rules": rules }))
    }
}
