//! Tool definitions advertised by `tools/list`.
//!
//! Every tool except `init-memory-bank` also accepts optional
//! `repository`, `branch`, and `projectRoot` overrides; the session binding
//! supplies the defaults.

use serde_json::{json, Value};

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required,
        }
    })
}

pub(crate) fn tool_definitions() -> Vec<Value> {
    vec![
        tool(
            "init-memory-bank",
            "Bind the session to a project root, repository, and branch; initialise the graph database on first use",
            json!({
                "projectRoot": { "type": "string", "description": "Absolute path of the client project (defaults to the server working directory)" },
                "repository": { "type": "string", "description": "Logical repository name" },
                "branch": { "type": "string", "description": "Branch name (default: main)" },
            }),
            &["repository"],
        ),
        tool(
            "upsert-component",
            "Create or update an architectural component; resolves DEPENDS_ON edges for dependencies that exist",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed comp-" },
                "name": { "type": "string" },
                "kind": { "type": "string" },
                "status": { "type": "string", "enum": ["active", "deprecated", "planned"] },
                "dependsOn": { "type": "array", "items": { "type": "string" } },
            }),
            &["id", "name"],
        ),
        tool(
            "upsert-decision",
            "Create or update a decision record; transitions follow proposed -> approved -> implemented | failed",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed dec-" },
                "name": { "type": "string" },
                "date": { "type": "string", "description": "ISO date (YYYY-MM-DD)" },
                "context": { "type": "string", "description": "Rationale" },
                "status": { "type": "string", "enum": ["proposed", "approved", "implemented", "failed"] },
                "componentId": { "type": "string", "description": "Component this decision governs" },
            }),
            &["id", "name", "date"],
        ),
        tool(
            "upsert-rule",
            "Create or update a governance rule",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed rule-" },
                "name": { "type": "string" },
                "created": { "type": "string", "description": "ISO date (YYYY-MM-DD)" },
                "content": { "type": "string" },
                "triggers": { "type": "array", "items": { "type": "string" } },
                "status": { "type": "string", "enum": ["active", "deprecated"] },
            }),
            &["id", "name", "created", "content"],
        ),
        tool(
            "upsert-metadata",
            "Create or update a named JSON metadata blob for the scope",
            json!({
                "id": { "type": "string" },
                "name": { "type": "string" },
                "content": { "description": "JSON object or pre-encoded JSON string" },
            }),
            &["id", "name", "content"],
        ),
        tool(
            "upsert-file",
            "Create or update a tracked file; inline content derives hash and size",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed file-" },
                "name": { "type": "string" },
                "path": { "type": "string" },
                "language": { "type": "string" },
                "metrics": { "type": "object" },
                "content": { "type": "string", "description": "Optional file content for hashing" },
                "contentHash": { "type": "string" },
                "mimeType": { "type": "string" },
                "sizeBytes": { "type": "integer" },
            }),
            &["id", "name", "path"],
        ),
        tool(
            "upsert-tag",
            "Create or update a tag (global to the project-root database)",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed tag-" },
                "name": { "type": "string" },
                "color": { "type": "string" },
                "description": { "type": "string" },
            }),
            &["id", "name"],
        ),
        tool(
            "add-context",
            "Record an agent observation, optionally linked to a component, decision, or rule",
            json!({
                "id": { "type": "string", "description": "Logical id, prefixed ctx- (generated when absent)" },
                "agent": { "type": "string" },
                "summary": { "type": "string" },
                "observation": { "type": "string" },
                "date": { "type": "string", "description": "ISO date (defaults to today)" },
                "issue": { "type": "string" },
                "itemId": { "type": "string", "description": "Item to attach this context to" },
                "itemType": { "type": "string", "enum": ["component", "decision", "rule"] },
            }),
            &["agent", "summary", "observation"],
        ),
        tool(
            "get-component",
            "Fetch one component by logical id",
            json!({
                "id": { "type": "string" },
                "branch": { "type": "string" },
            }),
            &["id"],
        ),
        tool(
            "get-metadata",
            "Fetch one metadata blob by logical id",
            json!({ "id": { "type": "string" } }),
            &["id"],
        ),
        tool(
            "delete-entity",
            "Delete one entity by type and id (incident edges are detached)",
            json!({
                "id": { "type": "string" },
                "entityType": { "type": "string", "enum": ["component", "decision", "rule", "file", "context", "metadata", "tag"] },
            }),
            &["id", "entityType"],
        ),
        tool(
            "associate-file-with-component",
            "MERGE a CONTAINS_FILE edge; soft {success:false} when an endpoint is missing",
            json!({
                "componentId": { "type": "string" },
                "fileId": { "type": "string" },
            }),
            &["componentId", "fileId"],
        ),
        tool(
            "tag-item",
            "MERGE an IS_TAGGED_WITH edge from an item to a tag; idempotent",
            json!({
                "itemId": { "type": "string" },
                "itemType": { "type": "string", "enum": ["component", "decision", "rule", "file", "context", "metadata"] },
                "tagId": { "type": "string" },
            }),
            &["itemId", "tagId"],
        ),
        tool(
            "get-component-dependencies",
            "BFS over DEPENDS_ON up to depth hops; deduplicated, ascending id",
            json!({
                "componentId": { "type": "string" },
                "depth": { "type": "integer", "minimum": 0, "default": 1 },
            }),
            &["componentId"],
        ),
        tool(
            "get-component-dependents",
            "Inverse dependency traversal",
            json!({
                "componentId": { "type": "string" },
                "depth": { "type": "integer", "minimum": 0, "default": 1 },
            }),
            &["componentId"],
        ),
        tool(
            "get-governing-items",
            "Decisions, active rules, and context history governing a component",
            json!({ "componentId": { "type": "string" } }),
            &["componentId"],
        ),
        tool(
            "get-item-contextual-history",
            "Context nodes linked to an item, newest first",
            json!({
                "itemId": { "type": "string" },
                "itemType": { "type": "string", "enum": ["component", "decision", "rule", "file", "context", "metadata"] },
            }),
            &["itemId", "itemType"],
        ),
        tool(
            "get-related-items",
            "Breadth-limited undirected neighborhood, filtered by relationship types",
            json!({
                "itemId": { "type": "string" },
                "relationships": { "type": "array", "items": { "type": "string" } },
                "depth": { "type": "integer", "minimum": 0, "default": 1 },
            }),
            &["itemId"],
        ),
        tool(
            "shortest-path",
            "Shortest undirected path between two nodes in the scope",
            json!({
                "startId": { "type": "string" },
                "endId": { "type": "string" },
            }),
            &["startId", "endId"],
        ),
        tool(
            "get-decisions-by-date-range",
            "Decisions dated within [startDate, endDate], inclusive",
            json!({
                "startDate": { "type": "string" },
                "endDate": { "type": "string" },
            }),
            &["startDate", "endDate"],
        ),
        tool(
            "get-active-rules",
            "Rules with status=active in the scope",
            json!({}),
            &[],
        ),
        tool(
            "pagerank",
            "PageRank over components and DEPENDS_ON edges (damping 0.85, tolerance 1e-6)",
            json!({
                "damping": { "type": "number", "default": 0.85 },
                "maxIterations": { "type": "integer", "default": 100 },
            }),
            &[],
        ),
        tool(
            "louvain-community-detection",
            "Louvain communities plus modularity over the component graph",
            json!({ "resolution": { "type": "number", "default": 1.0 } }),
            &[],
        ),
        tool(
            "k-core-decomposition",
            "Coreness of every component by classical peeling",
            json!({}),
            &[],
        ),
        tool(
            "strongly-connected-components",
            "Tarjan SCCs with at least two nodes (dependency cycles)",
            json!({}),
            &[],
        ),
        tool(
            "weakly-connected-components",
            "Undirected reachability groups with at least two nodes",
            json!({}),
            &[],
        ),
        tool("labels", "Node labels present in the database", json!({}), &[]),
        tool("count", "Node counts per label plus edge count", json!({}), &[]),
        tool(
            "properties",
            "Property keys present on nodes of one label",
            json!({ "label": { "type": "string" } }),
            &["label"],
        ),
        tool("indexes", "Index names installed by the schema", json!({}), &[]),
        tool(
            "memory-bank-stats",
            "Database-wide node and edge statistics",
            json!({}),
            &[],
        ),
        tool(
            "bulk-delete-by-type",
            "Delete every entity of one type in the scope; dryRun reports without mutating",
            json!({
                "entityType": { "type": "string", "enum": ["component", "decision", "rule", "file", "context", "metadata"] },
                "dryRun": { "type": "boolean", "default": false },
                "force": { "type": "boolean", "default": false },
            }),
            &["entityType"],
        ),
        tool(
            "bulk-delete-by-tag",
            "Delete every entity carrying a tag (the tag itself survives)",
            json!({
                "tagId": { "type": "string" },
                "dryRun": { "type": "boolean", "default": false },
                "force": { "type": "boolean", "default": false },
            }),
            &["tagId"],
        ),
        tool(
            "bulk-delete-by-branch",
            "Delete every scoped entity on the branch, including its Repository node",
            json!({
                "dryRun": { "type": "boolean", "default": false },
                "force": { "type": "boolean", "default": false },
            }),
            &[],
        ),
        tool(
            "bulk-delete-by-repository",
            "Delete all entities and Repository nodes across every branch of the repository; tags survive",
            json!({
                "dryRun": { "type": "boolean", "default": false },
                "force": { "type": "boolean", "default": false },
            }),
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_are_well_formed() {
        let defs = tool_definitions();
        assert!(defs.len() > 30);
        for def in &defs {
            assert!(def["name"].is_string());
            assert!(def["description"].is_string());
            assert_eq!(def["inputSchema"]["type"], "object");
        }
    }

    #[test]
    fn names_are_unique() {
        let defs = tool_definitions();
        let mut names: Vec<&str> = defs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}
