//! Integration tests for membank-mcp: full tool-dispatch lifecycle against
//! an on-disk store under a temporary project root.

use membank_core::{CancelToken, ServerConfig};
use membank_mcp::{McpServer, NoopProgress, ToolResult};
use serde_json::{json, Value};
use tempfile::TempDir;

const SESSION: &str = "test-session";

// ── Helpers ────────────────────────────────────────────────────────────────

fn test_server() -> (McpServer, TempDir) {
    let root = tempfile::tempdir().unwrap();
    let server = McpServer::new(ServerConfig::default());
    (server, root)
}

fn call(server: &McpServer, tool: &str, args: Value) -> ToolResult {
    server.dispatch_tool(SESSION, tool, &args, &NoopProgress, &CancelToken::new())
}

/// Call a tool and unwrap the structured payload, asserting success.
fn call_ok(server: &McpServer, tool: &str, args: Value) -> Value {
    let result = call(server, tool, args);
    assert!(
        !result.is_error,
        "unexpected error calling {tool}: {}",
        result.content[0].text
    );
    result.structured_content.expect("missing structuredContent")
}

/// Call a tool and return its error text.
fn call_err(server: &McpServer, tool: &str, args: Value) -> String {
    let result = call(server, tool, args);
    assert!(result.is_error, "expected {tool} to fail");
    result.content[0].text.clone()
}

fn init(server: &McpServer, root: &TempDir, repository: &str, branch: &str) {
    let out = call_ok(
        server,
        "init-memory-bank",
        json!({
            "projectRoot": root.path().display().to_string(),
            "repository": repository,
            "branch": branch,
        }),
    );
    assert_eq!(out["success"], true);
}

fn add_component(server: &McpServer, id: &str, name: &str, deps: &[&str], branch: Option<&str>) {
    let mut args = json!({ "id": id, "name": name, "dependsOn": deps });
    if let Some(branch) = branch {
        args["branch"] = json!(branch);
    }
    call_ok(server, "upsert-component", args);
}

// ── Sessions ───────────────────────────────────────────────────────────────

#[test]
fn tools_require_a_bound_session() {
    let (server, _root) = test_server();
    let msg = call_err(&server, "get-component", json!({"id": "comp-A"}));
    assert!(msg.contains("Session not bound"), "got: {msg}");
}

#[test]
fn init_creates_database_directory() {
    let (server, root) = test_server();
    init(&server, &root, "my-app", "main");
    assert!(root.path().join("memory-bank.db").is_dir());
}

#[test]
fn unknown_tool_is_an_error() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    let msg = call_err(&server, "no-such-tool", json!({}));
    assert!(msg.contains("unknown tool"));
}

// ── Scenario A: branch isolation ───────────────────────────────────────────

#[test]
fn branch_isolation_same_logical_id() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-A", "A", &[], None);
    add_component(&server, "comp-A", "A-dev", &[], Some("dev"));

    let main = call_ok(
        &server,
        "get-component",
        json!({"id": "comp-A", "branch": "main"}),
    );
    assert_eq!(main["component"]["name"], "A");

    let dev = call_ok(
        &server,
        "get-component",
        json!({"id": "comp-A", "branch": "dev"}),
    );
    assert_eq!(dev["component"]["name"], "A-dev");
}

// ── Scenario B: dependency traversal ───────────────────────────────────────

#[test]
fn dependency_traversal_depth_and_order() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    // A -> B -> C and A -> D. Create leaves first so edges resolve.
    add_component(&server, "comp-C", "C", &[], None);
    add_component(&server, "comp-B", "B", &["comp-C"], None);
    add_component(&server, "comp-D", "D", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B", "comp-D"], None);

    let depth1 = call_ok(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-A", "depth": 1}),
    );
    let ids: Vec<&str> = depth1["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["comp-B", "comp-D"]);

    let depth2 = call_ok(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-A", "depth": 2}),
    );
    let ids: Vec<&str> = depth2["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["comp-B", "comp-C", "comp-D"]);
}

#[test]
fn depth_zero_traversal_returns_only_the_source() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-B", "B", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let out = call_ok(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-A", "depth": 0}),
    );
    let ids: Vec<&str> = out["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["comp-A"]);

    let related = call_ok(
        &server,
        "get-related-items",
        json!({"itemId": "comp-A", "depth": 0}),
    );
    let items = related["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "comp-A");
}

#[test]
fn dependents_are_the_inverse_traversal() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-B", "B", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);
    add_component(&server, "comp-C", "C", &["comp-B"], None);

    let out = call_ok(
        &server,
        "get-component-dependents",
        json!({"componentId": "comp-B"}),
    );
    let ids: Vec<&str> = out["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["comp-A", "comp-C"]);
}

#[test]
fn dangling_dependencies_do_not_materialise_edges() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let out = call_ok(
        &server,
        "upsert-component",
        json!({"id": "comp-A", "name": "A", "dependsOn": ["comp-ghost"]}),
    );
    assert_eq!(out["danglingDependencies"][0], "comp-ghost");
    assert!(out["resolvedDependencies"].as_array().unwrap().is_empty());

    let deps = call_ok(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-A"}),
    );
    assert!(deps["components"].as_array().unwrap().is_empty());
    // The listing is retained on the component for later resolution.
    assert_eq!(out["component"]["depends_on"][0], "comp-ghost");
}

#[test]
fn traversal_on_missing_component_is_not_found() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    let msg = call_err(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-ghost"}),
    );
    assert!(msg.contains("Not found"));
}

// ── Scenario C: association on missing endpoint ────────────────────────────

#[test]
fn association_with_missing_endpoint_is_soft_failure() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let out = call_ok(
        &server,
        "associate-file-with-component",
        json!({"componentId": "comp-X", "fileId": "file-y"}),
    );
    assert_eq!(out["success"], false);
    assert!(out["message"].as_str().unwrap().contains("comp-X"));
}

#[test]
fn association_is_idempotent_when_endpoints_exist() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-A", "A", &[], None);
    call_ok(
        &server,
        "upsert-file",
        json!({"id": "file-main", "name": "main.rs", "path": "src/main.rs", "content": "fn main() {}"}),
    );

    for _ in 0..2 {
        let out = call_ok(
            &server,
            "associate-file-with-component",
            json!({"componentId": "comp-A", "fileId": "file-main"}),
        );
        assert_eq!(out["success"], true);
    }

    // The file shows up exactly once in the neighborhood.
    let related = call_ok(
        &server,
        "get-related-items",
        json!({"itemId": "comp-A", "relationships": ["CONTAINS_FILE"]}),
    );
    let items = related["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["label"], "File");
}

#[test]
fn cross_branch_reference_is_conflict() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-A", "A", &[], None);

    let msg = call_err(
        &server,
        "associate-file-with-component",
        json!({"componentId": "r:dev:comp-A", "fileId": "file-y"}),
    );
    assert!(msg.contains("Conflict"), "got: {msg}");
}

// ── Tagging ────────────────────────────────────────────────────────────────

#[test]
fn tag_item_is_idempotent_and_scoped() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-A", "A", &[], None);
    call_ok(
        &server,
        "upsert-tag",
        json!({"id": "tag-sec", "name": "security"}),
    );

    for _ in 0..2 {
        let out = call_ok(
            &server,
            "tag-item",
            json!({"itemId": "comp-A", "itemType": "component", "tagId": "tag-sec"}),
        );
        assert_eq!(out["success"], true);
    }

    let out = call_ok(
        &server,
        "tag-item",
        json!({"itemId": "comp-missing", "itemType": "component", "tagId": "tag-sec"}),
    );
    assert_eq!(out["success"], false);
}

// ── Scenario F: bulk delete by tag, dry run ────────────────────────────────

#[test]
fn bulk_delete_by_tag_dry_run_leaves_graph_intact() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    call_ok(
        &server,
        "upsert-tag",
        json!({"id": "tag-sec", "name": "security"}),
    );
    for id in ["comp-A", "comp-B", "comp-C"] {
        add_component(&server, id, id, &[], None);
        call_ok(
            &server,
            "tag-item",
            json!({"itemId": id, "itemType": "component", "tagId": "tag-sec"}),
        );
    }

    let out = call_ok(
        &server,
        "bulk-delete-by-tag",
        json!({"tagId": "tag-sec", "dryRun": true}),
    );
    assert_eq!(out["count"], 3);
    assert_eq!(out["entities"].as_array().unwrap().len(), 3);
    assert!(out["warnings"].as_array().unwrap().is_empty());
    assert_eq!(out["deleted"], false);

    // All three components still present.
    for id in ["comp-A", "comp-B", "comp-C"] {
        call_ok(&server, "get-component", json!({"id": id}));
    }

    // Real delete removes the components but not the tag.
    let out = call_ok(
        &server,
        "bulk-delete-by-tag",
        json!({"tagId": "tag-sec"}),
    );
    assert_eq!(out["deleted"], true);
    let msg = call_err(&server, "get-component", json!({"id": "comp-A"}));
    assert!(msg.contains("Not found"));
    let counts = call_ok(&server, "count", json!({}));
    assert_eq!(counts["byLabel"]["Tag"], 1);
}

#[test]
fn bulk_delete_force_threshold() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    for i in 0..12 {
        add_component(&server, &format!("comp-{i:02}"), "c", &[], None);
    }

    let msg = call_err(
        &server,
        "bulk-delete-by-type",
        json!({"entityType": "component"}),
    );
    assert!(msg.contains("force"), "got: {msg}");

    let out = call_ok(
        &server,
        "bulk-delete-by-type",
        json!({"entityType": "component", "force": true}),
    );
    assert_eq!(out["count"], 12);
    assert_eq!(out["deleted"], true);
}

#[test]
fn bulk_delete_by_repository_spans_branches_and_spares_tags() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-A", "A", &[], None);
    add_component(&server, "comp-B", "B", &[], Some("dev"));
    call_ok(&server, "upsert-tag", json!({"id": "tag-keep", "name": "keep"}));

    let out = call_ok(
        &server,
        "bulk-delete-by-repository",
        json!({"dryRun": true}),
    );
    // comp-A, comp-B, and two Repository nodes (main, dev).
    assert_eq!(out["count"], 4);

    call_ok(
        &server,
        "bulk-delete-by-repository",
        json!({"force": true}),
    );
    let counts = call_ok(&server, "count", json!({}));
    assert_eq!(counts["byLabel"]["Tag"], 1);
    assert!(counts["byLabel"].get("Component").is_none());
    assert!(counts["byLabel"].get("Repository").is_none());
}

// ── Decisions ──────────────────────────────────────────────────────────────

#[test]
fn decision_state_machine_via_tools() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let base = json!({"id": "dec-1", "name": "Use Rust", "date": "2025-03-01"});
    call_ok(&server, "upsert-decision", base.clone());

    let mut approved = base.clone();
    approved["status"] = json!("approved");
    call_ok(&server, "upsert-decision", approved);

    let mut skip = base.clone();
    skip["status"] = json!("proposed");
    let msg = call_err(&server, "upsert-decision", skip);
    assert!(msg.contains("Conflict"), "got: {msg}");

    let mut done = base;
    done["status"] = json!("implemented");
    let out = call_ok(&server, "upsert-decision", done);
    assert_eq!(out["decision"]["status"], "implemented");
}

#[test]
fn decisions_by_date_range_inclusive_bounds() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    for (id, date) in [
        ("dec-1", "2025-03-01"),
        ("dec-2", "2025-03-31"),
        ("dec-3", "2025-04-01"),
    ] {
        call_ok(
            &server,
            "upsert-decision",
            json!({"id": id, "name": id, "date": date}),
        );
    }

    let out = call_ok(
        &server,
        "get-decisions-by-date-range",
        json!({"startDate": "2025-03-01", "endDate": "2025-03-31"}),
    );
    let ids: Vec<&str> = out["decisions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["dec-1", "dec-2"]);
}

// ── Governance and context ─────────────────────────────────────────────────

#[test]
fn governing_items_for_component() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-A", "A", &[], None);
    call_ok(
        &server,
        "upsert-decision",
        json!({"id": "dec-1", "name": "d", "date": "2025-03-01", "componentId": "comp-A"}),
    );
    call_ok(
        &server,
        "upsert-rule",
        json!({"id": "rule-1", "name": "no panics", "created": "2025-01-01", "content": "no unwrap"}),
    );
    call_ok(
        &server,
        "upsert-rule",
        json!({"id": "rule-2", "name": "old", "created": "2024-01-01", "content": "x", "status": "deprecated"}),
    );
    call_ok(
        &server,
        "add-context",
        json!({"agent": "claude", "summary": "s", "observation": "o", "itemId": "comp-A", "itemType": "component"}),
    );

    let out = call_ok(
        &server,
        "get-governing-items",
        json!({"componentId": "comp-A"}),
    );
    assert_eq!(out["decisions"].as_array().unwrap().len(), 1);
    let rules = out["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["id"], "rule-1");
    assert_eq!(out["contextHistory"].as_array().unwrap().len(), 1);
}

#[test]
fn contextual_history_is_date_descending() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-A", "A", &[], None);

    for (id, date) in [("ctx-old", "2025-01-01"), ("ctx-new", "2025-06-01")] {
        call_ok(
            &server,
            "add-context",
            json!({
                "id": id, "agent": "claude", "summary": id, "observation": "o",
                "date": date, "itemId": "comp-A", "itemType": "component",
            }),
        );
    }

    let out = call_ok(
        &server,
        "get-item-contextual-history",
        json!({"itemId": "comp-A", "itemType": "component"}),
    );
    let ids: Vec<&str> = out["contextHistory"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ctx-new", "ctx-old"]);
}

// ── Paths and analytics ────────────────────────────────────────────────────

#[test]
fn shortest_path_within_scope() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-C", "C", &[], None);
    add_component(&server, "comp-B", "B", &["comp-C"], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let out = call_ok(
        &server,
        "shortest-path",
        json!({"startId": "comp-A", "endId": "comp-C"}),
    );
    assert_eq!(out["found"], true);
    assert_eq!(out["length"], 2);
    assert_eq!(
        out["path"],
        json!(["r:main:comp-A", "r:main:comp-B", "r:main:comp-C"])
    );

    add_component(&server, "comp-Z", "Z", &[], None);
    let out = call_ok(
        &server,
        "shortest-path",
        json!({"startId": "comp-A", "endId": "comp-Z"}),
    );
    assert_eq!(out["found"], false);
}

#[test]
fn pagerank_over_component_projection() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-C", "C", &[], None);
    add_component(&server, "comp-B", "B", &["comp-C"], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let out = call_ok(&server, "pagerank", json!({}));
    assert_eq!(out["nodeCount"], 3);
    let nodes = out["nodes"].as_array().unwrap();
    // Sink of the chain ranks highest.
    assert_eq!(nodes[0]["id"], "r:main:comp-C");

    let total: f64 = nodes.iter().map(|n| n["score"].as_f64().unwrap()).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn pagerank_deterministic_across_runs() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-B", "B", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let first = call_ok(&server, "pagerank", json!({}));
    let second = call_ok(&server, "pagerank", json!({}));
    assert_eq!(first["nodes"], second["nodes"]);
}

#[test]
fn cancelled_analytics_return_cancelled_error() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-B", "B", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = server.dispatch_tool(SESSION, "pagerank", &json!({}), &NoopProgress, &cancel);
    assert!(result.is_error);
    assert!(result.content[0].text.contains("cancelled"));
    assert!(result.structured_content.is_none());
}

#[test]
fn scc_reports_dependency_cycles() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-A", "A", &[], None);
    add_component(&server, "comp-B", "B", &["comp-A"], None);
    // Close the cycle A -> B.
    add_component(&server, "comp-A", "A", &["comp-B"], None);
    add_component(&server, "comp-C", "C", &["comp-A"], None);

    let out = call_ok(&server, "strongly-connected-components", json!({}));
    assert_eq!(out["componentCount"], 1);
    assert_eq!(
        out["components"][0],
        json!(["r:main:comp-A", "r:main:comp-B"])
    );

    let wcc = call_ok(&server, "weakly-connected-components", json!({}));
    assert_eq!(wcc["componentCount"], 1);
    assert_eq!(wcc["components"][0].as_array().unwrap().len(), 3);
}

#[test]
fn analytics_on_empty_scope_are_empty_not_errors() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let pr = call_ok(&server, "pagerank", json!({}));
    assert_eq!(pr["nodeCount"], 0);
    assert!(pr["nodes"].as_array().unwrap().is_empty());

    let louvain = call_ok(&server, "louvain-community-detection", json!({}));
    assert_eq!(louvain["communityCount"], 0);

    let kcore = call_ok(&server, "k-core-decomposition", json!({}));
    assert_eq!(kcore["maxCoreness"], 0);
}

// ── Introspection and upsert round-trips ───────────────────────────────────

#[test]
fn catalog_introspection() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");
    add_component(&server, "comp-A", "A", &[], None);

    let labels = call_ok(&server, "labels", json!({}));
    let labels = labels["labels"].as_array().unwrap();
    assert!(labels.contains(&json!("Component")));
    assert!(labels.contains(&json!("Repository")));

    let props = call_ok(&server, "properties", json!({"label": "Component"}));
    assert!(props["properties"]
        .as_array()
        .unwrap()
        .contains(&json!("status")));

    let indexes = call_ok(&server, "indexes", json!({}));
    assert!(!indexes["indexes"].as_array().unwrap().is_empty());

    let stats = call_ok(&server, "memory-bank-stats", json!({}));
    assert!(stats["nodeCount"].as_i64().unwrap() >= 2);
}

#[test]
fn upsert_post_image_is_stable() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let args = json!({"id": "comp-A", "name": "A", "kind": "service"});
    let first = call_ok(&server, "upsert-component", args.clone());
    let second = call_ok(&server, "upsert-component", args);

    let a = first["component"].as_object().unwrap();
    let b = second["component"].as_object().unwrap();
    for (key, value) in a {
        if key == "updated_at" {
            continue;
        }
        assert_eq!(Some(value), b.get(key), "field {key} changed");
    }
}

#[test]
fn metadata_roundtrip_and_validation() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    call_ok(
        &server,
        "upsert-metadata",
        json!({"id": "meta", "name": "project", "content": {"stack": ["rust"]}}),
    );
    let out = call_ok(&server, "get-metadata", json!({"id": "meta"}));
    let content: Value =
        serde_json::from_str(out["metadata"]["content"].as_str().unwrap()).unwrap();
    assert_eq!(content["stack"][0], "rust");

    let msg = call_err(
        &server,
        "upsert-metadata",
        json!({"id": "meta2", "name": "bad", "content": "not json"}),
    );
    assert!(msg.contains("Invalid argument"));
}

#[test]
fn delete_entity_detaches_edges() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    add_component(&server, "comp-B", "B", &[], None);
    add_component(&server, "comp-A", "A", &["comp-B"], None);

    let out = call_ok(
        &server,
        "delete-entity",
        json!({"id": "comp-B", "entityType": "component"}),
    );
    assert_eq!(out["deleted"], true);

    let deps = call_ok(
        &server,
        "get-component-dependencies",
        json!({"componentId": "comp-A"}),
    );
    assert!(deps["components"].as_array().unwrap().is_empty());
}

#[test]
fn id_prefix_validation_via_tools() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let msg = call_err(
        &server,
        "upsert-component",
        json!({"id": "component-A", "name": "A"}),
    );
    assert!(msg.contains("comp-"), "got: {msg}");
}

#[test]
fn empty_scope_queries_return_empty_lists() {
    let (server, root) = test_server();
    init(&server, &root, "r", "main");

    let rules = call_ok(&server, "get-active-rules", json!({}));
    assert!(rules["rules"].as_array().unwrap().is_empty());

    let decisions = call_ok(
        &server,
        "get-decisions-by-date-range",
        json!({"startDate": "2025-01-01", "endDate": "2025-12-31"}),
    );
    assert!(decisions["decisions"].as_array().unwrap().is_empty());
}
