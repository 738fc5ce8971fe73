//! membank-graph: graph algorithms over a (repository, branch) projection.
//!
//! A [`ScopeGraph`] is an in-memory petgraph projection of one scope's nodes
//! and edges, loaded from a [`StoreClient`]. Traversals and analytics run on
//! the projection; results are node ids (`graph_unique_id`s) that the
//! operations layer joins back to entities.

mod algorithms;
mod traversal;

pub use traversal::TraverseDirection;

use membank_core::{EntityLabel, MemBankError, RelationshipType};
use membank_storage::StoreClient;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// In-memory projection of one (repository, branch) scope.
pub struct ScopeGraph {
    pub(crate) graph: DiGraph<String, f64>,
    /// Map from node ids to petgraph indices.
    pub(crate) id_to_index: HashMap<String, NodeIndex>,
}

impl ScopeGraph {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_to_index: HashMap::new(),
        }
    }

    /// Load a projection from storage.
    ///
    /// `labels = None` loads every scoped entity; otherwise only the given
    /// labels. `relationships = None` loads every edge whose endpoints are
    /// both in the projection; otherwise only the given types.
    pub fn load(
        client: &StoreClient,
        repository: &str,
        branch: &str,
        labels: Option<&[EntityLabel]>,
        relationships: Option<&[RelationshipType]>,
    ) -> Result<Self, MemBankError> {
        let mut projection = Self::new();

        let rows = match labels {
            None => client.scan_scoped_entities(repository, branch)?,
            Some(labels) => {
                let mut rows = Vec::new();
                for label in labels {
                    rows.extend(client.scan_scope(*label, repository, branch)?);
                }
                rows
            }
        };
        for row in rows {
            projection.add_node(&row.id);
        }

        for edge in client.scan_scope_edges(repository, branch)? {
            if let Some(wanted) = relationships {
                if !wanted.contains(&edge.relationship) {
                    continue;
                }
            }
            projection.add_edge(&edge.src, &edge.dst);
        }

        Ok(projection)
    }

    /// Load the analytics projection: `Component` nodes and `DEPENDS_ON`
    /// edges within the scope.
    pub fn load_components(
        client: &StoreClient,
        repository: &str,
        branch: &str,
    ) -> Result<Self, MemBankError> {
        Self::load(
            client,
            repository,
            branch,
            Some(&[EntityLabel::Component]),
            Some(&[RelationshipType::DependsOn]),
        )
    }

    /// Add a node if absent.
    pub fn add_node(&mut self, id: &str) {
        if !self.id_to_index.contains_key(id) {
            let idx = self.graph.add_node(id.to_string());
            self.id_to_index.insert(id.to_string(), idx);
        }
    }

    /// Add a directed edge; endpoints outside the projection are skipped.
    pub fn add_edge(&mut self, src: &str, dst: &str) {
        if let (Some(&s), Some(&d)) = (self.id_to_index.get(src), self.id_to_index.get(dst)) {
            self.graph.add_edge(s, d, 1.0);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Node ids in a stable (petgraph insertion) order.
    pub(crate) fn ordered_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    /// Undirected neighbor ids of one node, sorted and deduplicated.
    pub(crate) fn undirected_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .chain(
                self.graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming),
            )
            .collect();
        out.sort_by_key(|i| self.graph.node_weight(*i).cloned());
        out.dedup();
        out
    }
}

impl Default for ScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::graph_from_edges;
    use super::*;
    use membank_storage::StoreClient;
    use serde_json::json;

    #[test]
    fn empty_projection() {
        let g = ScopeGraph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(!g.contains("x"));
    }

    #[test]
    fn edges_to_unknown_nodes_are_skipped() {
        let mut g = ScopeGraph::new();
        g.add_node("a");
        g.add_edge("a", "missing");
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut g = ScopeGraph::new();
        g.add_node("a");
        g.add_node("a");
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn load_components_filters_scope_and_label() {
        let client = StoreClient::open_in_memory().unwrap();
        for (id, branch) in [
            ("r:main:comp-A", "main"),
            ("r:main:comp-B", "main"),
            ("r:dev:comp-A", "dev"),
        ] {
            client
                .put_node(
                    id,
                    EntityLabel::Component,
                    Some("r"),
                    Some(branch),
                    &json!({"name": id, "status": "active"}),
                )
                .unwrap();
        }
        // A file node in scope must not appear in the component projection.
        client
            .put_node(
                "r:main:file-x",
                EntityLabel::File,
                Some("r"),
                Some("main"),
                &json!({"name": "x", "path": "x"}),
            )
            .unwrap();
        client
            .merge_edge("r:main:comp-A", RelationshipType::DependsOn, "r:main:comp-B")
            .unwrap();
        client
            .merge_edge(
                "r:main:comp-A",
                RelationshipType::ContainsFile,
                "r:main:file-x",
            )
            .unwrap();

        let g = ScopeGraph::load_components(&client, "r", "main").unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.contains("r:main:comp-A"));
        assert!(!g.contains("r:dev:comp-A"));
        assert!(!g.contains("r:main:file-x"));
    }

    #[test]
    fn graph_from_edges_helper() {
        let g = graph_from_edges(&["a"], &[("b", "c")]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 1);
    }
}
