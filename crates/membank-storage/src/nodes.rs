//! Generic node and edge operations on a [`StoreClient`].
//!
//! Gateways use the node helpers for their own label; cross-entity edge
//! composition happens in the operations layer.

use crate::StoreClient;
use chrono::{DateTime, Utc};
use membank_core::{
    split_graph_unique_id, EdgeRecord, EntityLabel, EntityRecord, MemBankError, RelationshipType,
};
use rusqlite::{params, OptionalExtension};

/// Raw node row as stored in the engine.
pub struct NodeRow {
    pub id: String,
    pub label: String,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub properties: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NodeRow {
    pub fn into_entity_record(self) -> Result<EntityRecord, MemBankError> {
        let label: EntityLabel = self.label.parse()?;
        let properties: serde_json::Value = serde_json::from_str(&self.properties)?;
        let logical_id = if label.is_scoped() {
            split_graph_unique_id(&self.id)
                .map(|(_, _, id)| id.to_string())
                .ok_or_else(|| {
                    MemBankError::Internal(format!("malformed graph_unique_id: {}", self.id))
                })?
        } else {
            self.id.clone()
        };
        let name = properties
            .get("name")
            .and_then(|v| v.as_str())
            .map(String::from);
        Ok(EntityRecord {
            node_id: self.id,
            label,
            id: logical_id,
            repository: self.repository,
            branch: self.branch,
            name,
            properties,
            created_at: millis_to_datetime(self.created_at),
            updated_at: millis_to_datetime(self.updated_at),
        })
    }
}

pub(crate) fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub(crate) fn map_node_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<NodeRow> {
    Ok(NodeRow {
        id: row.get(0)?,
        label: row.get(1)?,
        repository: row.get(2)?,
        branch: row.get(3)?,
        properties: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const NODE_COLUMNS: &str = "id, label, repository, branch, properties, created_at, updated_at";

impl StoreClient {
    /// Create-or-update a node by primary key.
    ///
    /// On create, `created_at = updated_at = now`. On match, `created_at`
    /// is preserved and `updated_at` advances; label and scope columns are
    /// left untouched (identity is immutable).
    pub fn put_node(
        &self,
        node_id: &str,
        label: EntityLabel,
        repository: Option<&str>,
        branch: Option<&str>,
        properties: &serde_json::Value,
    ) -> Result<(), MemBankError> {
        let now = Utc::now().timestamp_millis();
        let props = serde_json::to_string(properties)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO nodes (id, label, repository, branch, properties, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 properties = excluded.properties,
                 updated_at = excluded.updated_at",
            params![node_id, label.to_string(), repository, branch, props, now],
        )
        .map_err(|e| MemBankError::Engine(e.to_string()))?;
        Ok(())
    }

    /// Fetch one node by primary key.
    pub fn get_node(&self, node_id: &str) -> Result<Option<NodeRow>, MemBankError> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1"),
            params![node_id],
            map_node_row,
        )
        .optional()
        .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// Fetch one node and require a specific label.
    pub fn get_node_labeled(
        &self,
        node_id: &str,
        label: EntityLabel,
    ) -> Result<Option<NodeRow>, MemBankError> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1 AND label = ?2"),
            params![node_id, label.to_string()],
            map_node_row,
        )
        .optional()
        .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// Delete a node; incident edges cascade. Returns whether a row existed.
    pub fn delete_node(&self, node_id: &str) -> Result<bool, MemBankError> {
        let conn = self.conn();
        let n = conn
            .execute("DELETE FROM nodes WHERE id = ?1", params![node_id])
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        Ok(n > 0)
    }

    /// All nodes of one label within a (repository, branch), ordered by id.
    pub fn scan_scope(
        &self,
        label: EntityLabel,
        repository: &str,
        branch: &str,
    ) -> Result<Vec<NodeRow>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE label = ?1 AND repository = ?2 AND branch = ?3
                 ORDER BY id"
            ))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![label.to_string(), repository, branch], map_node_row)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// All nodes of one label, ordered by id.
    pub fn scan_label(&self, label: EntityLabel) -> Result<Vec<NodeRow>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM nodes WHERE label = ?1 ORDER BY id"
            ))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![label.to_string()], map_node_row)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// All scoped nodes (any label except Repository/Tag) in a scope,
    /// ordered by id.
    pub fn scan_scoped_entities(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Vec<NodeRow>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE repository = ?1 AND branch = ?2
                   AND label NOT IN ('Repository', 'Tag')
                 ORDER BY id"
            ))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![repository, branch], map_node_row)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// All nodes of a logical repository across every branch, `Repository`
    /// nodes included, `Tag` nodes excluded. Ordered by id.
    pub fn scan_repository_entities(
        &self,
        repository: &str,
    ) -> Result<Vec<NodeRow>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NODE_COLUMNS} FROM nodes
                 WHERE repository = ?1 AND label != 'Tag'
                 ORDER BY id"
            ))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![repository], map_node_row)
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    // ── Edges ───────────────────────────────────────────────────────────

    /// MERGE a typed edge. Returns `true` if the edge was newly created,
    /// `false` if it already existed. Both endpoints must exist (enforced
    /// by the schema's foreign keys; callers check first for soft failures).
    pub fn merge_edge(
        &self,
        src: &str,
        relationship: RelationshipType,
        dst: &str,
    ) -> Result<bool, MemBankError> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn();
        let n = conn
            .execute(
                "INSERT OR IGNORE INTO edges (src, dst, relationship, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![src, dst, relationship.to_string(), now],
            )
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        Ok(n > 0)
    }

    /// Whether a specific edge exists.
    pub fn edge_exists(
        &self,
        src: &str,
        relationship: RelationshipType,
        dst: &str,
    ) -> Result<bool, MemBankError> {
        let conn = self.conn();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM edges WHERE src = ?1 AND relationship = ?2 AND dst = ?3",
                params![src, relationship.to_string(), dst],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        Ok(found.is_some())
    }

    /// Outgoing neighbor node ids over one relationship, ordered by dst.
    pub fn out_neighbors(
        &self,
        src: &str,
        relationship: RelationshipType,
    ) -> Result<Vec<String>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT dst FROM edges WHERE src = ?1 AND relationship = ?2 ORDER BY dst",
            )
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![src, relationship.to_string()], |row| row.get(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// Incoming neighbor node ids over one relationship, ordered by src.
    pub fn in_neighbors(
        &self,
        dst: &str,
        relationship: RelationshipType,
    ) -> Result<Vec<String>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT src FROM edges WHERE dst = ?1 AND relationship = ?2 ORDER BY src",
            )
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![dst, relationship.to_string()], |row| row.get(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// All edges touching any node in a (repository, branch) scope.
    pub fn scan_scope_edges(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Vec<EdgeRecord>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT e.src, e.dst, e.relationship, e.created_at
                 FROM edges e
                 JOIN nodes s ON s.id = e.src
                 WHERE s.repository = ?1 AND s.branch = ?2
                 ORDER BY e.src, e.relationship, e.dst",
            )
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![repository, branch], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| MemBankError::Engine(e.to_string()))?;

        let mut edges = Vec::new();
        for row in rows {
            let (src, dst, rel, created_at) =
                row.map_err(|e| MemBankError::Engine(e.to_string()))?;
            edges.push(EdgeRecord {
                src,
                dst,
                relationship: rel.parse()?,
                created_at: millis_to_datetime(created_at),
            });
        }
        Ok(edges)
    }
}
