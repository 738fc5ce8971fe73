//! Engine catalog reads: labels, counts, property keys, indexes.

use crate::StoreClient;
use membank_core::MemBankError;
use rusqlite::params;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

impl StoreClient {
    /// Distinct node labels present in the database, sorted.
    pub fn catalog_labels(&self) -> Result<Vec<String>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT DISTINCT label FROM nodes ORDER BY label")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }

    /// Node count per label, plus edge count under the `_edges` key.
    pub fn catalog_counts(&self) -> Result<BTreeMap<String, i64>, MemBankError> {
        let conn = self.conn();
        let mut counts = BTreeMap::new();

        let mut stmt = conn
            .prepare("SELECT label, COUNT(*) FROM nodes GROUP BY label ORDER BY label")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        for row in rows {
            let (label, count) = row.map_err(|e| MemBankError::Engine(e.to_string()))?;
            counts.insert(label, count);
        }

        let edges: i64 = conn
            .query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        counts.insert("_edges".to_string(), edges);
        Ok(counts)
    }

    /// Union of property keys across nodes of one label, sorted.
    pub fn catalog_properties(&self, label: &str) -> Result<Vec<String>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT properties FROM nodes WHERE label = ?1")
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map(params![label], |row| row.get::<_, String>(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;

        let mut keys = BTreeSet::new();
        for row in rows {
            let props = row.map_err(|e| MemBankError::Engine(e.to_string()))?;
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(&props) {
                keys.extend(map.keys().cloned());
            }
        }
        Ok(keys.into_iter().collect())
    }

    /// Index names defined by the schema installer, sorted.
    pub fn catalog_indexes(&self) -> Result<Vec<String>, MemBankError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'index' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| MemBankError::Engine(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| MemBankError::Engine(e.to_string()))
    }
}
