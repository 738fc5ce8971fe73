//! Gateway for `File` nodes.

use crate::gateways::{prop_str, prop_str_required};
use crate::{NodeRow, StoreClient};
use membank_core::{
    graph_unique_id, validate_id_prefix, validate_scope, EntityLabel, FileEntity, MemBankError,
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct FileUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub path: String,
    pub language: Option<String>,
    pub metrics: Option<serde_json::Value>,
    pub content_hash: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

pub struct FileGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> FileGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &FileUpsert) -> Result<FileEntity, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        validate_id_prefix("File", &input.id)?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        let props = json!({
            "name": input.name,
            "path": input.path,
            "language": input.language,
            "metrics": input.metrics,
            "content_hash": input.content_hash,
            "mime_type": input.mime_type,
            "size_bytes": input.size_bytes,
        });
        self.client.put_node(
            &gid,
            EntityLabel::File,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("file {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<FileEntity>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::File)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::File)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<FileEntity>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::File, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

fn from_row(row: NodeRow) -> Result<FileEntity, MemBankError> {
    let record = row.into_entity_record()?;
    let metrics = match record.properties.get("metrics") {
        Some(serde_json::Value::Null) | None => None,
        Some(v) => Some(v.clone()),
    };
    let size_bytes = record
        .properties
        .get("size_bytes")
        .and_then(|v| v.as_i64());
    Ok(FileEntity {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("file missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("file missing branch".into()))?,
        name: prop_str_required(&record.properties, "name")?,
        path: prop_str_required(&record.properties, "path")?,
        language: prop_str(&record.properties, "language"),
        metrics,
        content_hash: prop_str(&record.properties, "content_hash"),
        mime_type: prop_str(&record.properties, "mime_type"),
        size_bytes,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
