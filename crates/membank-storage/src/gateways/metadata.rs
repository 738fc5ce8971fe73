//! Gateway for `Metadata` nodes.

use crate::gateways::prop_str_required;
use crate::{NodeRow, StoreClient};
use membank_core::{
    graph_unique_id, validate_scope, EntityLabel, MemBankError, Metadata,
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct MetadataUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    /// JSON content as a string; validated on upsert.
    pub content: String,
}

pub struct MetadataGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> MetadataGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &MetadataUpsert) -> Result<Metadata, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        if input.id.is_empty() {
            return Err(MemBankError::InvalidArgument(
                "metadata id must be non-empty".into(),
            ));
        }
        // Content must be well-formed JSON.
        serde_json::from_str::<serde_json::Value>(&input.content).map_err(|e| {
            MemBankError::InvalidArgument(format!("metadata content is not valid JSON: {e}"))
        })?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        let props = json!({
            "name": input.name,
            "content": input.content,
        });
        self.client.put_node(
            &gid,
            EntityLabel::Metadata,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("metadata {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<Metadata>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::Metadata)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::Metadata)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<Metadata>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::Metadata, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

fn from_row(row: NodeRow) -> Result<Metadata, MemBankError> {
    let record = row.into_entity_record()?;
    Ok(Metadata {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("metadata missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("metadata missing branch".into()))?,
        name: prop_str_required(&record.properties, "name")?,
        content: prop_str_required(&record.properties, "content")?,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
