//! Gateway for `Tag` nodes (global to a project-root database).

use crate::gateways::{prop_str, prop_str_required};
use crate::{NodeRow, StoreClient};
use membank_core::{
    validate_id_prefix, EntityLabel, EntityRecord, MemBankError, RelationshipType, Tag,
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct TagUpsert {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

pub struct TagGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> TagGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &TagUpsert) -> Result<Tag, MemBankError> {
        validate_id_prefix("Tag", &input.id)?;
        let props = json!({
            "name": input.name,
            "color": input.color,
            "description": input.description,
        });
        // Tags are global: no scope columns.
        self.client
            .put_node(&input.id, EntityLabel::Tag, None, None, &props)?;
        self.find_by_id(&input.id)?
            .ok_or_else(|| MemBankError::Internal(format!("tag {} vanished", input.id)))
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Tag>, MemBankError> {
        self.client
            .get_node_labeled(id, EntityLabel::Tag)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, id: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(id, EntityLabel::Tag)? {
            Some(_) => self.client.delete_node(id),
            None => Ok(false),
        }
    }

    /// All tags in the database, ordered by id.
    pub fn scan(&self) -> Result<Vec<Tag>, MemBankError> {
        self.client
            .scan_label(EntityLabel::Tag)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Nodes tagged with `tag_id` via `IS_TAGGED_WITH`, ordered by node id.
    pub fn find_tagged_items(&self, tag_id: &str) -> Result<Vec<EntityRecord>, MemBankError> {
        let sources = self
            .client
            .in_neighbors(tag_id, RelationshipType::IsTaggedWith)?;
        let mut items = Vec::new();
        for node_id in sources {
            if let Some(row) = self.client.get_node(&node_id)? {
                items.push(row.into_entity_record()?);
            }
        }
        Ok(items)
    }
}

fn from_row(row: NodeRow) -> Result<Tag, MemBankError> {
    let record = row.into_entity_record()?;
    Ok(Tag {
        id: record.id,
        name: prop_str_required(&record.properties, "name")?,
        color: prop_str(&record.properties, "color"),
        description: prop_str(&record.properties, "description"),
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
