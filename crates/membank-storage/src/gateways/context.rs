//! Gateway for `Context` nodes.

use crate::gateways::{prop_date, prop_str, prop_str_required};
use crate::{NodeRow, StoreClient};
use chrono::NaiveDate;
use membank_core::{
    graph_unique_id, validate_id_prefix, validate_scope, Context, EntityLabel, MemBankError,
    RelationshipType,
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ContextUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub agent: String,
    pub summary: String,
    pub observation: String,
    pub date: NaiveDate,
    pub issue: Option<String>,
}

pub struct ContextGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> ContextGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &ContextUpsert) -> Result<Context, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        validate_id_prefix("Context", &input.id)?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        let props = json!({
            "agent": input.agent,
            "summary": input.summary,
            "observation": input.observation,
            "date": input.date.to_string(),
            "issue": input.issue,
            "name": input.summary,
        });
        self.client.put_node(
            &gid,
            EntityLabel::Context,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("context {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<Context>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::Context)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::Context)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<Context>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::Context, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Contexts linked to `item_gid` via `CONTEXT_OF`, newest date first;
    /// ties broken by ascending id.
    pub fn find_for_item(&self, item_gid: &str) -> Result<Vec<Context>, MemBankError> {
        let sources = self
            .client
            .in_neighbors(item_gid, RelationshipType::ContextOf)?;
        let mut contexts = Vec::new();
        for gid in sources {
            if let Some(ctx) = self.find_by_graph_id(&gid)? {
                contexts.push(ctx);
            }
        }
        contexts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
        Ok(contexts)
    }
}

fn from_row(row: NodeRow) -> Result<Context, MemBankError> {
    let record = row.into_entity_record()?;
    Ok(Context {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("context missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("context missing branch".into()))?,
        agent: prop_str_required(&record.properties, "agent")?,
        summary: prop_str_required(&record.properties, "summary")?,
        observation: prop_str_required(&record.properties, "observation")?,
        date: prop_date(&record.properties, "date")?,
        issue: prop_str(&record.properties, "issue"),
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
