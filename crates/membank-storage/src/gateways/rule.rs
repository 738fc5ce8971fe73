//! Gateway for `Rule` nodes.

use crate::gateways::{prop_date, prop_str_list, prop_str_required};
use crate::{NodeRow, StoreClient};
use chrono::NaiveDate;
use membank_core::{
    graph_unique_id, validate_id_prefix, validate_scope, EntityLabel, MemBankError, Rule,
    RuleStatus,
};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct RuleUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub created: NaiveDate,
    pub content: String,
    pub triggers: Vec<String>,
    pub status: RuleStatus,
}

pub struct RuleGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> RuleGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &RuleUpsert) -> Result<Rule, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        validate_id_prefix("Rule", &input.id)?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        let props = json!({
            "name": input.name,
            "created": input.created.to_string(),
            "content": input.content,
            "triggers": input.triggers,
            "status": input.status.to_string(),
        });
        self.client.put_node(
            &gid,
            EntityLabel::Rule,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("rule {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<Rule>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::Rule)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::Rule)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<Rule>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::Rule, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Rules with `status = active` in a scope, ordered by id.
    pub fn find_active(&self, repository: &str, branch: &str) -> Result<Vec<Rule>, MemBankError> {
        Ok(self
            .scan(repository, branch)?
            .into_iter()
            .filter(|r| r.status == RuleStatus::Active)
            .collect())
    }
}

fn from_row(row: NodeRow) -> Result<Rule, MemBankError> {
    let record = row.into_entity_record()?;
    let status: RuleStatus = prop_str_required(&record.properties, "status")?.parse()?;
    Ok(Rule {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("rule missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("rule missing branch".into()))?,
        name: prop_str_required(&record.properties, "name")?,
        created: prop_date(&record.properties, "created")?,
        content: prop_str_required(&record.properties, "content")?,
        triggers: prop_str_list(&record.properties, "triggers"),
        status,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
