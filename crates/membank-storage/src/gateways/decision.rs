//! Gateway for `Decision` nodes.

use crate::gateways::{prop_date, prop_str, prop_str_required};
use crate::{NodeRow, StoreClient};
use chrono::NaiveDate;
use membank_core::{
    graph_unique_id, validate_id_prefix, validate_scope, Decision, DecisionStatus, EntityLabel,
    MemBankError,
};
use rusqlite::params;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct DecisionUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub date: NaiveDate,
    pub context: Option<String>,
    pub status: DecisionStatus,
}

pub struct DecisionGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> DecisionGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    /// Create or update a decision.
    ///
    /// Status changes on an existing decision must follow the lifecycle
    /// `proposed → approved → implemented | failed`; anything else is a
    /// `Conflict`. A new decision may carry any initial status.
    pub fn upsert(&self, input: &DecisionUpsert) -> Result<Decision, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        validate_id_prefix("Decision", &input.id)?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        if let Some(existing) = self.find_by_graph_id(&gid)? {
            if !existing.status.can_transition_to(input.status) {
                return Err(MemBankError::Conflict(format!(
                    "illegal decision transition {} -> {} for {gid}",
                    existing.status, input.status
                )));
            }
        }

        let props = json!({
            "name": input.name,
            "date": input.date.to_string(),
            "context": input.context,
            "status": input.status.to_string(),
        });
        self.client.put_node(
            &gid,
            EntityLabel::Decision,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("decision {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<Decision>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::Decision)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::Decision)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<Decision>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::Decision, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Decisions whose `date` falls within `[start, end]`, calendar-day
    /// precision, both bounds inclusive. Ordered by date then id.
    pub fn find_by_date_range(
        &self,
        repository: &str,
        branch: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Decision>, MemBankError> {
        // ISO dates compare lexicographically in calendar order.
        let rows = {
            let conn = self.client.conn();
            let mut stmt = conn
                .prepare(
                    "SELECT id, label, repository, branch, properties, created_at, updated_at
                     FROM nodes
                     WHERE label = 'Decision' AND repository = ?1 AND branch = ?2
                       AND json_extract(properties, '$.date') >= ?3
                       AND json_extract(properties, '$.date') <= ?4
                     ORDER BY json_extract(properties, '$.date'), id",
                )
                .map_err(|e| MemBankError::Engine(e.to_string()))?;
            let mapped = stmt
                .query_map(
                    params![repository, branch, start.to_string(), end.to_string()],
                    crate::nodes::map_node_row,
                )
                .map_err(|e| MemBankError::Engine(e.to_string()))?;
            mapped
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| MemBankError::Engine(e.to_string()))?
        };
        rows.into_iter().map(from_row).collect()
    }
}

fn from_row(row: NodeRow) -> Result<Decision, MemBankError> {
    let record = row.into_entity_record()?;
    let status: DecisionStatus = prop_str_required(&record.properties, "status")?.parse()?;
    Ok(Decision {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("decision missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("decision missing branch".into()))?,
        name: prop_str_required(&record.properties, "name")?,
        date: prop_date(&record.properties, "date")?,
        context: prop_str(&record.properties, "context"),
        status,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
