//! Gateway for `Repository` nodes.

use crate::gateways::prop_str_required;
use crate::StoreClient;
use membank_core::{
    repository_node_id, validate_scope, EntityLabel, MemBankError, Repository,
};
use serde_json::json;

pub struct RepositoryGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> RepositoryGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    /// Create the `(name, branch)` repository node if absent; return the
    /// post-image either way.
    pub fn ensure(&self, name: &str, branch: &str) -> Result<Repository, MemBankError> {
        validate_scope(name, branch)?;
        let node_id = repository_node_id(name, branch);
        if self.find_by_id(&node_id)?.is_none() {
            self.client.put_node(
                &node_id,
                EntityLabel::Repository,
                Some(name),
                Some(branch),
                &json!({ "name": name, "branch": branch }),
            )?;
        }
        self.find_by_id(&node_id)?
            .ok_or_else(|| MemBankError::Internal(format!("repository {node_id} vanished")))
    }

    pub fn find_by_id(&self, node_id: &str) -> Result<Option<Repository>, MemBankError> {
        let row = self
            .client
            .get_node_labeled(node_id, EntityLabel::Repository)?;
        row.map(|row| {
            let record = row.into_entity_record()?;
            Ok(Repository {
                id: record.node_id,
                name: prop_str_required(&record.properties, "name")?,
                branch: prop_str_required(&record.properties, "branch")?,
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
        })
        .transpose()
    }

    /// All branches of one logical repository name, ordered by node id.
    pub fn find_branches(&self, name: &str) -> Result<Vec<Repository>, MemBankError> {
        let rows = self.client.scan_label(EntityLabel::Repository)?;
        let mut out = Vec::new();
        for row in rows {
            if row.repository.as_deref() == Some(name) {
                let record = row.into_entity_record()?;
                out.push(Repository {
                    id: record.node_id,
                    name: prop_str_required(&record.properties, "name")?,
                    branch: prop_str_required(&record.properties, "branch")?,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                });
            }
        }
        Ok(out)
    }

    pub fn delete(&self, node_id: &str) -> Result<bool, MemBankError> {
        self.client.delete_node(node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_is_idempotent() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = RepositoryGateway::new(&client);

        let first = gateway.ensure("my-app", "main").unwrap();
        let second = gateway.ensure("my-app", "main").unwrap();
        assert_eq!(first.id, "my-app:main");
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn branches_are_distinct_nodes() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = RepositoryGateway::new(&client);

        gateway.ensure("my-app", "main").unwrap();
        gateway.ensure("my-app", "dev").unwrap();
        gateway.ensure("other", "main").unwrap();

        let branches = gateway.find_branches("my-app").unwrap();
        assert_eq!(branches.len(), 2);
        assert!(branches.iter().all(|r| r.name == "my-app"));
    }

    #[test]
    fn rejects_colon_in_name() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = RepositoryGateway::new(&client);
        assert!(gateway.ensure("bad:name", "main").is_err());
    }
}
