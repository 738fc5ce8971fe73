//! Gateway for `Component` nodes.

use crate::gateways::{prop_str, prop_str_list, prop_str_required};
use crate::{NodeRow, StoreClient};
use membank_core::{
    graph_unique_id, validate_id_prefix, validate_scope, Component, ComponentStatus, EntityLabel,
    MemBankError,
};
use serde_json::json;

/// Caller-supplied attributes for a component upsert. Timestamps are set
/// server-side.
#[derive(Debug, Clone)]
pub struct ComponentUpsert {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub kind: Option<String>,
    pub status: ComponentStatus,
    pub depends_on: Vec<String>,
}

pub struct ComponentGateway<'a> {
    client: &'a StoreClient,
}

impl<'a> ComponentGateway<'a> {
    pub fn new(client: &'a StoreClient) -> Self {
        Self { client }
    }

    pub fn upsert(&self, input: &ComponentUpsert) -> Result<Component, MemBankError> {
        validate_scope(&input.repository, &input.branch)?;
        validate_id_prefix("Component", &input.id)?;

        let gid = graph_unique_id(&input.repository, &input.branch, &input.id);
        let props = json!({
            "name": input.name,
            "kind": input.kind,
            "status": input.status.to_string(),
            "depends_on": input.depends_on,
        });
        self.client.put_node(
            &gid,
            EntityLabel::Component,
            Some(&input.repository),
            Some(&input.branch),
            &props,
        )?;
        self.find_by_graph_id(&gid)?
            .ok_or_else(|| MemBankError::Internal(format!("component {gid} vanished")))
    }

    pub fn find_by_graph_id(&self, gid: &str) -> Result<Option<Component>, MemBankError> {
        self.client
            .get_node_labeled(gid, EntityLabel::Component)?
            .map(from_row)
            .transpose()
    }

    pub fn delete(&self, gid: &str) -> Result<bool, MemBankError> {
        match self.client.get_node_labeled(gid, EntityLabel::Component)? {
            Some(_) => self.client.delete_node(gid),
            None => Ok(false),
        }
    }

    /// All components in a scope, ordered by graph id.
    pub fn scan(&self, repository: &str, branch: &str) -> Result<Vec<Component>, MemBankError> {
        self.client
            .scan_scope(EntityLabel::Component, repository, branch)?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

fn from_row(row: NodeRow) -> Result<Component, MemBankError> {
    let record = row.into_entity_record()?;
    let status: ComponentStatus = prop_str_required(&record.properties, "status")?.parse()?;
    Ok(Component {
        id: record.id,
        repository: record
            .repository
            .ok_or_else(|| MemBankError::Internal("component missing repository".into()))?,
        branch: record
            .branch
            .ok_or_else(|| MemBankError::Internal("component missing branch".into()))?,
        name: prop_str_required(&record.properties, "name")?,
        kind: prop_str(&record.properties, "kind"),
        status,
        depends_on: prop_str_list(&record.properties, "depends_on"),
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, branch: &str, name: &str) -> ComponentUpsert {
        ComponentUpsert {
            id: id.into(),
            repository: "r".into(),
            branch: branch.into(),
            name: name.into(),
            kind: Some("service".into()),
            status: ComponentStatus::Active,
            depends_on: vec![],
        }
    }

    #[test]
    fn upsert_returns_post_image() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = ComponentGateway::new(&client);

        let comp = gateway.upsert(&input("comp-A", "main", "A")).unwrap();
        assert_eq!(comp.graph_unique_id(), "r:main:comp-A");
        assert_eq!(comp.name, "A");
        assert_eq!(comp.status, ComponentStatus::Active);
    }

    #[test]
    fn upsert_twice_updates_attributes() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = ComponentGateway::new(&client);

        let first = gateway.upsert(&input("comp-A", "main", "A")).unwrap();
        let mut renamed = input("comp-A", "main", "A-renamed");
        renamed.status = ComponentStatus::Deprecated;
        let second = gateway.upsert(&renamed).unwrap();

        assert_eq!(second.name, "A-renamed");
        assert_eq!(second.status, ComponentStatus::Deprecated);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn branch_isolation() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = ComponentGateway::new(&client);

        gateway.upsert(&input("comp-A", "main", "A")).unwrap();
        gateway.upsert(&input("comp-A", "dev", "A-dev")).unwrap();

        let main = gateway.find_by_graph_id("r:main:comp-A").unwrap().unwrap();
        let dev = gateway.find_by_graph_id("r:dev:comp-A").unwrap().unwrap();
        assert_eq!(main.name, "A");
        assert_eq!(dev.name, "A-dev");
    }

    #[test]
    fn rejects_bad_prefix() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = ComponentGateway::new(&client);
        let bad = input("dec-A", "main", "A");
        assert!(matches!(
            gateway.upsert(&bad),
            Err(MemBankError::InvalidArgument(_))
        ));
    }

    #[test]
    fn delete_only_matches_component_label() {
        let client = StoreClient::open_in_memory().unwrap();
        let gateway = ComponentGateway::new(&client);
        gateway.upsert(&input("comp-A", "main", "A")).unwrap();

        assert!(gateway.delete("r:main:comp-A").unwrap());
        assert!(!gateway.delete("r:main:comp-A").unwrap());
        assert!(gateway.find_by_graph_id("r:main:comp-A").unwrap().is_none());
    }
}
