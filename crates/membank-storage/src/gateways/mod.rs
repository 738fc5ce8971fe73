//! Per-entity-type gateways.
//!
//! Each gateway wraps one node label and translates domain structs to and
//! from graph records. Gateways hold a non-owning reference to a
//! [`StoreClient`](crate::StoreClient) and never compose operations across
//! entity types; composition happens in the operations layer.

mod component;
mod context;
mod decision;
mod file;
mod metadata;
mod repository;
mod rule;
mod tag;

pub use component::{ComponentGateway, ComponentUpsert};
pub use context::{ContextGateway, ContextUpsert};
pub use decision::{DecisionGateway, DecisionUpsert};
pub use file::{FileGateway, FileUpsert};
pub use metadata::{MetadataGateway, MetadataUpsert};
pub use repository::RepositoryGateway;
pub use rule::{RuleGateway, RuleUpsert};
pub use tag::{TagGateway, TagUpsert};

use chrono::NaiveDate;
use membank_core::MemBankError;
use serde_json::Value;

// ── Property extraction helpers ─────────────────────────────────────────────

pub(crate) fn prop_str(props: &Value, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.as_str()).map(String::from)
}

pub(crate) fn prop_str_required(props: &Value, key: &str) -> Result<String, MemBankError> {
    prop_str(props, key)
        .ok_or_else(|| MemBankError::Internal(format!("stored node missing '{key}' property")))
}

pub(crate) fn prop_str_list(props: &Value, key: &str) -> Vec<String> {
    props
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn prop_date(props: &Value, key: &str) -> Result<NaiveDate, MemBankError> {
    let raw = prop_str_required(props, key)?;
    raw.parse()
        .map_err(|_| MemBankError::Internal(format!("stored node has malformed date '{raw}'")))
}
