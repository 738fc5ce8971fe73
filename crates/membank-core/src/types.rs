use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{graph_unique_id, repository_node_id, MemBankError};

// ── Entity Labels ───────────────────────────────────────────────────────────

/// Node labels in the memory graph.
///
/// All labels except `Repository` and `Tag` are scoped to a
/// (repository, branch) pair. `Tag` is global to a project-root database;
/// `Repository` carries its branch as an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    Repository,
    Metadata,
    Context,
    Component,
    Decision,
    Rule,
    File,
    Tag,
}

impl EntityLabel {
    /// Labels whose identity is partitioned by (repository, branch).
    pub fn is_scoped(&self) -> bool {
        !matches!(self, Self::Repository | Self::Tag)
    }

    /// All labels, in schema order.
    pub fn all() -> [EntityLabel; 8] {
        [
            Self::Repository,
            Self::Metadata,
            Self::Context,
            Self::Component,
            Self::Decision,
            Self::Rule,
            Self::File,
            Self::Tag,
        ]
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repository => write!(f, "Repository"),
            Self::Metadata => write!(f, "Metadata"),
            Self::Context => write!(f, "Context"),
            Self::Component => write!(f, "Component"),
            Self::Decision => write!(f, "Decision"),
            Self::Rule => write!(f, "Rule"),
            Self::File => write!(f, "File"),
            Self::Tag => write!(f, "Tag"),
        }
    }
}

impl std::str::FromStr for EntityLabel {
    type Err = MemBankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repository" => Ok(Self::Repository),
            "metadata" => Ok(Self::Metadata),
            "context" => Ok(Self::Context),
            "component" => Ok(Self::Component),
            "decision" => Ok(Self::Decision),
            "rule" => Ok(Self::Rule),
            "file" => Ok(Self::File),
            "tag" => Ok(Self::Tag),
            _ => Err(MemBankError::InvalidArgument(format!(
                "unknown entity label: {s}"
            ))),
        }
    }
}

// ── Relationship Types ──────────────────────────────────────────────────────

/// Typed, directed relationships between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Scoped entity → its Repository node.
    PartOf,
    /// Component → Component, same (repository, branch).
    DependsOn,
    /// Context → Component | Decision | Rule.
    ContextOf,
    /// Decision → Component.
    DecisionOn,
    /// Component → File, same (repository, branch) on both endpoints.
    ContainsFile,
    /// Any scoped entity or Context → Tag (the Tag end is global).
    IsTaggedWith,
}

impl RelationshipType {
    /// Relationships whose two endpoints must share a (repository, branch).
    pub fn requires_same_scope(&self) -> bool {
        matches!(
            self,
            Self::DependsOn | Self::ContextOf | Self::DecisionOn | Self::ContainsFile
        )
    }

    /// All relationship types, in schema order.
    pub fn all() -> [RelationshipType; 6] {
        [
            Self::PartOf,
            Self::DependsOn,
            Self::ContextOf,
            Self::DecisionOn,
            Self::ContainsFile,
            Self::IsTaggedWith,
        ]
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PartOf => write!(f, "PART_OF"),
            Self::DependsOn => write!(f, "DEPENDS_ON"),
            Self::ContextOf => write!(f, "CONTEXT_OF"),
            Self::DecisionOn => write!(f, "DECISION_ON"),
            Self::ContainsFile => write!(f, "CONTAINS_FILE"),
            Self::IsTaggedWith => write!(f, "IS_TAGGED_WITH"),
        }
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = MemBankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PART_OF" => Ok(Self::PartOf),
            "DEPENDS_ON" => Ok(Self::DependsOn),
            "CONTEXT_OF" => Ok(Self::ContextOf),
            "DECISION_ON" => Ok(Self::DecisionOn),
            "CONTAINS_FILE" => Ok(Self::ContainsFile),
            "IS_TAGGED_WITH" => Ok(Self::IsTaggedWith),
            _ => Err(MemBankError::InvalidArgument(format!(
                "unknown relationship type: {s}"
            ))),
        }
    }
}

// ── Status Enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Active,
    Deprecated,
    Planned,
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Deprecated => write!(f, "deprecated"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

impl std::str::FromStr for ComponentStatus {
    type Err = MemBankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "deprecated" => Ok(Self::Deprecated),
            "planned" => Ok(Self::Planned),
            _ => Err(MemBankError::InvalidArgument(format!(
                "unknown component status: {s}"
            ))),
        }
    }
}

/// Decision lifecycle: `proposed → approved → implemented` (terminal success)
/// or `proposed → approved → failed` (terminal failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Proposed,
    Approved,
    Implemented,
    Failed,
}

impl DecisionStatus {
    /// Whether updating a stored decision from `self` to `next` is a legal
    /// transition. Keeping the same status is always allowed.
    pub fn can_transition_to(&self, next: DecisionStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Proposed, Self::Approved)
                | (Self::Approved, Self::Implemented)
                | (Self::Approved, Self::Failed)
        )
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Approved => write!(f, "approved"),
            Self::Implemented => write!(f, "implemented"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DecisionStatus {
    type Err = MemBankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "proposed" => Ok(Self::Proposed),
            "approved" => Ok(Self::Approved),
            "implemented" => Ok(Self::Implemented),
            "failed" => Ok(Self::Failed),
            _ => Err(MemBankError::InvalidArgument(format!(
                "unknown decision status: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Deprecated,
}

impl std::fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Deprecated => write!(f, "deprecated"),
        }
    }
}

impl std::str::FromStr for RuleStatus {
    type Err = MemBankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "deprecated" => Ok(Self::Deprecated),
            _ => Err(MemBankError::InvalidArgument(format!(
                "unknown rule status: {s}"
            ))),
        }
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

/// A logical repository on one branch. Node id is `"{name}:{branch}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn node_id(name: &str, branch: &str) -> String {
        repository_node_id(name, branch)
    }
}

/// Named JSON blob attached to a (repository, branch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    /// Arbitrary JSON content, stored as a string.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// An agent observation recorded against the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub agent: String,
    pub summary: String,
    pub observation: String,
    pub date: NaiveDate,
    pub issue: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Context {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// An architectural component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub kind: Option<String>,
    pub status: ComponentStatus,
    /// Logical ids of components this one depends on. A listed dependency
    /// materialises a DEPENDS_ON edge only when the target node exists in
    /// the same scope; dangling listings are retained for later resolution.
    pub depends_on: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Component {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// An architectural decision record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub date: NaiveDate,
    /// Rationale / context for the decision.
    pub context: Option<String>,
    pub status: DecisionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Decision {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// A governance rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub created: NaiveDate,
    pub content: String,
    pub triggers: Vec<String>,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// A tracked source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntity {
    pub id: String,
    pub repository: String,
    pub branch: String,
    pub name: String,
    pub path: String,
    pub language: Option<String>,
    /// Arbitrary metrics as JSON (line counts, complexity, ...).
    pub metrics: Option<serde_json::Value>,
    pub content_hash: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileEntity {
    pub fn graph_unique_id(&self) -> String {
        graph_unique_id(&self.repository, &self.branch, &self.id)
    }
}

/// A tag, global to a project-root database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Generic Records ─────────────────────────────────────────────────────────

/// Label-agnostic view of a stored node, as read back from the engine.
///
/// Used by traversal results, bulk deletes, and introspection where the
/// caller works across entity types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Primary key: `graph_unique_id` for scoped entities, plain id otherwise.
    pub node_id: String,
    pub label: EntityLabel,
    /// Logical id (equal to `node_id` for Repository and Tag nodes).
    pub id: String,
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub name: Option<String>,
    /// Remaining per-label attributes as JSON.
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A typed edge between two stored nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub src: String,
    pub dst: String,
    pub relationship: RelationshipType,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_label_roundtrip() {
        for label in EntityLabel::all() {
            let s = label.to_string();
            let parsed: EntityLabel = s.parse().unwrap();
            assert_eq!(label, parsed);
        }
    }

    #[test]
    fn relationship_type_roundtrip() {
        for rt in RelationshipType::all() {
            let s = rt.to_string();
            let parsed: RelationshipType = s.parse().unwrap();
            assert_eq!(rt, parsed);
        }
    }

    #[test]
    fn scoped_labels() {
        assert!(EntityLabel::Component.is_scoped());
        assert!(EntityLabel::Context.is_scoped());
        assert!(!EntityLabel::Repository.is_scoped());
        assert!(!EntityLabel::Tag.is_scoped());
    }

    #[test]
    fn same_scope_relationships() {
        assert!(RelationshipType::DependsOn.requires_same_scope());
        assert!(RelationshipType::ContainsFile.requires_same_scope());
        assert!(RelationshipType::ContextOf.requires_same_scope());
        assert!(RelationshipType::DecisionOn.requires_same_scope());
        assert!(!RelationshipType::IsTaggedWith.requires_same_scope());
        assert!(!RelationshipType::PartOf.requires_same_scope());
    }

    #[test]
    fn decision_transitions_legal() {
        use DecisionStatus::*;
        assert!(Proposed.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Implemented));
        assert!(Approved.can_transition_to(Failed));
        // Same-status updates are no-ops, not transitions.
        assert!(Proposed.can_transition_to(Proposed));
        assert!(Implemented.can_transition_to(Implemented));
    }

    #[test]
    fn decision_transitions_illegal() {
        use DecisionStatus::*;
        assert!(!Proposed.can_transition_to(Implemented));
        assert!(!Proposed.can_transition_to(Failed));
        assert!(!Implemented.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Proposed));
    }

    #[test]
    fn status_string_roundtrip() {
        for s in ["active", "deprecated", "planned"] {
            let parsed: ComponentStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        for s in ["proposed", "approved", "implemented", "failed"] {
            let parsed: DecisionStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        for s in ["active", "deprecated"] {
            let parsed: RuleStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
    }

    #[test]
    fn component_graph_unique_id() {
        let now = Utc::now();
        let comp = Component {
            id: "comp-Auth".into(),
            repository: "my-app".into(),
            branch: "main".into(),
            name: "Auth".into(),
            kind: None,
            status: ComponentStatus::Active,
            depends_on: vec![],
            created_at: now,
            updated_at: now,
        };
        assert_eq!(comp.graph_unique_id(), "my-app:main:comp-Auth");
    }
}
