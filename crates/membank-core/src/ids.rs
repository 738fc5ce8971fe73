//! Branch-scoped composite identity.
//!
//! Every scoped entity is keyed by `"{repository}:{branch}:{id}"` so that the
//! same logical id on different branches yields distinct nodes.

use crate::MemBankError;

/// Build the primary key for a scoped entity.
pub fn graph_unique_id(repository: &str, branch: &str, id: &str) -> String {
    format!("{repository}:{branch}:{id}")
}

/// Build the node id for a Repository: `"{name}:{branch}"`.
pub fn repository_node_id(name: &str, branch: &str) -> String {
    format!("{name}:{branch}")
}

/// Split a `graph_unique_id` back into (repository, branch, logical id).
///
/// Branch names may contain `/` but not `:`, so the first two colons are
/// the separators.
pub fn split_graph_unique_id(gid: &str) -> Option<(&str, &str, &str)> {
    let mut parts = gid.splitn(3, ':');
    let repository = parts.next()?;
    let branch = parts.next()?;
    let id = parts.next()?;
    if repository.is_empty() || branch.is_empty() || id.is_empty() {
        return None;
    }
    Some((repository, branch, id))
}

/// Validate the logical-id prefix for an entity label.
///
/// Upserts reject ids that do not carry the conventional prefix for their
/// type (`comp-`, `dec-`, `rule-`, `file-`, `tag-`, `ctx-`).
pub fn validate_id_prefix(label: &str, id: &str) -> Result<(), MemBankError> {
    let expected = match label {
        "Component" => "comp-",
        "Decision" => "dec-",
        "Rule" => "rule-",
        "File" => "file-",
        "Tag" => "tag-",
        "Context" => "ctx-",
        _ => return Ok(()),
    };
    if id.starts_with(expected) && id.len() > expected.len() {
        Ok(())
    } else {
        Err(MemBankError::InvalidArgument(format!(
            "id '{id}' must start with '{expected}' for {label}"
        )))
    }
}

/// Validate that repository and branch names are non-empty and colon-free.
///
/// Colons would break the composite-key encoding.
pub fn validate_scope(repository: &str, branch: &str) -> Result<(), MemBankError> {
    if repository.is_empty() || repository.contains(':') {
        return Err(MemBankError::InvalidArgument(format!(
            "invalid repository name '{repository}'"
        )));
    }
    if branch.is_empty() || branch.contains(':') {
        return Err(MemBankError::InvalidArgument(format!(
            "invalid branch name '{branch}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_unique_id_concatenation() {
        assert_eq!(
            graph_unique_id("my-app", "main", "comp-Auth"),
            "my-app:main:comp-Auth"
        );
    }

    #[test]
    fn split_roundtrip() {
        let gid = graph_unique_id("my-app", "feature/x", "comp-Auth");
        let (r, b, i) = split_graph_unique_id(&gid).unwrap();
        assert_eq!(r, "my-app");
        assert_eq!(b, "feature/x");
        assert_eq!(i, "comp-Auth");
    }

    #[test]
    fn split_rejects_malformed() {
        assert!(split_graph_unique_id("no-separators").is_none());
        assert!(split_graph_unique_id("a:b:").is_none());
        assert!(split_graph_unique_id(":b:c").is_none());
    }

    #[test]
    fn same_id_distinct_branches() {
        let main = graph_unique_id("r", "main", "comp-A");
        let dev = graph_unique_id("r", "dev", "comp-A");
        assert_ne!(main, dev);
    }

    #[test]
    fn prefix_validation() {
        assert!(validate_id_prefix("Component", "comp-Auth").is_ok());
        assert!(validate_id_prefix("Component", "dec-Auth").is_err());
        assert!(validate_id_prefix("Component", "comp-").is_err());
        assert!(validate_id_prefix("Decision", "dec-20240101-auth").is_ok());
        assert!(validate_id_prefix("Rule", "rule-no-panics").is_ok());
        assert!(validate_id_prefix("File", "file-main-rs").is_ok());
        assert!(validate_id_prefix("Tag", "tag-security").is_ok());
        assert!(validate_id_prefix("Context", "ctx-login-fix").is_ok());
        // Metadata and Repository ids are unconstrained.
        assert!(validate_id_prefix("Metadata", "meta").is_ok());
    }

    #[test]
    fn scope_validation() {
        assert!(validate_scope("my-app", "main").is_ok());
        assert!(validate_scope("my-app", "feature/x").is_ok());
        assert!(validate_scope("", "main").is_err());
        assert!(validate_scope("a:b", "main").is_err());
        assert!(validate_scope("my-app", "bad:branch").is_err());
    }
}
