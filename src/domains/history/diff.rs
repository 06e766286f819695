use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields never written to a change set
pub const EXCLUDED_FIELDS: &[&str] = &["password", "password_hash", "created_at", "updated_at"];

/// Old and new value of one changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

pub type ChangeSet = BTreeMap<String, FieldChange>;

/// An entity whose mutations are recorded in history.
///
/// The snapshot lists every persisted field in schema order under the name
/// clients see; `diff` walks two snapshots of the same type pairwise.
pub trait Auditable {
    fn audit_snapshot(&self) -> Vec<(&'static str, Value)>;
}

/// Field-by-field comparison of two versions of an entity.
/// Returns `None` when nothing outside `EXCLUDED_FIELDS` changed.
pub fn diff<T: Auditable>(before: &T, after: &T) -> Option<ChangeSet> {
    let changes: ChangeSet = before
        .audit_snapshot()
        .into_iter()
        .zip(after.audit_snapshot())
        .filter(|((field, _), _)| !EXCLUDED_FIELDS.contains(field))
        .filter(|((_, old), (_, new))| old != new)
        .map(|((field, old), (_, new))| (field.to_string(), FieldChange { old, new }))
        .collect();

    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Account {
        name: String,
        password_hash: String,
        limit: i64,
        updated_at: String,
    }

    impl Auditable for Account {
        fn audit_snapshot(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("name", json!(self.name)),
                ("password_hash", json!(self.password_hash)),
                ("limit", json!(self.limit)),
                ("updated_at", json!(self.updated_at)),
            ]
        }
    }

    fn account(name: &str, hash: &str, limit: i64, updated_at: &str) -> Account {
        Account {
            name: name.to_string(),
            password_hash: hash.to_string(),
            limit,
            updated_at: updated_at.to_string(),
        }
    }

    #[test]
    fn test_only_changed_fields_reported() {
        let before = account("Anna", "h1", 10, "t1");
        let after = account("Anna", "h2", 20, "t2");

        let changes = diff(&before, &after).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes["limit"],
            FieldChange { old: json!(10), new: json!(20) }
        );
    }

    #[test]
    fn test_housekeeping_only_changes_yield_none() {
        let before = account("Anna", "h1", 10, "t1");
        let after = account("Anna", "h2", 10, "t2");
        assert!(diff(&before, &after).is_none());
    }
}
