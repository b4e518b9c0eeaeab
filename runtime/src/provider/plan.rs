//! Diff declared resources against recorded state.

use std::collections::BTreeMap;
use std::fmt;

use dockerless_core::config::RemoteImageDeclaration;
use serde::Serialize;

use super::remote_image::RemoteImageModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    NoOp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::NoOp => "no-op",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub name: String,
    pub action: Action,
    /// Recorded state, if any
    pub before: Option<RemoteImageModel>,
    /// Planned values; `None` for deletes
    pub after: Option<RemoteImageModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Changes ordered by resource name
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != Action::NoOp)
    }

    pub fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Plan: {} to add, {} to change, {} to destroy.",
            self.count(Action::Create),
            self.count(Action::Update),
            self.count(Action::Delete)
        )
    }
}

/// Compute the changes needed to move `state` to `declared`.
///
/// A resource in state without source and target (fresh import) is updated
/// so that its attributes get recorded. Unchanged resources keep their
/// digest in the planned values.
pub fn plan(
    declared: &BTreeMap<String, RemoteImageDeclaration>,
    state: &BTreeMap<String, RemoteImageModel>,
) -> Plan {
    let mut changes: BTreeMap<&str, PlannedChange> = BTreeMap::new();

    for (name, declaration) in declared {
        let change = match state.get(name) {
            None => PlannedChange {
                name: name.clone(),
                action: Action::Create,
                before: None,
                after: Some(RemoteImageModel::from_declaration(declaration)),
            },
            Some(current) if current.matches(declaration) => PlannedChange {
                name: name.clone(),
                action: Action::NoOp,
                before: Some(current.clone()),
                after: Some(current.clone()),
            },
            Some(current) => PlannedChange {
                name: name.clone(),
                action: Action::Update,
                before: Some(current.clone()),
                after: Some(RemoteImageModel::from_declaration(declaration)),
            },
        };
        changes.insert(name.as_str(), change);
    }

    for (name, current) in state {
        if !declared.contains_key(name) {
            changes.insert(
                name.as_str(),
                PlannedChange {
                    name: name.clone(),
                    action: Action::Delete,
                    before: Some(current.clone()),
                    after: None,
                },
            );
        }
    }

    Plan {
        changes: changes.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(source: &str, target: &str) -> RemoteImageDeclaration {
        RemoteImageDeclaration {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn model(source: &str, target: &str, digest: &str) -> RemoteImageModel {
        RemoteImageModel {
            source: Some(source.to_string()),
            target: Some(target.to_string()),
            digest: Some(digest.to_string()),
        }
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan(&BTreeMap::new(), &BTreeMap::new());
        assert!(!plan.has_changes());
        assert_eq!(plan.summary(), "Plan: 0 to add, 0 to change, 0 to destroy.");
    }

    #[test]
    fn test_actions_sorted_by_name() {
        let mut declared = BTreeMap::new();
        declared.insert("web".to_string(), decl("nginx:1.25", "ghcr.io/o/web:1.25"));
        declared.insert("api".to_string(), decl("app:v2", "ghcr.io/o/api:v2"));
        declared.insert("db".to_string(), decl("postgres:16", "ghcr.io/o/db:16"));

        let mut state = BTreeMap::new();
        state.insert("api".to_string(), model("app:v1", "ghcr.io/o/api:v1", "sha256:a"));
        state.insert("db".to_string(), model("postgres:16", "ghcr.io/o/db:16", "sha256:d"));
        state.insert("old".to_string(), model("x:1", "ghcr.io/o/x:1", "sha256:x"));

        let plan = plan(&declared, &state);
        let names: Vec<_> = plan.changes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["api", "db", "old", "web"]);

        let actions: Vec<_> = plan.changes.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![Action::Update, Action::NoOp, Action::Delete, Action::Create]
        );
        assert!(plan.has_changes());
        assert_eq!(plan.summary(), "Plan: 1 to add, 1 to change, 1 to destroy.");
    }

    #[test]
    fn test_noop_keeps_digest() {
        let mut declared = BTreeMap::new();
        declared.insert("db".to_string(), decl("postgres:16", "ghcr.io/o/db:16"));
        let mut state = BTreeMap::new();
        state.insert("db".to_string(), model("postgres:16", "ghcr.io/o/db:16", "sha256:d"));

        let plan = plan(&declared, &state);
        assert!(!plan.has_changes());
        let after = plan.changes[0].after.as_ref().unwrap();
        assert_eq!(after.digest.as_deref(), Some("sha256:d"));
    }

    #[test]
    fn test_imported_resource_is_updated() {
        let mut declared = BTreeMap::new();
        declared.insert("db".to_string(), decl("postgres:16", "ghcr.io/o/db:16"));
        let mut state = BTreeMap::new();
        state.insert(
            "db".to_string(),
            RemoteImageModel {
                digest: Some("sha256:d".to_string()),
                ..Default::default()
            },
        );

        let plan = plan(&declared, &state);
        assert_eq!(plan.changes[0].action, Action::Update);
        assert!(plan.changes[0].after.as_ref().unwrap().digest.is_none());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(Action::NoOp.to_string(), "no-op");
        assert_eq!(Action::Create.to_string(), "create");
    }
}
