//! Grantable resource addressing.
//!
//! # Purpose
//! Defines the closed set of resources a privilege can be granted on inside a
//! catalog, their canonical textual rendering, and the subtree containment
//! test that cascading revocation is built on.
//!
//! # How it fits
//! Grants are keyed by (catalog role, resource, privilege). The control plane
//! stores resources in this shape, renders them with [`Resource::path`] for
//! listings and logs, and expands cascades with [`Resource::contains`].
//!
//! # Key invariants
//! - The variant determines which fields exist; there is no partially filled
//!   resource.
//! - A resource is always relative to the catalog of the catalog role that owns
//!   the grant, so the catalog name is not part of the address.
//! - Leaves (`table`, `view`, `policy`) contain nothing, not even themselves.
//!
//! # Examples
//! ```rust
//! use lattice_authz::Resource;
//!
//! let ns = Resource::namespace(["sales"]);
//! let table = Resource::table(["sales"], "orders");
//! assert_eq!(table.path(), "sales.orders");
//! assert!(ns.contains(&table));
//! assert!(!table.contains(&ns));
//! ```
use crate::errors::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const SEGMENT_SEPARATOR: char = '\u{1f}';
const LEAF_SEPARATOR: char = '\u{1e}';

/// Addressable, grantable object inside a catalog.
///
/// Serialized with a `type` discriminator:
/// `{"type":"table","namespace":["sales"],"tableName":"orders"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resource {
    Catalog,
    Namespace {
        #[serde(default)]
        namespace: Vec<String>,
    },
    Table {
        #[serde(default)]
        namespace: Vec<String>,
        #[serde(rename = "tableName")]
        table_name: String,
    },
    View {
        #[serde(default)]
        namespace: Vec<String>,
        #[serde(rename = "viewName")]
        view_name: String,
    },
    Policy {
        #[serde(default)]
        namespace: Vec<String>,
        #[serde(rename = "policyName")]
        policy_name: String,
    },
}

/// Discriminator of a [`Resource`] without its address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Catalog,
    Namespace,
    Table,
    View,
    Policy,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Catalog => "catalog",
            ResourceKind::Namespace => "namespace",
            ResourceKind::Table => "table",
            ResourceKind::View => "view",
            ResourceKind::Policy => "policy",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Resource {
    pub fn namespace<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Resource::Namespace {
            namespace: collect_segments(segments),
        }
    }

    pub fn table<I, S>(namespace: I, table_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Resource::Table {
            namespace: collect_segments(namespace),
            table_name: table_name.into(),
        }
    }

    pub fn view<I, S>(namespace: I, view_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Resource::View {
            namespace: collect_segments(namespace),
            view_name: view_name.into(),
        }
    }

    pub fn policy<I, S>(namespace: I, policy_name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Resource::Policy {
            namespace: collect_segments(namespace),
            policy_name: policy_name.into(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Catalog => ResourceKind::Catalog,
            Resource::Namespace { .. } => ResourceKind::Namespace,
            Resource::Table { .. } => ResourceKind::Table,
            Resource::View { .. } => ResourceKind::View,
            Resource::Policy { .. } => ResourceKind::Policy,
        }
    }

    /// Namespace segments of the resource; empty for the catalog and the root namespace.
    pub fn namespace_segments(&self) -> &[String] {
        match self {
            Resource::Catalog => &[],
            Resource::Namespace { namespace }
            | Resource::Table { namespace, .. }
            | Resource::View { namespace, .. }
            | Resource::Policy { namespace, .. } => namespace,
        }
    }

    /// Leaf name for tables, views and policies.
    pub fn leaf_name(&self) -> Option<&str> {
        match self {
            Resource::Catalog | Resource::Namespace { .. } => None,
            Resource::Table { table_name, .. } => Some(table_name),
            Resource::View { view_name, .. } => Some(view_name),
            Resource::Policy { policy_name, .. } => Some(policy_name),
        }
    }

    /// Render the canonical dotted path.
    ///
    /// - `catalog` renders as `(catalog)`.
    /// - The root namespace renders as `(root)`.
    /// - Leaves render as `ns.parts.leaf`, or the bare leaf name at the root.
    pub fn path(&self) -> String {
        match self {
            Resource::Catalog => "(catalog)".to_string(),
            Resource::Namespace { namespace } if namespace.is_empty() => "(root)".to_string(),
            Resource::Namespace { namespace } => namespace.join("."),
            Resource::Table { .. } | Resource::View { .. } | Resource::Policy { .. } => {
                let leaf = self.leaf_name().unwrap_or_default();
                let namespace = self.namespace_segments();
                if namespace.is_empty() {
                    leaf.to_string()
                } else {
                    format!("{}.{}", namespace.join("."), leaf)
                }
            }
        }
    }

    /// Short label used in listings: the kind for containers, the leaf name otherwise.
    pub fn display_name(&self) -> &str {
        match self {
            Resource::Catalog => "Catalog",
            Resource::Namespace { .. } => "Namespace",
            Resource::Table { table_name, .. } => table_name,
            Resource::View { view_name, .. } => view_name,
            Resource::Policy { policy_name, .. } => policy_name,
        }
    }

    /// Whether `other` lies inside the subtree addressed by `self`.
    ///
    /// The catalog contains everything, a namespace contains itself, its
    /// sub-namespaces and every leaf whose namespace starts with its segments,
    /// and leaves contain nothing.
    pub fn contains(&self, other: &Resource) -> bool {
        match self {
            Resource::Catalog => true,
            Resource::Namespace { namespace } => match other {
                Resource::Catalog => false,
                Resource::Namespace { namespace: inner }
                | Resource::Table {
                    namespace: inner, ..
                }
                | Resource::View {
                    namespace: inner, ..
                }
                | Resource::Policy {
                    namespace: inner, ..
                } => inner.starts_with(namespace),
            },
            Resource::Table { .. } | Resource::View { .. } | Resource::Policy { .. } => false,
        }
    }

    /// Reject empty or control-character names anywhere in the address.
    pub fn validate(&self) -> AuthzResult<()> {
        for segment in self.namespace_segments() {
            check_part(segment, "namespace segment")?;
        }
        if let Some(leaf) = self.leaf_name() {
            check_part(leaf, "leaf name")?;
        }
        Ok(())
    }

    /// Unambiguous key identifying the resource inside one catalog.
    ///
    /// Separators are control characters, which [`Resource::validate`] rejects
    /// inside names, so distinct valid resources never share a key.
    pub fn storage_key(&self) -> String {
        let mut key = String::from(self.kind().as_str());
        key.push(':');
        let namespace = self.namespace_segments();
        for (idx, segment) in namespace.iter().enumerate() {
            if idx > 0 {
                key.push(SEGMENT_SEPARATOR);
            }
            key.push_str(segment);
        }
        if let Some(leaf) = self.leaf_name() {
            key.push(LEAF_SEPARATOR);
            key.push_str(leaf);
        }
        key
    }
}

fn collect_segments<I, S>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

fn check_part(value: &str, label: &str) -> AuthzResult<()> {
    if value.trim().is_empty() {
        return Err(AuthzError::InvalidResource(format!("empty {label}")));
    }
    if value.chars().any(char::is_control) {
        return Err(AuthzError::InvalidResource(format!(
            "{label} contains control characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rendering() {
        assert_eq!(Resource::Catalog.path(), "(catalog)");
        assert_eq!(
            Resource::Namespace { namespace: vec![] }.path(),
            "(root)"
        );
        assert_eq!(Resource::namespace(["a", "b"]).path(), "a.b");
        assert_eq!(Resource::table(["a", "b"], "t").path(), "a.b.t");
        assert_eq!(Resource::view(Vec::<String>::new(), "v").path(), "v");
        assert_eq!(Resource::policy(["sec"], "mask_pii").path(), "sec.mask_pii");
        assert_eq!(
            Resource::table(["a", "b"], "t").path(),
            Resource::table(["a", "b"], "t").path()
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(Resource::Catalog.display_name(), "Catalog");
        assert_eq!(Resource::namespace(["a"]).display_name(), "Namespace");
        assert_eq!(Resource::table(["a"], "orders").display_name(), "orders");
        assert_eq!(Resource::view(["a"], "daily").display_name(), "daily");
        assert_eq!(Resource::policy(["a"], "p1").display_name(), "p1");
    }

    #[test]
    fn catalog_contains_everything() {
        let targets = [
            Resource::Catalog,
            Resource::namespace(Vec::<String>::new()),
            Resource::namespace(["a", "b"]),
            Resource::table(["a"], "t"),
            Resource::view(Vec::<String>::new(), "v"),
            Resource::policy(["x", "y"], "p"),
        ];
        for target in &targets {
            assert!(Resource::Catalog.contains(target), "{target:?}");
        }
    }

    #[test]
    fn namespace_contains_prefix_subtree() {
        let scope = Resource::namespace(["a", "b"]);
        assert!(scope.contains(&Resource::namespace(["a", "b"])));
        assert!(scope.contains(&Resource::namespace(["a", "b", "c"])));
        assert!(scope.contains(&Resource::table(["a", "b"], "t")));
        assert!(scope.contains(&Resource::view(["a", "b", "c"], "v")));
        assert!(scope.contains(&Resource::policy(["a", "b"], "p")));

        assert!(!scope.contains(&Resource::Catalog));
        assert!(!scope.contains(&Resource::namespace(["a"])));
        assert!(!scope.contains(&Resource::namespace(["a", "bc"])));
        assert!(!scope.contains(&Resource::table(["a"], "b")));
    }

    #[test]
    fn root_namespace_contains_all_namespaces_and_leaves() {
        let root = Resource::namespace(Vec::<String>::new());
        assert!(root.contains(&Resource::namespace(["a"])));
        assert!(root.contains(&Resource::table(Vec::<String>::new(), "t")));
        assert!(!root.contains(&Resource::Catalog));
    }

    #[test]
    fn leaves_contain_nothing() {
        let table = Resource::table(["a"], "t");
        assert!(!table.contains(&table));
        assert!(!table.contains(&Resource::Catalog));
        assert!(!Resource::view(["a"], "v").contains(&Resource::view(["a"], "v")));
        assert!(!Resource::policy(["a"], "p").contains(&Resource::namespace(["a"])));
    }

    #[test]
    fn wire_shape_uses_type_tag_and_camel_case_leaf_names() {
        let table = Resource::table(["sales"], "orders");
        let value = serde_json::to_value(&table).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"type": "table", "namespace": ["sales"], "tableName": "orders"})
        );

        let catalog: Resource =
            serde_json::from_value(serde_json::json!({"type": "catalog"})).expect("catalog");
        assert_eq!(catalog, Resource::Catalog);

        let policy: Resource = serde_json::from_value(serde_json::json!({
            "type": "policy",
            "namespace": [],
            "policyName": "p"
        }))
        .expect("policy");
        assert_eq!(policy, Resource::policy(Vec::<String>::new(), "p"));

        let bad = serde_json::from_value::<Resource>(serde_json::json!({
            "type": "table",
            "namespace": ["a"],
            "viewName": "v"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn validation_rejects_empty_parts() {
        assert!(Resource::Catalog.validate().is_ok());
        assert!(Resource::namespace(Vec::<String>::new()).validate().is_ok());
        assert!(Resource::namespace(["a", ""]).validate().is_err());
        assert!(Resource::table(["a"], " ").validate().is_err());
        assert!(Resource::view(["a\u{1f}b"], "v").validate().is_err());
    }

    #[test]
    fn storage_keys_are_unambiguous() {
        let nested = Resource::namespace(["a", "b"]);
        let dotted = Resource::namespace(["a.b"]);
        assert_ne!(nested.storage_key(), dotted.storage_key());
        assert_ne!(
            Resource::table(["a"], "t").storage_key(),
            Resource::view(["a"], "t").storage_key()
        );
        assert_ne!(
            Resource::table(["a", "b"], "t").storage_key(),
            Resource::table(["a"], "b\u{1e}t").storage_key()
        );
        assert_eq!(Resource::Catalog.storage_key(), "catalog:");
    }
}
