//! Strongly typed privilege tokens and entity-name validation.
//!
//! # Purpose
//! Keeps privilege strings and principal/role names from reaching storage in
//! malformed shapes (empty, padded, or carrying control characters).
//!
//! # Key invariants
//! - A [`Privilege`] is a single non-empty token without whitespace; case is kept.
//! - Entity names are non-empty, at most [`MAX_NAME_LEN`] characters, and never
//!   contain `/` (they appear as URL path segments) or control characters.
use crate::errors::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MAX_NAME_LEN: usize = 256;

/// Privilege carried by a grant, e.g. `SELECT` or `TABLE_READ_DATA`.
///
/// # Example
/// ```rust
/// use lattice_authz::Privilege;
///
/// let privilege = Privilege::parse(" SELECT ").expect("valid");
/// assert_eq!(privilege.as_str(), "SELECT");
/// assert!(Privilege::parse("").is_err());
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct Privilege(String);

impl Privilege {
    pub const SELECT: &'static str = "SELECT";
    pub const CATALOG_MANAGE_ACCESS: &'static str = "CATALOG_MANAGE_ACCESS";
    pub const CATALOG_MANAGE_CONTENT: &'static str = "CATALOG_MANAGE_CONTENT";
    pub const NAMESPACE_CREATE: &'static str = "NAMESPACE_CREATE";
    pub const TABLE_READ_DATA: &'static str = "TABLE_READ_DATA";
    pub const TABLE_WRITE_DATA: &'static str = "TABLE_WRITE_DATA";
    pub const VIEW_READ_PROPERTIES: &'static str = "VIEW_READ_PROPERTIES";
    pub const POLICY_APPLY: &'static str = "POLICY_APPLY";

    /// Parse and normalize a privilege token.
    ///
    /// # Errors
    /// - [`AuthzError::InvalidPrivilege`] when the trimmed value is empty or
    ///   contains whitespace/control characters.
    pub fn parse(raw: &str) -> AuthzResult<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(AuthzError::InvalidPrivilege("empty privilege".to_string()));
        }
        if value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(AuthzError::InvalidPrivilege(format!(
                "privilege must be a single token: {value:?}"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Re-check a privilege that arrived through deserialization, which skips [`Privilege::parse`].
    pub fn validate(&self) -> AuthzResult<()> {
        let parsed = Self::parse(&self.0)?;
        if parsed.0 != self.0 {
            return Err(AuthzError::InvalidPrivilege(format!(
                "privilege must not be padded: {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Privilege {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Validate a principal, principal role, catalog, or catalog role name.
///
/// `kind` is only used to label the error.
pub fn validate_name(kind: &'static str, name: &str) -> AuthzResult<()> {
    let invalid = |reason: &str| AuthzError::InvalidName {
        kind,
        reason: reason.to_string(),
    };
    if name.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.trim() != name {
        return Err(invalid("must not start or end with whitespace"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("too long"));
    }
    if name.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("must not contain control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_parse_trims_and_keeps_case() {
        let privilege = Privilege::parse("  table_read_data ").expect("privilege");
        assert_eq!(privilege.as_str(), "table_read_data");
        assert_eq!(privilege.to_string(), "table_read_data");
        assert_eq!(
            "SELECT".parse::<Privilege>().expect("select").as_str(),
            Privilege::SELECT
        );
    }

    #[test]
    fn privilege_parse_rejects_malformed() {
        assert!(Privilege::parse("").is_err());
        assert!(Privilege::parse("   ").is_err());
        assert!(Privilege::parse("READ DATA").is_err());
        assert!(Privilege::parse("READ\tDATA").is_err());
    }

    #[test]
    fn privilege_serializes_as_plain_string() {
        let privilege = Privilege::parse("SELECT").expect("privilege");
        assert_eq!(
            serde_json::to_value(&privilege).expect("json"),
            serde_json::json!("SELECT")
        );
    }

    #[test]
    fn deserialized_privilege_is_revalidated() {
        let empty: Privilege = serde_json::from_value(serde_json::json!("")).expect("json");
        assert!(empty.validate().is_err());
        let padded: Privilege = serde_json::from_value(serde_json::json!(" SELECT")).expect("json");
        assert!(padded.validate().is_err());
        let ok: Privilege = serde_json::from_value(serde_json::json!("SELECT")).expect("json");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn name_validation() {
        assert!(validate_name("principal", "alice").is_ok());
        assert!(validate_name("catalog role", "data engineers").is_ok());
        assert!(validate_name("principal", "").is_err());
        assert!(validate_name("principal", " alice").is_err());
        assert!(validate_name("principal", "a/b").is_err());
        assert!(validate_name("principal", "a\nb").is_err());
        assert!(validate_name("principal", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
