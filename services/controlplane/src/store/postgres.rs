//! Postgres-backed implementation of the access-control store.
//!
//! # What this module is
//! Implements [`RoleStore`], [`GrantStore`] and [`AccessStore`] on Postgres
//! (via `sqlx`) as the durable, shared home of principals, roles, role-graph
//! edges and grants.
//!
//! # Key invariants
//! - Every mutation runs in one transaction. A failed version check or a
//!   missing row returns early, dropping the transaction, which rolls it back.
//! - Versioned rows are locked with `SELECT ... FOR UPDATE` before their
//!   version is compared, so two writers holding the same expected version
//!   are serialized and the second one sees the bumped version.
//! - Grant and revoke lock the owning catalog role row. The grant set of one
//!   catalog role therefore cannot change while a cascading revoke computes
//!   and deletes its removal set.
//! - Grant uniqueness is the primary key
//!   `(catalog_name, catalog_role_name, resource_key, privilege)`.
//! - Foreign keys with `ON DELETE CASCADE` remove edges and grants of deleted
//!   entities in the same statement as the delete.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Connection pooling/timeouts are explicit so a stuck database surfaces as
//!   a failed request or health check instead of a hang.
//!
//! # Security notes
//! - Database URLs may contain credentials; avoid logging them.
//! - All SQL is static; user input only travels through bind parameters.
use super::{
    AccessStore, GrantStore, RoleStore, StoreError, StoreResult, check_version, record_grant_delta,
};
use crate::config::PostgresConfig;
use crate::model::{
    CatalogRole, CatalogRoleKey, EntityUpdate, Grant, GrantEntry, Principal, PrincipalRole,
    Properties, sort_grants,
};
use anyhow::anyhow;
use async_trait::async_trait;
use lattice_authz::{INITIAL_ENTITY_VERSION, Privilege, Resource, validate_name};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Durable access-control store backed by Postgres.
///
/// # Errors
/// - Connection and query failures surface as [`StoreError::Unexpected`].
///
/// # Example
/// ```rust,no_run
/// use lattice_controlplane::config::PostgresConfig;
/// use lattice_controlplane::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape shared by `principals` and `principal_roles`.
#[derive(Debug, Clone, FromRow)]
struct DbEntity {
    name: String,
    properties: Json<Properties>,
    entity_version: i64,
}

impl DbEntity {
    fn into_principal(self) -> Principal {
        Principal {
            name: self.name,
            properties: self.properties.0,
            entity_version: self.entity_version as u64,
        }
    }

    fn into_principal_role(self) -> PrincipalRole {
        PrincipalRole {
            name: self.name,
            properties: self.properties.0,
            entity_version: self.entity_version as u64,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbCatalogRole {
    catalog_name: String,
    name: String,
    properties: Json<Properties>,
    entity_version: i64,
}

impl From<DbCatalogRole> for CatalogRole {
    fn from(row: DbCatalogRole) -> Self {
        CatalogRole {
            catalog_name: row.catalog_name,
            name: row.name,
            properties: row.properties.0,
            entity_version: row.entity_version as u64,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbGrant {
    catalog_name: String,
    catalog_role_name: String,
    resource_key: String,
    resource: Json<Resource>,
    privilege: String,
}

impl PostgresStore {
    /// Connect to Postgres and apply migrations.
    ///
    /// # Errors
    /// - Connection, timeout, or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        // Avoid logging `pg.url`; it may contain credentials.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let connect = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options);
        let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
            .await
            .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))??;

        sqlx::migrate!("./migrations").run(&pool).await?;
        let store = Self { pool };
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM grants")
            .fetch_one(&store.pool)
            .await?;
        // Later mutations move the gauge by their own deltas.
        metrics::gauge!("lattice_grants_total").set(total as f64);
        Ok(store)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn grant_from_db(row: DbGrant) -> StoreResult<Grant> {
    let privilege = Privilege::parse(&row.privilege)?;
    let grant = Grant {
        catalog_name: row.catalog_name,
        catalog_role_name: row.catalog_role_name,
        resource: row.resource.0,
        privilege,
    };
    if grant.resource.storage_key() != row.resource_key {
        return Err(StoreError::Unexpected(anyhow!(
            "grant resource key mismatch for {}",
            grant.resource.path()
        )));
    }
    Ok(grant)
}

fn principal_not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("principal {name}"))
}

fn principal_role_not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("principal role {name}"))
}

fn catalog_role_not_found(key: &CatalogRoleKey) -> StoreError {
    StoreError::NotFound(format!(
        "catalog role {} in catalog {}",
        key.catalog_role_name, key.catalog_name
    ))
}

async fn lock_principal(conn: &mut PgConnection, name: &str) -> StoreResult<DbEntity> {
    sqlx::query_as::<_, DbEntity>(
        "SELECT name, properties, entity_version FROM principals WHERE name = $1 FOR UPDATE",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| principal_not_found(name))
}

async fn lock_principal_role(conn: &mut PgConnection, name: &str) -> StoreResult<DbEntity> {
    sqlx::query_as::<_, DbEntity>(
        "SELECT name, properties, entity_version FROM principal_roles WHERE name = $1 FOR UPDATE",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| principal_role_not_found(name))
}

async fn lock_catalog_role(
    conn: &mut PgConnection,
    key: &CatalogRoleKey,
) -> StoreResult<DbCatalogRole> {
    sqlx::query_as::<_, DbCatalogRole>(
        r#"SELECT catalog_name, name, properties, entity_version FROM catalog_roles
           WHERE catalog_name = $1 AND name = $2 FOR UPDATE"#,
    )
    .bind(&key.catalog_name)
    .bind(&key.catalog_role_name)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| catalog_role_not_found(key))
}

// `FOR KEY SHARE` keeps the row from being deleted until the edge insert commits.
async fn share_principal_role(conn: &mut PgConnection, name: &str) -> StoreResult<bool> {
    let row: Option<i32> =
        sqlx::query_scalar("SELECT 1 FROM principal_roles WHERE name = $1 FOR KEY SHARE")
            .bind(name)
            .fetch_optional(conn)
            .await?;
    Ok(row.is_some())
}

async fn share_catalog_role(conn: &mut PgConnection, key: &CatalogRoleKey) -> StoreResult<bool> {
    let row: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM catalog_roles WHERE catalog_name = $1 AND name = $2 FOR KEY SHARE",
    )
    .bind(&key.catalog_name)
    .bind(&key.catalog_role_name)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

async fn set_version(
    conn: &mut PgConnection,
    table: VersionedTable,
    name: &str,
    catalog_name: Option<&str>,
    version: u64,
) -> StoreResult<()> {
    let query = match table {
        VersionedTable::Principals => sqlx::query(
            "UPDATE principals SET entity_version = $1, updated_at = now() WHERE name = $2",
        ),
        VersionedTable::PrincipalRoles => sqlx::query(
            "UPDATE principal_roles SET entity_version = $1, updated_at = now() WHERE name = $2",
        ),
        VersionedTable::CatalogRoles => sqlx::query(
            r#"UPDATE catalog_roles SET entity_version = $1, updated_at = now()
               WHERE name = $2 AND catalog_name = $3"#,
        ),
    };
    let query = query.bind(version as i64).bind(name);
    let query = match catalog_name {
        Some(catalog_name) => query.bind(catalog_name),
        None => query,
    };
    query.execute(conn).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum VersionedTable {
    Principals,
    PrincipalRoles,
    CatalogRoles,
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn create_principal(&self, principal: Principal) -> StoreResult<Principal> {
        validate_name("principal", &principal.name)?;
        let principal = Principal {
            entity_version: INITIAL_ENTITY_VERSION,
            ..principal
        };
        let insert = sqlx::query(
            "INSERT INTO principals (name, properties, entity_version) VALUES ($1, $2, $3)",
        )
        .bind(&principal.name)
        .bind(Json(&principal.properties))
        .bind(principal.entity_version as i64)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists(format!(
                    "principal {}",
                    principal.name
                )));
            }
            return Err(err.into());
        }
        tracing::info!(principal = %principal.name, "principal created");
        Ok(principal)
    }

    async fn get_principal(&self, name: &str) -> StoreResult<Principal> {
        let row = sqlx::query_as::<_, DbEntity>(
            "SELECT name, properties, entity_version FROM principals WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbEntity::into_principal)
            .ok_or_else(|| principal_not_found(name))
    }

    async fn list_principals(&self) -> StoreResult<Vec<Principal>> {
        let rows = sqlx::query_as::<_, DbEntity>(
            "SELECT name, properties, entity_version FROM principals ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbEntity::into_principal).collect())
    }

    async fn update_principal(&self, name: &str, update: EntityUpdate) -> StoreResult<Principal> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal(&mut tx, name).await?;
        let version = check_version(
            "principal",
            name,
            current.entity_version as u64,
            update.expected_version,
            true,
        )?;
        sqlx::query(
            r#"UPDATE principals SET properties = $1, entity_version = $2, updated_at = now()
               WHERE name = $3"#,
        )
        .bind(Json(&update.properties))
        .bind(version as i64)
        .bind(name)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Principal {
            name: current.name,
            properties: update.properties,
            entity_version: version,
        })
    }

    async fn delete_principal(&self, name: &str, expected: Option<u64>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal(&mut tx, name).await?;
        check_version(
            "principal",
            name,
            current.entity_version as u64,
            expected,
            true,
        )?;
        sqlx::query("DELETE FROM principals WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(principal = %name, "principal deleted");
        Ok(())
    }

    async fn create_principal_role(&self, role: PrincipalRole) -> StoreResult<PrincipalRole> {
        validate_name("principal role", &role.name)?;
        let role = PrincipalRole {
            entity_version: INITIAL_ENTITY_VERSION,
            ..role
        };
        let insert = sqlx::query(
            "INSERT INTO principal_roles (name, properties, entity_version) VALUES ($1, $2, $3)",
        )
        .bind(&role.name)
        .bind(Json(&role.properties))
        .bind(role.entity_version as i64)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists(format!(
                    "principal role {}",
                    role.name
                )));
            }
            return Err(err.into());
        }
        tracing::info!(principal_role = %role.name, "principal role created");
        Ok(role)
    }

    async fn get_principal_role(&self, name: &str) -> StoreResult<PrincipalRole> {
        let row = sqlx::query_as::<_, DbEntity>(
            "SELECT name, properties, entity_version FROM principal_roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DbEntity::into_principal_role)
            .ok_or_else(|| principal_role_not_found(name))
    }

    async fn list_principal_roles(&self) -> StoreResult<Vec<PrincipalRole>> {
        let rows = sqlx::query_as::<_, DbEntity>(
            "SELECT name, properties, entity_version FROM principal_roles ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbEntity::into_principal_role).collect())
    }

    async fn update_principal_role(
        &self,
        name: &str,
        update: EntityUpdate,
    ) -> StoreResult<PrincipalRole> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal_role(&mut tx, name).await?;
        let version = check_version(
            "principal_role",
            name,
            current.entity_version as u64,
            update.expected_version,
            true,
        )?;
        sqlx::query(
            r#"UPDATE principal_roles SET properties = $1, entity_version = $2, updated_at = now()
               WHERE name = $3"#,
        )
        .bind(Json(&update.properties))
        .bind(version as i64)
        .bind(name)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(PrincipalRole {
            name: current.name,
            properties: update.properties,
            entity_version: version,
        })
    }

    async fn delete_principal_role(&self, name: &str, expected: Option<u64>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal_role(&mut tx, name).await?;
        check_version(
            "principal_role",
            name,
            current.entity_version as u64,
            expected,
            true,
        )?;
        sqlx::query("DELETE FROM principal_roles WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(principal_role = %name, "principal role deleted");
        Ok(())
    }

    async fn create_catalog_role(&self, role: CatalogRole) -> StoreResult<CatalogRole> {
        validate_name("catalog", &role.catalog_name)?;
        validate_name("catalog role", &role.name)?;
        let role = CatalogRole {
            entity_version: INITIAL_ENTITY_VERSION,
            ..role
        };
        let insert = sqlx::query(
            r#"INSERT INTO catalog_roles (catalog_name, name, properties, entity_version)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(&role.catalog_name)
        .bind(&role.name)
        .bind(Json(&role.properties))
        .bind(role.entity_version as i64)
        .execute(&self.pool)
        .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::AlreadyExists(format!(
                    "catalog role {} in catalog {}",
                    role.name, role.catalog_name
                )));
            }
            return Err(err.into());
        }
        tracing::info!(catalog_role = %role.key(), "catalog role created");
        Ok(role)
    }

    async fn get_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<CatalogRole> {
        let row = sqlx::query_as::<_, DbCatalogRole>(
            r#"SELECT catalog_name, name, properties, entity_version FROM catalog_roles
               WHERE catalog_name = $1 AND name = $2"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CatalogRole::from)
            .ok_or_else(|| catalog_role_not_found(key))
    }

    async fn list_catalog_roles(&self, catalog_name: &str) -> StoreResult<Vec<CatalogRole>> {
        let rows = sqlx::query_as::<_, DbCatalogRole>(
            r#"SELECT catalog_name, name, properties, entity_version FROM catalog_roles
               WHERE catalog_name = $1 ORDER BY name"#,
        )
        .bind(catalog_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogRole::from).collect())
    }

    async fn update_catalog_role(
        &self,
        key: &CatalogRoleKey,
        update: EntityUpdate,
    ) -> StoreResult<CatalogRole> {
        let mut tx = self.pool.begin().await?;
        let current = lock_catalog_role(&mut tx, key).await?;
        let version = check_version(
            "catalog_role",
            &key.to_string(),
            current.entity_version as u64,
            update.expected_version,
            true,
        )?;
        sqlx::query(
            r#"UPDATE catalog_roles SET properties = $1, entity_version = $2, updated_at = now()
               WHERE catalog_name = $3 AND name = $4"#,
        )
        .bind(Json(&update.properties))
        .bind(version as i64)
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(CatalogRole {
            catalog_name: current.catalog_name,
            name: current.name,
            properties: update.properties,
            entity_version: version,
        })
    }

    async fn delete_catalog_role(
        &self,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let current = lock_catalog_role(&mut tx, key).await?;
        check_version(
            "catalog_role",
            &key.to_string(),
            current.entity_version as u64,
            expected,
            true,
        )?;
        let dropped = sqlx::query(
            "DELETE FROM grants WHERE catalog_name = $1 AND catalog_role_name = $2",
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .execute(&mut *tx)
        .await?
        .rows_affected() as usize;
        // Bindings go with the role through their foreign key.
        sqlx::query("DELETE FROM catalog_roles WHERE catalog_name = $1 AND name = $2")
            .bind(&key.catalog_name)
            .bind(&key.catalog_role_name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        record_grant_delta(0, dropped);
        tracing::info!(catalog_role = %key, dropped_grants = dropped, "catalog role deleted");
        Ok(())
    }

    async fn assign_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal(&mut tx, principal).await?;
        if !share_principal_role(&mut tx, principal_role).await? {
            return Err(principal_role_not_found(principal_role));
        }
        let inserted = sqlx::query(
            r#"INSERT INTO principal_role_assignments (principal_name, principal_role_name)
               VALUES ($1, $2) ON CONFLICT DO NOTHING"#,
        )
        .bind(principal)
        .bind(principal_role)
        .execute(&mut *tx)
        .await?;
        let changed = inserted.rows_affected() > 0;
        let version = check_version(
            "principal",
            principal,
            current.entity_version as u64,
            expected,
            changed,
        )?;
        if changed {
            set_version(&mut tx, VersionedTable::Principals, principal, None, version).await?;
        }
        tx.commit().await?;
        if changed {
            tracing::info!(principal, principal_role, "principal role assigned");
        }
        Ok(Principal {
            entity_version: version,
            ..current.into_principal()
        })
    }

    async fn revoke_principal_role(
        &self,
        principal: &str,
        principal_role: &str,
        expected: Option<u64>,
    ) -> StoreResult<Principal> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal(&mut tx, principal).await?;
        if !share_principal_role(&mut tx, principal_role).await? {
            return Err(principal_role_not_found(principal_role));
        }
        let removed = sqlx::query(
            r#"DELETE FROM principal_role_assignments
               WHERE principal_name = $1 AND principal_role_name = $2"#,
        )
        .bind(principal)
        .bind(principal_role)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "principal role {principal_role} is not assigned to principal {principal}"
            )));
        }
        let version = check_version(
            "principal",
            principal,
            current.entity_version as u64,
            expected,
            true,
        )?;
        set_version(&mut tx, VersionedTable::Principals, principal, None, version).await?;
        tx.commit().await?;
        tracing::info!(principal, principal_role, "principal role revoked");
        Ok(Principal {
            entity_version: version,
            ..current.into_principal()
        })
    }

    async fn bind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal_role(&mut tx, principal_role).await?;
        if !share_catalog_role(&mut tx, key).await? {
            return Err(catalog_role_not_found(key));
        }
        let inserted = sqlx::query(
            r#"INSERT INTO catalog_role_bindings (principal_role_name, catalog_name, catalog_role_name)
               VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"#,
        )
        .bind(principal_role)
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .execute(&mut *tx)
        .await?;
        let changed = inserted.rows_affected() > 0;
        let version = check_version(
            "principal_role",
            principal_role,
            current.entity_version as u64,
            expected,
            changed,
        )?;
        if changed {
            set_version(
                &mut tx,
                VersionedTable::PrincipalRoles,
                principal_role,
                None,
                version,
            )
            .await?;
        }
        tx.commit().await?;
        if changed {
            tracing::info!(principal_role, catalog_role = %key, "catalog role bound");
        }
        Ok(PrincipalRole {
            entity_version: version,
            ..current.into_principal_role()
        })
    }

    async fn unbind_catalog_role(
        &self,
        principal_role: &str,
        key: &CatalogRoleKey,
        expected: Option<u64>,
    ) -> StoreResult<PrincipalRole> {
        let mut tx = self.pool.begin().await?;
        let current = lock_principal_role(&mut tx, principal_role).await?;
        if !share_catalog_role(&mut tx, key).await? {
            return Err(catalog_role_not_found(key));
        }
        let removed = sqlx::query(
            r#"DELETE FROM catalog_role_bindings
               WHERE principal_role_name = $1 AND catalog_name = $2 AND catalog_role_name = $3"#,
        )
        .bind(principal_role)
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .execute(&mut *tx)
        .await?;
        if removed.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "catalog role {key} is not bound to principal role {principal_role}"
            )));
        }
        let version = check_version(
            "principal_role",
            principal_role,
            current.entity_version as u64,
            expected,
            true,
        )?;
        set_version(
            &mut tx,
            VersionedTable::PrincipalRoles,
            principal_role,
            None,
            version,
        )
        .await?;
        tx.commit().await?;
        tracing::info!(principal_role, catalog_role = %key, "catalog role unbound");
        Ok(PrincipalRole {
            entity_version: version,
            ..current.into_principal_role()
        })
    }

    async fn principal_roles_for_principal(
        &self,
        principal: &str,
    ) -> StoreResult<Vec<PrincipalRole>> {
        self.get_principal(principal).await?;
        let rows = sqlx::query_as::<_, DbEntity>(
            r#"SELECT r.name, r.properties, r.entity_version
               FROM principal_role_assignments a
               JOIN principal_roles r ON r.name = a.principal_role_name
               WHERE a.principal_name = $1
               ORDER BY r.name"#,
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbEntity::into_principal_role).collect())
    }

    async fn principals_for_principal_role(
        &self,
        principal_role: &str,
    ) -> StoreResult<Vec<Principal>> {
        self.get_principal_role(principal_role).await?;
        let rows = sqlx::query_as::<_, DbEntity>(
            r#"SELECT p.name, p.properties, p.entity_version
               FROM principal_role_assignments a
               JOIN principals p ON p.name = a.principal_name
               WHERE a.principal_role_name = $1
               ORDER BY p.name"#,
        )
        .bind(principal_role)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbEntity::into_principal).collect())
    }

    async fn catalog_roles_for_principal_role(
        &self,
        principal_role: &str,
        catalog_name: Option<&str>,
    ) -> StoreResult<Vec<CatalogRole>> {
        self.get_principal_role(principal_role).await?;
        let rows = sqlx::query_as::<_, DbCatalogRole>(
            r#"SELECT c.catalog_name, c.name, c.properties, c.entity_version
               FROM catalog_role_bindings b
               JOIN catalog_roles c
                 ON c.catalog_name = b.catalog_name AND c.name = b.catalog_role_name
               WHERE b.principal_role_name = $1
                 AND ($2::text IS NULL OR b.catalog_name = $2)
               ORDER BY c.catalog_name, c.name"#,
        )
        .bind(principal_role)
        .bind(catalog_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogRole::from).collect())
    }

    async fn principal_roles_for_catalog_role(
        &self,
        key: &CatalogRoleKey,
    ) -> StoreResult<Vec<PrincipalRole>> {
        self.get_catalog_role(key).await?;
        let rows = sqlx::query_as::<_, DbEntity>(
            r#"SELECT r.name, r.properties, r.entity_version
               FROM catalog_role_bindings b
               JOIN principal_roles r ON r.name = b.principal_role_name
               WHERE b.catalog_name = $1 AND b.catalog_role_name = $2
               ORDER BY r.name"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DbEntity::into_principal_role).collect())
    }

    async fn effective_catalog_roles(&self, principal: &str) -> StoreResult<Vec<CatalogRole>> {
        self.get_principal(principal).await?;
        let rows = sqlx::query_as::<_, DbCatalogRole>(
            r#"SELECT DISTINCT c.catalog_name, c.name, c.properties, c.entity_version
               FROM principal_role_assignments a
               JOIN catalog_role_bindings b ON b.principal_role_name = a.principal_role_name
               JOIN catalog_roles c
                 ON c.catalog_name = b.catalog_name AND c.name = b.catalog_role_name
               WHERE a.principal_name = $1
               ORDER BY c.catalog_name, c.name"#,
        )
        .bind(principal)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CatalogRole::from).collect())
    }
}

#[async_trait]
impl GrantStore for PostgresStore {
    async fn grant(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        expected: Option<u64>,
    ) -> StoreResult<Grant> {
        entry.validate()?;
        let mut tx = self.pool.begin().await?;
        let role = lock_catalog_role(&mut tx, key).await?;
        let inserted = sqlx::query(
            r#"INSERT INTO grants (catalog_name, catalog_role_name, resource_key, resource, privilege)
               VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .bind(entry.resource.storage_key())
        .bind(Json(&entry.resource))
        .bind(entry.privilege.as_str())
        .execute(&mut *tx)
        .await?;
        let changed = inserted.rows_affected() > 0;
        let version = check_version(
            "catalog_role",
            &key.to_string(),
            role.entity_version as u64,
            expected,
            changed,
        )?;
        if changed {
            set_version(
                &mut tx,
                VersionedTable::CatalogRoles,
                &key.catalog_role_name,
                Some(&key.catalog_name),
                version,
            )
            .await?;
        }
        tx.commit().await?;
        let grant = Grant::new(key, entry);
        if changed {
            metrics::counter!("lattice_grant_changes_total", "op" => "grant").increment(1);
            record_grant_delta(1, 0);
            tracing::info!(
                catalog_role = %key,
                resource = %grant.resource.path(),
                privilege = %grant.privilege,
                "privilege granted"
            );
        }
        Ok(grant)
    }

    async fn revoke(
        &self,
        key: &CatalogRoleKey,
        entry: GrantEntry,
        cascade: bool,
        expected: Option<u64>,
    ) -> StoreResult<Vec<Grant>> {
        entry.validate()?;
        let mut tx = self.pool.begin().await?;
        // The role row lock freezes this role's grant set until commit.
        let role = lock_catalog_role(&mut tx, key).await?;
        let rows = sqlx::query_as::<_, DbGrant>(
            r#"SELECT catalog_name, catalog_role_name, resource_key, resource, privilege
               FROM grants WHERE catalog_name = $1 AND catalog_role_name = $2"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .fetch_all(&mut *tx)
        .await?;
        let grants = rows
            .into_iter()
            .map(grant_from_db)
            .collect::<StoreResult<Vec<_>>>()?;

        let target = Grant::new(key, entry);
        let Some(position) = grants.iter().position(|grant| *grant == target) else {
            return Err(StoreError::NotFound(format!(
                "grant {} on {} {} for catalog role {key}",
                target.privilege,
                target.resource.kind(),
                target.resource.path()
            )));
        };
        let version = check_version(
            "catalog_role",
            &key.to_string(),
            role.entity_version as u64,
            expected,
            true,
        )?;

        let mut removed = vec![grants[position].clone()];
        if cascade {
            let mut contained: Vec<Grant> = grants
                .iter()
                .enumerate()
                .filter(|(idx, grant)| {
                    *idx != position && target.resource.contains(&grant.resource)
                })
                .map(|(_, grant)| grant.clone())
                .collect();
            sort_grants(&mut contained);
            removed.extend(contained);
        }

        let resource_keys: Vec<String> = removed
            .iter()
            .map(|grant| grant.resource.storage_key())
            .collect();
        let privileges: Vec<String> = removed
            .iter()
            .map(|grant| grant.privilege.as_str().to_string())
            .collect();
        let deleted = sqlx::query(
            r#"DELETE FROM grants
               WHERE catalog_name = $1 AND catalog_role_name = $2
                 AND (resource_key, privilege) IN (
                     SELECT * FROM UNNEST($3::text[], $4::text[])
                 )"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .bind(resource_keys)
        .bind(privileges)
        .execute(&mut *tx)
        .await?;
        if deleted.rows_affected() != removed.len() as u64 {
            // Dropping `tx` rolls the partial delete back.
            return Err(StoreError::Unexpected(anyhow!(
                "revoke removed {} of {} grants for {key}",
                deleted.rows_affected(),
                removed.len()
            )));
        }
        set_version(
            &mut tx,
            VersionedTable::CatalogRoles,
            &key.catalog_role_name,
            Some(&key.catalog_name),
            version,
        )
        .await?;
        tx.commit().await?;

        metrics::counter!("lattice_grant_changes_total", "op" => "revoke")
            .increment(removed.len() as u64);
        record_grant_delta(0, removed.len());
        tracing::info!(
            catalog_role = %key,
            resource = %target.resource.path(),
            privilege = %target.privilege,
            cascade,
            removed = removed.len(),
            "privilege revoked"
        );
        Ok(removed)
    }

    async fn grants_for_catalog_role(&self, key: &CatalogRoleKey) -> StoreResult<Vec<Grant>> {
        self.get_catalog_role(key).await?;
        let rows = sqlx::query_as::<_, DbGrant>(
            r#"SELECT catalog_name, catalog_role_name, resource_key, resource, privilege
               FROM grants WHERE catalog_name = $1 AND catalog_role_name = $2"#,
        )
        .bind(&key.catalog_name)
        .bind(&key.catalog_role_name)
        .fetch_all(&self.pool)
        .await?;
        let mut grants = rows
            .into_iter()
            .map(grant_from_db)
            .collect::<StoreResult<Vec<_>>>()?;
        sort_grants(&mut grants);
        Ok(grants)
    }

    async fn grants_for_resource(
        &self,
        catalog_name: &str,
        resource: &Resource,
    ) -> StoreResult<Vec<Grant>> {
        resource.validate()?;
        let rows = sqlx::query_as::<_, DbGrant>(
            r#"SELECT catalog_name, catalog_role_name, resource_key, resource, privilege
               FROM grants WHERE catalog_name = $1 AND resource_key = $2"#,
        )
        .bind(catalog_name)
        .bind(resource.storage_key())
        .fetch_all(&self.pool)
        .await?;
        let mut grants = rows
            .into_iter()
            .map(grant_from_db)
            .collect::<StoreResult<Vec<_>>>()?;
        sort_grants(&mut grants);
        Ok(grants)
    }
}

#[async_trait]
impl AccessStore for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_detects_only_db_codes() {
        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn grant_from_db_checks_resource_key() {
        let resource = Resource::table(["sales"], "orders");
        let row = DbGrant {
            catalog_name: "prod".to_string(),
            catalog_role_name: "analysts".to_string(),
            resource_key: resource.storage_key(),
            resource: Json(resource.clone()),
            privilege: "SELECT".to_string(),
        };
        let grant = grant_from_db(row.clone()).expect("grant");
        assert_eq!(grant.resource, resource);
        assert_eq!(grant.privilege.as_str(), "SELECT");

        let tampered = DbGrant {
            resource_key: Resource::Catalog.storage_key(),
            ..row.clone()
        };
        assert!(matches!(
            grant_from_db(tampered),
            Err(StoreError::Unexpected(_))
        ));

        let bad_privilege = DbGrant {
            privilege: String::new(),
            ..row
        };
        assert!(matches!(
            grant_from_db(bad_privilege),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn db_rows_map_versions_and_properties() {
        let mut properties = Properties::new();
        properties.insert("owner".to_string(), "data-platform".to_string());
        let row = DbCatalogRole {
            catalog_name: "prod".to_string(),
            name: "analysts".to_string(),
            properties: Json(properties.clone()),
            entity_version: 7,
        };
        let role = CatalogRole::from(row);
        assert_eq!(role.entity_version, 7);
        assert_eq!(role.properties, properties);
        assert_eq!(role.key(), CatalogRoleKey::new("prod", "analysts"));
    }
}
