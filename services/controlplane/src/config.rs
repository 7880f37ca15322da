use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

// Control plane configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Static bearer token guarding the management API. `None` leaves it open.
    pub admin_token: Option<String>,
    /// Reject mutations that omit `currentEntityVersion`.
    pub require_entity_version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "pg" => Ok(Self::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_POSTGRES_MAX_CONNECTIONS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS
}

fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS
}

#[derive(Debug, Deserialize)]
struct ControlPlaneConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    admin_token: Option<String>,
    require_entity_version: Option<bool>,
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    let Ok(value) = std::env::var(key) else {
        return Ok(None);
    };
    let flag = match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        other => bail!("parse {key}: expected a boolean, got {other:?}"),
    };
    Ok(Some(flag))
}

// Pool sizes and timeouts; zero is rejected like any other unparsable value.
fn env_positive<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let Ok(value) = std::env::var(key) else {
        return Ok(default);
    };
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|err| anyhow!("parse {key}: {err}"))?;
    if parsed == T::default() {
        bail!("parse {key}: must be greater than zero");
    }
    Ok(parsed)
}

impl ControlPlaneConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("LATTICE_CP_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse LATTICE_CP_METRICS_BIND")?;
        let bind_addr = std::env::var("LATTICE_CP_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8181".to_string())
            .parse()
            .with_context(|| "parse LATTICE_CP_BIND")?;
        let storage = match std::env::var("LATTICE_CP_STORAGE") {
            Ok(value) => StorageBackend::parse(&value).with_context(|| "parse LATTICE_CP_STORAGE")?,
            Err(_) => StorageBackend::Memory,
        };
        let postgres = match std::env::var("LATTICE_CP_POSTGRES_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_positive(
                    "LATTICE_CP_POSTGRES_MAX_CONNECTIONS",
                    DEFAULT_POSTGRES_MAX_CONNECTIONS,
                )?,
                connect_timeout_ms: env_positive(
                    "LATTICE_CP_POSTGRES_CONNECT_TIMEOUT_MS",
                    DEFAULT_POSTGRES_CONNECT_TIMEOUT_MS,
                )?,
                acquire_timeout_ms: env_positive(
                    "LATTICE_CP_POSTGRES_ACQUIRE_TIMEOUT_MS",
                    DEFAULT_POSTGRES_ACQUIRE_TIMEOUT_MS,
                )?,
            }),
            Err(_) => None,
        };
        let admin_token = std::env::var("LATTICE_CP_ADMIN_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let require_entity_version =
            env_flag("LATTICE_CP_REQUIRE_ENTITY_VERSION")?.unwrap_or(false);
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            admin_token,
            require_entity_version,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("LATTICE_CP_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read LATTICE_CP_CONFIG: {path}"))?;
            let override_cfg: ControlPlaneConfigOverride = serde_yaml::from_str(&contents)
                .with_context(|| "parse control plane config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.storage {
                config.storage = value;
            }
            if let Some(value) = override_cfg.postgres {
                config.postgres = Some(value);
            }
            if let Some(value) = override_cfg.admin_token {
                config.admin_token = Some(value).filter(|token| !token.trim().is_empty());
            }
            if let Some(value) = override_cfg.require_entity_version {
                config.require_entity_version = value;
            }
        }
        Ok(config)
    }
}
