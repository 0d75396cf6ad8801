//! Environment-driven configuration.
//!
//! A `Config` is read once at [`crate::registry::NodeRegistry::initialize`]
//! time, with named presets for tests and a `from_env` constructor for
//! production use.

use crate::error::{CodexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceStorageType {
    Sqlite,
    Postgresql,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub persistence_enabled: bool,
    pub ice_storage_type: IceStorageType,
    pub ice_connection_string: String,
    pub water_connection_string: Option<String>,
    pub testing: bool,
    pub writer_worker_count: usize,
    pub writer_queue_high_water_mark: usize,
    pub writer_max_retries: u32,
    pub writer_backoff_base_ms: u64,
    pub writer_backoff_cap_ms: u64,
    pub shutdown_drain_timeout_ms: u64,
    pub adapter_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persistence_enabled: true,
            ice_storage_type: IceStorageType::Sqlite,
            ice_connection_string: "codex_ice.db3".into(),
            water_connection_string: None,
            testing: false,
            writer_worker_count: 4,
            writer_queue_high_water_mark: 1024,
            writer_max_retries: 8,
            writer_backoff_base_ms: 25,
            writer_backoff_cap_ms: 5_000,
            shutdown_drain_timeout_ms: 30_000,
            adapter_cache_capacity: 512,
        }
    }
}

impl Config {
    /// Both backends forced in-memory, matching `ENVIRONMENT=Testing`.
    pub fn testing() -> Self {
        Self {
            persistence_enabled: true,
            ice_connection_string: ":memory:".into(),
            testing: true,
            ..Self::default()
        }
    }

    /// Reads the recognized environment options, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if matches!(std::env::var("ENVIRONMENT"), Ok(v) if v.eq_ignore_ascii_case("testing")) {
            return Ok(Self::testing());
        }

        if let Ok(v) = std::env::var("PERSISTENCE_ENABLED") {
            cfg.persistence_enabled = parse_bool(&v)?;
        }
        if !cfg.persistence_enabled {
            cfg.ice_connection_string = ":memory:".into();
            cfg.water_connection_string = None;
        }

        if let Ok(v) = std::env::var("ICE_STORAGE_TYPE") {
            cfg.ice_storage_type = match v.to_ascii_lowercase().as_str() {
                "sqlite" => IceStorageType::Sqlite,
                "postgresql" => IceStorageType::Postgresql,
                other => {
                    return Err(CodexError::InvalidInput(format!(
                        "unrecognized ICE_STORAGE_TYPE '{other}'"
                    )))
                }
            };
        }

        if let Ok(v) = std::env::var("ICE_CONNECTION_STRING") {
            cfg.ice_connection_string = v;
        }
        if let Ok(v) = std::env::var("WATER_CONNECTION_STRING") {
            cfg.water_connection_string = Some(v);
        }

        Ok(cfg)
    }
}

fn parse_bool(v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(CodexError::InvalidInput(format!(
            "expected 'true' or 'false', got '{other}'"
        ))),
    }
}
