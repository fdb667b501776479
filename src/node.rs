//! N-API surface for JavaScript hosts

use napi::bindgen_prelude::*;
use napi_derive::napi;
use serde_json::Value;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::db::{Bindings, ConnectionManager, ConnectionRegistry};
use crate::error::{to_napi_error, DbError};
use crate::logger::{Logger, TracingLogger};
use crate::models::FetchMode;
use crate::Settings;

/// Install a compact `tracing` formatter; `RUST_LOG` wins over `debug`
#[napi]
pub fn init_tracing(debug: Option<bool>) -> Result<()> {
    let fallback = if debug.unwrap_or(false) { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .map_err(|e| Error::from_reason(e.to_string()))
}

#[napi]
pub struct Registry {
    inner: Arc<ConnectionRegistry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[napi]
impl Registry {
    #[napi(constructor)]
    pub fn new() -> Self {
        Registry {
            inner: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Connect `slot`; throws if the slot is already open
    #[napi]
    pub fn open(&self, slot: u32, settings: Value) -> Result<()> {
        let settings = parse_settings(settings)?;
        self.inner
            .open(slot, settings, Some(tracing_logger()))
            .map(|_| ())
            .map_err(to_napi_error)
    }

    /// Connect `slot` on first use; later settings are ignored
    #[napi]
    pub fn load(&self, slot: u32, settings: Value) -> Result<()> {
        let settings = parse_settings(settings)?;
        self.inner
            .load(slot, settings, Some(tracing_logger()))
            .map(|_| ())
            .map_err(to_napi_error)
    }

    /// Rows for SELECT/SHOW, a count for INSERT/UPDATE/DELETE, otherwise null
    #[napi]
    pub fn query(
        &self,
        slot: u32,
        sql: String,
        bindings: Option<Value>,
        fetch_mode: Option<String>,
    ) -> Result<Value> {
        run_query(&self.inner, slot, &sql, bindings, fetch_mode).map_err(to_napi_error)
    }

    #[napi]
    pub async fn query_async(
        &self,
        slot: u32,
        sql: String,
        bindings: Option<Value>,
        fetch_mode: Option<String>,
    ) -> Result<Value> {
        let registry = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || run_query(&registry, slot, &sql, bindings, fetch_mode))
            .await
            .map_err(|e| Error::from_reason(e.to_string()))?
            .map_err(to_napi_error)
    }

    #[napi]
    pub fn last_insert_id(&self, slot: u32) -> Result<Option<i64>> {
        let manager = open_manager(&self.inner, slot).map_err(to_napi_error)?;
        manager.last_insert_id().map_err(to_napi_error)
    }

    #[napi]
    pub fn tables(&self, slot: u32) -> Result<Vec<String>> {
        let manager = open_manager(&self.inner, slot).map_err(to_napi_error)?;
        manager.table().names().map_err(to_napi_error)
    }

    #[napi]
    pub fn close(&self, slot: u32) -> Result<bool> {
        self.inner.close(slot).map_err(to_napi_error)
    }

    #[napi]
    pub fn slots(&self) -> Result<Vec<u32>> {
        self.inner.slots().map_err(to_napi_error)
    }
}

fn run_query(
    registry: &ConnectionRegistry,
    slot: u32,
    sql: &str,
    bindings: Option<Value>,
    fetch_mode: Option<String>,
) -> crate::Result<Value> {
    let manager = open_manager(registry, slot)?;
    let bindings = Bindings::from_json(bindings.unwrap_or(Value::Null))?;
    let mode = match fetch_mode {
        Some(m) => serde_json::from_value::<FetchMode>(Value::String(m))?,
        None => FetchMode::default(),
    };
    Ok(manager.query(sql, &bindings, mode, false)?.into_json())
}

fn open_manager(registry: &ConnectionRegistry, slot: u32) -> crate::Result<Arc<ConnectionManager>> {
    registry.get(slot).ok_or(DbError::UnknownSlot(slot))
}

fn parse_settings(settings: Value) -> Result<Settings> {
    let settings: Settings =
        serde_json::from_value(settings).map_err(|e| Error::from_reason(e.to_string()))?;
    settings.validate().map_err(to_napi_error)?;
    Ok(settings)
}

fn tracing_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}
