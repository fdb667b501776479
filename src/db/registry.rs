//! Registry module - at most one ConnectionManager per integer slot

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::manager::ConnectionManager;
use crate::config::Settings;
use crate::error::{DbError, Result};
use crate::logger::Logger;

pub const DEFAULT_SLOT: u32 = 0;

/// Holds the connection managers of an application, keyed by slot id.
///
/// The slot table stays locked for the whole get-or-open, so concurrent
/// first loads of a slot connect exactly once.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: Mutex<HashMap<u32, Arc<ConnectionManager>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new manager into `slot`; fails if the slot is taken
    pub fn open(
        &self,
        slot: u32,
        settings: Settings,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Arc<ConnectionManager>> {
        let mut slots = self.lock()?;
        if slots.contains_key(&slot) {
            return Err(DbError::SlotInUse(slot));
        }
        Self::insert(&mut slots, slot, settings, logger)
    }

    /// Manager for `slot`, connecting it on first use.
    ///
    /// When the slot is already populated `settings` and `logger` are ignored.
    pub fn load(
        &self,
        slot: u32,
        settings: Settings,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Arc<ConnectionManager>> {
        let mut slots = self.lock()?;
        if let Some(existing) = slots.get(&slot) {
            debug!(slot, "reusing connection");
            return Ok(Arc::clone(existing));
        }
        Self::insert(&mut slots, slot, settings, logger)
    }

    pub fn get(&self, slot: u32) -> Option<Arc<ConnectionManager>> {
        self.lock().ok()?.get(&slot).cloned()
    }

    /// Drop the registry's handle on `slot`. The connection closes once the
    /// last outstanding `Arc` is gone.
    pub fn close(&self, slot: u32) -> Result<bool> {
        let removed = self.lock()?.remove(&slot).is_some();
        if removed {
            info!(slot, "connection closed");
        }
        Ok(removed)
    }

    /// Occupied slot ids in ascending order
    pub fn slots(&self) -> Result<Vec<u32>> {
        let mut ids: Vec<u32> = self.lock()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn insert(
        slots: &mut HashMap<u32, Arc<ConnectionManager>>,
        slot: u32,
        settings: Settings,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Arc<ConnectionManager>> {
        let manager = Arc::new(ConnectionManager::connect(settings, logger)?);
        info!(slot, dsn = %manager.settings().dsn(), "connection opened");
        slots.insert(slot, Arc::clone(&manager));
        Ok(manager)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<u32, Arc<ConnectionManager>>>> {
        self.slots.lock().map_err(|_| DbError::LockPoisoned)
    }
}
