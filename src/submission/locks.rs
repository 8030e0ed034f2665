//! Per-entity lock registry.
//!
//! Each submission entity gets its own async mutex so transitions of one
//! entity run one at a time while different entities proceed in parallel.
//! Entries nobody holds or waits for are evicted on the next acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{EngineError, EngineResult};

use super::EntityRef;

/// Async mutexes keyed by entity.
#[derive(Debug, Default)]
pub struct EntityLocks {
    entries: Mutex<HashMap<EntityRef, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to an entity.
    ///
    /// The returned guard releases the entity when dropped.
    pub async fn acquire(&self, entity: &EntityRef) -> EngineResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut entries = self.entries.lock().map_err(|_| EngineError::Store {
                message: "entity lock registry poisoned".to_string(),
            })?;
            // Only the registry holds an idle entry.
            entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(entries.entry(entity.clone()).or_default())
        };
        Ok(lock.lock_owned().await)
    }

    /// Number of entities currently tracked.
    pub fn tracked(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}
