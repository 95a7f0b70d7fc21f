use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::app::ports::KeyValueStore;
use crate::constants::{CATALOG_KEY, SETTINGS_KEY, STAGED_KEY};
use crate::error::Result;
use crate::pipeline::record::Record;
use crate::pipeline::settings::Settings;
use crate::pipeline::staging::StagedSet;

/// Typed access to the catalog, staged set and settings.
///
/// Each collection lives under its own key, so a bad write to one never
/// touches the others.
#[derive(Clone)]
pub struct InventoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl InventoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_catalog(&self) -> Result<Option<Vec<Record>>> {
        self.load(CATALOG_KEY)
    }

    pub fn save_catalog(&self, catalog: &[Record]) -> Result<()> {
        self.save(CATALOG_KEY, catalog)
    }

    pub fn load_staged(&self) -> Result<Option<StagedSet>> {
        self.load(STAGED_KEY)
    }

    pub fn save_staged(&self, staged: &StagedSet) -> Result<()> {
        self.save(STAGED_KEY, staged)
    }

    /// Drop the staged set entirely; a later load sees nothing stored.
    pub fn clear_staged(&self) -> Result<()> {
        self.store.remove(STAGED_KEY)
    }

    pub fn load_settings(&self) -> Result<Option<Settings>> {
        self.load(SETTINGS_KEY)
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.save(SETTINGS_KEY, settings)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)?;
                debug!("Loaded '{}' from storage", key);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)?;
        debug!("Saved '{}' to storage", key);
        Ok(())
    }
}
