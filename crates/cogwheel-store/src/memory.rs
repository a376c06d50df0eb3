//! In-memory [`SettingsStore`], for tests and ephemeral bots.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use cogwheel_core::{CommandSetting, Setting, SettingsStore, StoreError, StoreResult};

/// Settings held in process memory. Lost on exit.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    commands: RwLock<BTreeMap<String, CommandSetting>>,
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `settings`.
    pub fn with_settings(settings: impl IntoIterator<Item = CommandSetting>) -> Self {
        let store = Self::new();
        {
            let mut commands = store.commands.write();
            for setting in settings {
                commands.insert(setting.handler_id.clone(), setting);
            }
        }
        store
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn select(&self, handler_id: &str) -> StoreResult<Option<CommandSetting>> {
        Ok(self.commands.read().get(handler_id).cloned())
    }

    async fn select_all(&self) -> StoreResult<Vec<CommandSetting>> {
        Ok(self.commands.read().values().cloned().collect())
    }

    async fn insert(&self, setting: &CommandSetting) -> StoreResult<u64> {
        let mut commands = self.commands.write();
        if commands.contains_key(&setting.handler_id) {
            return Err(StoreError::Database(format!(
                "duplicate command setting '{}'",
                setting.handler_id
            )));
        }
        commands.insert(setting.handler_id.clone(), setting.clone());
        Ok(1)
    }

    async fn update(&self, setting: &CommandSetting) -> StoreResult<u64> {
        match self.commands.write().get_mut(&setting.handler_id) {
            Some(existing) => {
                existing.tag.clone_from(&setting.tag);
                existing.enabled = setting.enabled;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn exists(&self, handler_id: &str) -> StoreResult<bool> {
        Ok(self.commands.read().contains_key(handler_id))
    }

    async fn delete(&self, handler_id: &str) -> StoreResult<u64> {
        Ok(self.commands.write().remove(handler_id).map_or(0, |_| 1))
    }

    async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set_value(&self, setting: &Setting) -> StoreResult<u64> {
        self.values
            .write()
            .insert(setting.key.clone(), setting.value.clone());
        Ok(1)
    }

    async fn remove_value(&self, key: &str) -> StoreResult<u64> {
        Ok(self.values.write().remove(key).map_or(0, |_| 1))
    }

    async fn values(&self) -> StoreResult<Vec<Setting>> {
        Ok(self
            .values
            .read()
            .iter()
            .map(|(key, value)| Setting::new(key.as_str(), value.as_str()))
            .collect())
    }
}
