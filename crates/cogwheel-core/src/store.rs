//! Persistence contract.
//!
//! The core never issues raw queries. Everything it needs from storage goes
//! through [`SettingsStore`], which implementations back with SQLite, memory,
//! or anything else that can honour plain CRUD.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::setting::{CommandSetting, Setting};

/// CRUD access to persisted settings.
///
/// Counts returned by mutating calls are the number of affected rows, so `0`
/// means "nothing matched" rather than an error.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    // ─── Command settings ────────────────────────────────────────────────────

    /// Returns the setting for `handler_id`, if any.
    async fn select(&self, handler_id: &str) -> StoreResult<Option<CommandSetting>>;

    /// Returns every command setting.
    async fn select_all(&self) -> StoreResult<Vec<CommandSetting>>;

    /// Inserts a new command setting.
    async fn insert(&self, setting: &CommandSetting) -> StoreResult<u64>;

    /// Updates the tag and enabled flag of an existing command setting.
    async fn update(&self, setting: &CommandSetting) -> StoreResult<u64>;

    /// Returns whether a setting exists for `handler_id`.
    async fn exists(&self, handler_id: &str) -> StoreResult<bool>;

    /// Deletes the setting for `handler_id`.
    ///
    /// Only used when a handler kind is removed from the system entirely.
    async fn delete(&self, handler_id: &str) -> StoreResult<u64>;

    // ─── Key/value settings ──────────────────────────────────────────────────

    /// Returns the value stored under `key`.
    async fn get_value(&self, key: &str) -> StoreResult<Option<String>>;

    /// Inserts or replaces a key/value setting.
    async fn set_value(&self, setting: &Setting) -> StoreResult<u64>;

    /// Removes the value stored under `key`.
    async fn remove_value(&self, key: &str) -> StoreResult<u64>;

    /// Returns every key/value setting.
    async fn values(&self) -> StoreResult<Vec<Setting>>;
}

/// A shared [`SettingsStore`] trait object.
pub type BoxedStore = Arc<dyn SettingsStore>;
