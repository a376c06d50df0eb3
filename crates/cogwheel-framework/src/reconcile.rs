//! Keeps the live registry in agreement with persisted settings.
//!
//! [`SettingsReconciler`] is the only component that reads and writes
//! [`CommandSetting`]s. It drives the [`CommandRegistry`] in three situations:
//!
//! - **Startup** ([`bootstrap`](SettingsReconciler::bootstrap)): seed, prune,
//!   then replay every persisted setting.
//! - **Enable/disable** ([`set_enabled`](SettingsReconciler::set_enabled)).
//! - **Renaming** ([`retag`](SettingsReconciler::retag)).
//!
//! Whenever the registry forces a setting to `enabled = false`, the corrected
//! setting is written back so the store never claims a command is live when it
//! is not.
//!
//! Edits are serialized: each one holds an async lock from the read of the
//! persisted setting until the corrected setting is written back.
//!
//! ```text
//!  SettingsStore ──select_all──▶ sort by handler_id ──reconcile──▶ CommandRegistry
//!        ▲                                                  │
//!        └──────────────── update (forced disables) ◀──────┘
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cogwheel_core::{BoxedStore, CommandSetting, Setting, StoreResult};

use crate::error::{ReconcileError, SettingsError};
use crate::registry::{CommandRegistry, ReconcileOutcome, is_valid_tag};

/// Settings key holding the persisted command prefix.
pub const PREFIX_KEY: &str = "prefix";

/// Settings key holding the persisted bot token.
pub const TOKEN_KEY: &str = "token";

/// Replaces a handler kind's defaults when its setting is first seeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedOverride {
    /// Tag to seed instead of the kind's default tag.
    pub tag: Option<String>,
    /// Whether to seed the setting enabled.
    pub enabled: Option<bool>,
}

/// What [`SettingsReconciler::bootstrap`] did.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    /// Settings that ended up bound, in replay order.
    pub registered: Vec<CommandSetting>,
    /// Enabled settings that lost a tag conflict and were disabled.
    pub conflicts: Vec<ReconcileError>,
    /// Enabled settings that failed for any other reason and were disabled.
    pub failures: Vec<ReconcileError>,
    /// Settings created for kinds that had none.
    pub seeded: Vec<CommandSetting>,
    /// Handler ids whose settings were deleted because the kind no longer exists.
    pub pruned: Vec<String>,
}

impl BootstrapReport {
    /// Returns `true` if every enabled setting was bound.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.failures.is_empty()
    }
}

/// Applies persisted command settings to a [`CommandRegistry`].
pub struct SettingsReconciler {
    store: BoxedStore,
    registry: Arc<CommandRegistry>,
    overrides: BTreeMap<String, SeedOverride>,
    edits: Mutex<()>,
}

impl SettingsReconciler {
    /// Creates a reconciler over `store` and `registry`.
    pub fn new(store: BoxedStore, registry: Arc<CommandRegistry>) -> Self {
        Self {
            store,
            registry,
            overrides: BTreeMap::new(),
            edits: Mutex::new(()),
        }
    }

    /// Sets per-handler seed overrides (builder pattern).
    pub fn with_seed_overrides(mut self, overrides: BTreeMap<String, SeedOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Returns the store.
    pub fn store(&self) -> &BoxedStore {
        &self.store
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Seeds, prunes and replays every persisted setting.
    ///
    /// Replay is sorted by `handler_id`, so the winner of a tag conflict is the
    /// same on every start.
    pub async fn bootstrap(&self) -> StoreResult<BootstrapReport> {
        let _edit = self.edits.lock().await;
        let mut report = BootstrapReport::default();
        let factory = self.registry.factory();

        let mut settings = Vec::new();
        for setting in self.store.select_all().await? {
            if factory.contains(&setting.handler_id) {
                settings.push(setting);
            } else {
                self.store.delete(&setting.handler_id).await?;
                info!(handler = %setting.handler_id, "Pruned setting for removed handler");
                report.pruned.push(setting.handler_id);
            }
        }

        let known: HashSet<String> = settings.iter().map(|s| s.handler_id.clone()).collect();
        for kind in factory.kinds() {
            if known.contains(kind.id()) {
                continue;
            }
            let seed = self.overrides.get(kind.id()).cloned().unwrap_or_default();
            let setting = CommandSetting::new(
                kind.id(),
                seed.tag.unwrap_or_else(|| kind.default_tag().to_string()),
                seed.enabled.unwrap_or(kind.is_enabled_by_default()),
            );
            self.store.insert(&setting).await?;
            debug!(setting = %setting, "Seeded command setting");
            report.seeded.push(setting.clone());
            settings.push(setting);
        }

        settings.sort_by(|a, b| a.handler_id.cmp(&b.handler_id));

        for mut setting in settings {
            match self.registry.reconcile(&mut setting) {
                Ok(ReconcileOutcome::Registered | ReconcileOutcome::AlreadyRegistered) => {
                    report.registered.push(setting);
                }
                Ok(_) => {}
                Err(e) => {
                    self.store.update(&setting).await?;
                    match e {
                        ReconcileError::TagConflict { .. } => report.conflicts.push(e),
                        _ => report.failures.push(e),
                    }
                }
            }
        }

        info!(
            registered = report.registered.len(),
            conflicts = report.conflicts.len(),
            failures = report.failures.len(),
            seeded = report.seeded.len(),
            pruned = report.pruned.len(),
            "Command settings reconciled"
        );
        Ok(report)
    }

    /// Enables or disables the command backed by `handler_id`.
    ///
    /// Returns the setting as persisted. A rejected enable is persisted as
    /// disabled and reported as [`SettingsError::Rejected`].
    pub async fn set_enabled(
        &self,
        handler_id: &str,
        enabled: bool,
    ) -> Result<CommandSetting, SettingsError> {
        let _edit = self.edits.lock().await;
        let mut setting = self.load(handler_id).await?;
        setting.enabled = enabled;
        self.apply(setting).await
    }

    /// Moves the command backed by `handler_id` to `new_tag`.
    ///
    /// The old binding is released before the new tag is claimed, so a
    /// conflict on the new tag leaves the command disabled.
    pub async fn retag(
        &self,
        handler_id: &str,
        new_tag: &str,
    ) -> Result<CommandSetting, SettingsError> {
        if !is_valid_tag(new_tag) {
            return Err(ReconcileError::InvalidTag {
                tag: new_tag.to_string(),
                handler: handler_id.to_string(),
            }
            .into());
        }

        let _edit = self.edits.lock().await;
        let mut setting = self.load(handler_id).await?;
        if setting.tag == new_tag {
            return Ok(setting);
        }

        self.registry
            .reconcile(&mut CommandSetting::disabled(handler_id, &setting.tag))?;
        debug!(handler = %handler_id, from = %setting.tag, to = %new_tag, "Retagging command");
        setting.tag = new_tag.to_string();
        self.apply(setting).await
    }

    /// Returns the persisted prefix, or `default` if none is usable.
    pub async fn resolve_prefix(&self, default: &str) -> String {
        match self.store.get_value(PREFIX_KEY).await {
            Ok(Some(prefix)) if !prefix.is_empty() && !prefix.contains(char::is_whitespace) => {
                prefix
            }
            Ok(Some(prefix)) => {
                warn!(prefix = %prefix, "Ignoring unusable persisted prefix");
                default.to_string()
            }
            Ok(None) => default.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted prefix, using default");
                default.to_string()
            }
        }
    }

    /// Persists `prefix` as the command prefix.
    pub async fn store_prefix(&self, prefix: &str) -> StoreResult<()> {
        self.store.set_value(&Setting::new(PREFIX_KEY, prefix)).await?;
        Ok(())
    }

    async fn load(&self, handler_id: &str) -> Result<CommandSetting, SettingsError> {
        self.store
            .select(handler_id)
            .await?
            .ok_or_else(|| SettingsError::UnknownSetting(handler_id.to_string()))
    }

    /// Reconciles `setting`, then persists whatever state it ended in.
    async fn apply(&self, mut setting: CommandSetting) -> Result<CommandSetting, SettingsError> {
        let result = self.registry.reconcile(&mut setting);
        self.store.update(&setting).await?;
        match result {
            Ok(outcome) => {
                debug!(setting = %setting, outcome = ?outcome, "Applied command setting");
                Ok(setting)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for SettingsReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsReconciler")
            .field("registry", &self.registry)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::test_factory;
    use async_trait::async_trait;
    use cogwheel_core::{SettingsStore, StoreError};
    use cogwheel_store::MemorySettingsStore;

    fn setup(store: Arc<MemorySettingsStore>) -> SettingsReconciler {
        SettingsReconciler::new(store, CommandRegistry::shared(test_factory()))
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_missing_settings() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));

        let report = reconciler.bootstrap().await.unwrap();

        let seeded: Vec<_> = report.seeded.iter().map(|s| s.handler_id.as_str()).collect();
        assert_eq!(seeded, vec!["broken", "dice", "kick", "roll"]);
        assert_eq!(store.select_all().await.unwrap().len(), 4);
        assert!(reconciler.registry().is_registered("roll"));
        assert!(reconciler.registry().is_registered("kick"));

        // "broken" cannot be constructed and is persisted as disabled.
        assert_eq!(report.failures.len(), 1);
        assert!(!store.select("broken").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_bootstrap_conflict_is_persisted() {
        let store = Arc::new(MemorySettingsStore::new());
        store.insert(&CommandSetting::enabled("roll", "r")).await.unwrap();
        store.insert(&CommandSetting::enabled("dice", "r")).await.unwrap();
        let reconciler = setup(Arc::clone(&store));

        let report = reconciler.bootstrap().await.unwrap();

        // Replay is sorted by handler id, so "dice" wins.
        assert_eq!(
            reconciler.registry().bound_handler_id("r").as_deref(),
            Some("dice")
        );
        assert_eq!(report.conflicts.len(), 1);
        assert!(!report.is_clean());
        assert!(!store.select("roll").await.unwrap().unwrap().enabled);
        assert!(store.select("dice").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_bootstrap_prunes_removed_kinds() {
        let store = Arc::new(MemorySettingsStore::new());
        store.insert(&CommandSetting::enabled("weather", "weather")).await.unwrap();
        let reconciler = setup(Arc::clone(&store));

        let report = reconciler.bootstrap().await.unwrap();

        assert_eq!(report.pruned, vec!["weather".to_string()]);
        assert!(!store.exists("weather").await.unwrap());
        assert!(!reconciler.registry().is_registered("weather"));
    }

    #[tokio::test]
    async fn test_bootstrap_applies_seed_overrides() {
        let store = Arc::new(MemorySettingsStore::new());
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "roll".to_string(),
            SeedOverride {
                tag: Some("dice-roll".into()),
                enabled: None,
            },
        );
        overrides.insert(
            "kick".to_string(),
            SeedOverride {
                tag: None,
                enabled: Some(false),
            },
        );
        let reconciler = setup(Arc::clone(&store)).with_seed_overrides(overrides);

        reconciler.bootstrap().await.unwrap();

        assert!(reconciler.registry().is_registered("dice-roll"));
        assert!(!reconciler.registry().is_registered("kick"));
        assert_eq!(store.select("roll").await.unwrap().unwrap().tag, "dice-roll");
    }

    #[tokio::test]
    async fn test_bootstrap_is_repeatable() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));

        reconciler.bootstrap().await.unwrap();
        let before = reconciler.registry().snapshot();
        let report = reconciler.bootstrap().await.unwrap();

        assert!(report.seeded.is_empty());
        assert_eq!(reconciler.registry().snapshot(), before);
    }

    #[tokio::test]
    async fn test_set_enabled_round_trip() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));
        reconciler.bootstrap().await.unwrap();

        let setting = reconciler.set_enabled("roll", false).await.unwrap();
        assert!(!setting.enabled);
        assert!(!reconciler.registry().is_registered("roll"));
        assert!(!store.select("roll").await.unwrap().unwrap().enabled);

        reconciler.set_enabled("roll", true).await.unwrap();
        assert!(reconciler.registry().is_registered("roll"));
        assert!(store.select("roll").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn test_set_enabled_unknown_handler() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(store);
        assert!(matches!(
            reconciler.set_enabled("ghost", true).await,
            Err(SettingsError::UnknownSetting(id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_retag_moves_binding() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));
        reconciler.bootstrap().await.unwrap();

        let setting = reconciler.retag("roll", "r").await.unwrap();

        assert_eq!(setting.tag, "r");
        assert!(setting.enabled);
        assert!(!reconciler.registry().is_registered("roll"));
        assert_eq!(reconciler.registry().bound_handler_id("r").as_deref(), Some("roll"));
        assert_eq!(store.select("roll").await.unwrap().unwrap().tag, "r");
    }

    #[tokio::test]
    async fn test_retag_into_conflict_disables() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));
        reconciler.bootstrap().await.unwrap();

        let err = reconciler.retag("dice", "roll").await.unwrap_err();

        assert!(matches!(
            err,
            SettingsError::Rejected(ReconcileError::TagConflict { .. })
        ));
        assert!(!reconciler.registry().is_registered("dice"));
        assert_eq!(reconciler.registry().bound_handler_id("roll").as_deref(), Some("roll"));
        let persisted = store.select("dice").await.unwrap().unwrap();
        assert_eq!(persisted.tag, "roll");
        assert!(!persisted.enabled);
    }

    #[tokio::test]
    async fn test_retag_rejects_invalid_tag() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));
        reconciler.bootstrap().await.unwrap();

        assert!(matches!(
            reconciler.retag("roll", "two words").await,
            Err(SettingsError::Rejected(ReconcileError::InvalidTag { .. }))
        ));
        assert!(reconciler.registry().is_registered("roll"));
    }

    #[tokio::test]
    async fn test_resolve_prefix() {
        let store = Arc::new(MemorySettingsStore::new());
        let reconciler = setup(Arc::clone(&store));

        assert_eq!(reconciler.resolve_prefix("!").await, "!");
        reconciler.store_prefix("?").await.unwrap();
        assert_eq!(reconciler.resolve_prefix("!").await, "?");
        store.set_value(&Setting::new(PREFIX_KEY, "a b")).await.unwrap();
        assert_eq!(reconciler.resolve_prefix("!").await, "!");
    }

    /// A store whose every call fails.
    struct Unreachable;

    #[async_trait]
    impl SettingsStore for Unreachable {
        async fn select(&self, _: &str) -> StoreResult<Option<CommandSetting>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn select_all(&self) -> StoreResult<Vec<CommandSetting>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn insert(&self, _: &CommandSetting) -> StoreResult<u64> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn update(&self, _: &CommandSetting) -> StoreResult<u64> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn exists(&self, _: &str) -> StoreResult<bool> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn delete(&self, _: &str) -> StoreResult<u64> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn get_value(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn set_value(&self, _: &Setting) -> StoreResult<u64> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn remove_value(&self, _: &str) -> StoreResult<u64> {
            Err(StoreError::Unavailable("offline".into()))
        }
        async fn values(&self) -> StoreResult<Vec<Setting>> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    /// Yields after every `select`, so concurrent edits interleave.
    struct Yielding(MemorySettingsStore);

    #[async_trait]
    impl SettingsStore for Yielding {
        async fn select(&self, handler_id: &str) -> StoreResult<Option<CommandSetting>> {
            let setting = self.0.select(handler_id).await;
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            setting
        }
        async fn select_all(&self) -> StoreResult<Vec<CommandSetting>> {
            self.0.select_all().await
        }
        async fn insert(&self, setting: &CommandSetting) -> StoreResult<u64> {
            self.0.insert(setting).await
        }
        async fn update(&self, setting: &CommandSetting) -> StoreResult<u64> {
            self.0.update(setting).await
        }
        async fn exists(&self, handler_id: &str) -> StoreResult<bool> {
            self.0.exists(handler_id).await
        }
        async fn delete(&self, handler_id: &str) -> StoreResult<u64> {
            self.0.delete(handler_id).await
        }
        async fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get_value(key).await
        }
        async fn set_value(&self, setting: &Setting) -> StoreResult<u64> {
            self.0.set_value(setting).await
        }
        async fn remove_value(&self, key: &str) -> StoreResult<u64> {
            self.0.remove_value(key).await
        }
        async fn values(&self) -> StoreResult<Vec<Setting>> {
            self.0.values().await
        }
    }

    #[tokio::test]
    async fn test_concurrent_edits_keep_one_binding() {
        let store = Arc::new(Yielding(MemorySettingsStore::new()));
        let reconciler = SettingsReconciler::new(
            Arc::clone(&store) as BoxedStore,
            CommandRegistry::shared(test_factory()),
        );
        reconciler.bootstrap().await.unwrap();

        let (enabled, retagged) = tokio::join!(
            reconciler.set_enabled("roll", true),
            reconciler.retag("roll", "r2")
        );
        enabled.unwrap();
        retagged.unwrap();

        let persisted = store.select("roll").await.unwrap().unwrap();
        assert_eq!(persisted.tag, "r2");
        assert!(persisted.enabled);
        assert_eq!(reconciler.registry().tags_of("roll"), vec!["r2".to_string()]);
    }

    #[tokio::test]
    async fn test_retag_leaves_foreign_binding() {
        let store = Arc::new(MemorySettingsStore::new());
        store.insert(&CommandSetting::disabled("roll", "dice")).await.unwrap();
        let reconciler = setup(Arc::clone(&store));
        reconciler.bootstrap().await.unwrap();

        let setting = reconciler.retag("roll", "r").await.unwrap();
        assert!(!setting.enabled);
        assert_eq!(reconciler.registry().bound_handler_id("dice").as_deref(), Some("dice"));
    }

    #[tokio::test]
    async fn test_store_failure_leaves_registry_intact() {
        let registry = CommandRegistry::shared(test_factory());
        registry.enable("roll", "roll").unwrap();
        let reconciler = SettingsReconciler::new(Arc::new(Unreachable), Arc::clone(&registry));

        assert!(reconciler.bootstrap().await.is_err());
        assert!(matches!(
            reconciler.set_enabled("roll", false).await,
            Err(SettingsError::Store(_))
        ));
        assert!(registry.is_registered("roll"));
        assert_eq!(reconciler.resolve_prefix("!").await, "!");
    }
}
