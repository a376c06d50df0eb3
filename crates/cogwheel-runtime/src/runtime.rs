//! Runtime orchestration: settings bootstrap, dispatcher wiring and adapter
//! lifecycle.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let runtime = BotRuntime::builder()
//!     .config_file("cogwheel.toml")
//!     .factory(cogwheel_commands::builtin_factory())
//!     .build()
//!     .await?;
//!
//! runtime.register_adapter::<DiscordAdapter>().await?;
//! runtime.run().await?;
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! build()  load config → validate → init logging → open store
//! init()   bootstrap settings → resolve prefix
//! start()  spawn every adapter with a child shutdown token
//! stop()   cancel the token → wait for every adapter to return
//! ```
//!
//! `run()` and `run_until()` do all of the above and stop when the shutdown
//! future completes, `stop()` is called, or any adapter returns.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use cogwheel_core::{
    AdapterError, AdapterResult, BoxedAdapter, BoxedStore, ConfigurableAdapter,
    MessageDispatcher,
};
use cogwheel_framework::{
    BootstrapReport, CommandRegistry, Dispatcher, HandlerFactory, SettingsReconciler, TOKEN_KEY,
};
use cogwheel_store::SqliteSettingsStore;

use crate::config::{CogwheelConfig, ConfigLoader, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

type AdapterExit = (String, AdapterResult<()>);

/// Owns the settings store, registry, dispatcher and adapters of one bot.
///
/// A runtime runs once: after [`stop`](Self::stop) its shutdown token stays
/// cancelled.
pub struct BotRuntime {
    config: CogwheelConfig,
    reconciler: Arc<SettingsReconciler>,
    dispatcher: Dispatcher,
    adapters: RwLock<HashMap<String, BoxedAdapter>>,
    tasks: Mutex<JoinSet<AdapterExit>>,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl BotRuntime {
    /// Creates a builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Assembles a runtime from already-loaded parts.
    ///
    /// Logging is left alone and the store is used as given.
    pub fn from_parts(config: CogwheelConfig, store: BoxedStore, factory: HandlerFactory) -> Self {
        let registry = CommandRegistry::shared(factory);
        let reconciler = SettingsReconciler::new(store, Arc::clone(&registry))
            .with_seed_overrides(config.commands.seed_overrides());
        let dispatcher = Dispatcher::builder(registry)
            .prefix(config.bot.prefix.as_str())
            .handler_timeout(config.bot.handler_timeout())
            .ignore_bots(config.bot.ignore_bots)
            .build();

        Self {
            config,
            reconciler: Arc::new(reconciler),
            dispatcher,
            adapters: RwLock::new(HashMap::new()),
            tasks: Mutex::new(JoinSet::new()),
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &CogwheelConfig {
        &self.config
    }

    /// Returns the dispatcher adapters feed.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns the command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.dispatcher.registry()
    }

    /// Returns the reconciler for enabling, disabling and retagging commands.
    pub fn reconciler(&self) -> &Arc<SettingsReconciler> {
        &self.reconciler
    }

    /// Returns the settings store.
    pub fn store(&self) -> &BoxedStore {
        self.reconciler.store()
    }

    /// Returns a token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns `true` between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns the bot token: `bot.token` from the configuration, else the
    /// `token` settings key.
    pub async fn resolve_token(&self) -> RuntimeResult<String> {
        if let Some(token) = &self.config.bot.token {
            return Ok(token.clone());
        }
        match self.store().get_value(TOKEN_KEY).await? {
            Some(token) if !token.trim().is_empty() => {
                debug!("Using token from settings store");
                Ok(token)
            }
            _ => Err(RuntimeError::MissingToken),
        }
    }

    /// Deserializes `adapters.<A::config_key()>`, or returns the default
    /// config if the section is absent.
    pub fn adapter_config<A>(&self) -> RuntimeResult<A::Config>
    where
        A: ConfigurableAdapter + 'static,
    {
        let key = A::config_key();
        match self.config.adapters.get(key) {
            Some(value) => value.deserialize().map_err(|e| {
                RuntimeError::AdapterConfigDeserialize(format!(
                    "Failed to deserialize config for adapter '{key}': {e}"
                ))
            }),
            None => {
                warn!(adapter = key, "No configuration found for adapter, using default");
                Ok(A::Config::default())
            }
        }
    }

    /// Creates an adapter from its configuration section and registers it.
    ///
    /// ```rust,ignore
    /// runtime.register_adapter::<DiscordAdapter>().await?;
    /// ```
    pub async fn register_adapter<A>(&self) -> RuntimeResult<()>
    where
        A: ConfigurableAdapter + 'static,
    {
        let config = self.adapter_config::<A>()?;
        let adapter = A::from_config(config)?;
        self.add_adapter(adapter).await;
        Ok(())
    }

    /// Registers an already-built adapter, replacing one with the same name.
    pub async fn add_adapter(&self, adapter: BoxedAdapter) {
        let name = adapter.name().to_string();
        if self
            .adapters
            .write()
            .await
            .insert(name.clone(), adapter)
            .is_some()
        {
            warn!(adapter = %name, "Replaced previously registered adapter");
        }
        info!(adapter = %name, "Registered adapter");
    }

    /// Returns the number of registered adapters.
    pub async fn adapter_count(&self) -> usize {
        self.adapters.read().await.len()
    }

    /// Replays persisted command settings and resolves the prefix.
    pub async fn init(&self) -> RuntimeResult<BootstrapReport> {
        let report = self.reconciler.bootstrap().await?;
        for conflict in &report.conflicts {
            warn!(error = %conflict, "Command disabled by tag conflict");
        }
        for failure in &report.failures {
            warn!(error = %failure, "Command disabled, handler could not be built");
        }

        let prefix = self.reconciler.resolve_prefix(&self.config.bot.prefix).await;
        self.dispatcher.set_prefix(prefix.as_str());

        info!(
            commands = report.registered.len(),
            seeded = report.seeded.len(),
            pruned = report.pruned.len(),
            prefix = %prefix,
            "Runtime initialized"
        );
        Ok(report)
    }

    /// Spawns every registered adapter.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Runtime is already running");
            return Ok(());
        }

        let adapters = self.adapters.read().await;
        if adapters.is_empty() {
            warn!("No adapters registered, nothing will receive messages");
        }

        let dispatcher: Arc<dyn MessageDispatcher> = Arc::new(self.dispatcher.clone());
        let mut tasks = self.tasks.lock().await;
        for (name, adapter) in adapters.iter() {
            info!(adapter = %name, "Starting adapter");
            let name = name.clone();
            let adapter = Arc::clone(adapter);
            let dispatcher = Arc::clone(&dispatcher);
            let shutdown = self.shutdown.child_token();
            tasks.spawn(async move {
                let result = adapter.run(dispatcher, shutdown).await;
                (name, result)
            });
        }

        info!("Runtime started");
        Ok(())
    }

    /// Cancels the shutdown token and waits for every adapter to return.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        info!("Stopping runtime");
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            match flatten_exit(joined) {
                (name, Ok(())) => debug!(adapter = %name, "Adapter stopped"),
                (name, Err(e)) => error!(adapter = %name, error = %e, "Adapter stopped with error"),
            }
        }
        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Cogwheel is running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes, [`stop`](Self::stop) is called, or an
    /// adapter returns. An adapter's error becomes the result.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.init().await?;
        self.start().await?;

        let exit = tokio::select! {
            _ = shutdown => None,
            _ = self.shutdown.cancelled() => None,
            exit = self.first_adapter_exit() => Some(exit),
        };

        self.stop().await;

        match exit {
            Some((name, Err(source))) => {
                error!(adapter = %name, error = %source, "Adapter failed");
                Err(RuntimeError::AdapterFailed {
                    adapter: name,
                    source,
                })
            }
            Some((name, Ok(()))) => {
                info!(adapter = %name, "Adapter finished, shutting down");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Resolves when the first adapter task ends. Never resolves if none run.
    async fn first_adapter_exit(&self) -> AdapterExit {
        let mut tasks = self.tasks.lock().await;
        match tasks.join_next().await {
            Some(joined) => flatten_exit(joined),
            None => {
                drop(tasks);
                std::future::pending().await
            }
        }
    }
}

fn flatten_exit(joined: Result<AdapterExit, tokio::task::JoinError>) -> AdapterExit {
    joined.unwrap_or_else(|e| {
        (
            "<unknown>".to_string(),
            Err(AdapterError::internal(format!("adapter task panicked: {e}"))),
        )
    })
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`BotRuntime`].
///
/// ```rust,ignore
/// let runtime = BotRuntime::builder()
///     .profile("production")
///     .factory(builtin_factory())
///     .build()
///     .await?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    factory: HandlerFactory,
    store: Option<BoxedStore>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder with an empty handler factory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            factory: HandlerFactory::new(),
            store: None,
            init_logging: true,
        }
    }

    /// Loads configuration from this file instead of searching.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a configuration search path.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables `COGWHEEL_*` environment variables (default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges programmatic configuration below files and environment.
    pub fn merge(mut self, config: CogwheelConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Sets the handler kinds the registry can build.
    pub fn factory(mut self, factory: HandlerFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Uses `store` instead of opening `database.path`.
    pub fn store(mut self, store: BoxedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates configuration, initializes logging and opens the
    /// settings store.
    pub async fn build(self) -> RuntimeResult<BotRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let store = match self.store {
            Some(store) => store,
            None => {
                info!(path = %config.database.path, "Opening settings store");
                Arc::new(SqliteSettingsStore::connect(&config.database.path).await?) as BoxedStore
            }
        };

        Ok(BotRuntime::from_parts(config, store, self.factory))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use cogwheel_commands::builtin_factory;
    use cogwheel_core::{Author, ChannelRef, InboundMessage, Setting, SettingsStore};
    use cogwheel_framework::PREFIX_KEY;
    use cogwheel_framework::testing::RecordingPlatform;
    use cogwheel_store::MemorySettingsStore;
    use serde::Deserialize;

    use super::*;

    fn runtime_with(config: CogwheelConfig, store: Arc<MemorySettingsStore>) -> BotRuntime {
        BotRuntime::from_parts(config, store, builtin_factory())
    }

    /// Sends one message on start, then idles until shut down.
    struct ScriptedAdapter {
        content: &'static str,
        platform: Arc<RecordingPlatform>,
    }

    #[async_trait]
    impl cogwheel_core::Adapter for ScriptedAdapter {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn run(
            &self,
            dispatcher: Arc<dyn MessageDispatcher>,
            shutdown: CancellationToken,
        ) -> AdapterResult<()> {
            let message = InboundMessage::new(
                "m1",
                self.content,
                Author::user("u1", "alice"),
                ChannelRef::text("c1", "g1"),
            );
            dispatcher.dispatch(message, self.platform.clone()).await;
            shutdown.cancelled().await;
            Ok(())
        }
    }

    struct BrokenAdapter;

    #[async_trait]
    impl cogwheel_core::Adapter for BrokenAdapter {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn run(
            &self,
            _dispatcher: Arc<dyn MessageDispatcher>,
            _shutdown: CancellationToken,
        ) -> AdapterResult<()> {
            Err(AdapterError::Connection("gateway refused".into()))
        }
    }

    #[derive(Debug, Default, Deserialize)]
    struct NamedConfig {
        #[serde(default)]
        label: String,
    }

    struct NamedAdapter;

    #[async_trait]
    impl cogwheel_core::Adapter for NamedAdapter {
        fn name(&self) -> &'static str {
            "named"
        }

        async fn run(
            &self,
            _dispatcher: Arc<dyn MessageDispatcher>,
            shutdown: CancellationToken,
        ) -> AdapterResult<()> {
            shutdown.cancelled().await;
            Ok(())
        }
    }

    impl ConfigurableAdapter for NamedAdapter {
        type Config = NamedConfig;

        fn config_key() -> &'static str {
            "named"
        }

        fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>> {
            if config.label.is_empty() {
                return Err(AdapterError::Config("label is required".into()));
            }
            Ok(Arc::new(Self))
        }
    }

    #[tokio::test]
    async fn test_init_seeds_builtin_commands() {
        let store = Arc::new(MemorySettingsStore::new());
        let runtime = runtime_with(CogwheelConfig::default(), store.clone());

        let report = runtime.init().await.unwrap();
        assert!(report.is_clean());
        assert!(runtime.registry().is_registered("ping"));
        assert!(!runtime.registry().is_registered("ban"));
        assert_eq!(store.select_all().await.unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_init_applies_seed_overrides() {
        let mut config = CogwheelConfig::default();
        config.commands.overrides.insert(
            "roll".into(),
            crate::config::CommandOverride {
                tag: Some("dice".into()),
                enabled: None,
            },
        );
        let runtime = runtime_with(config, Arc::new(MemorySettingsStore::new()));
        runtime.init().await.unwrap();

        assert!(runtime.registry().is_registered("dice"));
        assert!(!runtime.registry().is_registered("roll"));
    }

    #[tokio::test]
    async fn test_persisted_prefix_wins() {
        let store = Arc::new(MemorySettingsStore::new());
        store.set_value(&Setting::new(PREFIX_KEY, "?")).await.unwrap();
        let runtime = runtime_with(CogwheelConfig::default(), store);

        assert_eq!(&*runtime.dispatcher().prefix(), "!");
        runtime.init().await.unwrap();
        assert_eq!(&*runtime.dispatcher().prefix(), "?");
    }

    #[tokio::test]
    async fn test_resolve_token() {
        let store = Arc::new(MemorySettingsStore::new());
        let runtime = runtime_with(CogwheelConfig::default(), store.clone());
        assert!(matches!(
            runtime.resolve_token().await,
            Err(RuntimeError::MissingToken)
        ));

        store.set_value(&Setting::new(TOKEN_KEY, "stored")).await.unwrap();
        assert_eq!(runtime.resolve_token().await.unwrap(), "stored");

        let mut config = CogwheelConfig::default();
        config.bot.token = Some("configured".into());
        let runtime = runtime_with(config, store);
        assert_eq!(runtime.resolve_token().await.unwrap(), "configured");
    }

    #[tokio::test]
    async fn test_run_until_dispatches_and_stops() {
        let platform = RecordingPlatform::new("bot").shared();
        let runtime = runtime_with(CogwheelConfig::default(), Arc::new(MemorySettingsStore::new()));
        runtime
            .add_adapter(Arc::new(ScriptedAdapter {
                content: "!ping",
                platform: platform.clone(),
            }))
            .await;

        let watched = platform.clone();
        let replied = async move {
            while watched.sent().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), runtime.run_until(replied))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(platform.sent(), vec!["Pong!".to_string()]);
        assert!(!runtime.is_running());
        assert!(runtime.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_run() {
        let runtime = Arc::new(runtime_with(
            CogwheelConfig::default(),
            Arc::new(MemorySettingsStore::new()),
        ));
        runtime
            .add_adapter(Arc::new(ScriptedAdapter {
                content: "hello",
                platform: RecordingPlatform::new("bot").shared(),
            }))
            .await;

        let token = runtime.shutdown_token();
        let handle = {
            let runtime = Arc::clone(&runtime);
            tokio::spawn(async move { runtime.run_until(std::future::pending()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_adapter_failure_is_returned() {
        let runtime = runtime_with(CogwheelConfig::default(), Arc::new(MemorySettingsStore::new()));
        runtime.add_adapter(Arc::new(BrokenAdapter)).await;

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            runtime.run_until(std::future::pending()),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::AdapterFailed { ref adapter, .. } if adapter == "broken"
        ));
    }

    #[tokio::test]
    async fn test_register_adapter_from_config() {
        let mut config = CogwheelConfig::default();
        config.adapters.insert(
            "named".into(),
            figment::value::Value::serialize(label_section("main")).unwrap(),
        );
        let runtime = runtime_with(config, Arc::new(MemorySettingsStore::new()));
        runtime.register_adapter::<NamedAdapter>().await.unwrap();
        assert_eq!(runtime.adapter_count().await, 1);

        let bare = runtime_with(CogwheelConfig::default(), Arc::new(MemorySettingsStore::new()));
        assert!(matches!(
            bare.register_adapter::<NamedAdapter>().await,
            Err(RuntimeError::Adapter(AdapterError::Config(_)))
        ));
    }

    fn label_section(label: &str) -> std::collections::BTreeMap<&'static str, String> {
        std::collections::BTreeMap::from([("label", label.to_string())])
    }

    #[tokio::test]
    async fn test_builder_opens_sqlite_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = CogwheelConfig::default();
        overrides.database.path = dir.path().join("bot.db").display().to_string();

        let runtime = BotRuntime::builder()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .merge(overrides)
            .factory(builtin_factory())
            .build()
            .await
            .unwrap();
        runtime.init().await.unwrap();

        assert!(dir.path().join("bot.db").exists());
        assert!(runtime.store().exists("help").await.unwrap());
    }
}
