//! Main runtime orchestration.
//!
//! The runtime owns the [`Robot`] and drives it through its lifecycle:
//! adapters are constructed from their configuration sections, plugins are
//! initialized against the robot, each adapter's `run` loop is spawned on its
//! own task, and shutdown closes every adapter exactly once.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchboard_runtime::SwitchboardRuntime;
//!
//! let runtime = SwitchboardRuntime::builder()
//!     .config_file("switchboard.toml")
//!     .build()?;
//!
//! runtime.register_adapter::<ShellAdapter>();
//! runtime.register_plugin(ping::PLUGIN);
//! runtime.run().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use switchboard_core::{
    AdapterContext, BoxedAdapter, BoxedDispatcher, CancellationToken, ConfigurableAdapter,
};
use switchboard_framework::{
    MemoryUserStore, PluginDescriptor, PluginLoadContext, Robot, Services, UserStore, ValueLookup,
};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, SwitchboardConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::logging;

/// How long `stop` waits for each adapter task after closing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type AdapterFactory = Box<dyn Fn(Option<&Value>) -> RuntimeResult<BoxedAdapter> + Send + Sync>;

/// The Switchboard runtime.
///
/// Lifecycle hooks run while the runtime holds its lifecycle lock; a hook
/// must not call back into [`SwitchboardRuntime::on`] or
/// [`SwitchboardRuntime::state`].
pub struct SwitchboardRuntime {
    config: SwitchboardConfig,
    robot: Robot,
    services: Services,
    /// Adapter constructors keyed by the name used in `adapters = [...]`.
    factories: RwLock<HashMap<String, AdapterFactory>>,
    plugins: RwLock<Vec<PluginDescriptor>>,
    lifecycle: Mutex<Lifecycle>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SwitchboardRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Validates the configuration, initializes logging and creates the
    /// robot. The runtime is left in [`LifecycleState::Configured`].
    pub fn from_config(config: SwitchboardConfig) -> RuntimeResult<Self> {
        let services = default_services(&config, None);
        Self::assemble(config, services, Lifecycle::new())
    }

    fn assemble(
        config: SwitchboardConfig,
        services: Services,
        mut lifecycle: Lifecycle,
    ) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        let robot = match &config.bot.alias {
            Some(alias) => Robot::with_alias(config.bot.name.clone(), alias.clone()),
            None => Robot::new(config.bot.name.clone()),
        };

        lifecycle.advance(LifecycleState::Configured, &robot)?;

        info!(
            bot = %config.bot.name,
            adapters = ?config.adapters,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            robot,
            services,
            factories: RwLock::new(HashMap::new()),
            plugins: RwLock::new(Vec::new()),
            lifecycle: Mutex::new(lifecycle),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &SwitchboardConfig {
        &self.config
    }

    /// Returns the robot driven by this runtime.
    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state()
    }

    /// Registers a hook to run when the runtime enters `state`.
    pub fn on<F>(&self, state: LifecycleState, hook: F)
    where
        F: Fn(&Robot) + Send + Sync + 'static,
    {
        self.lifecycle.lock().on(state, hook);
    }

    /// Returns the token cancelled when the runtime begins shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn advance(&self, state: LifecycleState) -> RuntimeResult<()> {
        self.lifecycle.lock().advance(state, &self.robot)?;
        Ok(())
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers an adapter type that the configuration can name.
    ///
    /// When the adapter is listed in `adapters`, its `[adapter.<name>]`
    /// section is deserialized into `A::Config`, or `A::Config::default()` is
    /// used if the section is absent.
    pub fn register_adapter<A>(&self)
    where
        A: ConfigurableAdapter + 'static,
    {
        let name = A::adapter_name();
        let factory: AdapterFactory = Box::new(move |section: Option<&Value>| {
            let config: A::Config = match section {
                Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                    RuntimeError::AdapterConfig {
                        name: name.to_string(),
                        message: e.to_string(),
                    }
                })?,
                None => {
                    warn!(adapter = name, "No configuration found for adapter, using default");
                    A::Config::default()
                }
            };
            let adapter: BoxedAdapter = A::from_config(config)?;
            Ok(adapter)
        });

        self.factories.write().insert(name.to_string(), factory);
        debug!(adapter = name, "Registered adapter type");
    }

    /// Registers an already constructed adapter under its own name.
    ///
    /// It is loaded only if the configuration lists that name.
    pub fn add_adapter(&self, adapter: BoxedAdapter) {
        let name = adapter.name().to_string();
        let factory: AdapterFactory = Box::new(move |_| Ok(Arc::clone(&adapter)));
        self.factories.write().insert(name.clone(), factory);
        debug!(adapter = %name, "Registered adapter instance");
    }

    /// Registers a plugin to be initialized at startup.
    ///
    /// Plugins are initialized in registration order.
    pub fn register_plugin(&self, descriptor: PluginDescriptor) {
        debug!(plugin = descriptor.name, "Registered plugin");
        self.plugins.write().push(descriptor);
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Constructs every configured adapter, in configuration order, and hands
    /// it to the robot.
    fn load_adapters(&self) -> RuntimeResult<()> {
        let factories = self.factories.read();

        for name in &self.config.adapters {
            let factory = factories
                .get(name)
                .ok_or_else(|| RuntimeError::UnknownAdapterType(name.clone()))?;
            let adapter = factory(self.config.adapter_config(name))?;

            if adapter.name() != name {
                warn!(
                    configured = %name,
                    actual = adapter.name(),
                    "Adapter name differs from its configured name; envelopes will carry the actual name"
                );
            }
            self.robot.add_adapter(adapter);
        }
        drop(factories);

        self.advance(LifecycleState::AdaptersLoaded)
    }

    /// Initializes every registered plugin.
    ///
    /// A plugin that fails to classify or initialize is logged and skipped;
    /// the remaining plugins still load.
    async fn load_plugins(&self) -> RuntimeResult<()> {
        let descriptors = self.plugins.read().clone();
        let mut loaded = 0usize;

        for descriptor in descriptors {
            let plugin = match descriptor.instantiate() {
                Ok(plugin) => plugin,
                Err(e) => {
                    error!(plugin = descriptor.name, error = %e, "Skipping plugin");
                    continue;
                }
            };

            let ctx = Arc::new(PluginLoadContext::new(
                Arc::new(self.config.plugin_config(plugin.name())),
                self.services.clone(),
            ));

            match plugin.initialize(&self.robot, ctx).await {
                Ok(()) => loaded += 1,
                Err(e) => error!(plugin = plugin.name(), error = %e, "Failed to load plugin"),
            }
        }

        info!(loaded, listeners = self.robot.listener_count(), "Plugins loaded");
        self.advance(LifecycleState::PluginsLoaded)
    }

    /// Loads adapters and plugins, then spawns each adapter's `run` loop.
    ///
    /// When every adapter's `run` has returned, the shutdown token is
    /// cancelled.
    pub async fn start(&self) -> RuntimeResult<()> {
        self.load_adapters()?;
        self.load_plugins().await?;

        let dispatcher: BoxedDispatcher = Arc::new(self.robot.clone());
        let adapters: Vec<BoxedAdapter> = self
            .config
            .adapters
            .iter()
            .filter_map(|name| self.robot.adapter(name))
            .collect();
        let remaining = Arc::new(AtomicUsize::new(adapters.len()));

        let mut tasks = self.tasks.lock();
        for adapter in adapters {
            let ctx = AdapterContext::new(
                Arc::clone(&dispatcher),
                Arc::clone(&adapter),
                self.shutdown.child_token(),
            );
            let remaining = Arc::clone(&remaining);
            let shutdown = self.shutdown.clone();

            let name = adapter.name().to_string();
            debug!(adapter = %name, "Spawning adapter task");

            tasks.push(tokio::spawn(async move {
                match adapter.run(ctx).await {
                    Ok(()) => info!(adapter = %name, "Adapter stopped"),
                    Err(e) => error!(adapter = %name, error = %e, "Adapter run failed"),
                }
                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                    info!("All adapters stopped");
                    shutdown.cancel();
                }
            }));
        }
        drop(tasks);

        self.advance(LifecycleState::Running)?;
        info!(bot = self.robot.name(), "Runtime started");
        Ok(())
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stops the runtime.
    ///
    /// Cancels the shutdown token, closes every adapter through the robot and
    /// waits for the adapter tasks to finish. Calling it again is a no-op.
    pub async fn stop(&self) -> RuntimeResult<()> {
        match self.state() {
            LifecycleState::ShuttingDown | LifecycleState::Stopped => {
                warn!("Runtime is already stopping");
                return Ok(());
            }
            _ => {}
        }

        self.advance(LifecycleState::ShuttingDown)?;
        info!("Stopping runtime");

        self.shutdown.cancel();
        self.robot.shutdown().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for mut handle in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Adapter task panicked"),
                Err(_) => {
                    warn!("Adapter task did not finish in time, aborting");
                    handle.abort();
                }
            }
        }

        self.advance(LifecycleState::Stopped)?;
        info!("Runtime stopped");
        Ok(())
    }

    /// Runs until Ctrl+C, SIGTERM, or until every adapter has stopped.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start_or_stop().await?;
        info!("Switchboard is now running. Press Ctrl+C to stop.");

        tokio::select! {
            _ = wait_for_signal() => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.stop().await
    }

    /// Runs until `shutdown` resolves or every adapter has stopped.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start_or_stop().await?;

        tokio::select! {
            _ = shutdown => {}
            _ = self.shutdown.cancelled() => {}
        }

        self.stop().await
    }

    /// Starts the runtime; on failure, releases whatever was loaded.
    async fn start_or_stop(&self) -> RuntimeResult<()> {
        if let Err(e) = self.start().await {
            error!(error = %e, "Runtime failed to start");
            if let Err(stop_err) = self.stop().await {
                error!(error = %stop_err, "Error while stopping after failed start");
            }
            return Err(e);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SwitchboardRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchboardRuntime")
            .field("robot", &self.robot)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn default_services(config: &SwitchboardConfig, users: Option<Arc<dyn UserStore>>) -> Services {
    let lookup = ValueLookup::new(Value::Object(config.settings.clone()));
    let users = users.unwrap_or_else(|| Arc::new(MemoryUserStore::new()));
    Services::new(Arc::new(lookup), users)
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => on_ctrl_c(result).await,
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                on_ctrl_c(signal::ctrl_c().await).await;
            }
        }
    }

    #[cfg(not(unix))]
    on_ctrl_c(signal::ctrl_c().await).await;
}

async fn on_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`SwitchboardRuntime`] with custom configuration.
///
/// ```rust,ignore
/// let runtime = SwitchboardRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .on(LifecycleState::Running, |robot| info!(bot = robot.name(), "up"))
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    services: Option<Services>,
    users: Option<Arc<dyn UserStore>>,
    lifecycle: Lifecycle,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            services: None,
            users: None,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SwitchboardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Replaces the services handed to plugins.
    pub fn services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// Replaces only the user store; configuration lookup still reads `[settings]`.
    pub fn user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    /// Registers a lifecycle hook, including for `Configured`.
    pub fn on<F>(mut self, state: LifecycleState, hook: F) -> Self
    where
        F: Fn(&Robot) + Send + Sync + 'static,
    {
        self.lifecycle.on(state, hook);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<SwitchboardRuntime> {
        let config = self.config_loader.load()?;
        let services = match self.services {
            Some(services) => services,
            None => default_services(&config, self.users),
        };
        SwitchboardRuntime::assemble(config, services, self.lifecycle)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
