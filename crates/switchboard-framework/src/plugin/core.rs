use std::sync::Arc;

use serde_json::Value;
use switchboard_core::Message;
use tracing::{debug, info};

use super::descriptor::PluginKind;
use crate::error::{BoxError, PatternError, PluginError};
use crate::listener::{ListenerOptions, MatchData};
use crate::response::Response;
use crate::robot::Robot;
use crate::service::{ConfigLookup, Services, UserStore};

// ─── PluginLoadContext ────────────────────────────────────────────────────────

/// Context passed to a plugin at load time.
///
/// Provides the plugin's configuration section (an empty JSON object when the
/// section is absent) and the external services.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize, Default)]
/// #[serde(default)]
/// struct GreetConfig { greeting: String }
///
/// fn init(robot: Robot, ctx: Arc<PluginLoadContext>) -> BoxFuture<'static, Result<(), BoxError>> {
///     Box::pin(async move {
///         let cfg: GreetConfig = ctx.get_config()?;
///         info!("greeting = {}", cfg.greeting);
///         Ok(())
///     })
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PluginLoadContext {
    plugin_config: Arc<Value>,
    services: Services,
}

impl PluginLoadContext {
    pub fn new(plugin_config: Arc<Value>, services: Services) -> Self {
        Self {
            plugin_config,
            services,
        }
    }

    /// A context with an empty configuration section and default services.
    pub fn empty() -> Self {
        Self::new(Arc::new(Value::Object(Default::default())), Services::default())
    }

    /// Deserialise the plugin config section into `T`.
    ///
    /// Returns `Err` if the config is missing required fields or has the wrong
    /// shape; use `#[serde(default)]` on the struct to make all fields optional.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.plugin_config.as_ref())
    }

    /// Returns the raw config section.
    pub fn raw_config(&self) -> &Value {
        &self.plugin_config
    }

    /// Global configuration lookup.
    pub fn config(&self) -> &dyn ConfigLookup {
        self.services.config.as_ref()
    }

    /// Token-to-user resolution.
    pub fn users(&self) -> &dyn UserStore {
        self.services.users.as_ref()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }
}

// ─── Plugin ───────────────────────────────────────────────────────────────────

/// A live plugin, resolved from a [`PluginDescriptor`](super::PluginDescriptor).
#[derive(Debug, Clone)]
pub struct Plugin {
    name: &'static str,
    description: &'static str,
    kind: PluginKind,
}

impl Plugin {
    pub(crate) fn new(name: &'static str, description: &'static str, kind: PluginKind) -> Self {
        Self {
            name,
            description,
            kind,
        }
    }

    /// Returns the plugin's display name.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn description(&self) -> &str {
        self.description
    }

    pub fn kind(&self) -> &PluginKind {
        &self.kind
    }

    /// Loads the plugin into `robot`.
    ///
    /// Legacy plugins register their listeners directly. Modern plugins run
    /// `init`; their `handle`, if any, is then registered as a listener for
    /// every text message, with id `<name>::handle`.
    pub async fn initialize(
        &self,
        robot: &Robot,
        ctx: Arc<PluginLoadContext>,
    ) -> Result<(), PluginError> {
        debug!(plugin = self.name, kind = self.kind.as_str(), "Initializing plugin");

        match self.kind {
            PluginKind::Legacy(register) => {
                register(robot).map_err(|e| self.failure(e))?;
            }
            PluginKind::Modern { init, handle } => {
                init(robot.clone(), ctx).await.map_err(|e| self.failure(e))?;

                if let Some(handle) = handle {
                    let options = ListenerOptions::new()
                        .id(format!("{}::handle", self.name))
                        .meta("plugin", self.name);
                    robot.listen(
                        |message: &Message| {
                            message
                                .as_text()
                                .map(|text| MatchData::whole(text.text.clone()))
                        },
                        options,
                        move |res: Response| handle(res),
                    );
                }
            }
        }

        info!(plugin = self.name, kind = self.kind.as_str(), "Plugin loaded");
        Ok(())
    }

    fn failure(&self, err: BoxError) -> PluginError {
        let name = self.name.to_string();
        match err.downcast::<PatternError>() {
            Ok(source) => PluginError::Pattern {
                name,
                source: *source,
            },
            Err(source) => PluginError::Init { name, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginDescriptor;
    use crate::service::{MemoryUserStore, ValueLookup};
    use crate::testing::robot_with_adapter;
    use futures::future::BoxFuture;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchboard_core::User;

    fn text(body: &str) -> Message {
        Message::text(User::new("u1"), "general", body)
    }

    fn register_ping(robot: &Robot) -> Result<(), BoxError> {
        robot.hear("ping", "ping", |res: Response| async move { res.send("PONG").await })?;
        Ok(())
    }

    fn register_broken(robot: &Robot) -> Result<(), BoxError> {
        robot.hear("(unclosed", (), |_res: Response| async {})?;
        Ok(())
    }

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct GreetConfig {
        greeting: String,
    }

    fn init_greet(
        robot: Robot,
        ctx: Arc<PluginLoadContext>,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(async move {
            let cfg: GreetConfig = ctx.get_config()?;
            robot.respond("hello", "greet.hello", move |_res: Response| {
                let greeting = cfg.greeting.clone();
                async move { greeting }
            })?;
            Ok(())
        })
    }

    fn init_failing(
        _robot: Robot,
        _ctx: Arc<PluginLoadContext>,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(async { Err(BoxError::from("database unavailable")) })
    }

    fn init_noop(
        _robot: Robot,
        _ctx: Arc<PluginLoadContext>,
    ) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(async { Ok(()) })
    }

    static HANDLED: AtomicUsize = AtomicUsize::new(0);

    fn count_handle(_res: Response) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(async {
            HANDLED.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_legacy_plugin_registers_listeners() {
        let (robot, adapter, origin) = robot_with_adapter();
        let plugin = PluginDescriptor::legacy("ping", register_ping).instantiate().unwrap();

        plugin.initialize(&robot, Arc::new(PluginLoadContext::empty())).await.unwrap();
        robot.receive(text("ping"), &origin, None).await;

        assert_eq!(robot.listener_count(), 1);
        assert_eq!(adapter.sent()[0].2, vec!["PONG".to_string()]);
    }

    #[tokio::test]
    async fn test_modern_plugin_reads_its_config() {
        let (robot, adapter, origin) = robot_with_adapter();
        let plugin = PluginDescriptor::modern("greet", init_greet).instantiate().unwrap();
        let ctx = PluginLoadContext::new(
            Arc::new(json!({ "greeting": "hi there" })),
            Services::default(),
        );

        plugin.initialize(&robot, Arc::new(ctx)).await.unwrap();
        robot.receive(text("hubot hello"), &origin, None).await;

        assert_eq!(
            adapter.sent(),
            vec![("reply", "general".to_string(), vec!["hi there".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_modern_handle_sees_every_text_message() {
        let (robot, _, origin) = robot_with_adapter();
        let plugin = PluginDescriptor::modern("counter", init_noop)
            .with_handle(count_handle)
            .instantiate()
            .unwrap();

        plugin.initialize(&robot, Arc::new(PluginLoadContext::empty())).await.unwrap();
        robot.receive(text("one"), &origin, None).await;
        robot.receive(text("two"), &origin, None).await;

        assert_eq!(HANDLED.load(Ordering::SeqCst), 2);
        assert_eq!(robot.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_init_failure_is_reported_with_plugin_name() {
        let robot = Robot::new("hubot");
        let plugin = PluginDescriptor::modern("db", init_failing).instantiate().unwrap();

        let err = plugin
            .initialize(&robot, Arc::new(PluginLoadContext::empty()))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Init { ref name, .. } if name == "db"));
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_reported_as_pattern_error() {
        let robot = Robot::new("hubot");
        let plugin = PluginDescriptor::legacy("broken", register_broken).instantiate().unwrap();

        let err = plugin
            .initialize(&robot, Arc::new(PluginLoadContext::empty()))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::Pattern { source: PatternError::Regex(_), .. }));
    }

    #[tokio::test]
    async fn test_context_exposes_services() {
        let users = Arc::new(MemoryUserStore::new());
        users.insert("tok", "alice");
        let services = Services::new(Arc::new(ValueLookup::new(json!({ "env": "prod" }))), users);
        let ctx = PluginLoadContext::new(Arc::new(json!({})), services);

        assert_eq!(ctx.config().get("env"), Some(json!("prod")));
        assert_eq!(ctx.users().user_from_auth_token("tok").await.as_deref(), Some("alice"));
        assert!(ctx.get_config::<GreetConfig>().unwrap().greeting.is_empty());
    }
}
