//! The demo's plugins.

use std::sync::Arc;

use serde::Deserialize;
use switchboard::prelude::*;
use tracing::{debug, info};

/// `ping`, `echo`, `decide`, `dance`, and a fallback for unmatched commands.
pub const PING: PluginDescriptor = PluginDescriptor::legacy("ping", register_ping)
    .with_description("Liveness checks and small talk");

/// Greets users with the configured greeting.
pub const GREETER: PluginDescriptor =
    PluginDescriptor::modern("greeter", init_greeter).with_description("Says hello");

/// Announces deployments, defaulting to `settings.deploy.default_env`.
pub const DEPLOY: PluginDescriptor =
    PluginDescriptor::modern("deploy", init_deploy).with_description("Pretends to deploy");

/// Logs every inbound text message.
///
/// Its handler matches every text message, so the `ping` fallback never fires
/// while it is loaded.
pub const AUDIT: PluginDescriptor = PluginDescriptor::modern("audit", init_audit)
    .with_handle(audit_message)
    .with_description("Logs every message");

// ============================================================================
// ping (legacy)
// ============================================================================

fn register_ping(robot: &Robot) -> Result<(), BoxError> {
    robot.hear(Pattern::with_flags("^ping$", "i"), "ping.hear", |res: Response| async move {
        res.send("PONG").await
    })?;

    robot.respond("echo (.+)", "ping.echo", |res: Response| async move {
        res.group(1).map(str::to_string)
    })?;

    robot.respond("decide", "ping.decide", |res: Response| async move {
        res.random(&["yes", "no", "maybe"]).map(|answer| answer.to_string())
    })?;

    robot.respond("dance", "ping.dance", |res: Response| async move {
        res.emote("dances").await
    })?;

    robot.catch_all("ping.fallback", |res: Response| async move {
        let addressed = res
            .message()
            .body()
            .is_some_and(|text| addressed_to(res.robot(), text));
        addressed.then(|| "Sorry, I didn't catch that.".to_string())
    });

    Ok(())
}

/// Whether `text` starts with the robot's name or alias.
fn addressed_to(robot: &Robot, text: &str) -> bool {
    let text = text.trim_start().trim_start_matches('@').to_lowercase();
    let name = robot.name().to_lowercase();
    text.starts_with(&name)
        || robot
            .alias()
            .is_some_and(|alias| text.starts_with(&alias.to_lowercase()))
}

// ============================================================================
// greeter (modern)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GreeterConfig {
    greeting: String,
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
        }
    }
}

fn init_greeter(
    robot: Robot,
    ctx: Arc<PluginLoadContext>,
) -> BoxFuture<'static, Result<(), BoxError>> {
    Box::pin(async move {
        let config: GreeterConfig = ctx.get_config()?;
        info!(greeting = %config.greeting, "Greeter ready");

        robot.respond(r"(?:hello|hi)\b", "greeter.hello", move |res: Response| {
            let greeting = config.greeting.clone();
            async move { format!("{greeting}, {}!", res.user()) }
        })?;
        Ok(())
    })
}

// ============================================================================
// deploy (modern)
// ============================================================================

fn init_deploy(
    robot: Robot,
    ctx: Arc<PluginLoadContext>,
) -> BoxFuture<'static, Result<(), BoxError>> {
    Box::pin(async move {
        let default_env = ctx
            .config()
            .get("deploy.default_env")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "production".to_string());

        robot.respond(r"deploy(?: (?P<env>\w+))?", "deploy.run", move |res: Response| {
            let default_env = default_env.clone();
            async move {
                let target = res.named("env").unwrap_or(default_env.as_str()).to_string();
                res.send(format!("Deploying to {target}")).await
            }
        })?;
        Ok(())
    })
}

// ============================================================================
// audit (modern, with handle)
// ============================================================================

fn init_audit(
    _robot: Robot,
    _ctx: Arc<PluginLoadContext>,
) -> BoxFuture<'static, Result<(), BoxError>> {
    Box::pin(async { Ok(()) })
}

fn audit_message(res: Response) -> BoxFuture<'static, Result<(), BoxError>> {
    Box::pin(async move {
        debug!(
            user = %res.user(),
            room = res.envelope().room(),
            text = res.message().body().unwrap_or_default(),
            "Message"
        );
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use switchboard::core::CancellationToken;
    use switchboard::framework::{MemoryUserStore, Services, ValueLookup};
    use tokio::io::{AsyncReadExt, BufReader, DuplexStream, duplex};

    async fn load(robot: &Robot, descriptor: PluginDescriptor, ctx: PluginLoadContext) {
        descriptor
            .instantiate()
            .unwrap()
            .initialize(robot, Arc::new(ctx))
            .await
            .unwrap();
    }

    /// Feeds `input` through a shell adapter and returns what it printed.
    async fn converse(robot: &Robot, input: &'static [u8], expected_len: usize) -> String {
        let (writer, mut reader): (DuplexStream, DuplexStream) = duplex(64 * 1024);
        let adapter = Arc::new(ShellAdapter::with_io(
            ShellConfig::default(),
            BufReader::new(input),
            writer,
        ));
        robot.add_adapter(adapter.clone());

        let ctx = AdapterContext::new(
            Arc::new(robot.clone()),
            adapter.clone(),
            CancellationToken::new(),
        );
        adapter.run(ctx).await.unwrap();

        let mut buf = vec![0u8; expected_len];
        reader.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_ping_plugin_conversation() {
        let robot = Robot::with_alias("hubot", "/");
        load(&robot, PING, PluginLoadContext::empty()).await;

        let expected = "PONG\nShell: hello world\n* dances\nShell: Sorry, I didn't catch that.\n";
        let output = converse(
            &robot,
            b"PING\nhubot echo hello world\n/dance\nhubot what?\nnot for the bot\n",
            expected.len(),
        )
        .await;

        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn test_greeter_uses_configured_greeting() {
        let robot = Robot::new("hubot");
        let ctx = PluginLoadContext::new(
            Arc::new(json!({ "greeting": "Howdy" })),
            Services::default(),
        );
        load(&robot, GREETER, ctx).await;

        let expected = "Shell: Howdy, Shell!\n";
        assert_eq!(converse(&robot, b"hubot hello\n", expected.len()).await, expected);
    }

    #[tokio::test]
    async fn test_deploy_defaults_to_settings() {
        let robot = Robot::new("hubot");
        let services = Services::new(
            Arc::new(ValueLookup::new(json!({ "deploy": { "default_env": "staging" } }))),
            Arc::new(MemoryUserStore::new()),
        );
        load(&robot, DEPLOY, PluginLoadContext::new(Arc::new(json!({})), services)).await;

        let expected = "Deploying to staging\nDeploying to prod\n";
        let output = converse(&robot, b"hubot deploy\nhubot deploy prod\n", expected.len()).await;
        assert_eq!(output, expected);
    }

    #[test]
    fn test_addressed_to() {
        let robot = Robot::with_alias("Hubot", "/");
        assert!(addressed_to(&robot, "@hubot help"));
        assert!(addressed_to(&robot, "/help"));
        assert!(!addressed_to(&robot, "help hubot"));
    }
}
