//! The shell adapter.
//!
//! Every non-empty input line becomes a text message from the configured
//! user in the configured room. Outbound strings are written one per line:
//!
//! | action | output |
//! |--------|--------|
//! | `send` | `<text>` |
//! | `reply` | `<user>: <text>` |
//! | `emote` | `* <text>` |
//!
//! `topic` and `play` are ignored.
//!
//! Stdin is read on a dedicated OS thread and handed over through a channel,
//! so a pending read never holds up runtime shutdown.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use async_trait::async_trait;
use switchboard_core::{
    Adapter, AdapterContext, AdapterError, AdapterResult, CancellationToken, ConfigurableAdapter,
    Envelope, Message,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, trace, warn};

use crate::config::ShellConfig;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Lines buffered between the stdin thread and the adapter.
const STDIN_BUFFER: usize = 16;

/// Where input lines come from.
enum Input {
    Stdin,
    Reader(Reader),
    Channel(mpsc::Receiver<io::Result<String>>),
}

/// An opened [`Input`].
enum LineSource {
    Reader(Lines<Reader>),
    Channel(mpsc::Receiver<io::Result<String>>),
}

impl LineSource {
    fn open(input: Input) -> io::Result<Self> {
        Ok(match input {
            Input::Stdin => Self::Channel(spawn_stdin_reader()?),
            Input::Reader(reader) => Self::Reader(reader.lines()),
            Input::Channel(rx) => Self::Channel(rx),
        })
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self {
            Self::Reader(lines) => lines.next_line().await,
            Self::Channel(rx) => rx.recv().await.transpose(),
        }
    }
}

/// Reads stdin line by line on its own thread.
///
/// The thread exits at end of input, on a read error, or once the receiver is
/// gone and the next line arrives. It is never joined.
fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel(STDIN_BUFFER);

    thread::Builder::new()
        .name("switchboard-shell-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;

    Ok(rx)
}

/// A line-oriented adapter over an input source and an async writer.
pub struct ShellAdapter {
    config: ShellConfig,
    /// Taken by the first call to `run`.
    input: Mutex<Option<Input>>,
    output: Mutex<Output>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl ShellAdapter {
    /// Creates an adapter reading stdin and writing stdout.
    pub fn new(config: ShellConfig) -> Self {
        Self::from_parts(config, Input::Stdin, Box::new(tokio::io::stdout()))
    }

    /// Creates an adapter over the given reader and writer.
    pub fn with_io<R, W>(config: ShellConfig, input: R, output: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::from_parts(config, Input::Reader(Box::new(input)), Box::new(output))
    }

    /// Creates an adapter fed by lines sent on `lines`.
    pub fn with_channel<W>(
        config: ShellConfig,
        lines: mpsc::Receiver<io::Result<String>>,
        output: W,
    ) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::from_parts(config, Input::Channel(lines), Box::new(output))
    }

    fn from_parts(config: ShellConfig, input: Input, output: Output) -> Self {
        Self {
            config,
            input: Mutex::new(Some(input)),
            output: Mutex::new(output),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn write_lines(&self, lines: &[String]) -> AdapterResult<()> {
        if self.is_closed() {
            return Err(AdapterError::Closed(self.name().to_string()));
        }

        let mut output = self.output.lock().await;
        for line in lines {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;
        Ok(())
    }

    async fn write_prompt(&self) -> AdapterResult<()> {
        if let Some(prompt) = &self.config.prompt {
            let mut output = self.output.lock().await;
            output.write_all(prompt.as_bytes()).await?;
            output.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    fn name(&self) -> &str {
        "shell"
    }

    async fn send(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.write_lines(strings).await
    }

    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let user = envelope.user().display_name();
        let lines: Vec<String> = strings.iter().map(|s| format!("{user}: {s}")).collect();
        self.write_lines(&lines).await
    }

    async fn emote(&self, _envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        let lines: Vec<String> = strings.iter().map(|s| format!("* {s}")).collect();
        self.write_lines(&lines).await
    }

    async fn run(&self, ctx: AdapterContext) -> AdapterResult<()> {
        let input = self.input.lock().await.take().ok_or_else(|| {
            AdapterError::internal("shell input was already consumed by an earlier run")
        })?;
        let mut lines = LineSource::open(input)?;
        let user = self.config.user();

        info!(user = %user, room = %self.config.room, "Shell adapter running");

        loop {
            if self.is_closed() || ctx.shutdown_token().is_cancelled() {
                break;
            }

            self.write_prompt().await?;

            let line = tokio::select! {
                biased;
                _ = ctx.shutdown_token().cancelled() => break,
                _ = self.shutdown.cancelled() => break,
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Shell input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read shell input");
                    return Err(e.into());
                }
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            trace!(text, "Shell input");
            ctx.receive(Message::text(user.clone(), self.config.room.clone(), text))
                .await;
        }

        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shutdown.cancel();
        self.output.lock().await.flush().await?;
        debug!("Shell adapter closed");
        Ok(())
    }
}

impl ConfigurableAdapter for ShellAdapter {
    type Config = ShellConfig;

    fn adapter_name() -> &'static str {
        "shell"
    }

    fn from_config(config: Self::Config) -> AdapterResult<Arc<Self>> {
        Ok(Arc::new(Self::new(config)))
    }
}

impl std::fmt::Debug for ShellAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellAdapter")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use switchboard_core::User;
    use switchboard_framework::{Response, Robot};
    use tokio::io::{AsyncReadExt, BufReader, DuplexStream, duplex};

    fn adapter_over(
        config: ShellConfig,
        input: &'static [u8],
    ) -> (Arc<ShellAdapter>, DuplexStream) {
        let (writer, reader) = duplex(64 * 1024);
        let adapter = Arc::new(ShellAdapter::with_io(config, BufReader::new(input), writer));
        (adapter, reader)
    }

    fn context(robot: &Robot, adapter: &Arc<ShellAdapter>) -> AdapterContext {
        AdapterContext::new(Arc::new(robot.clone()), adapter.clone(), CancellationToken::new())
    }

    async fn read_exactly(reader: &mut DuplexStream, expected: &str) -> String {
        let mut buf = vec![0u8; expected.len()];
        reader.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    /// A robot counting every `ping` it hears.
    fn counting_robot() -> (Robot, Arc<AtomicUsize>) {
        let robot = Robot::new("hubot");
        let heard = Arc::new(AtomicUsize::new(0));
        let counter = heard.clone();
        robot
            .hear("ping", (), move |_res: Response| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        (robot, heard)
    }

    #[tokio::test]
    async fn test_lines_are_dispatched_and_answers_printed() {
        let robot = Robot::new("hubot");
        robot
            .hear("ping", (), |res: Response| async move { res.send("PONG").await })
            .unwrap();
        robot
            .respond("who am i", (), |res: Response| async move {
                let name = res.user().display_name().to_string();
                res.reply(format!("you are {name}")).await
            })
            .unwrap();

        let input = b"ping\n\n   hubot who am i  \n";
        let (adapter, mut out) = adapter_over(ShellConfig::default(), input);
        robot.add_adapter(adapter.clone());

        adapter.run(context(&robot, &adapter)).await.unwrap();

        let expected = "PONG\nShell: you are Shell\n";
        assert_eq!(read_exactly(&mut out, expected).await, expected);
    }

    #[tokio::test]
    async fn test_prompt_is_written_before_each_read() {
        let config = ShellConfig {
            prompt: Some("> ".to_string()),
            ..Default::default()
        };
        let (adapter, mut out) = adapter_over(config, b"hello\n");
        let robot = Robot::new("hubot");
        robot.add_adapter(adapter.clone());

        adapter.run(context(&robot, &adapter)).await.unwrap();

        assert_eq!(read_exactly(&mut out, "> > ").await, "> > ");
    }

    #[tokio::test]
    async fn test_reply_and_emote_formatting() {
        let (adapter, mut out) = adapter_over(ShellConfig::default(), b"");
        let envelope = Envelope::new(User::new("u7").with_name("alice"), "Shell", "shell");

        adapter.reply(&envelope, &["hi".to_string()]).await.unwrap();
        adapter.emote(&envelope, &["waves".to_string()]).await.unwrap();
        adapter.topic(&envelope, &["ignored".to_string()]).await.unwrap();
        adapter
            .send(&envelope, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let expected = "alice: hi\n* waves\na\nb\n";
        assert_eq!(read_exactly(&mut out, expected).await, expected);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_ends_run() {
        let (input, _keep_open) = duplex(64);
        let (output, _sink) = duplex(64);
        let adapter = Arc::new(ShellAdapter::with_io(
            ShellConfig::default(),
            BufReader::new(input),
            output,
        ));
        let robot = Robot::new("hubot");
        robot.add_adapter(adapter.clone());

        let ctx = context(&robot, &adapter);
        let running = {
            let adapter = adapter.clone();
            tokio::spawn(async move { adapter.run(ctx).await })
        };

        adapter.close().await.unwrap();
        adapter.close().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), running)
            .await
            .expect("run did not stop after close")
            .unwrap();
        assert!(result.is_ok());

        let envelope = Envelope::new(User::new("u1"), "Shell", "shell");
        assert!(matches!(
            adapter.send(&envelope, &["late".to_string()]).await,
            Err(AdapterError::Closed(_))
        ));
    }

    #[tokio::test]
    async fn test_buffered_input_is_ignored_after_close() {
        for _ in 0..50 {
            let (robot, heard) = counting_robot();
            let (adapter, _out) = adapter_over(ShellConfig::default(), b"ping\nping\nping\nping\n");
            robot.add_adapter(adapter.clone());

            adapter.close().await.unwrap();
            adapter.run(context(&robot, &adapter)).await.unwrap();

            assert_eq!(heard.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_buffered_input_is_ignored_after_shutdown_token() {
        let (robot, heard) = counting_robot();
        let (adapter, _out) = adapter_over(ShellConfig::default(), b"ping\nping\n");
        robot.add_adapter(adapter.clone());

        let token = CancellationToken::new();
        token.cancel();
        let ctx = AdapterContext::new(Arc::new(robot.clone()), adapter.clone(), token);
        adapter.run(ctx).await.unwrap();

        assert_eq!(heard.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_channel_input_ends_when_sender_drops() {
        let (robot, heard) = counting_robot();
        let (tx, rx) = mpsc::channel(4);
        let (output, _sink) = duplex(64);
        let adapter = Arc::new(ShellAdapter::with_channel(ShellConfig::default(), rx, output));
        robot.add_adapter(adapter.clone());

        tx.send(Ok("ping".to_string())).await.unwrap();
        tx.send(Ok("  ".to_string())).await.unwrap();
        tx.send(Ok("ping".to_string())).await.unwrap();
        drop(tx);

        adapter.run(context(&robot, &adapter)).await.unwrap();

        assert_eq!(heard.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_channel_read_error_fails_run() {
        let robot = Robot::new("hubot");
        let (tx, rx) = mpsc::channel(1);
        let (output, _sink) = duplex(64);
        let adapter = Arc::new(ShellAdapter::with_channel(ShellConfig::default(), rx, output));

        tx.send(Err(io::Error::other("tty gone"))).await.unwrap();

        let result = adapter.run(context(&robot, &adapter)).await;
        assert!(matches!(result, Err(AdapterError::Io(_))));
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let (adapter, _out) = adapter_over(ShellConfig::default(), b"");
        let robot = Robot::new("hubot");
        let ctx = context(&robot, &adapter);

        adapter.run(ctx.clone()).await.unwrap();
        assert!(matches!(adapter.run(ctx).await, Err(AdapterError::Internal(_))));
    }
}
