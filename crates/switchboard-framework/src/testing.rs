//! Test doubles shared by the framework's unit tests.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use switchboard_core::{Adapter, AdapterContext, AdapterResult, BoxedAdapter, Envelope};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::robot::Robot;

/// One outbound call: action, room, strings.
pub(crate) type Sent = (&'static str, String, Vec<String>);

/// An adapter that records every outbound call.
#[derive(Default)]
pub(crate) struct RecordingAdapter {
    name: &'static str,
    sent: Mutex<Vec<Sent>>,
    closed: AtomicUsize,
}

impl RecordingAdapter {
    pub(crate) fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            ..Default::default()
        })
    }

    fn record(&self, action: &'static str, envelope: &Envelope, strings: &[String]) {
        self.sent
            .lock()
            .push((action, envelope.room().to_string(), strings.to_vec()));
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.record("send", envelope, strings);
        Ok(())
    }

    async fn reply(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.record("reply", envelope, strings);
        Ok(())
    }

    async fn emote(&self, envelope: &Envelope, strings: &[String]) -> AdapterResult<()> {
        self.record("emote", envelope, strings);
        Ok(())
    }

    async fn run(&self, _ctx: AdapterContext) -> AdapterResult<()> {
        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A robot named "hubot" with a recording adapter registered as "shell".
pub(crate) fn robot_with_adapter() -> (Robot, Arc<RecordingAdapter>, BoxedAdapter) {
    let robot = Robot::new("hubot");
    let adapter = RecordingAdapter::new("shell");
    let boxed: BoxedAdapter = adapter.clone();
    robot.add_adapter(boxed.clone());
    (robot, adapter, boxed)
}

/// Formatted log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Captures every event on the current thread until the guard is dropped.
pub(crate) fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
