//! # Shell Adapter for Switchboard
//!
//! A line-oriented adapter: each line read from the input is handed to the
//! robot as a text message, and everything the robot sends back is written
//! to the output. By default it talks to stdin and stdout, which makes it the
//! adapter of choice for local development.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchboard_adapter_shell::ShellAdapter;
//! use switchboard_runtime::SwitchboardRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SwitchboardRuntime::builder().build()?;
//!     runtime.register_adapter::<ShellAdapter>();
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! Any `AsyncBufRead`/`AsyncWrite` pair works, which is how the adapter is
//! driven in tests:
//!
//! ```rust,ignore
//! let (writer, reader) = tokio::io::duplex(1024);
//! let adapter = ShellAdapter::with_io(ShellConfig::default(), &b"ping\n"[..], writer);
//! ```

mod adapter;
mod config;

pub use adapter::ShellAdapter;
pub use config::ShellConfig;
