//! Command-line control for BluOS network players.
//!
//! `blue` talks to a player's HTTP API (XML answers on port 11000), browses
//! the local library and a streaming service through the player, manages the
//! play queue, and can ask a chat model for albums similar to the one
//! playing.
//!
//! Core modules:
//! - [`transport`] - HTTP access to the player
//! - [`xml`] - XML answers as JSON values
//! - [`query_path`] - Path expressions over those values
//! - [`device`] - Cached queries and control requests
//! - [`library`] - Local library albums, random picks
//! - [`queue`] - Queue overview, album skipping, cleanup
//! - [`online`] - Streaming service search and favourites
//! - [`recommend`] - AI recommendations and explanations
//!
//! ### Supporting Modules
//!
//! - [`alias`] - Prefix resolution of abbreviated command names
//! - [`dispatch`] - Command registry and handler plumbing
//! - [`commands`] - The command tables and handlers
//! - [`cache`] - File-backed result cache with expiry
//! - [`db`] - Random-album history in SQLite
//! - [`picker`] - Interactive selection through `fzf`
//! - [`volume`] - Volume targets and ramping
//! - [`song`] - Player status
//! - [`config`] - Defaults, platform directories, keys file
//! - [`cli`] - Clap definitions
//! - [`completion`] - Shell completion scripts
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use blue::cache::ResultCache;
//! use blue::device::DeviceQueryClient;
//! use blue::transport::HttpTransport;
//! use std::time::Duration;
//!
//! let transport = HttpTransport::new("192.168.1.20", 11000, Duration::from_secs(10))?;
//! let cache = ResultCache::open(std::env::temp_dir().join("blue"))?;
//! let query = DeviceQueryClient::new(&transport, &cache);
//!
//! let status = query.status()?;
//! println!("{status}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Device access returns [`transport::DeviceError`], volume ramps
//! [`volume::VolumeError`], the recommendation provider
//! [`recommend::ProviderError`]. Command handlers wrap all of them in
//! `anyhow::Error` with context, and [`dispatch::Outcome`] maps the result to
//! an exit code.
//!
//! ## Logging
//!
//! Everything logs through `log`; the binary installs `env_logger`, so
//! `RUST_LOG=blue=debug blue queue` shows every request and cache hit.

pub mod alias;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod device;
pub mod dispatch;
pub mod library;
pub mod online;
pub mod picker;
pub mod query_path;
pub mod queue;
pub mod recommend;
pub mod song;
pub mod transport;
pub mod volume;
pub mod xml;
