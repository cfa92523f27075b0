//! # Command-Line Interface Module
//!
//! Clap definitions for `blue`. The top level only knows the global options
//! and a free-form command line: the first word is resolved against the
//! command table by the dispatcher (so abbreviations such as `vol` or `pau`
//! work), and the rest is parsed by that command's own argument struct.
//!
//! ## Examples
//!
//! ```bash
//! blue --host 192.168.1.20 queue
//! blue vol +10
//! blue online se -a "blue train"
//! blue clean --pick
//! ```

use crate::config::{DEFAULT_HOST, DEFAULT_PORT};
use crate::volume::VolumeTarget;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global options must come before the command; everything from the command
/// word on is handed to the dispatcher untouched.
#[derive(Parser, Debug)]
#[command(name = "blue")]
#[command(about = "Blue: command-line control for BluOS players")]
#[command(version)]
pub struct Args {
    /// Player host name or address
    #[arg(long, env = "BLUE_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Player HTTP port
    #[arg(long, env = "BLUE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory for cached player and AI answers
    #[arg(long, env = "BLUE_CACHE_DIR", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,

    /// Command (may be abbreviated) followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Commands that take no arguments.
#[derive(Parser, Debug)]
pub struct NoArgs {}

/// Enqueue random albums from the local library
#[derive(Parser, Debug)]
pub struct RandomArgs {
    /// How many albums to add
    #[arg(default_value_t = 1)]
    pub count: usize,
}

/// Delete songs from the queue
#[derive(Parser, Debug)]
pub struct CleanupArgs {
    /// Clear the whole queue
    #[arg(short, long, conflicts_with = "pick")]
    pub all: bool,

    /// Pick an album in the queue and remove all of its songs
    #[arg(short, long)]
    pub pick: bool,
}

/// Browse the local library and enqueue albums
#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Pick albums directly instead of going through artists
    #[arg(short, long)]
    pub album: bool,
}

/// Show or set the volume
#[derive(Parser, Debug)]
pub struct VolumeArgs {
    /// New level: absolute (40) or relative (+10, -5)
    #[arg(allow_hyphen_values = true)]
    pub value: Option<VolumeTarget>,
}

/// Recommend albums similar to the one playing and enqueue them
#[derive(Parser, Debug)]
pub struct AiArgs {
    /// Only show what would be added
    #[arg(short, long)]
    pub test: bool,
}

/// Skip to the next track
#[derive(Parser, Debug)]
pub struct NextArgs {
    /// Skip to the first song of the next album instead
    #[arg(short, long)]
    pub album: bool,
}

/// Show or clear the query cache
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Remove every cached entry
    #[arg(long)]
    pub clear: bool,
}

/// Print a shell completion script
#[derive(Parser, Debug)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Search the streaming service and enqueue the result
#[derive(Parser, Debug)]
pub struct OnlineSearchArgs {
    /// What to search for; asked for when omitted
    pub keyword: Option<String>,

    /// Search albums
    #[arg(short, long, conflicts_with_all = ["song", "favourites"])]
    pub album: bool,

    /// Search songs
    #[arg(short, long, conflicts_with = "favourites")]
    pub song: bool,

    /// Browse favourite artists instead of searching
    #[arg(short, long, visible_alias = "favorites")]
    pub favourites: bool,
}

/// Add one album from each of several favourite artists
#[derive(Parser, Debug)]
pub struct FavouritesArgs {
    /// How many artists to take
    #[arg(default_value_t = 5)]
    pub count: usize,

    /// Pick a random album per artist instead of the latest
    #[arg(short = 'R', long)]
    pub random: bool,
}

/// Preview target
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Album id (`tracks`) or artist id (`album`)
    pub id: String,
}
