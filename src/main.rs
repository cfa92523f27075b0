//! # Blue - BluOS Player Control
//!
//! Entry point: resolves the global options, builds the shared context and
//! hands the command line to the dispatcher.
//!
//! ## Usage
//!
//! ```bash
//! # Add three random albums from the library
//! blue random 3
//!
//! # Abbreviations work as long as they are unique
//! blue vol -5
//! blue on lat 10
//!
//! # Recommendations for the playing album, without adding anything
//! blue ai --test
//! ```

use anyhow::Result;
use blue::cache::ResultCache;
use blue::cli;
use blue::commands;
use blue::config::Config;
use blue::dispatch::{Context, Dispatcher, Outcome, Registry};
use blue::picker::FzfPicker;
use blue::recommend::{OpenAiRecommender, Recommender};
use blue::transport::HttpTransport;
use clap::{CommandFactory, FromArgMatches};
use log::{debug, info};

/// Build the context for one run from the parsed global options.
fn build_context(args: &cli::Args) -> Result<Context> {
    let config = Config::load(&args.host, args.port, args.cache_dir.clone())?;
    debug!("Using player at {}:{}", config.host, config.port);

    let transport = HttpTransport::new(&config.host, config.port, config.device_timeout)?;
    let cache = ResultCache::open(&config.cache_dir)?;

    let recommender: Option<Box<dyn Recommender>> = match &config.api_key {
        Some(key) => Some(Box::new(OpenAiRecommender::new(
            key,
            config.keys.model(),
            config.keys.base_url(),
            config.provider_timeout,
        )?)),
        None => {
            info!("No API key configured, recommendations are unavailable");
            None
        }
    };

    Ok(Context {
        config,
        transport: Box::new(transport),
        cache,
        picker: Box::new(FzfPicker::new()),
        recommender,
    })
}

fn run(args: &cli::Args, registry: Registry) -> Result<i32> {
    let Some((token, rest)) = args.command.split_first() else {
        return Ok(2);
    };

    let context = build_context(args)?;
    let dispatcher = Dispatcher::new(&context, registry);
    let outcome = dispatcher.dispatch(token, rest);
    let code = outcome.exit_code();

    match outcome {
        Outcome::Success => {}
        Outcome::Usage(e) => e.print()?,
        other => eprintln!("Error: {other}"),
    }
    Ok(code)
}

/// Main entry point for the Blue application.
///
/// Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug blue queue` - Every request, cache hit and dispatch
/// - `RUST_LOG=blue::cache=trace blue random` - Module-specific logging
fn main() {
    env_logger::init();

    let registry = match commands::registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let matches = cli::Args::command()
        .after_help(format!("Commands:\n{}", registry.summary()))
        .get_matches();
    let args = cli::Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let code = match run(&args, registry) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}
