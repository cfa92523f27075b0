//! # Command Dispatch
//!
//! Turns `blue <token> [args...]` into a call of exactly one handler.
//!
//! ## Pieces
//!
//! - [`CommandSpec`]: a registered command (name, help line, argument
//!   definition and handler)
//! - [`Registry`]: an ordered command table plus its [`AliasResolver`]
//! - [`Context`]: long-lived collaborators built once in `main`
//! - [`Services`]: the borrowing clients handed to one handler call
//! - [`Outcome`]: what happened, and which exit code that means
//!
//! Command groups (`online`, `preview`) are ordinary handlers that run a
//! nested [`Registry`] over their own table, so abbreviations work at every
//! level.

use crate::alias::{AliasResolver, RegistrationError, Resolution};
use crate::cache::ResultCache;
use crate::config::Config;
use crate::db::HistoryStore;
use crate::device::{DeviceControlClient, DeviceQueryClient};
use crate::library::Library;
use crate::online::OnlineService;
use crate::picker::Picker;
use crate::recommend::{ProviderError, RecommendationService, Recommender};
use crate::transport::Transport;
use anyhow::Result;
use clap::{CommandFactory, FromArgMatches};
use log::debug;
use std::fmt;

/// A command handler. `args` holds everything after the command token.
pub type Handler = fn(&Services<'_>, &[String]) -> Result<()>;

/// One registered command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub about: &'static str,
    /// Argument definition, used for help and completions
    pub args: fn() -> clap::Command,
    pub run: Handler,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec").field("name", &self.name).finish()
    }
}

impl CommandSpec {
    /// The clap command for this spec, named as registered.
    #[must_use]
    pub fn clap_command(&self) -> clap::Command {
        (self.args)().name(self.name).about(self.about)
    }
}

/// A clap command with one subcommand per spec.
#[must_use]
pub fn command_tree(name: &'static str, about: &'static str, specs: &[CommandSpec]) -> clap::Command {
    specs
        .iter()
        .fold(clap::Command::new(name).about(about), |tree, spec| {
            tree.subcommand(spec.clap_command())
        })
}

/// Parse a command's arguments with its clap definition.
///
/// # Errors
///
/// The [`clap::Error`] for invalid arguments, or for `--help`.
pub fn parse_args<T>(name: &'static str, args: &[String]) -> Result<T, clap::Error>
where
    T: CommandFactory + FromArgMatches,
{
    let mut command = T::command().name(name).bin_name(format!("blue {name}"));
    let matches = command.try_get_matches_from_mut(std::iter::once(name.to_string()).chain(args.iter().cloned()))?;
    T::from_arg_matches(&matches).map_err(|e| e.format(&mut command))
}

/// An ordered command table.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: &'static [CommandSpec],
    resolver: AliasResolver,
}

impl Registry {
    /// # Errors
    ///
    /// [`RegistrationError`] for empty or duplicate names.
    pub fn new(specs: &'static [CommandSpec]) -> Result<Self, RegistrationError> {
        let resolver = AliasResolver::new(specs.iter().map(|spec| spec.name))?;
        Ok(Self { specs, resolver })
    }

    #[must_use]
    pub fn resolve(&self, token: &str) -> Resolution<'_> {
        self.resolver.resolve(token)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    #[must_use]
    pub fn specs(&self) -> &'static [CommandSpec] {
        self.specs
    }

    /// Resolve `token` and run the matching handler.
    pub fn run(&self, services: &Services<'_>, token: &str, args: &[String]) -> Outcome {
        match self.resolve(token) {
            Resolution::Unique(name) => match self.get(name) {
                Some(spec) => {
                    debug!("dispatching `{token}` to {name} {args:?}");
                    Outcome::from_result((spec.run)(services, args))
                }
                None => self.not_found(token),
            },
            Resolution::Ambiguous(candidates) => Outcome::Ambiguous {
                token: token.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            },
            Resolution::NotFound => self.not_found(token),
        }
    }

    fn not_found(&self, token: &str) -> Outcome {
        Outcome::NotFound {
            token: token.to_string(),
            known: self.resolver.names().map(str::to_string).collect(),
        }
    }

    /// One `name  about` line per command, for help output.
    #[must_use]
    pub fn summary(&self) -> String {
        let width = self.specs.iter().map(|spec| spec.name.len()).max().unwrap_or(0);
        self.specs
            .iter()
            .map(|spec| format!("  {:width$}  {}", spec.name, spec.about))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The whole table as a clap command tree rooted at `name`.
    #[must_use]
    pub fn clap_command(&self, name: &'static str, about: &'static str) -> clap::Command {
        command_tree(name, about, self.specs)
    }
}

/// Result of one dispatch.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Ambiguous { token: String, candidates: Vec<String> },
    NotFound { token: String, known: Vec<String> },
    /// Bad arguments, or a help request
    Usage(clap::Error),
    Failed(anyhow::Error),
}

impl Outcome {
    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => match e.downcast::<clap::Error>() {
                Ok(usage) => Self::Usage(usage),
                Err(e) => Self::Failed(e),
            },
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Usage(e) => e.exit_code(),
            Self::Ambiguous { .. } | Self::NotFound { .. } | Self::Failed(_) => 1,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Back into a `Result`, for command groups nested inside a handler.
    ///
    /// # Errors
    ///
    /// Every outcome other than [`Outcome::Success`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Usage(e) => Err(e.into()),
            Self::Failed(e) => Err(e),
            other => Err(anyhow::anyhow!("{other}")),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => Ok(()),
            Self::Ambiguous { token, candidates } => write!(
                f,
                "Ambiguous command `{token}`, could be: {}",
                candidates.join(", ")
            ),
            Self::NotFound { token, known } => write!(
                f,
                "Unknown command `{token}`. Available commands: {}",
                known.join(", ")
            ),
            Self::Usage(e) => write!(f, "{e}"),
            Self::Failed(e) => write!(f, "{e:#}"),
        }
    }
}

/// Collaborators that live for the whole process.
pub struct Context {
    pub config: Config,
    pub transport: Box<dyn Transport>,
    pub cache: ResultCache,
    pub picker: Box<dyn Picker>,
    pub recommender: Option<Box<dyn Recommender>>,
}

impl Context {
    /// Fresh clients borrowing from this context.
    #[must_use]
    pub fn services(&self) -> Services<'_> {
        let query = DeviceQueryClient::new(self.transport.as_ref(), &self.cache);
        Services {
            config: &self.config,
            query,
            control: DeviceControlClient::new(self.transport.as_ref(), query, self.config.ramp),
            cache: &self.cache,
            picker: self.picker.as_ref(),
            recommender: self.recommender.as_deref(),
        }
    }
}

/// What a handler gets to work with.
pub struct Services<'a> {
    pub config: &'a Config,
    pub query: DeviceQueryClient<'a>,
    pub control: DeviceControlClient<'a>,
    pub cache: &'a ResultCache,
    pub picker: &'a dyn Picker,
    pub recommender: Option<&'a dyn Recommender>,
}

impl<'a> Services<'a> {
    #[must_use]
    pub fn library(&self) -> Library<'a> {
        Library::new(self.query, &self.config.media_location)
    }

    #[must_use]
    pub fn online(&self) -> OnlineService<'a> {
        OnlineService::new(self.query, &self.config.online_service)
    }

    /// # Errors
    ///
    /// [`ProviderError::MissingKey`] when no provider is configured.
    pub fn recommendations(&self) -> Result<RecommendationService<'a>, ProviderError> {
        let recommender = self.recommender.ok_or(ProviderError::MissingKey)?;
        Ok(RecommendationService::new(recommender, self.cache))
    }

    /// # Errors
    ///
    /// Fails when the history database cannot be opened.
    pub fn history(&self) -> Result<HistoryStore> {
        HistoryStore::open(&self.config.history_path)
    }
}

/// Runs top-level commands against one [`Context`].
pub struct Dispatcher<'c> {
    context: &'c Context,
    registry: Registry,
}

impl<'c> Dispatcher<'c> {
    #[must_use]
    pub fn new(context: &'c Context, registry: Registry) -> Self {
        Self { context, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve `token` and run its handler with fresh services.
    pub fn dispatch(&self, token: &str, args: &[String]) -> Outcome {
        self.registry.run(&self.context.services(), token, args)
    }
}
