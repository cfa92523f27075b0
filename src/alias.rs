//! # Command Alias Resolution
//!
//! Users rarely type full command names: `blue vol 40` and `blue pau` should
//! work as long as the abbreviation points at exactly one command. This module
//! maps a typed token onto the fixed set of registered names.
//!
//! ## Matching Rules
//!
//! - Matching is case-insensitive
//! - An exact match always wins, even when the name is also a prefix of
//!   longer names (`play` resolves to `play`, not to `play`/`playlist`)
//! - A single prefix match resolves to that name
//! - Several prefix matches are reported as ambiguous, in registration order
//!
//! ```
//! use blue::alias::{AliasResolver, Resolution};
//!
//! let resolver = AliasResolver::new(["play", "pause", "playlist"])?;
//! assert_eq!(resolver.resolve("pau"), Resolution::Unique("pause"));
//! assert_eq!(resolver.resolve("pl"), Resolution::Ambiguous(vec!["play", "playlist"]));
//! # Ok::<(), blue::alias::RegistrationError>(())
//! ```

use thiserror::Error;

/// Outcome of resolving one user token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Exactly one registered name matches
    Unique(&'a str),
    /// Several names share the typed prefix; listed in registration order
    Ambiguous(Vec<&'a str>),
    /// Nothing matches
    NotFound,
}

/// Invalid command tables, caught when the resolver is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("command name must not be empty")]
    Empty,
    #[error("command `{0}` is registered more than once")]
    Duplicate(String),
}

/// Resolves abbreviated tokens against a fixed, ordered set of command names.
#[derive(Debug, Clone)]
pub struct AliasResolver {
    names: Vec<String>,
    folded: Vec<String>,
}

impl AliasResolver {
    /// Build a resolver over `names`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] for an empty name or a name registered
    /// twice (compared case-insensitively). Either would make some command
    /// permanently unreachable.
    pub fn new<I, S>(names: I) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut resolver = Self {
            names: Vec::new(),
            folded: Vec::new(),
        };

        for name in names {
            let name = name.into();
            if name.is_empty() {
                return Err(RegistrationError::Empty);
            }
            let folded = name.to_lowercase();
            if resolver.folded.contains(&folded) {
                return Err(RegistrationError::Duplicate(name));
            }
            resolver.names.push(name);
            resolver.folded.push(folded);
        }

        Ok(resolver)
    }

    /// Resolve `token` to a registered name.
    ///
    /// An empty token never resolves; callers are expected to reject it
    /// before getting here.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Resolution<'_> {
        if token.is_empty() {
            return Resolution::NotFound;
        }
        let token = token.to_lowercase();

        if let Some(exact) = self.folded.iter().position(|name| *name == token) {
            return Resolution::Unique(&self.names[exact]);
        }

        let mut matches: Vec<&str> = self
            .folded
            .iter()
            .zip(&self.names)
            .filter(|(folded, _)| folded.starts_with(&token))
            .map(|(_, name)| name.as_str())
            .collect();

        match matches.len() {
            0 => Resolution::NotFound,
            1 => Resolution::Unique(matches.remove(0)),
            _ => Resolution::Ambiguous(matches),
        }
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
