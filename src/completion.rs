//! # Shell Completion Module
//!
//! Completion scripts for `blue`. The top-level parser only sees a free-form
//! command line, so the script is generated from a separate clap tree that
//! has the global options plus one subcommand per registered command
//! (`online` and `preview` with their own subcommands).
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! blue completion bash > ~/.local/share/bash-completion/completions/blue
//!
//! # Generate zsh completions
//! blue completion zsh > ~/.config/zsh/completions/_blue
//! ```

use crate::cli::{Args, Shell};
use crate::dispatch::CommandSpec;
use clap::{Command, CommandFactory};
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// The command tree completions are generated from: the global options of
/// [`Args`] and one subcommand per spec.
#[must_use]
pub fn completion_command(specs: &[CommandSpec]) -> Command {
    let top = Args::command();
    let globals: Vec<clap::Arg> = top
        .get_arguments()
        .filter(|arg| arg.get_id().as_str() != "command")
        .cloned()
        .collect();

    let mut command = Command::new("blue").args(globals).subcommand_required(true);
    if let Some(about) = top.get_about() {
        command = command.about(about.clone());
    }
    specs
        .iter()
        .fold(command, |command, spec| command.subcommand(spec.clap_command()))
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}
