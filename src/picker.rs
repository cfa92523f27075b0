//! # Interactive Selection
//!
//! Commands that need a choice from the user go through the [`Picker`] trait.
//! The real implementation runs `fzf`; tests script the answers.
//!
//! ## fzf Protocol
//!
//! Each choice is written to fzf's stdin as `index<TAB>value<TAB>label` and
//! only the label is displayed (`--with-nth=3..`). The selected lines come
//! back unchanged on stdout, so the index maps them to choices even when
//! labels repeat. Preview templates may use `{value}`, which becomes fzf's
//! `{2}` field placeholder.
//!
//! fzf exits with 1 when nothing matched and 130 when the user pressed Esc or
//! Ctrl-C; both mean "nothing selected".

use anyhow::{bail, Context, Result};
use log::debug;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// One selectable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// What the user sees
    pub label: String,
    /// What the command gets back
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// A choice whose value is its label.
    pub fn plain(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value: label.clone(),
            label,
        }
    }
}

/// Prompt text and an optional preview command template.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prompt<'a> {
    pub title: &'a str,
    /// Shell command run for the highlighted item; `{value}` is replaced by
    /// the item's value
    pub preview: Option<&'a str>,
}

impl<'a> Prompt<'a> {
    #[must_use]
    pub const fn new(title: &'a str) -> Self {
        Self { title, preview: None }
    }

    #[must_use]
    pub const fn with_preview(self, preview: &'a str) -> Self {
        Self {
            preview: Some(preview),
            ..self
        }
    }
}

pub trait Picker {
    /// Let the user choose one item. `Ok(None)` means nothing was chosen.
    ///
    /// # Errors
    ///
    /// Only when the selection UI itself fails.
    fn pick(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Option<Choice>>;

    /// Let the user choose any number of items, in list order.
    ///
    /// # Errors
    ///
    /// Only when the selection UI itself fails.
    fn pick_many(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Vec<Choice>>;
}

/// [`Picker`] backed by the `fzf` binary.
#[derive(Debug, Clone, Default)]
pub struct FzfPicker {
    /// Explicit binary; looked up on `PATH` when unset
    program: Option<PathBuf>,
}

impl FzfPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> Result<PathBuf> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => which::which("fzf")
                .context("fzf was not found on PATH; install fzf to use interactive selection"),
        }
    }

    fn run(&self, prompt: &Prompt<'_>, choices: &[Choice], multi: bool) -> Result<Vec<Choice>> {
        if choices.is_empty() {
            return Ok(Vec::new());
        }

        let program = self.program()?;
        let args = fzf_args(prompt, multi);
        debug!("{} {args:?} ({} choices)", program.display(), choices.len());

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", program.display()))?;

        {
            let mut stdin = child.stdin.take().context("fzf stdin unavailable")?;
            // fzf may exit before reading everything; a broken pipe is fine.
            if let Err(e) = stdin.write_all(render_lines(choices).as_bytes()) {
                debug!("fzf stopped reading: {e}");
            }
        }

        let output = child.wait_with_output().context("Failed to wait for fzf")?;
        match output.status.code() {
            Some(0) => Ok(parse_selection(&String::from_utf8_lossy(&output.stdout), choices)),
            Some(1 | 130) => Ok(Vec::new()),
            code => bail!("fzf failed with exit code {code:?}"),
        }
    }
}

impl Picker for FzfPicker {
    fn pick(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Option<Choice>> {
        Ok(self.run(prompt, choices, false)?.into_iter().next())
    }

    fn pick_many(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Vec<Choice>> {
        self.run(prompt, choices, true)
    }
}

fn sanitize(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

fn fzf_args(prompt: &Prompt<'_>, multi: bool) -> Vec<String> {
    let mut args = vec![
        "--delimiter=\t".to_string(),
        "--with-nth=3..".to_string(),
        "--tiebreak=index".to_string(),
        format!("--prompt={}> ", prompt.title),
    ];
    if multi {
        args.push("--multi".to_string());
    }
    if let Some(preview) = prompt.preview {
        args.push(format!("--preview={}", preview.replace("{value}", "{2}")));
    }
    args
}

/// fzf input: one `index<TAB>value<TAB>label` line per choice.
#[must_use]
pub fn render_lines(choices: &[Choice]) -> String {
    choices
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{i}\t{}\t{}\n", sanitize(&c.value), sanitize(&c.label)))
        .collect()
}

/// Map fzf output lines back to choices. Unknown lines are ignored.
#[must_use]
pub fn parse_selection(output: &str, choices: &[Choice]) -> Vec<Choice> {
    output
        .lines()
        .filter_map(|line| line.split('\t').next()?.parse::<usize>().ok())
        .filter_map(|index| choices.get(index).cloned())
        .collect()
}
