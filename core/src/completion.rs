//! Completion candidates for partial command lines.
//!
//! Per-flag completion callbacks live in a process-wide registry keyed by
//! flag identity, so they may be registered and looked up from any thread.
//! The default `completion` subcommand prints candidates for the command
//! line it is given, one per line, followed by `:<directive>`.

use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use cmdtree_flags::{Flag, FlagError, FlagId};
use tracing::debug;

use crate::command::Command;
use crate::error::{BoxError, Error, Result};
use crate::resolve::Resolution;
use crate::tree::{CommandId, CommandRef, CommandTree};

/// Name of the default completion subcommand.
pub const COMPLETION: &str = "completion";

/// Hints for the shell about how to treat the returned candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompletionDirective(u8);

impl CompletionDirective {
    pub const DEFAULT: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const NO_SPACE: Self = Self(1 << 1);
    pub const NO_FILE_COMP: Self = Self(1 << 2);
    pub const FILTER_FILE_EXT: Self = Self(1 << 3);
    pub const FILTER_DIRS: Self = Self(1 << 4);
    pub const KEEP_ORDER: Self = Self(1 << 5);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CompletionDirective {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for CompletionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion callback for a flag's value: receives the command, its
/// positional args so far and the partial value.
pub type FlagCompletionFn =
    Arc<dyn Fn(CommandRef<'_>, &[String], &str) -> (Vec<String>, CompletionDirective) + Send + Sync>;

static FLAG_COMPLETIONS: LazyLock<RwLock<HashMap<FlagId, FlagCompletionFn>>> =
    LazyLock::new(Default::default);

/// The completion callback registered for `flag`, if any.
pub fn flag_completion_fn(flag: &Flag) -> Option<FlagCompletionFn> {
    FLAG_COMPLETIONS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&flag.id())
        .cloned()
}

impl CommandTree {
    /// Registers a value-completion callback for the flag `name` as seen
    /// from `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`Flag`](Error::Flag) error if no such flag is visible at
    /// `id`, or [`CompletionAlreadyRegistered`](Error::CompletionAlreadyRegistered)
    /// if the flag already has a callback.
    pub fn register_flag_completion_fn<F>(&self, id: CommandId, name: &str, complete: F) -> Result<()>
    where
        F: Fn(CommandRef<'_>, &[String], &str) -> (Vec<String>, CompletionDirective)
            + Send
            + Sync
            + 'static,
    {
        let flag = self
            .effective_flag(id, name)
            .ok_or_else(|| FlagError::NotFound(name.to_string()))?;
        let mut registry = FLAG_COMPLETIONS
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if registry.contains_key(&flag.id()) {
            return Err(Error::CompletionAlreadyRegistered(name.to_string()));
        }
        registry.insert(flag.id(), Arc::new(complete));
        Ok(())
    }

    /// Candidates for the last word of `args`, given the words before it.
    pub fn complete(&self, args: &[String]) -> (Vec<String>, CompletionDirective) {
        let (to_complete, preceding) = match args.split_last() {
            Some((last, rest)) => (last.as_str(), rest),
            None => ("", args),
        };
        let root = self.root;
        let Resolution { command, args: remaining } = match self.resolve(root, preceding) {
            Ok(resolution) => resolution,
            Err(err) => {
                debug!(%err, "completion could not resolve command");
                return (Vec::new(), CompletionDirective::ERROR);
            }
        };
        let cmd = self.command(command);
        let positional = self.strip_flags(command, &remaining);

        if let Some(flag) = self.flag_awaiting_value(command, &remaining) {
            return complete_flag_value(cmd, &flag, &positional, to_complete, "");
        }
        if let Some((name, partial)) = to_complete
            .strip_prefix("--")
            .and_then(|body| body.split_once('='))
        {
            if let Some(flag) = self.effective_flag(command, name) {
                let prefix = format!("--{name}=");
                return complete_flag_value(cmd, &flag, &positional, partial, &prefix);
            }
        }

        if to_complete.starts_with('-') {
            return (
                self.flag_candidates(command, to_complete),
                CompletionDirective::NO_FILE_COMP,
            );
        }

        let mut candidates = Vec::new();
        if positional.is_empty() {
            for child in self.listed_children(command) {
                let sub = self.get(child);
                let visible = self.is_available_command(child) || self.help_command == Some(child);
                if visible && sub.name().starts_with(to_complete) {
                    candidates.push(describe(sub.name(), &sub.short));
                }
            }
        }
        for valid in &self.get(command).valid_args {
            let name = valid.split('\t').next().unwrap_or_default();
            if name.starts_with(to_complete) {
                candidates.push(valid.clone());
            }
        }

        let directive = if self.has_sub_commands(command) || !self.get(command).valid_args.is_empty() {
            CompletionDirective::NO_FILE_COMP
        } else {
            CompletionDirective::DEFAULT
        };
        (candidates, directive)
    }

    /// The value-taking flag named by the last of `args`, when that token
    /// has no inline value.
    fn flag_awaiting_value(&self, id: CommandId, args: &[String]) -> Option<std::rc::Rc<Flag>> {
        let last = args.last()?.as_str();
        if last.contains('=') {
            return None;
        }
        let flag = if let Some(name) = last.strip_prefix("--") {
            self.effective_flag(id, name)?
        } else {
            let mut chars = last.strip_prefix('-')?.chars();
            let shorthand = chars.last()?;
            self.effective_shorthand(id, shorthand)?
        };
        flag.takes_value().then_some(flag)
    }

    fn flag_candidates(&self, id: CommandId, prefix: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        let local = self.local_flags(id);
        let inherited = self.inherited_flags(id);
        for flag in local.iter().chain(inherited.iter()) {
            if flag.is_hidden() {
                continue;
            }
            let long = format!("--{}", flag.name());
            if long.starts_with(prefix) {
                candidates.push(describe(&long, flag.usage()));
            }
            if let Some(shorthand) = flag.shorthand() {
                let short = format!("-{shorthand}");
                if prefix.len() <= 1 && short.starts_with(prefix) {
                    candidates.push(describe(&short, flag.usage()));
                }
            }
        }
        candidates
    }

    /// Adds the `completion` subcommand to the root unless the root's
    /// completion options disable it, the root has no subcommands, or a
    /// subcommand of that name or alias exists.
    pub fn init_default_completion_cmd(&mut self) {
        let root = self.root;
        let options = self.nodes[root.0].completion_options;
        if options.disable_default_cmd || !self.has_sub_commands(root) {
            return;
        }
        if let Some(id) = self.completion_command {
            self.nodes[id.0].hidden = options.hidden_default_cmd;
            return;
        }
        let taken = self.nodes[root.0]
            .children
            .iter()
            .any(|&c| {
                let cmd = &self.nodes[c.0];
                cmd.name() == COMPLETION || cmd.has_alias(COMPLETION)
            });
        if taken {
            return;
        }
        let mut cmd = default_completion_command();
        cmd.hidden = options.hidden_default_cmd;
        let id = self.add_command(root, cmd);
        self.completion_command = Some(id);
        debug!("installed default completion command");
    }

    pub fn completion_command(&self) -> Option<CommandId> {
        self.completion_command
    }
}

fn complete_flag_value(
    cmd: CommandRef<'_>,
    flag: &Flag,
    positional: &[String],
    partial: &str,
    prefix: &str,
) -> (Vec<String>, CompletionDirective) {
    match flag_completion_fn(flag) {
        Some(complete) => {
            let (values, directive) = complete(cmd, positional, partial);
            let values = values.into_iter().map(|v| format!("{prefix}{v}")).collect();
            (values, directive)
        }
        None => (Vec::new(), CompletionDirective::DEFAULT),
    }
}

fn describe(candidate: &str, description: &str) -> String {
    match description.lines().next() {
        Some(line) if !line.is_empty() => format!("{candidate}\t{line}"),
        _ => candidate.to_string(),
    }
}

fn default_completion_command() -> Command {
    Command::new("completion [command line]")
        .with_short("Print completion candidates for a partial command line")
        .with_long(
            "Print completion candidates for a partial command line.\n\n\
             The last argument is the word being completed; pass \"\" to complete a new word.\n\
             Candidates are printed one per line, followed by a line of the form :<directive>.",
        )
        .with_disable_flag_parsing()
        .with_run(run_completion)
}

fn run_completion(cmd: CommandRef<'_>, args: &[String]) -> std::result::Result<(), BoxError> {
    let (candidates, directive) = cmd.tree().complete(args);
    for candidate in candidates {
        cmd.println(&candidate);
    }
    cmd.println(&format!(":{directive}"));
    Ok(())
}
