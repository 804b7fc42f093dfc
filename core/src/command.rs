//! The per-node record of a command tree.
//!
//! A [`Command`] is declared with builder methods and then handed to a
//! [`CommandTree`](crate::CommandTree), which owns it for the rest of its
//! life and addresses it by [`CommandId`](crate::CommandId).
//!
//! # Examples
//!
//! ```
//! use cmdtree_core::{Command, CommandTree, PositionalArgs};
//! use cmdtree_flags::Flag;
//!
//! let mut tree = CommandTree::new(Command::new("app").with_short("Demo application"));
//! let root = tree.root();
//! tree.add_command(
//!     root,
//!     Command::new("echo [text...]")
//!         .with_aliases(["say"])
//!         .with_args(PositionalArgs::minimum(1))
//!         .with_flag(Flag::bool("upper", false).with_shorthand('u'))
//!         .with_run(|cmd, args| {
//!             cmd.println(&args.join(" "));
//!             Ok(())
//!         }),
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;

use cmdtree_flags::{Flag, FlagError, FlagSet, NormalizeFn, ParseErrorsWhitelist};

use crate::args::PositionalArgs;
use crate::context::Context;
use crate::error::{BoxError, Error};
use crate::output::{Sink, Source, sink, source};
use crate::tree::{CommandId, CommandRef};

/// Annotation marking a flag as required.
pub const ANNOTATION_REQUIRED: &str = "cmdtree_annotation_required";

/// Annotation overriding the name shown in command paths and help.
pub const ANNOTATION_DISPLAY_NAME: &str = "cmdtree_annotation_command_display_name";

/// Annotation marking flags declared by the framework itself.
pub const ANNOTATION_SET_BY_FRAMEWORK: &str = "cmdtree_annotation_flag_set_by_framework";

/// Lifecycle hook: receives the executing command and its positional args.
pub type HookFn = Rc<dyn Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError>>;

/// Converts a flag parse failure into the error execution reports.
pub type FlagErrorFn = Rc<dyn Fn(CommandRef<'_>, FlagError) -> Error>;

/// The five optional lifecycle hooks of a command.
#[derive(Clone, Default)]
pub struct Hooks {
    pub persistent_pre_run: Option<HookFn>,
    pub pre_run: Option<HookFn>,
    pub run: Option<HookFn>,
    pub post_run: Option<HookFn>,
    pub persistent_post_run: Option<HookFn>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("persistent_pre_run", &self.persistent_pre_run.is_some())
            .field("pre_run", &self.pre_run.is_some())
            .field("run", &self.run.is_some())
            .field("post_run", &self.post_run.is_some())
            .field("persistent_post_run", &self.persistent_post_run.is_some())
            .finish()
    }
}

/// A titled group that subcommands can be listed under in help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub title: String,
}

impl Group {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Controls the default `completion` command. Read from the root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Do not add the `completion` command at all.
    pub disable_default_cmd: bool,
    /// Add it, but hide it from help and suggestions.
    pub hidden_default_cmd: bool,
}

/// One node of a command tree.
///
/// Public fields are declarative and may be set directly or through the
/// `with_*` builders. Flag sets, the tree links and per-execution state are
/// private to the framework.
pub struct Command {
    /// One-line usage; the first word is the command's name.
    pub use_line: String,
    pub aliases: Vec<String>,
    /// Extra names this command is suggested for when mistyped.
    pub suggest_for: Vec<String>,
    pub short: String,
    pub long: String,
    pub example: String,
    /// Group (declared on the parent) this command is listed under.
    pub group_id: String,
    /// Accepted positional arguments; text after a tab is a description.
    pub valid_args: Vec<String>,
    /// Positional-argument validator. `None` accepts anything.
    pub args: Option<PositionalArgs>,
    /// Non-empty marks the command deprecated, with this message.
    pub deprecated: String,
    pub hidden: bool,
    pub annotations: BTreeMap<String, String>,
    /// Non-empty enables the `--version` flag.
    pub version: String,
    pub hooks: Hooks,
    pub silence_errors: bool,
    pub silence_usage: bool,
    /// Pass every argument through to the hooks unparsed.
    pub disable_flag_parsing: bool,
    pub disable_suggestions: bool,
    /// Maximum edit distance for suggestions; `0` means the default of 2.
    pub suggestions_minimum_distance: usize,
    /// Parse flags at every level while resolving (root only).
    pub traverse_children: bool,
    pub parse_errors_whitelist: ParseErrorsWhitelist,
    pub completion_options: CompletionOptions,

    pub(crate) flags: FlagSet,
    pub(crate) persistent_flags: FlagSet,
    pub(crate) parents_pflags: FlagSet,
    pub(crate) global_normalize: Option<NormalizeFn>,
    pub(crate) parent: Option<CommandId>,
    pub(crate) children: Vec<CommandId>,
    pub(crate) children_sorted: bool,
    pub(crate) groups: Vec<Group>,
    pub(crate) called_as: String,
    pub(crate) called: bool,
    pub(crate) ctx: Option<Context>,
    pub(crate) flag_error_fn: Option<FlagErrorFn>,
    pub(crate) err_prefix: Option<String>,
    pub(crate) out: Option<Sink>,
    pub(crate) err: Option<Sink>,
    pub(crate) input: Option<Source>,
    pub(crate) use_padding: usize,
    pub(crate) command_path_padding: usize,
    pub(crate) name_padding: usize,
}

impl Command {
    /// Creates a command from its usage line, e.g. `"get <key>"`.
    pub fn new(use_line: impl Into<String>) -> Self {
        let use_line = use_line.into();
        let name = first_word(&use_line).to_string();
        Self {
            use_line,
            aliases: Vec::new(),
            suggest_for: Vec::new(),
            short: String::new(),
            long: String::new(),
            example: String::new(),
            group_id: String::new(),
            valid_args: Vec::new(),
            args: None,
            deprecated: String::new(),
            hidden: false,
            annotations: BTreeMap::new(),
            version: String::new(),
            hooks: Hooks::default(),
            silence_errors: false,
            silence_usage: false,
            disable_flag_parsing: false,
            disable_suggestions: false,
            suggestions_minimum_distance: 0,
            traverse_children: false,
            parse_errors_whitelist: ParseErrorsWhitelist::default(),
            completion_options: CompletionOptions::default(),
            flags: FlagSet::new(name.clone()),
            persistent_flags: FlagSet::new(name.clone()),
            parents_pflags: FlagSet::new(name),
            global_normalize: None,
            parent: None,
            children: Vec::new(),
            children_sorted: false,
            groups: Vec::new(),
            called_as: String::new(),
            called: false,
            ctx: None,
            flag_error_fn: None,
            err_prefix: None,
            out: None,
            err: None,
            input: None,
            use_padding: 0,
            command_path_padding: 0,
            name_padding: 0,
        }
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    pub fn with_long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_suggest_for<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggest_for.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = group_id.into();
        self
    }

    pub fn with_valid_args<I, S>(mut self, valid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_args.extend(valid.into_iter().map(Into::into));
        self
    }

    pub fn with_args(mut self, args: PositionalArgs) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = message.into();
        self
    }

    pub fn with_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_persistent_pre_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError> + 'static,
    {
        self.hooks.persistent_pre_run = Some(Rc::new(hook));
        self
    }

    pub fn with_pre_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError> + 'static,
    {
        self.hooks.pre_run = Some(Rc::new(hook));
        self
    }

    pub fn with_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError> + 'static,
    {
        self.hooks.run = Some(Rc::new(hook));
        self
    }

    pub fn with_post_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError> + 'static,
    {
        self.hooks.post_run = Some(Rc::new(hook));
        self
    }

    pub fn with_persistent_post_run<F>(mut self, hook: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<(), BoxError> + 'static,
    {
        self.hooks.persistent_post_run = Some(Rc::new(hook));
        self
    }

    pub fn with_silence_errors(mut self) -> Self {
        self.silence_errors = true;
        self
    }

    pub fn with_silence_usage(mut self) -> Self {
        self.silence_usage = true;
        self
    }

    pub fn with_disable_flag_parsing(mut self) -> Self {
        self.disable_flag_parsing = true;
        self
    }

    pub fn with_disable_suggestions(mut self) -> Self {
        self.disable_suggestions = true;
        self
    }

    pub fn with_traverse_children(mut self) -> Self {
        self.traverse_children = true;
        self
    }

    pub fn with_completion_options(mut self, options: CompletionOptions) -> Self {
        self.completion_options = options;
        self
    }

    /// Declares a local flag.
    ///
    /// # Panics
    ///
    /// Panics if the name or shorthand is already declared locally.
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.add(flag);
        self
    }

    /// Declares a persistent flag, visible to every descendant.
    ///
    /// # Panics
    ///
    /// Panics if the name or shorthand is already declared persistently.
    pub fn with_persistent_flag(mut self, flag: Flag) -> Self {
        self.persistent_flags.add(flag);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_out(mut self, writer: impl Write + 'static) -> Self {
        self.out = Some(sink(writer));
        self
    }

    pub fn with_err(mut self, writer: impl Write + 'static) -> Self {
        self.err = Some(sink(writer));
        self
    }

    pub fn with_in(mut self, reader: impl Read + 'static) -> Self {
        self.input = Some(source(reader));
        self
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn with_flag_error_fn<F>(mut self, transform: F) -> Self
    where
        F: Fn(CommandRef<'_>, FlagError) -> Error + 'static,
    {
        self.flag_error_fn = Some(Rc::new(transform));
        self
    }

    pub fn with_err_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.err_prefix = Some(prefix.into());
        self
    }

    /// The first word of the usage line.
    pub fn name(&self) -> &str {
        first_word(&self.use_line)
    }

    /// The display-name annotation if set, otherwise [`name`](Self::name).
    pub fn display_name(&self) -> &str {
        self.annotations
            .get(ANNOTATION_DISPLAY_NAME)
            .map(String::as_str)
            .unwrap_or_else(|| self.name())
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }

    pub fn is_runnable(&self) -> bool {
        self.hooks.run.is_some()
    }

    pub fn is_deprecated(&self) -> bool {
        !self.deprecated.is_empty()
    }

    /// The name or alias this command was invoked by, once resolved.
    pub fn called_as(&self) -> &str {
        &self.called_as
    }

    /// Whether this command was the target of the last execution.
    pub fn was_called(&self) -> bool {
        self.called
    }

    /// Local flags, plus inherited ones once merged for execution.
    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut FlagSet {
        &mut self.flags
    }

    pub fn persistent_flags(&self) -> &FlagSet {
        &self.persistent_flags
    }

    pub fn persistent_flags_mut(&mut self) -> &mut FlagSet {
        &mut self.persistent_flags
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = Some(ctx);
    }

    pub fn set_out(&mut self, writer: impl Write + 'static) {
        self.out = Some(sink(writer));
    }

    pub fn set_err(&mut self, writer: impl Write + 'static) {
        self.err = Some(sink(writer));
    }

    pub fn set_in(&mut self, reader: impl Read + 'static) {
        self.input = Some(source(reader));
    }

    pub fn set_flag_error_fn<F>(&mut self, transform: F)
    where
        F: Fn(CommandRef<'_>, FlagError) -> Error + 'static,
    {
        self.flag_error_fn = Some(Rc::new(transform));
    }

    pub fn set_err_prefix(&mut self, prefix: impl Into<String>) {
        self.err_prefix = Some(prefix.into());
    }

    pub fn use_padding(&self) -> usize {
        self.use_padding
    }

    pub fn command_path_padding(&self) -> usize {
        self.command_path_padding
    }

    pub fn name_padding(&self) -> usize {
        self.name_padding
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("use_line", &self.use_line)
            .field("aliases", &self.aliases)
            .field("hooks", &self.hooks)
            .field("flags", &self.flags)
            .field("persistent_flags", &self.persistent_flags)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

fn first_word(line: &str) -> &str {
    line.split(' ').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_first_word_of_use_line() {
        assert_eq!(Command::new("get <key> [flags]").name(), "get");
        assert_eq!(Command::new("root").name(), "root");
        assert_eq!(Command::new("").name(), "");
    }

    #[test]
    fn test_display_name_annotation() {
        let cmd = Command::new("kubectl-plugin").with_annotation(ANNOTATION_DISPLAY_NAME, "kubectl plugin");
        assert_eq!(cmd.display_name(), "kubectl plugin");
        assert_eq!(cmd.name(), "kubectl-plugin");
    }

    #[test]
    fn test_builder_sets_fields() {
        let cmd = Command::new("serve")
            .with_short("Start the server")
            .with_aliases(["s", "srv"])
            .with_deprecated("use run instead")
            .with_hidden()
            .with_flag(Flag::int("port", 8080).with_shorthand('p'))
            .with_persistent_flag(Flag::bool("verbose", false));

        assert_eq!(cmd.short, "Start the server");
        assert!(cmd.has_alias("srv"));
        assert!(cmd.is_deprecated());
        assert!(cmd.hidden);
        assert!(!cmd.is_runnable());
        assert!(cmd.flags().contains("port"));
        assert!(cmd.persistent_flags().contains("verbose"));
    }

    #[test]
    fn test_run_hook_makes_runnable() {
        let cmd = Command::new("x").with_run(|_, _| Ok(()));
        assert!(cmd.is_runnable());
        assert!(format!("{:?}", cmd.hooks).contains("run: true"));
    }

    #[test]
    #[should_panic(expected = "flag redefined")]
    fn test_duplicate_local_flag_panics() {
        let _ = Command::new("x")
            .with_flag(Flag::bool("dup", false))
            .with_flag(Flag::bool("dup", false));
    }
}
