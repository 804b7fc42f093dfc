//! The command tree arena.
//!
//! [`CommandTree`] owns every [`Command`] and links them by [`CommandId`]:
//! a child holds its parent's id, a parent holds its children's ids in
//! insertion (or sorted) order. The tree also carries the [`Config`], the
//! process-wide default flag set folded into the root, and the help
//! renderer.

use std::fmt;
use std::io::Write as _;
use std::rc::Rc;

use cmdtree_flags::{FlagSet, NormalizeFn};
use tracing::debug;

use crate::command::Command;
use crate::config::Config;
use crate::context::Context;
use crate::help::{HelpRenderer, PlainHelp};
use crate::output::{Sink, Source};

/// Handle to a command inside a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

/// An arena of commands rooted at one of them.
pub struct CommandTree {
    pub(crate) nodes: Vec<Command>,
    pub(crate) root: CommandId,
    pub(crate) config: Config,
    pub(crate) global_flags: FlagSet,
    pub(crate) help_command: Option<CommandId>,
    pub(crate) completion_command: Option<CommandId>,
    pub(crate) help_renderer: Rc<dyn HelpRenderer>,
    pub(crate) args: Option<Vec<String>>,
    pub(crate) initializers: Vec<Rc<dyn Fn()>>,
    pub(crate) finalizers: Vec<Rc<dyn Fn()>>,
}

impl CommandTree {
    /// Creates a tree with `root` as its root command and default config.
    pub fn new(root: Command) -> Self {
        Self::with_config(root, Config::default())
    }

    pub fn with_config(root: Command, config: Config) -> Self {
        Self {
            nodes: vec![root],
            root: CommandId(0),
            config,
            global_flags: FlagSet::new("global"),
            help_command: None,
            completion_command: None,
            help_renderer: Rc::new(PlainHelp),
            args: None,
            initializers: Vec::new(),
            finalizers: Vec::new(),
        }
    }

    pub fn root(&self) -> CommandId {
        self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// The command behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another tree.
    pub fn get(&self, id: CommandId) -> &Command {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: CommandId) -> &mut Command {
        &mut self.nodes[id.0]
    }

    /// Read-only view of `id` as handed to hooks.
    pub fn command(&self, id: CommandId) -> CommandRef<'_> {
        CommandRef { tree: self, id }
    }

    /// Adds a detached command to the arena.
    pub fn insert(&mut self, cmd: Command) -> CommandId {
        self.nodes.push(cmd);
        CommandId(self.nodes.len() - 1)
    }

    /// Inserts `cmd` and attaches it under `parent`.
    pub fn add_command(&mut self, parent: CommandId, cmd: Command) -> CommandId {
        let id = self.insert(cmd);
        self.attach(parent, id);
        id
    }

    /// Attaches an existing detached command under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `child` is `parent` itself, already has a parent, or is an
    /// ancestor of `parent`.
    pub fn attach(&mut self, parent: CommandId, child: CommandId) {
        if parent == child {
            panic!("command can't be a child of itself");
        }
        if let Some(existing) = self.nodes[child.0].parent {
            panic!(
                "command {:?} already has parent {:?}",
                self.nodes[child.0].name(),
                self.nodes[existing.0].name()
            );
        }
        if self.lineage(parent).contains(&child) {
            panic!(
                "attaching {:?} under {:?} would create a cycle",
                self.nodes[child.0].name(),
                self.nodes[parent.0].name()
            );
        }

        self.nodes[child.0].parent = Some(parent);
        let use_len = self.nodes[child.0].use_line.len();
        let name_len = self.nodes[child.0].name().len();
        let path_len = self.command_path(child).len();
        let node = &mut self.nodes[parent.0];
        node.use_padding = node.use_padding.max(use_len);
        node.name_padding = node.name_padding.max(name_len);
        node.command_path_padding = node.command_path_padding.max(path_len);
        node.children.push(child);
        node.children_sorted = false;

        if let Some(normalize) = node.global_normalize.clone() {
            self.set_global_normalization_fn(child, normalize);
        }
        debug!(
            parent = self.nodes[parent.0].name(),
            child = self.nodes[child.0].name(),
            "attached command"
        );
    }

    /// Detaches `victims` from `parent`; ids that are not children of
    /// `parent` are ignored.
    pub fn remove_command(&mut self, parent: CommandId, victims: &[CommandId]) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        let (removed, kept): (Vec<_>, Vec<_>) =
            children.into_iter().partition(|c| victims.contains(c));
        for id in removed {
            self.nodes[id.0].parent = None;
        }
        self.nodes[parent.0].children = kept;
        self.nodes[parent.0].children_sorted = false;
        self.recompute_padding(parent);
    }

    /// Detaches `id` from its parent and children so it can be rebuilt.
    pub fn reset_commands(&mut self, id: CommandId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.remove_command(parent, &[id]);
        }
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        let node = &mut self.nodes[id.0];
        node.parents_pflags = FlagSet::new(node.name());
        node.parents_pflags
            .set_normalize_fn(node.global_normalize.clone());
        node.children_sorted = false;
        if id == self.root {
            self.help_command = None;
            self.completion_command = None;
        }
        self.recompute_padding(id);
    }

    /// Recomputes the padding maxima of `id` from its current children.
    pub fn recompute_padding(&mut self, id: CommandId) {
        let (mut use_pad, mut name_pad, mut path_pad) = (0, 0, 0);
        for &child in &self.nodes[id.0].children {
            let cmd = &self.nodes[child.0];
            use_pad = use_pad.max(cmd.use_line.len());
            name_pad = name_pad.max(cmd.name().len());
            path_pad = path_pad.max(self.command_path(child).len());
        }
        let node = &mut self.nodes[id.0];
        node.use_padding = use_pad;
        node.name_padding = name_pad;
        node.command_path_padding = path_pad;
    }

    /// Children of `id`, sorted by name first when sorting is enabled.
    pub fn commands(&mut self, id: CommandId) -> &[CommandId] {
        if self.config.enable_command_sorting && !self.nodes[id.0].children_sorted {
            let mut children = std::mem::take(&mut self.nodes[id.0].children);
            children.sort_by(|a, b| self.nodes[a.0].name().cmp(self.nodes[b.0].name()));
            self.nodes[id.0].children = children;
            self.nodes[id.0].children_sorted = true;
        }
        &self.nodes[id.0].children
    }

    /// Children of `id` in their stored order.
    pub fn children(&self, id: CommandId) -> &[CommandId] {
        &self.nodes[id.0].children
    }

    /// Children of `id` for listing: sorted copies when sorting is enabled.
    pub(crate) fn listed_children(&self, id: CommandId) -> Vec<CommandId> {
        let mut children = self.nodes[id.0].children.clone();
        if self.config.enable_command_sorting {
            children.sort_by(|a, b| self.nodes[a.0].name().cmp(self.nodes[b.0].name()));
        }
        children
    }

    pub fn parent(&self, id: CommandId) -> Option<CommandId> {
        self.nodes[id.0].parent
    }

    /// `id` followed by its ancestors, nearest first.
    pub fn lineage(&self, id: CommandId) -> Vec<CommandId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// The topmost ancestor of `id`.
    pub fn root_of(&self, id: CommandId) -> CommandId {
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
        }
        current
    }

    /// `id` and every command below it, parents before children.
    pub fn descendants(&self, id: CommandId) -> Vec<CommandId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev());
        }
        out
    }

    pub fn name(&self, id: CommandId) -> &str {
        self.nodes[id.0].name()
    }

    pub fn display_name(&self, id: CommandId) -> &str {
        self.nodes[id.0].display_name()
    }

    /// Display names from the root down to `id`, space separated.
    pub fn command_path(&self, id: CommandId) -> String {
        match self.nodes[id.0].parent {
            Some(parent) => format!("{} {}", self.command_path(parent), self.display_name(id)),
            None => self.display_name(id).to_string(),
        }
    }

    /// Full usage line: the parent's path, the use line, and `[flags]` when
    /// the command has visible flags.
    pub fn use_line(&self, id: CommandId) -> String {
        let node = &self.nodes[id.0];
        let mut line = match node.parent {
            Some(parent) => format!("{} {}", self.command_path(parent), node.use_line),
            None => node.use_line.clone(),
        };
        if self.has_available_flags(id) && !line.contains("[flags]") {
            line.push_str(" [flags]");
        }
        line
    }

    pub fn has_sub_commands(&self, id: CommandId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    pub fn has_available_sub_commands(&self, id: CommandId) -> bool {
        self.nodes[id.0]
            .children
            .iter()
            .any(|&child| self.is_available_command(child))
    }

    /// Whether `id` shows up in help listings and suggestions.
    pub fn is_available_command(&self, id: CommandId) -> bool {
        let cmd = &self.nodes[id.0];
        if cmd.is_deprecated() || cmd.hidden || self.help_command == Some(id) {
            return false;
        }
        cmd.is_runnable() || self.has_available_sub_commands(id)
    }

    /// A non-runnable, visible command without visible subcommands.
    pub fn is_additional_help_topic(&self, id: CommandId) -> bool {
        let cmd = &self.nodes[id.0];
        !(cmd.is_runnable()
            || cmd.is_deprecated()
            || cmd.hidden
            || self.has_available_sub_commands(id))
    }

    /// Installs a flag-name normalization function on `id` and its subtree.
    pub fn set_global_normalization_fn(&mut self, id: CommandId, normalize: NormalizeFn) {
        for node in self.descendants(id) {
            let cmd = &mut self.nodes[node.0];
            cmd.flags.set_normalize_fn(Some(Rc::clone(&normalize)));
            cmd.persistent_flags
                .set_normalize_fn(Some(Rc::clone(&normalize)));
            cmd.parents_pflags
                .set_normalize_fn(Some(Rc::clone(&normalize)));
            cmd.global_normalize = Some(Rc::clone(&normalize));
        }
    }

    /// Rewrites every child's parent link from its parent's child list.
    pub(crate) fn normalize_parents(&mut self) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let children = self.nodes[id.0].children.clone();
            for child in children {
                self.nodes[child.0].parent = Some(id);
                stack.push(child);
            }
        }
    }

    /// Supplies the arguments for the next execution instead of the
    /// process arguments.
    pub fn set_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

/// A read-only view of one command and the tree around it.
#[derive(Clone, Copy)]
pub struct CommandRef<'a> {
    tree: &'a CommandTree,
    id: CommandId,
}

impl<'a> CommandRef<'a> {
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    pub fn command(&self) -> &'a Command {
        self.tree.get(self.id)
    }

    pub fn name(&self) -> &'a str {
        self.tree.name(self.id)
    }

    pub fn display_name(&self) -> &'a str {
        self.tree.display_name(self.id)
    }

    pub fn command_path(&self) -> String {
        self.tree.command_path(self.id)
    }

    pub fn use_line(&self) -> String {
        self.tree.use_line(self.id)
    }

    pub fn called_as(&self) -> &'a str {
        self.command().called_as()
    }

    pub fn parent(&self) -> Option<CommandRef<'a>> {
        self.tree.parent(self.id).map(|p| self.tree.command(p))
    }

    pub fn root(&self) -> CommandRef<'a> {
        self.tree.command(self.tree.root_of(self.id))
    }

    pub fn children(self) -> impl Iterator<Item = CommandRef<'a>> {
        let tree = self.tree;
        tree.children(self.id).iter().map(move |&c| tree.command(c))
    }

    /// Parsed flags of this command, including inherited ones.
    pub fn flags(&self) -> &'a FlagSet {
        self.command().flags()
    }

    pub fn persistent_flags(&self) -> &'a FlagSet {
        self.command().persistent_flags()
    }

    pub fn local_flags(&self) -> FlagSet {
        self.tree.local_flags(self.id)
    }

    pub fn inherited_flags(&self) -> FlagSet {
        self.tree.inherited_flags(self.id)
    }

    /// The command's context, or the background context when unset.
    pub fn context(&self) -> Context {
        self.command().context().cloned().unwrap_or_default()
    }

    pub fn out(&self) -> Sink {
        self.tree.out_or_stdout(self.id)
    }

    pub fn err(&self) -> Sink {
        self.tree.err_or_stderr(self.id)
    }

    pub fn input(&self) -> Source {
        self.tree.in_or_stdin(self.id)
    }

    /// Writes a line to the command's `out` stream (stdout when unset).
    pub fn println(&self, line: &str) {
        let out = self.out();
        let _ = writeln!(out.borrow_mut(), "{line}");
    }

    /// Writes a line to the command's `err` stream.
    pub fn eprintln(&self, line: &str) {
        self.tree.print_err_ln(self.id, line);
    }
}

impl fmt::Debug for CommandRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRef")
            .field("id", &self.id)
            .field("path", &self.command_path())
            .finish()
    }
}
