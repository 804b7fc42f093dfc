//! Help and usage output, plus the framework's own help machinery: the
//! `--help` and `--version` flags and the `help [command]` subcommand.
//!
//! Rendering goes through the [`HelpRenderer`] trait so applications can
//! replace the plain layout of [`PlainHelp`].

use std::io::{self, Write};

use cmdtree_flags::Flag;
use tracing::debug;

use crate::command::{ANNOTATION_SET_BY_FRAMEWORK, Command};
use crate::error::{BoxError, Result};
use crate::tree::{CommandId, CommandRef, CommandTree};

/// Name of the help flag and help command.
pub const HELP: &str = "help";

/// Name of the version flag.
pub const VERSION: &str = "version";

/// Renders help, usage and version text for a command.
pub trait HelpRenderer {
    /// Full help: description followed by usage.
    fn help(&self, cmd: CommandRef<'_>, out: &mut dyn Write) -> io::Result<()>;

    /// Usage section only.
    fn usage(&self, cmd: CommandRef<'_>, out: &mut dyn Write) -> io::Result<()>;

    fn version(&self, cmd: CommandRef<'_>, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} version {}", cmd.display_name(), cmd.command().version)
    }
}

/// Plain-text layout in the familiar `Usage:` / `Flags:` shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHelp;

impl HelpRenderer for PlainHelp {
    fn help(&self, cmd: CommandRef<'_>, out: &mut dyn Write) -> io::Result<()> {
        let command = cmd.command();
        let description = if command.long.is_empty() {
            &command.short
        } else {
            &command.long
        };
        let description = description.trim();
        if !description.is_empty() {
            writeln!(out, "{description}")?;
            writeln!(out)?;
        }
        let tree = cmd.tree();
        if command.is_runnable() || tree.has_sub_commands(cmd.id()) {
            self.usage(cmd, out)?;
        }
        Ok(())
    }

    fn usage(&self, cmd: CommandRef<'_>, out: &mut dyn Write) -> io::Result<()> {
        let tree = cmd.tree();
        let id = cmd.id();
        let command = cmd.command();

        writeln!(out, "Usage:")?;
        if command.is_runnable() {
            writeln!(out, "  {}", cmd.use_line())?;
        }
        if tree.has_available_sub_commands(id) {
            writeln!(out, "  {} [command]", cmd.command_path())?;
        }

        if !command.aliases.is_empty() {
            writeln!(out, "\nAliases:")?;
            let mut names = vec![command.name()];
            names.extend(command.aliases.iter().map(String::as_str));
            writeln!(out, "  {}", names.join(", "))?;
        }

        if !command.example.is_empty() {
            writeln!(out, "\nExamples:\n{}", command.example)?;
        }

        if tree.has_available_sub_commands(id) {
            write_command_listing(tree, id, out)?;
        }

        let local = cmd.local_flags();
        if local.has_available_flags() {
            write!(out, "\nFlags:\n{}", local.flag_usages())?;
        }
        let inherited = cmd.inherited_flags();
        if inherited.has_available_flags() {
            write!(out, "\nGlobal Flags:\n{}", inherited.flag_usages())?;
        }

        let topics: Vec<CommandId> = tree
            .listed_children(id)
            .into_iter()
            .filter(|&c| tree.is_additional_help_topic(c))
            .collect();
        if !topics.is_empty() {
            writeln!(out, "\nAdditional help topics:")?;
            let padding = command.command_path_padding();
            for topic in topics {
                let path = tree.command_path(topic);
                writeln!(out, "  {path:<padding$} {}", tree.get(topic).short)?;
            }
        }

        if tree.has_available_sub_commands(id) {
            writeln!(
                out,
                "\nUse \"{} [command] --help\" for more information about a command.",
                cmd.command_path()
            )?;
        }
        Ok(())
    }
}

/// Lists available subcommands, grouped by command group when any are
/// declared.
fn write_command_listing(tree: &CommandTree, id: CommandId, out: &mut dyn Write) -> io::Result<()> {
    let padding = tree.get(id).name_padding();
    let available: Vec<CommandId> = tree
        .listed_children(id)
        .into_iter()
        .filter(|&c| tree.is_available_command(c) || tree.help_command == Some(c))
        .collect();

    let groups = tree.all_groups(id);
    if groups.is_empty() {
        writeln!(out, "\nAvailable Commands:")?;
        for &child in &available {
            write_entry(tree, padding, out, child)?;
        }
        return Ok(());
    }

    for group in groups {
        writeln!(out, "\n{}", group.title)?;
        for &child in available.iter().filter(|&&c| tree.get(c).group_id == group.id) {
            write_entry(tree, padding, out, child)?;
        }
    }
    let ungrouped: Vec<CommandId> = available
        .into_iter()
        .filter(|&c| tree.get(c).group_id.is_empty())
        .collect();
    if !ungrouped.is_empty() {
        writeln!(out, "\nAdditional Commands:")?;
        for child in ungrouped {
            write_entry(tree, padding, out, child)?;
        }
    }
    Ok(())
}

fn write_entry(tree: &CommandTree, padding: usize, out: &mut dyn Write, child: CommandId) -> io::Result<()> {
    let cmd = tree.get(child);
    writeln!(out, "  {:<padding$} {}", cmd.name(), cmd.short)
}

impl CommandTree {
    /// Replaces the renderer used for help, usage and version output.
    pub fn set_help_renderer(&mut self, renderer: impl HelpRenderer + 'static) {
        self.help_renderer = std::rc::Rc::new(renderer);
    }

    pub fn help_string(&self, id: CommandId) -> String {
        let mut buf = Vec::new();
        let _ = self.help_renderer.help(self.command(id), &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn usage_string(&self, id: CommandId) -> String {
        let mut buf = Vec::new();
        let _ = self.help_renderer.usage(self.command(id), &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Writes help for `id` to its `out` stream (stdout when unset).
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if writing fails.
    pub fn render_help(&self, id: CommandId) -> Result<()> {
        let out = self.out_or_stdout(id);
        self.help_renderer.help(self.command(id), &mut *out.borrow_mut())?;
        Ok(())
    }

    /// Writes usage for `id` to its `out` stream (stderr when unset).
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if writing fails.
    pub fn render_usage(&self, id: CommandId) -> Result<()> {
        let out = self.out_or_stderr(id);
        self.help_renderer.usage(self.command(id), &mut *out.borrow_mut())?;
        Ok(())
    }

    /// Writes the version line for `id` to its `out` stream.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if writing fails.
    pub fn render_version(&self, id: CommandId) -> Result<()> {
        let out = self.out_or_stdout(id);
        self.help_renderer.version(self.command(id), &mut *out.borrow_mut())?;
        Ok(())
    }

    /// Declares `--help` on `id` unless a flag of that name is already
    /// visible there. Takes `-h` only when that shorthand is free.
    pub fn init_default_help_flag(&mut self, id: CommandId) {
        if self.effective_flag(id, HELP).is_some() {
            return;
        }
        let name = self.display_name(id).to_string();
        let mut flag = Flag::bool(HELP, false)
            .with_usage(format!("help for {name}"))
            .with_annotation(ANNOTATION_SET_BY_FRAMEWORK, vec!["true".to_string()]);
        if self.effective_shorthand(id, 'h').is_none() {
            flag = flag.with_shorthand('h');
        }
        self.nodes[id.0].flags.add(flag);
    }

    /// Declares `--version` on `id` when it has a version string and no
    /// flag of that name is visible. Takes `-v` only when free.
    pub fn init_default_version_flag(&mut self, id: CommandId) {
        if self.nodes[id.0].version.is_empty() || self.effective_flag(id, VERSION).is_some() {
            return;
        }
        let name = self.display_name(id).to_string();
        let mut flag = Flag::bool(VERSION, false)
            .with_usage(format!("version for {name}"))
            .with_annotation(ANNOTATION_SET_BY_FRAMEWORK, vec!["true".to_string()]);
        if self.effective_shorthand(id, 'v').is_none() {
            flag = flag.with_shorthand('v');
        }
        self.nodes[id.0].flags.add(flag);
    }

    /// Adds the `help [command]` subcommand to the root when the root has
    /// subcommands and none of them is already called `help`. Re-running
    /// moves it to the end of the root's children.
    pub fn init_default_help_cmd(&mut self) {
        let root = self.root;
        if !self.has_sub_commands(root) {
            return;
        }
        let id = match self.help_command {
            Some(id) => id,
            None => {
                let taken = self.nodes[root.0].children.iter().any(|&c| {
                    let cmd = &self.nodes[c.0];
                    cmd.name() == HELP || cmd.has_alias(HELP)
                });
                if taken {
                    return;
                }
                let id = self.insert(default_help_command());
                self.help_command = Some(id);
                id
            }
        };
        self.remove_command(root, &[id]);
        self.attach(root, id);
        debug!("installed default help command");
    }

    /// The framework's help subcommand, once installed.
    pub fn help_command(&self) -> Option<CommandId> {
        self.help_command
    }
}

fn default_help_command() -> Command {
    Command::new("help [command]")
        .with_short("Help about any command")
        .with_long(
            "Help provides help for any command in the application.\n\
             Simply type the application name followed by help [path to command] for full details.",
        )
        .with_run(run_help_topic)
}

fn run_help_topic(cmd: CommandRef<'_>, args: &[String]) -> std::result::Result<(), BoxError> {
    let tree = cmd.tree();
    let root = tree.root_of(cmd.id());
    match tree.resolve(root, args) {
        Ok(resolution) => tree.render_help(resolution.command)?,
        Err(_) => {
            let topic: Vec<String> = args.iter().map(|a| format!("`{a}`")).collect();
            cmd.println(&format!("Unknown help topic [{}]", topic.join(" ")));
            let out = cmd.out();
            tree.help_renderer
                .usage(tree.command(root), &mut *out.borrow_mut())?;
        }
    }
    Ok(())
}
