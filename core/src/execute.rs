//! The execution engine.
//!
//! [`execute_c`](CommandTree::execute_c) prepares the tree (parent links,
//! default help and completion commands, group checks, default help flags), resolves the
//! argument vector, and runs the resolved command:
//!
//! 1. deprecation notice, default `--help`/`--version` flags on the
//!    resolved command
//! 2. flag parsing (through the flag-error transform on failure)
//! 3. `--help`, `--version`, or a non-runnable command short-circuit
//! 4. initializers, positional-argument validation
//! 5. persistent pre-run, pre-run, required-flag and flag-group checks
//! 6. run, post-run, persistent post-run, then finalizers
//!
//! The first error stops the chain. Errors are printed with the error
//! prefix and followed by usage unless silenced.

use std::rc::Rc;

use cmdtree_flags::FlagError;
use tracing::{debug, warn};

use crate::command::{FlagErrorFn, HookFn};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::help::{HELP, VERSION};
use crate::resolve::Resolution;
use crate::tree::{CommandId, CommandTree};

const DEFAULT_ERR_PREFIX: &str = "Error:";

/// How a command's execution ended, short of an error.
enum Outcome {
    Ran,
    HelpRequested,
}

impl CommandTree {
    /// Registers a callback run before the hooks of every runnable
    /// execution.
    pub fn on_initialize(&mut self, init: impl Fn() + 'static) {
        self.initializers.push(Rc::new(init));
    }

    /// Registers a callback run after the hooks of every runnable
    /// execution, whether or not they failed.
    pub fn on_finalize(&mut self, fin: impl Fn() + 'static) {
        self.finalizers.push(Rc::new(fin));
    }

    /// Executes the tree and returns only the result.
    ///
    /// # Errors
    ///
    /// See [`execute_c`](Self::execute_c).
    pub fn execute(&mut self) -> Result<()> {
        self.execute_c().1
    }

    /// Sets the root context, then executes.
    ///
    /// # Errors
    ///
    /// See [`execute_c`](Self::execute_c).
    pub fn execute_context(&mut self, ctx: Context) -> Result<()> {
        let root = self.root;
        self.nodes[root.0].ctx = Some(ctx);
        self.execute()
    }

    /// Resolves the arguments (set with [`set_args`](Self::set_args), or
    /// the process arguments) and executes the resulting command.
    ///
    /// Returns the command that ran (the root when resolution failed) and
    /// the outcome.
    ///
    /// # Panics
    ///
    /// Panics if a subcommand names a group its parent does not declare.
    pub fn execute_c(&mut self) -> (CommandId, Result<()>) {
        let root = self.root;
        if self.nodes[root.0].ctx.is_none() {
            self.nodes[root.0].ctx = Some(Context::background());
        }
        self.normalize_parents();
        self.init_default_help_cmd();
        self.init_default_completion_cmd();
        self.check_command_groups(root);
        for id in self.descendants(root) {
            self.init_default_help_flag(id);
        }

        let args = self
            .args
            .clone()
            .unwrap_or_else(|| std::env::args().skip(1).collect());
        debug!(?args, "executing");

        let resolved = if self.nodes[root.0].traverse_children {
            self.traverse(root, &args)
        } else {
            self.find(root, &args)
        };
        let Resolution { command, args: flags } = match resolved {
            Ok(resolution) => resolution,
            Err(err) => {
                if !self.nodes[root.0].silence_errors {
                    let prefix = self.err_prefix(root);
                    self.print_err_ln(root, &format!("{prefix} {err}"));
                    let path = self.command_path(root);
                    self.print_err_ln(root, &format!("Run '{path} --help' for usage."));
                }
                return (root, Err(err));
            }
        };

        let root_ctx = self.nodes[root.0].ctx.clone();
        let node = &mut self.nodes[command.0];
        node.called = true;
        if node.called_as.is_empty() {
            node.called_as = node.name().to_string();
        }
        if node.ctx.is_none() {
            node.ctx = root_ctx;
        }

        let outcome = self
            .execute_command(command, &flags)
            .and_then(|outcome| match outcome {
                Outcome::Ran => Ok(()),
                Outcome::HelpRequested => self.render_help(command),
            });
        if let Err(err) = &outcome {
            let silence_errors = self.nodes[command.0].silence_errors || self.nodes[root.0].silence_errors;
            let silence_usage = self.nodes[command.0].silence_usage || self.nodes[root.0].silence_usage;
            if !silence_errors {
                let prefix = self.err_prefix(command);
                self.print_err_ln(root, &format!("{prefix} {err}"));
            }
            if !silence_usage {
                self.println(root, &self.usage_string(command));
            }
            warn!(command = %self.command_path(command), %err, "execution failed");
        }
        (command, outcome)
    }

    fn execute_command(&mut self, id: CommandId, args: &[String]) -> Result<Outcome> {
        let deprecated = self.nodes[id.0].deprecated.clone();
        if !deprecated.is_empty() {
            let name = self.name(id).to_string();
            self.println(id, &format!("Command {name:?} is deprecated, {deprecated}"));
        }

        self.init_default_help_flag(id);
        self.init_default_version_flag(id);

        if let Err(err) = self.parse_flags(id, args) {
            return Err(self.transform_flag_error(id, err));
        }

        if self.builtin_flag_set(id, HELP)? {
            return Ok(Outcome::HelpRequested);
        }
        if !self.nodes[id.0].version.is_empty() && self.builtin_flag_set(id, VERSION)? {
            self.render_version(id)?;
            return Ok(Outcome::Ran);
        }
        if !self.nodes[id.0].is_runnable() {
            return Ok(Outcome::HelpRequested);
        }

        for init in &self.initializers {
            init();
        }
        let result = self.run_hooks(id, args);
        for fin in &self.finalizers {
            fin();
        }
        result.map(|()| Outcome::Ran)
    }

    /// Reads the `help` or `version` flag of `id`. An absent flag reads as
    /// unset; one declared with another type is an error.
    fn builtin_flag_set(&self, id: CommandId, name: &str) -> Result<bool> {
        match self.nodes[id.0].flags.get_bool(name) {
            Ok(set) => Ok(set),
            Err(FlagError::NotFound(_)) => Ok(false),
            Err(err) => {
                self.println(id, &format!("{name:?} flag declared as non-bool. Please correct your code"));
                Err(Error::Flag(err))
            }
        }
    }

    /// Validates positional args and runs the hook chain of `id`.
    fn run_hooks(&self, id: CommandId, raw_args: &[String]) -> Result<()> {
        let node = &self.nodes[id.0];
        let args: Vec<String> = if node.disable_flag_parsing {
            raw_args.to_vec()
        } else {
            node.flags.args().to_vec()
        };
        let cmd = self.command(id);
        if let Some(rule) = &node.args {
            rule.validate(cmd, &args)?;
        }

        let lineage = self.lineage(id);
        let traverse = self.config.enable_traverse_run_hooks;

        let pre_runs = lineage
            .iter()
            .rev()
            .filter_map(|&c| self.nodes[c.0].hooks.persistent_pre_run.as_ref());
        if traverse {
            for hook in pre_runs {
                self.call(id, hook, &args, "persistent pre-run")?;
            }
        } else if let Some(hook) = lineage
            .iter()
            .find_map(|&c| self.nodes[c.0].hooks.persistent_pre_run.as_ref())
        {
            self.call(id, hook, &args, "persistent pre-run")?;
        }
        if let Some(hook) = &node.hooks.pre_run {
            self.call(id, hook, &args, "pre-run")?;
        }

        self.validate_required_flags(id)?;
        self.validate_flag_groups(id)?;

        if let Some(hook) = &node.hooks.run {
            self.call(id, hook, &args, "run")?;
        }
        if let Some(hook) = &node.hooks.post_run {
            self.call(id, hook, &args, "post-run")?;
        }

        let mut post_runs = lineage
            .iter()
            .filter_map(|&c| self.nodes[c.0].hooks.persistent_post_run.as_ref());
        if traverse {
            for hook in post_runs {
                self.call(id, hook, &args, "persistent post-run")?;
            }
        } else if let Some(hook) = post_runs.next() {
            self.call(id, hook, &args, "persistent post-run")?;
        }
        Ok(())
    }

    fn call(&self, id: CommandId, hook: &HookFn, args: &[String], phase: &str) -> Result<()> {
        debug!(command = self.name(id), phase, "running hook");
        hook(self.command(id), args).map_err(Error::from_hook)
    }

    /// The flag-error transform of `id` or its nearest ancestor that has
    /// one.
    pub fn flag_error_fn(&self, id: CommandId) -> Option<FlagErrorFn> {
        self.lineage(id)
            .into_iter()
            .find_map(|c| self.nodes[c.0].flag_error_fn.clone())
    }

    fn transform_flag_error(&self, id: CommandId, err: FlagError) -> Error {
        match self.flag_error_fn(id) {
            Some(transform) => transform(self.command(id), err),
            None => Error::Flag(err),
        }
    }

    /// The error prefix of `id` or its nearest ancestor that sets one,
    /// `Error:` otherwise.
    pub fn err_prefix(&self, id: CommandId) -> String {
        self.lineage(id)
            .into_iter()
            .find_map(|c| self.nodes[c.0].err_prefix.clone())
            .unwrap_or_else(|| DEFAULT_ERR_PREFIX.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use cmdtree_flags::Flag;

    use super::*;
    use crate::{Command, PositionalArgs, SharedBuffer};

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging(log: &Log, entry: &'static str) -> impl Fn(crate::CommandRef<'_>, &[String]) -> std::result::Result<(), crate::BoxError> + 'static {
        let log = Rc::clone(log);
        move |_, _| {
            log.borrow_mut().push(entry.to_string());
            Ok(())
        }
    }

    fn quiet(cmd: Command) -> Command {
        cmd.with_out(SharedBuffer::default())
            .with_err(SharedBuffer::default())
    }

    #[test]
    fn test_run_receives_positional_args() {
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut tree = CommandTree::new(quiet(Command::new("root")));
        let root = tree.root();
        tree.add_command(
            root,
            Command::new("echo")
                .with_flag(Flag::bool("upper", false))
                .with_run(move |cmd, args| {
                    assert!(cmd.flags().get_bool("upper")?);
                    sink.borrow_mut().extend(args.iter().cloned());
                    Ok(())
                }),
        );
        tree.set_args(["echo", "--upper", "a", "b"]);
        let (id, result) = tree.execute_c();
        result.unwrap();
        assert_eq!(tree.name(id), "echo");
        assert!(tree.get(id).was_called());
        assert_eq!(tree.get(id).called_as(), "echo");
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_hook_order_nearest_persistent_only() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_persistent_pre_run(logging(&log, "root ppre"))
                .with_persistent_post_run(logging(&log, "root ppost")),
        ));
        let root = tree.root();
        let child = tree.add_command(
            root,
            Command::new("child")
                .with_persistent_pre_run(logging(&log, "child ppre"))
                .with_persistent_post_run(logging(&log, "child ppost")),
        );
        tree.add_command(
            child,
            Command::new("leaf")
                .with_pre_run(logging(&log, "pre"))
                .with_run(logging(&log, "run"))
                .with_post_run(logging(&log, "post")),
        );
        tree.set_args(["child", "leaf"]);
        tree.execute().unwrap();
        assert_eq!(*log.borrow(), vec!["child ppre", "pre", "run", "post", "child ppost"]);
    }

    #[test]
    fn test_hook_order_traversing_persistent_hooks() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_persistent_pre_run(logging(&log, "root ppre"))
                .with_persistent_post_run(logging(&log, "root ppost")),
        ));
        tree.config_mut().enable_traverse_run_hooks = true;
        let root = tree.root();
        tree.add_command(
            root,
            Command::new("leaf")
                .with_persistent_pre_run(logging(&log, "leaf ppre"))
                .with_persistent_post_run(logging(&log, "leaf ppost"))
                .with_run(logging(&log, "run")),
        );
        tree.set_args(["leaf"]);
        tree.execute().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["root ppre", "leaf ppre", "run", "leaf ppost", "root ppost"]
        );
    }

    #[test]
    fn test_failing_hook_stops_chain_and_is_verbatim() {
        let log: Log = Rc::default();
        let err_buf = SharedBuffer::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_err(err_buf.clone())
                .with_out(SharedBuffer::default())
                .with_pre_run(|_, _| Err("boom".into()))
                .with_run(logging(&log, "run")),
        );
        tree.set_args(Vec::<String>::new());
        let err = tree.execute_c().1.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(log.borrow().is_empty());
        assert_eq!(err_buf.contents(), "Error: boom\n");
    }

    #[test]
    fn test_finalizers_run_after_failure() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(Command::new("root").with_run(|_, _| Err("nope".into()))));
        let init_log = Rc::clone(&log);
        tree.on_initialize(move || init_log.borrow_mut().push("init".into()));
        let fin_log = Rc::clone(&log);
        tree.on_finalize(move || fin_log.borrow_mut().push("fin".into()));
        tree.set_args(Vec::<String>::new());
        assert!(tree.execute().is_err());
        assert_eq!(*log.borrow(), vec!["init", "fin"]);
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let log: Log = Rc::default();
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_short("The root")
                .with_out(out.clone())
                .with_run(logging(&log, "run")),
        );
        tree.set_args(["--help"]);
        tree.execute().unwrap();
        assert!(log.borrow().is_empty());
        assert!(out.contents().starts_with("The root\n\nUsage:"));
    }

    #[test]
    fn test_non_runnable_shows_help() {
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new(Command::new("root").with_short("Just a topic").with_out(out.clone()));
        tree.set_args(Vec::<String>::new());
        tree.execute().unwrap();
        assert!(out.contents().starts_with("Just a topic"));
    }

    #[test]
    fn test_version_flag_prints_version() {
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_version("2.0.1")
                .with_out(out.clone())
                .with_run(|_, _| Err("should not run".into())),
        );
        tree.set_args(["-v"]);
        tree.execute().unwrap();
        assert_eq!(out.contents(), "root version 2.0.1\n");
    }

    #[test]
    fn test_version_flag_declared_on_executed_command_only() {
        let mut tree = CommandTree::new(quiet(Command::new("root").with_version("1.0")));
        let root = tree.root();
        let sub = tree.add_command(root, Command::new("sub").with_version("1.1").with_run(|_, _| Ok(())));
        let other = tree.add_command(root, Command::new("other").with_version("1.2").with_run(|_, _| Ok(())));
        tree.set_args(["sub"]);
        tree.execute().unwrap();

        assert!(tree.flags(sub).contains(VERSION));
        assert!(!tree.flags(root).contains(VERSION));
        assert!(!tree.flags(other).contains(VERSION));
        assert!(tree.flags(other).contains(HELP));
    }

    #[test]
    fn test_non_bool_help_flag_is_an_error() {
        let out = SharedBuffer::default();
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_flag(Flag::string("help", ""))
                .with_out(out.clone())
                .with_err(SharedBuffer::default())
                .with_run(logging(&log, "run")),
        );
        tree.set_args(["--help", "me"]);
        let err = tree.execute().unwrap_err();
        assert!(matches!(err, Error::Flag(FlagError::TypeMismatch { .. })));
        assert!(out.contents().starts_with("\"help\" flag declared as non-bool. Please correct your code\n"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_flag_error_transform_inherited() {
        let mut tree = CommandTree::new(quiet(
            Command::new("root").with_flag_error_fn(|cmd, err| {
                Error::Args(format!("{}: {err}", cmd.command_path()))
            }),
        ));
        let root = tree.root();
        tree.add_command(root, Command::new("child").with_run(|_, _| Ok(())));
        tree.set_args(["child", "--nope"]);
        let err = tree.execute().unwrap_err();
        assert_eq!(err.to_string(), "root child: unknown flag: --nope");
    }

    #[test]
    fn test_args_validation_precedes_hooks() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_args(PositionalArgs::exact(1))
                .with_pre_run(logging(&log, "pre"))
                .with_run(logging(&log, "run")),
        ));
        tree.set_args(Vec::<String>::new());
        let err = tree.execute().unwrap_err();
        assert_eq!(err.to_string(), "accepts 1 arg(s), received 0");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_required_flags_checked_after_pre_run() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_flag(Flag::string("name", ""))
                .with_pre_run(logging(&log, "pre"))
                .with_run(logging(&log, "run")),
        ));
        let root = tree.root();
        tree.mark_flag_required(root, "name").unwrap();
        tree.set_args(Vec::<String>::new());
        let err = tree.execute().unwrap_err();
        assert!(matches!(err, Error::RequiredFlags(_)));
        assert_eq!(*log.borrow(), vec!["pre"]);
    }

    #[test]
    fn test_required_flags_skipped_without_flag_parsing() {
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_flag(Flag::string("name", ""))
                .with_disable_flag_parsing()
                .with_run(logging(&log, "run")),
        ));
        let root = tree.root();
        tree.mark_flag_required(root, "name").unwrap();
        tree.set_args(["--other"]);
        tree.execute().unwrap();
        assert_eq!(*log.borrow(), vec!["run"]);
    }

    #[test]
    fn test_error_output_and_usage() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_out(out.clone())
                .with_err(err.clone())
                .with_err_prefix("fatal:")
                .with_run(|_, _| Err("bad things".into())),
        );
        tree.set_args(Vec::<String>::new());
        assert!(tree.execute().is_err());
        assert_eq!(err.contents(), "fatal: bad things\n");
        assert!(out.contents().starts_with("Usage:\n  root [flags]"));
    }

    #[test]
    fn test_silenced_errors_print_nothing() {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let mut tree = CommandTree::new(
            Command::new("root")
                .with_out(out.clone())
                .with_err(err.clone())
                .with_silence_errors()
                .with_silence_usage()
                .with_run(|_, _| Err("bad things".into())),
        );
        tree.set_args(Vec::<String>::new());
        assert!(tree.execute().is_err());
        assert!(out.contents().is_empty());
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_unknown_command_reports_and_suggests() {
        let err_buf = SharedBuffer::default();
        let mut tree = CommandTree::new(Command::new("root").with_err(err_buf.clone()));
        let root = tree.root();
        tree.add_command(root, Command::new("times").with_run(|_, _| Ok(())));
        tree.set_args(["tims"]);
        let (id, result) = tree.execute_c();
        assert_eq!(id, root);
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown command \"tims\" for \"root\"\n\nDid you mean this?\n\ttimes\n"
        );
        assert!(err_buf.contents().ends_with("Run 'root --help' for usage.\n"));
    }

    #[test]
    fn test_deprecated_command_still_runs() {
        let out = SharedBuffer::default();
        let log: Log = Rc::default();
        let mut tree = CommandTree::new(Command::new("root").with_out(out.clone()));
        let root = tree.root();
        tree.add_command(
            root,
            Command::new("old")
                .with_deprecated("use new instead")
                .with_run(logging(&log, "run")),
        );
        tree.set_args(["old"]);
        tree.execute().unwrap();
        assert_eq!(*log.borrow(), vec!["run"]);
        assert!(out.contents().starts_with("Command \"old\" is deprecated, use new instead\n"));
    }

    #[test]
    fn test_context_inherited_from_root() {
        let seen: Rc<RefCell<Option<String>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut tree = CommandTree::new(quiet(Command::new("root")));
        let root = tree.root();
        tree.add_command(
            root,
            Command::new("child").with_run(move |cmd, _| {
                *sink.borrow_mut() = cmd.context().value("user").map(String::from);
                Ok(())
            }),
        );
        tree.set_args(["child"]);
        tree.execute_context(Context::background().with_value("user", "alice"))
            .unwrap();
        assert_eq!(seen.borrow().as_deref(), Some("alice"));
    }

    #[test]
    fn test_traverse_children_execution() {
        let seen: Rc<RefCell<String>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut tree = CommandTree::new(quiet(
            Command::new("root")
                .with_traverse_children()
                .with_flag(Flag::string("region", "")),
        ));
        let root = tree.root();
        tree.add_command(
            root,
            Command::new("deploy").with_run(move |cmd, _| {
                let root = cmd.root();
                *sink.borrow_mut() = root.flags().get_string("region")?;
                Ok(())
            }),
        );
        tree.set_args(["--region", "eu", "deploy"]);
        tree.execute().unwrap();
        assert_eq!(*seen.borrow(), "eu");
    }

    #[test]
    fn test_help_command_renders_topic() {
        let out = SharedBuffer::default();
        let mut tree = CommandTree::new(Command::new("root").with_out(out.clone()));
        let root = tree.root();
        tree.add_command(root, Command::new("serve").with_short("Serve things").with_run(|_, _| Ok(())));
        tree.set_args(["help", "serve"]);
        tree.execute().unwrap();
        assert!(out.contents().starts_with("Serve things\n\nUsage:\n  root serve [flags]"));
        assert!(out.contents().contains("help for serve"));

        out.clear();
        tree.set_args(["help", "nope"]);
        tree.execute().unwrap();
        assert!(out.contents().starts_with("Unknown help topic [`nope`]\nUsage:"));
    }
}
