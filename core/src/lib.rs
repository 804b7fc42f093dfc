//! A command-tree framework for building command-line applications.
//!
//! Applications declare a tree of [`Command`]s, each with local and
//! persistent flags and optional lifecycle hooks, and hand the argument
//! vector to the [`CommandTree`]. The framework:
//!
//! - resolves the words of the argument vector to a command, either by
//!   stripping flags first ([`find`](CommandTree::find)) or by parsing each
//!   level's flags on the way down ([`traverse`](CommandTree::traverse));
//! - merges inherited persistent flags into the resolved command and
//!   parses its arguments;
//! - validates positional arguments, required flags and flag groups;
//! - runs the persistent pre-run, pre-run, run, post-run and persistent
//!   post-run hooks;
//! - suggests close subcommand names when a word matches none.
//!
//! `--help`, `--version`, a `help [command]` subcommand and a `completion`
//! subcommand are provided by default.
//!
//! # Example
//!
//! ```
//! use cmdtree_core::{Command, CommandTree, PositionalArgs, SharedBuffer};
//! use cmdtree_flags::Flag;
//!
//! let out = SharedBuffer::default();
//! let mut tree = CommandTree::new(
//!     Command::new("greet")
//!         .with_persistent_flag(Flag::bool("loud", false).with_shorthand('l'))
//!         .with_out(out.clone()),
//! );
//! let root = tree.root();
//! tree.add_command(
//!     root,
//!     Command::new("hello <name>")
//!         .with_args(PositionalArgs::exact(1))
//!         .with_run(|cmd, args| {
//!             let mut line = format!("hello {}", args[0]);
//!             if cmd.flags().get_bool("loud")? {
//!                 line = line.to_uppercase();
//!             }
//!             cmd.println(&line);
//!             Ok(())
//!         }),
//! );
//!
//! tree.set_args(["hello", "-l", "world"]);
//! tree.execute().unwrap();
//! assert_eq!(out.contents(), "HELLO WORLD\n");
//! ```

mod args;
mod command;
mod completion;
mod config;
mod context;
mod error;
mod execute;
mod groups;
mod help;
mod output;
mod resolve;
mod schema;
mod scope;
mod suggest;
mod tree;

pub use args::PositionalArgs;
pub use command::{
    ANNOTATION_DISPLAY_NAME, ANNOTATION_REQUIRED, ANNOTATION_SET_BY_FRAMEWORK, Command,
    CompletionOptions, FlagErrorFn, Group, HookFn, Hooks,
};
pub use completion::{COMPLETION, CompletionDirective, FlagCompletionFn, flag_completion_fn};
pub use config::Config;
pub use context::Context;
pub use error::{BoxError, Error, Result};
pub use groups::{
    ANNOTATION_MUTUALLY_EXCLUSIVE, ANNOTATION_ONE_REQUIRED, ANNOTATION_REQUIRED_TOGETHER,
};
pub use help::{HELP, HelpRenderer, PlainHelp, VERSION};
pub use output::{SharedBuffer, Sink, Source, sink, source};
pub use resolve::Resolution;
pub use schema::{CommandSchema, FlagSchema, SCHEMA_VERSION, SchemaFormat, format_schema};
pub use suggest::DEFAULT_SUGGESTION_DISTANCE;
pub use tree::{CommandId, CommandRef, CommandTree};
