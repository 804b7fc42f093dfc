//! Mapping an argument vector onto a command of the tree.
//!
//! Two strategies exist. [`find`](CommandTree::find) strips flag tokens
//! without parsing them and walks subcommand names greedily.
//! [`traverse`](CommandTree::traverse) parses each level's flags as it
//! descends, so parents can act on their own flags before a child is
//! chosen.

use tracing::debug;

use crate::args::legacy_args;
use crate::error::Result;
use crate::tree::{CommandId, CommandTree};

/// The command an argument vector resolved to and the arguments left for
/// it to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub command: CommandId,
    pub args: Vec<String>,
}

impl CommandTree {
    /// Removes flag tokens (and the values they consume) from `args`,
    /// returning the candidate command words. Stops at `--`.
    ///
    /// Whether `--name` or `-x` consumes the next token is decided by the
    /// flags visible at `id`: it does unless the flag has a no-option
    /// default. Unknown flags are assumed to take a value.
    pub fn strip_flags(&self, id: CommandId, args: &[String]) -> Vec<String> {
        let mut commands = Vec::new();
        let mut rest = args;
        while let Some((first, tail)) = rest.split_first() {
            rest = tail;
            let token = first.as_str();
            if token == "--" {
                break;
            }
            if self.flag_consumes_next(id, token) {
                if rest.len() <= 1 {
                    break;
                }
                rest = &rest[1..];
                continue;
            }
            if !token.is_empty() && !token.starts_with('-') {
                commands.push(token.to_string());
            }
        }
        commands
    }

    /// `--name` or `-x` without an inline value, naming a flag that is
    /// unknown or has no no-option default.
    fn flag_consumes_next(&self, id: CommandId, token: &str) -> bool {
        if token.contains('=') {
            return false;
        }
        if let Some(name) = token.strip_prefix("--") {
            return !self.has_no_opt_default(id, name);
        }
        let mut chars = token.chars();
        if chars.next() == Some('-') {
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return !self.short_has_no_opt_default(id, c);
            }
        }
        false
    }

    fn has_no_opt_default(&self, id: CommandId, name: &str) -> bool {
        self.effective_flag(id, name)
            .is_some_and(|flag| flag.no_opt_default().is_some())
    }

    fn short_has_no_opt_default(&self, id: CommandId, shorthand: char) -> bool {
        self.effective_shorthand(id, shorthand)
            .is_some_and(|flag| flag.no_opt_default().is_some())
    }

    /// The child of `id` named `next`, and the name it was matched by.
    ///
    /// Exact name or alias matches win. With prefix matching enabled, a
    /// prefix shared by exactly one child selects it; an ambiguous prefix
    /// selects nothing.
    pub fn find_next(&self, id: CommandId, next: &str) -> Option<(CommandId, String)> {
        let mut prefixed = Vec::new();
        for &child in &self.nodes[id.0].children {
            let cmd = &self.nodes[child.0];
            if self.name_matches(cmd.name(), next)
                || cmd.aliases.iter().any(|alias| self.name_matches(alias, next))
            {
                return Some((child, next.to_string()));
            }
            if self.config.enable_prefix_matching {
                let called_as = std::iter::once(cmd.name())
                    .chain(cmd.aliases.iter().map(String::as_str))
                    .find(|name| name.starts_with(next));
                if let Some(called_as) = called_as {
                    prefixed.push((child, called_as.to_string()));
                }
            }
        }
        if prefixed.len() == 1 {
            prefixed.pop()
        } else {
            None
        }
    }

    fn name_matches(&self, name: &str, typed: &str) -> bool {
        if self.config.enable_case_insensitive {
            name.to_lowercase() == typed.to_lowercase()
        } else {
            name == typed
        }
    }

    /// `args` with the first non-flag token equal to `word` removed,
    /// skipping the values consumed by flags. Tokens after `--` are never
    /// removed.
    pub fn args_minus_first(&self, id: CommandId, args: &[String], word: &str) -> Vec<String> {
        let mut pos = 0;
        while pos < args.len() {
            let token = args[pos].as_str();
            if token == "--" {
                break;
            }
            if self.flag_consumes_next(id, token) {
                pos += 2;
                continue;
            }
            if !token.starts_with('-') && token == word {
                let mut out = args.to_vec();
                out.remove(pos);
                return out;
            }
            pos += 1;
        }
        args.to_vec()
    }

    /// Walks down from `start` consuming command words; returns the last
    /// command reached, its remaining args, and each step's matched name.
    fn walk(&self, start: CommandId, args: &[String]) -> (CommandId, Vec<String>, Vec<(CommandId, String)>) {
        let mut current = start;
        let mut args = args.to_vec();
        let mut trail = Vec::new();
        loop {
            let words = self.strip_flags(current, &args);
            let Some(next) = words.first() else {
                break;
            };
            let Some((child, called_as)) = self.find_next(current, next) else {
                break;
            };
            args = self.args_minus_first(current, &args, next);
            debug!(command = self.name(child), called_as, "descended");
            trail.push((child, called_as));
            current = child;
        }
        (current, args, trail)
    }

    /// Resolves `args` from `start` without touching the tree.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCommand`](crate::Error::UnknownCommand) when the
    /// resolved command has no positional-argument rule, has subcommands,
    /// is the root, and words are left over.
    pub fn resolve(&self, start: CommandId, args: &[String]) -> Result<Resolution> {
        let (command, args, _) = self.walk(start, args);
        self.check_leftover_words(command, &args)?;
        Ok(Resolution { command, args })
    }

    /// Like [`resolve`](Self::resolve), and records on each command
    /// descended through the name it was invoked by.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn find(&mut self, start: CommandId, args: &[String]) -> Result<Resolution> {
        let (command, args, trail) = self.walk(start, args);
        for (id, called_as) in trail {
            self.nodes[id.0].called_as = called_as;
        }
        debug!(command = self.name(command), remaining = ?args, "resolved by find");
        self.check_leftover_words(command, &args)?;
        Ok(Resolution { command, args })
    }

    fn check_leftover_words(&self, id: CommandId, args: &[String]) -> Result<()> {
        if self.nodes[id.0].args.is_some() {
            return Ok(());
        }
        legacy_args(self, id, &self.strip_flags(id, args))
    }

    /// Resolves `args` from `start`, parsing each ancestor's flags on the
    /// way down.
    ///
    /// Flag tokens seen before a subcommand word are parsed at the current
    /// level; the remaining tokens become the next level's input. The first
    /// non-flag token that is not a subcommand ends the walk.
    ///
    /// # Errors
    ///
    /// Returns a [`Flag`](crate::Error::Flag) error when an ancestor's flags
    /// fail to parse.
    pub fn traverse(&mut self, start: CommandId, args: &[String]) -> Result<Resolution> {
        let mut current = start;
        let mut args = args.to_vec();
        loop {
            let mut flags = Vec::new();
            let mut in_flag = false;
            let mut matched = None;
            for (i, arg) in args.iter().enumerate() {
                let token = arg.as_str();
                if let Some(name) = token.strip_prefix("--").filter(|_| !token.contains('=')) {
                    in_flag = !self.has_no_opt_default(current, name);
                    flags.push(arg.clone());
                    continue;
                }
                if let Some(shorthand) = lone_shorthand(token) {
                    in_flag = !self.short_has_no_opt_default(current, shorthand);
                    flags.push(arg.clone());
                    continue;
                }
                if in_flag {
                    in_flag = false;
                    flags.push(arg.clone());
                    continue;
                }
                if is_flag_arg(token) {
                    flags.push(arg.clone());
                    continue;
                }
                matched = self
                    .find_next(current, token)
                    .map(|(child, called_as)| (i, child, called_as));
                break;
            }

            let Some((i, child, called_as)) = matched else {
                debug!(command = self.name(current), "resolved by traverse");
                return Ok(Resolution {
                    command: current,
                    args,
                });
            };
            self.parse_flags(current, &flags)?;
            self.nodes[child.0].called_as = called_as;
            args = args.split_off(i + 1);
            current = child;
        }
    }
}

/// The shorthand of a two-character `-x` token.
fn lone_shorthand(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('-'), Some(c), None) if c != '-' => Some(c),
        _ => None,
    }
}

/// `--x...` or `-x...` where `x` is not `-`.
pub(crate) fn is_flag_arg(token: &str) -> bool {
    let bytes = token.as_bytes();
    (bytes.len() >= 3 && token.starts_with("--"))
        || (bytes.len() >= 2 && bytes[0] == b'-' && bytes[1] != b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, Config};
    use cmdtree_flags::Flag;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn runnable(use_line: &str) -> Command {
        Command::new(use_line).with_run(|_, _| Ok(()))
    }

    fn flagged_root() -> CommandTree {
        CommandTree::new(
            runnable("root")
                .with_flag(Flag::int("int", 0).with_shorthand('i'))
                .with_flag(Flag::string("str", "").with_shorthand('s'))
                .with_flag(Flag::bool("bool", false).with_shorthand('b'))
                .with_persistent_flag(Flag::bool("persist", false).with_shorthand('p')),
        )
    }

    #[test]
    fn test_strip_flags() {
        let tree = flagged_root();
        let root = tree.root();
        let cases: &[(&[&str], &[&str])] = &[
            (&[""], &[]),
            (&["foo", "bar"], &["foo", "bar"]),
            (&["foo", "--str", "-s"], &["foo"]),
            (&["-s", "foo", "--str", "bar"], &[]),
            (&["-i10", "echo"], &["echo"]),
            (&["-i=10", "echo"], &["echo"]),
            (&["--int=100", "echo"], &["echo"]),
            (&["-ib", "echo", "-sfoo", "baz"], &["echo", "baz"]),
            (&["-i=baz", "bar", "-i", "foo", "blah"], &["bar", "blah"]),
            (&["--int", "baz", "-sfoo", "bar", "-i", "foo", "blah"], &["bar", "blah"]),
            (&["--bool", "bar", "-i", "foo", "blah"], &["bar", "blah"]),
            (&["-b", "bar", "-i", "foo", "blah"], &["bar", "blah"]),
            (&["--persist", "bar"], &["bar"]),
            (&["-p", "bar"], &["bar"]),
            (&["bar", "--", "baz"], &["bar"]),
        ];
        for (input, expected) in cases {
            assert_eq!(tree.strip_flags(root, &strings(input)), strings(expected), "input {input:?}");
        }
    }

    #[test]
    fn test_strip_flags_stops_on_trailing_value_flag() {
        let tree = flagged_root();
        assert!(tree.strip_flags(tree.root(), &strings(&["--str", "x"])).is_empty());
        assert!(tree.strip_flags(tree.root(), &strings(&["--unknown"])).is_empty());
    }

    #[test]
    fn test_args_minus_first() {
        let tree = flagged_root();
        let root = tree.root();
        assert_eq!(
            tree.args_minus_first(root, &strings(&["-s", "sub", "sub", "x"]), "sub"),
            strings(&["-s", "sub", "x"])
        );
        assert_eq!(
            tree.args_minus_first(root, &strings(&["--", "sub"]), "sub"),
            strings(&["--", "sub"])
        );
        assert_eq!(
            tree.args_minus_first(root, &strings(&["-b", "sub", "x"]), "sub"),
            strings(&["-b", "x"])
        );
    }

    #[test]
    fn test_find_exact_and_alias() {
        let mut tree = CommandTree::new(runnable("root"));
        let root = tree.root();
        let child = tree.add_command(root, runnable("child").with_aliases(["kid"]));
        let res = tree.find(root, &strings(&["kid", "arg"])).unwrap();
        assert_eq!(res.command, child);
        assert_eq!(res.args, strings(&["arg"]));
        assert_eq!(tree.get(child).called_as(), "kid");
    }

    #[test]
    fn test_find_unknown_at_root_errors() {
        let mut tree = CommandTree::new(runnable("root"));
        let root = tree.root();
        tree.add_command(root, runnable("child"));
        let err = tree.find(root, &strings(&["nope"])).unwrap_err();
        assert_eq!(err.to_string(), r#"unknown command "nope" for "root""#);
    }

    #[test]
    fn test_find_leftover_words_on_leaf_are_args() {
        let mut tree = CommandTree::new(runnable("root"));
        let root = tree.root();
        let child = tree.add_command(root, runnable("child"));
        let res = tree.find(root, &strings(&["child", "one", "two"])).unwrap();
        assert_eq!(res.command, child);
        assert_eq!(res.args, strings(&["one", "two"]));
    }

    #[test]
    fn test_prefix_matching() {
        let config = Config {
            enable_prefix_matching: true,
            ..Config::default()
        };
        let mut tree = CommandTree::with_config(runnable("root"), config);
        let root = tree.root();
        let apple = tree.add_command(root, runnable("apple"));
        tree.add_command(root, runnable("banana"));
        tree.add_command(root, runnable("bandana"));

        assert_eq!(tree.find_next(root, "app"), Some((apple, "apple".to_string())));
        assert_eq!(tree.find_next(root, "ban"), None);
        assert_eq!(tree.find_next(root, "apple"), Some((apple, "apple".to_string())));
    }

    #[test]
    fn test_exact_match_beats_prefix() {
        let config = Config {
            enable_prefix_matching: true,
            ..Config::default()
        };
        let mut tree = CommandTree::with_config(runnable("root"), config);
        let root = tree.root();
        let set = tree.add_command(root, runnable("set"));
        tree.add_command(root, runnable("settings"));
        assert_eq!(tree.find_next(root, "set").map(|(id, _)| id), Some(set));
    }

    #[test]
    fn test_case_insensitive_toggle() {
        let mut tree = CommandTree::new(runnable("root"));
        let root = tree.root();
        let child = tree.add_command(root, runnable("child").with_aliases(["kid"]));
        assert_eq!(tree.find_next(root, "CHILD"), None);

        tree.config_mut().enable_case_insensitive = true;
        assert_eq!(tree.find_next(root, "CHILD").map(|(id, _)| id), Some(child));
        assert_eq!(tree.find_next(root, "KiD").map(|(id, _)| id), Some(child));
    }

    #[test]
    fn test_traverse_parses_each_level() {
        let mut tree = CommandTree::new(
            runnable("root").with_persistent_flag(Flag::string("name", "")),
        );
        let root = tree.root();
        let child = tree.add_command(root, runnable("child").with_flag(Flag::bool("fast", false)));
        let res = tree
            .traverse(root, &strings(&["--name", "x", "child", "--fast", "arg"]))
            .unwrap();
        assert_eq!(res.command, child);
        assert_eq!(res.args, strings(&["--fast", "arg"]));
        assert_eq!(tree.flags(root).get_string("name").unwrap(), "x");
        assert_eq!(tree.get(child).called_as(), "child");
    }

    #[test]
    fn test_traverse_stops_at_first_positional() {
        let mut tree = CommandTree::new(runnable("root"));
        let root = tree.root();
        tree.add_command(root, runnable("child"));
        let res = tree.traverse(root, &strings(&["arg", "child"])).unwrap();
        assert_eq!(res.command, root);
        assert_eq!(res.args, strings(&["arg", "child"]));
    }

    #[test]
    fn test_is_flag_arg() {
        assert!(is_flag_arg("--x"));
        assert!(is_flag_arg("-x"));
        assert!(is_flag_arg("-xyz"));
        assert!(!is_flag_arg("--"));
        assert!(!is_flag_arg("-"));
        assert!(!is_flag_arg("x"));
    }
}
