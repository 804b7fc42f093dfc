//! Positional-argument validators.
//!
//! A [`PositionalArgs`] is attached to a command with
//! [`Command::with_args`](crate::Command::with_args) and checked after
//! flags are parsed, before any hook runs.

use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::tree::{CommandId, CommandRef, CommandTree};

type ValidateFn = dyn Fn(CommandRef<'_>, &[String]) -> Result<()>;

/// A rule over a command's positional arguments.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Command, CommandTree, PositionalArgs};
///
/// let mut tree = CommandTree::new(
///     Command::new("cp <src> <dst>")
///         .with_args(PositionalArgs::exact(2))
///         .with_run(|_, _| Ok(())),
/// );
/// tree.set_args(["only-one"]);
/// tree.get_mut(tree.root()).silence_errors = true;
/// tree.get_mut(tree.root()).silence_usage = true;
/// let err = tree.execute().unwrap_err();
/// assert_eq!(err.to_string(), "accepts 2 arg(s), received 1");
/// ```
#[derive(Clone)]
pub struct PositionalArgs(Rc<ValidateFn>);

impl PositionalArgs {
    /// A rule backed by an arbitrary function.
    pub fn custom<F>(validate: F) -> Self
    where
        F: Fn(CommandRef<'_>, &[String]) -> Result<()> + 'static,
    {
        Self(Rc::new(validate))
    }

    pub fn validate(&self, cmd: CommandRef<'_>, args: &[String]) -> Result<()> {
        (self.0)(cmd, args)
    }

    /// Rejects any positional argument as an unknown command.
    pub fn none() -> Self {
        Self::custom(|cmd, args| match args.first() {
            Some(first) => Err(Error::UnknownCommand {
                name: first.clone(),
                path: cmd.command_path(),
                suggestions: String::new(),
            }),
            None => Ok(()),
        })
    }

    /// Accepts anything.
    pub fn arbitrary() -> Self {
        Self::custom(|_, _| Ok(()))
    }

    /// Accepts only the command's `valid_args` (descriptions after a tab
    /// are ignored). Accepts anything when `valid_args` is empty.
    pub fn only_valid() -> Self {
        Self::custom(|cmd, args| {
            let valid = &cmd.command().valid_args;
            if valid.is_empty() {
                return Ok(());
            }
            let names: Vec<&str> = valid
                .iter()
                .map(|v| v.split('\t').next().unwrap_or_default())
                .collect();
            match args.iter().find(|arg| !names.contains(&arg.as_str())) {
                Some(arg) => Err(Error::InvalidArgument {
                    arg: arg.clone(),
                    path: cmd.command_path(),
                    suggestions: cmd.tree().find_suggestions(cmd.id(), &args[0]),
                }),
                None => Ok(()),
            }
        })
    }

    pub fn minimum(n: usize) -> Self {
        Self::custom(move |_, args| {
            if args.len() < n {
                return Err(Error::Args(format!(
                    "requires at least {n} arg(s), only received {}",
                    args.len()
                )));
            }
            Ok(())
        })
    }

    pub fn maximum(n: usize) -> Self {
        Self::custom(move |_, args| {
            if args.len() > n {
                return Err(Error::Args(format!(
                    "accepts at most {n} arg(s), received {}",
                    args.len()
                )));
            }
            Ok(())
        })
    }

    pub fn exact(n: usize) -> Self {
        Self::custom(move |_, args| {
            if args.len() != n {
                return Err(Error::Args(format!(
                    "accepts {n} arg(s), received {}",
                    args.len()
                )));
            }
            Ok(())
        })
    }

    /// Between `min` and `max` arguments, inclusive.
    pub fn range(min: usize, max: usize) -> Self {
        Self::custom(move |_, args| {
            if args.len() < min || args.len() > max {
                return Err(Error::Args(format!(
                    "accepts between {min} and {max} arg(s), received {}",
                    args.len()
                )));
            }
            Ok(())
        })
    }

    /// Every rule must pass; the first failure is returned.
    pub fn match_all(rules: Vec<PositionalArgs>) -> Self {
        Self::custom(move |cmd, args| {
            for rule in &rules {
                rule.validate(cmd, args)?;
            }
            Ok(())
        })
    }
}

impl fmt::Debug for PositionalArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PositionalArgs(..)")
    }
}

/// Default check for commands without their own rule: a root with
/// subcommands rejects leftover words as unknown commands.
pub(crate) fn legacy_args(tree: &CommandTree, id: CommandId, words: &[String]) -> Result<()> {
    if !tree.has_sub_commands(id) {
        return Ok(());
    }
    match words.first() {
        Some(first) if tree.parent(id).is_none() => Err(Error::UnknownCommand {
            name: first.clone(),
            path: tree.command_path(id),
            suggestions: tree.find_suggestions(id, first),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Command;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn check(rule: PositionalArgs, args: &[&str]) -> Result<()> {
        let tree = CommandTree::new(
            Command::new("c").with_valid_args(["one\tfirst", "two", "three"]),
        );
        rule.validate(tree.command(tree.root()), &strings(args))
    }

    #[test]
    fn test_none() {
        assert!(check(PositionalArgs::none(), &[]).is_ok());
        let err = check(PositionalArgs::none(), &["a"]).unwrap_err();
        assert_eq!(err.to_string(), r#"unknown command "a" for "c""#);
    }

    #[test]
    fn test_counts() {
        assert!(check(PositionalArgs::minimum(1), &["a"]).is_ok());
        assert_eq!(
            check(PositionalArgs::minimum(2), &["a"]).unwrap_err().to_string(),
            "requires at least 2 arg(s), only received 1"
        );
        assert_eq!(
            check(PositionalArgs::maximum(1), &["a", "b"]).unwrap_err().to_string(),
            "accepts at most 1 arg(s), received 2"
        );
        assert_eq!(
            check(PositionalArgs::exact(2), &["a"]).unwrap_err().to_string(),
            "accepts 2 arg(s), received 1"
        );
        assert!(check(PositionalArgs::range(1, 2), &["a", "b"]).is_ok());
        assert_eq!(
            check(PositionalArgs::range(1, 2), &[]).unwrap_err().to_string(),
            "accepts between 1 and 2 arg(s), received 0"
        );
    }

    #[test]
    fn test_only_valid() {
        assert!(check(PositionalArgs::only_valid(), &["one", "two"]).is_ok());
        let err = check(PositionalArgs::only_valid(), &["thre"]).unwrap_err();
        assert_eq!(err.to_string(), r#"invalid argument "thre" for "c""#);
    }

    #[test]
    fn test_match_all_returns_first_failure() {
        let rule = PositionalArgs::match_all(vec![
            PositionalArgs::exact(1),
            PositionalArgs::only_valid(),
        ]);
        assert!(check(rule.clone(), &["two"]).is_ok());
        assert!(matches!(check(rule.clone(), &[]), Err(Error::Args(_))));
        assert!(matches!(
            check(rule, &["four"]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_legacy_args() {
        let mut tree = CommandTree::new(Command::new("root"));
        let root = tree.root();
        assert!(legacy_args(&tree, root, &strings(&["x"])).is_ok());

        let child = tree.add_command(root, Command::new("child"));
        tree.add_command(child, Command::new("grandchild"));
        assert!(legacy_args(&tree, root, &strings(&["x"])).is_err());
        assert!(legacy_args(&tree, root, &[]).is_ok());
        assert!(legacy_args(&tree, child, &strings(&["x"])).is_ok());
    }
}
