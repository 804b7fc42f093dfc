//! Error types for command resolution and execution.
//!
//! Recoverable conditions (unknown commands, flag parse failures, positional
//! argument and required-flag validation, hook failures) are values of
//! [`Error`]. Static configuration defects such as attaching a command to
//! itself or referencing an undeclared group panic instead.

use cmdtree_flags::FlagError;
use thiserror::Error;

/// Error type returned by lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving or executing a command.
#[derive(Debug, Error)]
pub enum Error {
    /// A token did not match any subcommand.
    #[error("unknown command {name:?} for {path:?}{suggestions}")]
    UnknownCommand {
        /// The token as typed.
        name: String,
        /// Command path of the command it was looked up under.
        path: String,
        /// Preformatted "Did you mean this?" block, possibly empty.
        suggestions: String,
    },

    /// A positional argument is not among the command's valid arguments.
    #[error("invalid argument {arg:?} for {path:?}{suggestions}")]
    InvalidArgument {
        /// The offending argument.
        arg: String,
        /// Command path of the command being validated.
        path: String,
        /// Preformatted "Did you mean this?" block, possibly empty.
        suggestions: String,
    },

    /// Flag parsing or lookup failure.
    #[error(transparent)]
    Flag(#[from] FlagError),

    /// Wrong number of positional arguments.
    #[error("{0}")]
    Args(String),

    /// One or more required flags were not set.
    #[error("required flag(s) \"{}\" not set", .0.join("\", \""))]
    RequiredFlags(Vec<String>),

    /// A flag group constraint was violated.
    #[error("{0}")]
    FlagGroup(String),

    /// Error returned by a lifecycle hook, passed through unchanged.
    #[error("{0}")]
    Hook(BoxError),

    /// A completion function is already registered for the flag.
    #[error("flag {0:?} already has a completion function registered")]
    CompletionAlreadyRegistered(String),

    /// Reading or writing a stream or file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps a hook error, unwrapping it first if a hook returned one of ours.
    pub fn from_hook(err: BoxError) -> Self {
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(other) => Error::Hook(other),
        }
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_flags_message() {
        let err = Error::RequiredFlags(vec!["foo1".into(), "foo2".into()]);
        assert_eq!(err.to_string(), r#"required flag(s) "foo1", "foo2" not set"#);
    }

    #[test]
    fn test_unknown_command_message() {
        let err = Error::UnknownCommand {
            name: "foo".into(),
            path: "root".into(),
            suggestions: String::new(),
        };
        assert_eq!(err.to_string(), r#"unknown command "foo" for "root""#);
    }

    #[test]
    fn test_hook_error_is_verbatim() {
        let err = Error::from_hook("database is locked".into());
        assert_eq!(err.to_string(), "database is locked");
    }

    #[test]
    fn test_hook_returning_framework_error_is_unwrapped() {
        let err = Error::from_hook(Box::new(Error::Args("accepts 1 arg(s), received 0".into())));
        assert!(matches!(err, Error::Args(_)));
    }
}
