//! Error types for flag declaration, lookup and parsing.

use thiserror::Error;

/// Errors produced by a [`FlagSet`](crate::FlagSet).
///
/// Parse errors carry the text the user typed so the caller can report them
/// verbatim. Lookup errors name the flag that was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// `--name` was not declared on the set.
    #[error("unknown flag: --{0}")]
    UnknownFlag(String),

    /// A shorthand letter was not declared on the set.
    #[error("unknown shorthand flag: {shorthand:?} in -{group}")]
    UnknownShorthand {
        /// The offending letter.
        shorthand: char,
        /// The whole shorthand group it appeared in (without the dash).
        group: String,
    },

    /// `--name` takes a value and none followed it.
    #[error("flag needs an argument: --{0}")]
    MissingValue(String),

    /// `-x` takes a value and none followed it.
    #[error("flag needs an argument: {shorthand:?} in -{group}")]
    MissingShorthandValue {
        /// The offending letter.
        shorthand: char,
        /// The whole shorthand group it appeared in (without the dash).
        group: String,
    },

    /// Token such as `---x` or `--=x`.
    #[error("bad flag syntax: {0}")]
    BadSyntax(String),

    /// The value could not be converted to the flag's type.
    #[error("invalid argument {value:?} for {flag:?} flag: {reason}")]
    InvalidValue {
        /// Display form of the flag, e.g. `-i, --int` or `--int`.
        flag: String,
        /// The raw value as typed.
        value: String,
        /// Conversion failure detail.
        reason: String,
    },

    /// Lookup of a flag that was never declared.
    #[error("flag accessed but not defined: {0}")]
    NotFound(String),

    /// Typed getter used on a flag of another type.
    #[error("trying to get {expected} value of flag {name:?} of type {actual}")]
    TypeMismatch {
        /// Flag name.
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
        /// Declared type of the flag.
        actual: &'static str,
    },
}

impl FlagError {
    /// Returns `true` for errors raised by unknown flag names or shorthands.
    pub fn is_unknown_flag(&self) -> bool {
        matches!(
            self,
            FlagError::UnknownFlag(_) | FlagError::UnknownShorthand { .. }
        )
    }
}

/// Convenience alias for results with [`FlagError`].
pub type Result<T> = std::result::Result<T, FlagError>;
