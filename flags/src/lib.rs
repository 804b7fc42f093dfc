//! Flag sets for the cmdtree command framework.
//!
//! This crate is the flag-value layer the command tree builds on:
//!
//! - [`Flag`]: a declared flag with a typed [`Value`], optional shorthand,
//!   annotations and a `changed` bit.
//! - [`FlagSet`]: an ordered, name- and shorthand-indexed collection of
//!   shared flags with POSIX-style [`parse`](FlagSet::parse).
//! - [`FlagError`]: declaration, lookup and parse failures.
//!
//! Flags are reference counted so one declaration can live in several sets
//! at once; parsing through any of them updates the same value.
//!
//! # Example
//!
//! ```
//! use cmdtree_flags::{Flag, FlagSet};
//!
//! let mut set = FlagSet::new("mycli");
//! set.add(Flag::string("output", "-").with_shorthand('o').with_usage("Output file"));
//! set.add(Flag::count("verbose").with_shorthand('v'));
//!
//! let args: Vec<String> = ["-vv", "-o", "out.txt", "input"].iter().map(|s| s.to_string()).collect();
//! set.parse(&args).unwrap();
//! assert_eq!(set.get_count("verbose").unwrap(), 2);
//! assert_eq!(set.get_string("output").unwrap(), "out.txt");
//! assert_eq!(set.args(), ["input"]);
//! ```

mod error;
mod flag;
mod parse;
mod set;

pub use error::{FlagError, Result};
pub use flag::{Flag, FlagId, FlagKind, Value};
pub use set::{FlagSet, NormalizeFn, ParseErrorsWhitelist};
