//! Command-line parsing for [`FlagSet`].
//!
//! Accepted forms:
//!
//! - `--name value`, `--name=value`, `--name` (when the flag has a
//!   no-option default, e.g. booleans)
//! - `-x value`, `-xvalue`, `-x=value`, grouped booleans `-abc`
//! - `--` ends flag parsing; everything after it is positional
//!
//! Anything else is positional. With interspersing disabled the first
//! positional argument ends flag parsing as well.

use std::rc::Rc;

use tracing::debug;

use crate::error::{FlagError, Result};
use crate::set::FlagSet;

impl FlagSet {
    /// Parses `arguments` against the declared flags.
    ///
    /// Positional leftovers are available through [`args`](FlagSet::args)
    /// afterwards. Unknown flags are errors unless the
    /// [`ParseErrorsWhitelist`](crate::ParseErrorsWhitelist) says otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_flags::{Flag, FlagSet};
    ///
    /// let mut set = FlagSet::new("demo");
    /// set.add(Flag::bool("verbose", false).with_shorthand('v'));
    /// set.add(Flag::int("times", 1).with_shorthand('t'));
    ///
    /// let args: Vec<String> = ["-v", "one", "-t3", "two"].iter().map(|s| s.to_string()).collect();
    /// set.parse(&args).unwrap();
    /// assert!(set.get_bool("verbose").unwrap());
    /// assert_eq!(set.get_int("times").unwrap(), 3);
    /// assert_eq!(set.args(), ["one", "two"]);
    /// ```
    pub fn parse(&mut self, arguments: &[String]) -> Result<()> {
        self.parsed = true;
        self.args.clear();
        self.args_len_at_dash = None;

        let mut args = arguments;
        while let Some((first, tail)) = args.split_first() {
            args = tail;
            let token = first.as_str();

            if token.len() < 2 || !token.starts_with('-') {
                self.args.push(token.to_string());
                if !self.interspersed {
                    self.args.extend(args.iter().cloned());
                    break;
                }
                continue;
            }

            if let Some(long) = token.strip_prefix("--") {
                if long.is_empty() {
                    self.args_len_at_dash = Some(self.args.len());
                    self.args.extend(args.iter().cloned());
                    break;
                }
                args = self.parse_long(long, args)?;
            } else {
                args = self.parse_short(&token[1..], args)?;
            }
        }

        debug!(set = self.name(), positional = self.args.len(), "parsed flags");
        Ok(())
    }

    fn parse_long<'a>(&mut self, body: &str, args: &'a [String]) -> Result<&'a [String]> {
        if body.starts_with('-') || body.starts_with('=') {
            return Err(FlagError::BadSyntax(format!("--{body}")));
        }

        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        let Some(flag) = self.lookup(name).map(Rc::clone) else {
            if self.errors_whitelist.unknown_flags {
                if inline.is_some() {
                    return Ok(args);
                }
                return Ok(strip_unknown_flag_value(args));
            }
            return Err(FlagError::UnknownFlag(name.to_string()));
        };

        let (value, rest) = match (inline, flag.no_opt_default()) {
            (Some(value), _) => (value.to_string(), args),
            (None, Some(no_opt)) => (no_opt.to_string(), args),
            (None, None) => match args.split_first() {
                Some((value, tail)) => (value.clone(), tail),
                None => return Err(FlagError::MissingValue(name.to_string())),
            },
        };

        self.apply(&flag, &value)?;
        Ok(rest)
    }

    fn parse_short<'a>(&mut self, group: &str, mut args: &'a [String]) -> Result<&'a [String]> {
        let mut shorthands = group;
        while !shorthands.is_empty() {
            (shorthands, args) = self.parse_single_short(shorthands, group, args)?;
        }
        Ok(args)
    }

    fn parse_single_short<'s, 'a>(
        &mut self,
        shorthands: &'s str,
        group: &str,
        args: &'a [String],
    ) -> Result<(&'s str, &'a [String])> {
        let mut chars = shorthands.chars();
        let Some(c) = chars.next() else {
            return Ok(("", args));
        };
        let rest = chars.as_str();
        let inline = if rest.len() > 1 {
            rest.strip_prefix('=')
        } else {
            None
        };

        let Some(flag) = self.shorthand_lookup(c).map(Rc::clone) else {
            if self.errors_whitelist.unknown_flags {
                if inline.is_some() {
                    return Ok(("", args));
                }
                return Ok((rest, strip_unknown_flag_value(args)));
            }
            return Err(FlagError::UnknownShorthand {
                shorthand: c,
                group: group.to_string(),
            });
        };

        let (value, remaining, args) = if let Some(value) = inline {
            (value.to_string(), "", args)
        } else if let Some(no_opt) = flag.no_opt_default() {
            (no_opt.to_string(), rest, args)
        } else if !rest.is_empty() {
            (rest.to_string(), "", args)
        } else if let Some((value, tail)) = args.split_first() {
            (value.clone(), rest, tail)
        } else {
            return Err(FlagError::MissingShorthandValue {
                shorthand: c,
                group: group.to_string(),
            });
        };

        if let Some(message) = flag.shorthand_deprecated() {
            self.notices
                .push(format!("Flag shorthand -{c} has been deprecated, {message}"));
        }
        self.apply(&flag, &value)?;
        Ok((remaining, args))
    }
}

/// Drops the token following an ignored unknown flag when it looks like
/// that flag's value.
fn strip_unknown_flag_value(args: &[String]) -> &[String] {
    match args.first() {
        Some(first) if !first.starts_with('-') => &args[1..],
        _ => args,
    }
}
