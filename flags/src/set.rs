//! Named collections of flags.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{FlagError, Result};
use crate::flag::{Flag, FlagKind, Value};

/// Maps a flag name as typed (or declared) to the key it is stored under.
pub type NormalizeFn = Rc<dyn Fn(&str) -> String>;

/// Categories of parse errors a [`FlagSet`] can be told to ignore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseErrorsWhitelist {
    /// Skip unknown `--flags` and `-x` shorthands (and a following value
    /// token that does not look like a flag).
    pub unknown_flags: bool,
}

/// An ordered set of flags with name and shorthand indexes.
///
/// Flags are stored as `Rc<Flag>`; [`add_shared`](FlagSet::add_shared)
/// inserts an existing flag so that several sets observe the same value.
/// Iteration follows declaration order.
#[derive(Clone)]
pub struct FlagSet {
    name: String,
    flags: Vec<Rc<Flag>>,
    by_name: HashMap<String, usize>,
    by_shorthand: HashMap<char, usize>,
    normalize: Option<NormalizeFn>,
    pub(crate) interspersed: bool,
    pub(crate) errors_whitelist: ParseErrorsWhitelist,
    pub(crate) args: Vec<String>,
    pub(crate) args_len_at_dash: Option<usize>,
    pub(crate) parsed: bool,
    pub(crate) notices: Vec<String>,
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field(
                "flags",
                &self.flags.iter().map(|fl| fl.name()).collect::<Vec<_>>(),
            )
            .field("args", &self.args)
            .field("parsed", &self.parsed)
            .finish()
    }
}

impl FlagSet {
    /// Creates an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
            by_name: HashMap::new(),
            by_shorthand: HashMap::new(),
            normalize: None,
            interspersed: true,
            errors_whitelist: ParseErrorsWhitelist::default(),
            args: Vec::new(),
            args_len_at_dash: None,
            parsed: false,
            notices: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, name: &str) -> String {
        match &self.normalize {
            Some(normalize) => normalize(name),
            None => name.to_string(),
        }
    }

    /// Declares a new flag and returns the shared handle.
    ///
    /// # Panics
    ///
    /// Panics when a flag with the same (normalized) name or shorthand is
    /// already declared; that is a static configuration defect.
    pub fn add(&mut self, flag: Flag) -> Rc<Flag> {
        let flag = Rc::new(flag);
        if !self.add_shared(&flag) {
            panic!("{:?} flag redefined: {}", self.name, flag.name());
        }
        flag
    }

    /// Inserts an existing flag, keeping its identity.
    ///
    /// Returns `false` (and does nothing) when the name is already present.
    ///
    /// # Panics
    ///
    /// Panics when the shorthand is already used by another flag.
    pub fn add_shared(&mut self, flag: &Rc<Flag>) -> bool {
        let key = self.key(flag.name());
        if self.by_name.contains_key(&key) {
            return false;
        }
        if let Some(c) = flag.shorthand() {
            if let Some(&idx) = self.by_shorthand.get(&c) {
                panic!(
                    "unable to redefine {c:?} shorthand in {:?} flagset: it's already used for {:?} flag",
                    self.name,
                    self.flags[idx].name()
                );
            }
        }
        let idx = self.flags.len();
        self.flags.push(Rc::clone(flag));
        self.by_name.insert(key, idx);
        if let Some(c) = flag.shorthand() {
            self.by_shorthand.insert(c, idx);
        }
        true
    }

    /// Adds every flag of `other` whose name is not present yet.
    pub fn add_flag_set(&mut self, other: &FlagSet) {
        for flag in &other.flags {
            self.add_shared(flag);
        }
    }

    /// Looks a flag up by name, applying the normalization function.
    pub fn lookup(&self, name: &str) -> Option<&Rc<Flag>> {
        self.by_name.get(&self.key(name)).map(|&idx| &self.flags[idx])
    }

    /// Looks a flag up by its shorthand letter.
    pub fn shorthand_lookup(&self, shorthand: char) -> Option<&Rc<Flag>> {
        self.by_shorthand.get(&shorthand).map(|&idx| &self.flags[idx])
    }

    fn require(&self, name: &str) -> Result<&Rc<Flag>> {
        self.lookup(name)
            .ok_or_else(|| FlagError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Flag>> {
        self.flags.iter()
    }

    /// Returns `true` if any flag is not hidden.
    pub fn has_available_flags(&self) -> bool {
        self.flags.iter().any(|f| !f.is_hidden())
    }

    /// Sets a flag by name as if it had been typed on the command line.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let flag = Rc::clone(self.require(name)?);
        self.apply(&flag, value)
    }

    pub(crate) fn apply(&mut self, flag: &Rc<Flag>, value: &str) -> Result<()> {
        flag.set(value)?;
        if let Some(message) = flag.deprecated() {
            self.notices.push(format!(
                "Flag --{} has been deprecated, {message}",
                flag.name()
            ));
        }
        Ok(())
    }

    /// Whether the named flag was set.
    pub fn changed(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|f| f.changed())
    }

    pub fn set_annotation(&self, name: &str, key: &str, values: Vec<String>) -> Result<()> {
        self.require(name)?.set_annotation(key, values);
        Ok(())
    }

    pub fn mark_hidden(&self, name: &str) -> Result<()> {
        self.require(name)?.set_hidden(true);
        Ok(())
    }

    pub fn mark_deprecated(&self, name: &str, message: &str) -> Result<()> {
        let flag = self.require(name)?;
        flag.set_deprecated(message);
        flag.set_hidden(true);
        Ok(())
    }

    pub fn mark_shorthand_deprecated(&self, name: &str, message: &str) -> Result<()> {
        self.require(name)?.set_shorthand_deprecated(message);
        Ok(())
    }

    /// Installs a normalization function and re-keys existing flags.
    pub fn set_normalize_fn(&mut self, normalize: Option<NormalizeFn>) {
        self.normalize = normalize;
        self.by_name = self
            .flags
            .iter()
            .enumerate()
            .map(|(idx, f)| (self.key(f.name()), idx))
            .collect();
    }

    pub fn normalize_fn(&self) -> Option<NormalizeFn> {
        self.normalize.clone()
    }

    /// When `false`, the first positional argument stops flag parsing.
    pub fn set_interspersed(&mut self, interspersed: bool) {
        self.interspersed = interspersed;
    }

    pub fn set_errors_whitelist(&mut self, whitelist: ParseErrorsWhitelist) {
        self.errors_whitelist = whitelist;
    }

    pub fn errors_whitelist(&self) -> ParseErrorsWhitelist {
        self.errors_whitelist
    }

    /// Positional arguments left after the last parse.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    /// Number of positional arguments seen before a literal `--`, if any.
    pub fn args_len_at_dash(&self) -> Option<usize> {
        self.args_len_at_dash
    }

    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Drains deprecation notices produced by the last parse.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    fn typed(&self, name: &str, expected: FlagKind) -> Result<Value> {
        let flag = self.require(name)?;
        if flag.kind() != expected {
            return Err(FlagError::TypeMismatch {
                name: name.to_string(),
                expected: expected.as_str(),
                actual: flag.kind().as_str(),
            });
        }
        Ok(flag.value())
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.typed(name, FlagKind::Bool)? {
            Value::Bool(b) => Ok(b),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        match self.typed(name, FlagKind::String)? {
            Value::String(s) => Ok(s),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.typed(name, FlagKind::Int)? {
            Value::Int(i) => Ok(i),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_uint(&self, name: &str) -> Result<u64> {
        match self.typed(name, FlagKind::Uint)? {
            Value::Uint(u) => Ok(u),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.typed(name, FlagKind::Float)? {
            Value::Float(f) => Ok(f),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_string_slice(&self, name: &str) -> Result<Vec<String>> {
        match self.typed(name, FlagKind::StringSlice)? {
            Value::StringSlice(v) => Ok(v),
            _ => unreachable!("kind checked"),
        }
    }

    pub fn get_count(&self, name: &str) -> Result<u64> {
        match self.typed(name, FlagKind::Count)? {
            Value::Count(n) => Ok(n),
            _ => unreachable!("kind checked"),
        }
    }

    /// Usage listing of visible flags, one per line.
    pub fn flag_usages(&self) -> String {
        let rows: Vec<(String, String)> = self
            .flags
            .iter()
            .filter(|f| !f.is_hidden())
            .map(|f| {
                let mut left = match f.shorthand() {
                    Some(c) => format!("  -{c}, --{}", f.name()),
                    None => format!("      --{}", f.name()),
                };
                if f.takes_value() {
                    left.push(' ');
                    left.push_str(f.kind().as_str());
                }
                let mut right = f.usage().to_string();
                let default = f.default_value();
                if !default.is_zero() {
                    match default {
                        Value::String(s) => right.push_str(&format!(" (default {s:?})")),
                        other => right.push_str(&format!(" (default {other})")),
                    }
                }
                (left, right)
            })
            .collect();

        let width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        let mut out = String::new();
        for (left, right) in rows {
            out.push_str(&format!("{left:<width$}   {right}\n"));
        }
        out
    }
}
