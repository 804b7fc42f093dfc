//! Flag definitions and typed values.
//!
//! A [`Flag`] is declared once and then shared by reference between every
//! [`FlagSet`](crate::FlagSet) it is merged into. Its value, `changed` bit,
//! visibility and annotations use interior mutability so that parsing
//! through any of those sets updates the single underlying flag.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{FlagError, Result};

static NEXT_FLAG_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a declared flag.
///
/// Two [`Flag`]s with the same name declared on different commands have
/// different ids, which is what lets a redeclared flag shadow an inherited
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlagId(u64);

impl FlagId {
    fn next() -> Self {
        Self(NEXT_FLAG_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Declared type of a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// `true`/`false`, no value needed on the command line.
    Bool,
    /// Free-form text.
    String,
    /// Signed integer.
    Int,
    /// Unsigned integer.
    Uint,
    /// Floating point number.
    Float,
    /// Comma separated list, repeated occurrences append.
    StringSlice,
    /// Incremented on every occurrence (`-vvv`).
    Count,
}

impl FlagKind {
    /// Type name shown in usage listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagKind::Bool => "bool",
            FlagKind::String => "string",
            FlagKind::Int => "int",
            FlagKind::Uint => "uint",
            FlagKind::Float => "float",
            FlagKind::StringSlice => "strings",
            FlagKind::Count => "count",
        }
    }
}

/// Current or default value of a flag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    StringSlice(Vec<String>),
    Count(u64),
}

impl Value {
    /// Returns the kind matching this value.
    pub fn kind(&self) -> FlagKind {
        match self {
            Value::Bool(_) => FlagKind::Bool,
            Value::String(_) => FlagKind::String,
            Value::Int(_) => FlagKind::Int,
            Value::Uint(_) => FlagKind::Uint,
            Value::Float(_) => FlagKind::Float,
            Value::StringSlice(_) => FlagKind::StringSlice,
            Value::Count(_) => FlagKind::Count,
        }
    }

    /// Returns `true` when the value equals the zero value of its kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            Value::Int(i) => *i == 0,
            Value::Uint(u) | Value::Count(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::StringSlice(v) => v.is_empty(),
        }
    }

    /// Assigns `raw` to this value.
    ///
    /// `changed` tells whether the flag was already set during this parse;
    /// string slices replace their default on the first assignment and
    /// append afterwards.
    fn assign(&mut self, raw: &str, changed: bool) -> std::result::Result<(), String> {
        match self {
            Value::Bool(b) => *b = parse_bool(raw)?,
            Value::String(s) => *s = raw.to_string(),
            Value::Int(i) => *i = raw.parse::<i64>().map_err(|e| e.to_string())?,
            Value::Uint(u) => *u = raw.parse::<u64>().map_err(|e| e.to_string())?,
            Value::Float(f) => *f = raw.parse::<f64>().map_err(|e| e.to_string())?,
            Value::StringSlice(items) => {
                let parsed: Vec<String> = if raw.is_empty() {
                    Vec::new()
                } else {
                    raw.split(',').map(|s| s.trim().to_string()).collect()
                };
                if changed {
                    items.extend(parsed);
                } else {
                    *items = parsed;
                }
            }
            Value::Count(n) => {
                if raw == "+1" {
                    *n += 1;
                } else {
                    *n = raw.parse::<u64>().map_err(|e| e.to_string())?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::String(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) | Value::Count(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::StringSlice(items) => write!(f, "[{}]", items.join(",")),
        }
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("parsing {raw:?}: invalid syntax")),
    }
}

/// A declared command-line flag.
///
/// Build with one of the typed constructors and chain the `with_*`
/// builders, then hand it to [`FlagSet::add`](crate::FlagSet::add).
///
/// # Examples
///
/// ```
/// use cmdtree_flags::{Flag, FlagKind};
///
/// let verbose = Flag::bool("verbose", false)
///     .with_shorthand('v')
///     .with_usage("Enable verbose output");
/// assert_eq!(verbose.kind(), FlagKind::Bool);
/// assert!(!verbose.takes_value());
///
/// let output = Flag::string("output", "-").with_shorthand('o');
/// assert!(output.takes_value());
/// ```
#[derive(Debug)]
pub struct Flag {
    id: FlagId,
    name: String,
    shorthand: Option<char>,
    usage: String,
    default: Value,
    no_opt_default: Option<String>,
    value: RefCell<Value>,
    changed: Cell<bool>,
    hidden: Cell<bool>,
    deprecated: RefCell<Option<String>>,
    shorthand_deprecated: RefCell<Option<String>>,
    annotations: RefCell<BTreeMap<String, Vec<String>>>,
}

impl Flag {
    fn with_default(name: impl Into<String>, default: Value) -> Self {
        Self {
            id: FlagId::next(),
            name: name.into(),
            shorthand: None,
            usage: String::new(),
            value: RefCell::new(default.clone()),
            default,
            no_opt_default: None,
            changed: Cell::new(false),
            hidden: Cell::new(false),
            deprecated: RefCell::new(None),
            shorthand_deprecated: RefCell::new(None),
            annotations: RefCell::new(BTreeMap::new()),
        }
    }

    /// Boolean flag; `--name` alone sets it to `true`.
    pub fn bool(name: impl Into<String>, default: bool) -> Self {
        Self::with_default(name, Value::Bool(default)).with_no_opt_default("true")
    }

    /// String flag.
    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::with_default(name, Value::String(default.into()))
    }

    /// Signed integer flag.
    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self::with_default(name, Value::Int(default))
    }

    /// Unsigned integer flag.
    pub fn uint(name: impl Into<String>, default: u64) -> Self {
        Self::with_default(name, Value::Uint(default))
    }

    /// Floating point flag.
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self::with_default(name, Value::Float(default))
    }

    /// Comma separated list flag; repeated occurrences append.
    pub fn string_slice(name: impl Into<String>, default: Vec<String>) -> Self {
        Self::with_default(name, Value::StringSlice(default))
    }

    /// Counter flag; every bare occurrence increments it.
    pub fn count(name: impl Into<String>) -> Self {
        Self::with_default(name, Value::Count(0)).with_no_opt_default("+1")
    }

    /// Sets the single-letter shorthand.
    pub fn with_shorthand(mut self, shorthand: char) -> Self {
        self.shorthand = Some(shorthand);
        self
    }

    /// Sets the usage text.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Value used when the flag appears without one.
    pub fn with_no_opt_default(mut self, value: impl Into<String>) -> Self {
        self.no_opt_default = Some(value.into());
        self
    }

    /// Hides the flag from usage listings.
    pub fn with_hidden(self) -> Self {
        self.hidden.set(true);
        self
    }

    /// Adds an annotation at declaration time.
    pub fn with_annotation(self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.annotations.borrow_mut().insert(key.into(), values);
        self
    }

    pub fn id(&self) -> FlagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shorthand(&self) -> Option<char> {
        self.shorthand
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn kind(&self) -> FlagKind {
        self.default.kind()
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn no_opt_default(&self) -> Option<&str> {
        self.no_opt_default.as_deref()
    }

    /// Returns `true` when the flag consumes the following token as its value.
    pub fn takes_value(&self) -> bool {
        self.no_opt_default.is_none()
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Whether the flag was set since declaration or the last reset.
    pub fn changed(&self) -> bool {
        self.changed.get()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn deprecated(&self) -> Option<String> {
        self.deprecated.borrow().clone()
    }

    pub fn set_deprecated(&self, message: impl Into<String>) {
        *self.deprecated.borrow_mut() = Some(message.into());
    }

    pub fn shorthand_deprecated(&self) -> Option<String> {
        self.shorthand_deprecated.borrow().clone()
    }

    pub fn set_shorthand_deprecated(&self, message: impl Into<String>) {
        *self.shorthand_deprecated.borrow_mut() = Some(message.into());
    }

    /// Values stored under annotation `key`, if any.
    pub fn annotation(&self, key: &str) -> Option<Vec<String>> {
        self.annotations.borrow().get(key).cloned()
    }

    /// All annotations, sorted by key.
    pub fn annotations(&self) -> BTreeMap<String, Vec<String>> {
        self.annotations.borrow().clone()
    }

    pub fn set_annotation(&self, key: impl Into<String>, values: Vec<String>) {
        self.annotations.borrow_mut().insert(key.into(), values);
    }

    /// Parses `raw` into the flag and marks it changed.
    pub fn set(&self, raw: &str) -> Result<()> {
        let changed = self.changed.get();
        self.value
            .borrow_mut()
            .assign(raw, changed)
            .map_err(|reason| FlagError::InvalidValue {
                flag: self.display_name(),
                value: raw.to_string(),
                reason,
            })?;
        self.changed.set(true);
        Ok(())
    }

    /// Restores the default value and clears the `changed` bit.
    pub fn reset(&self) {
        *self.value.borrow_mut() = self.default.clone();
        self.changed.set(false);
    }

    /// `-x, --name` or `--name`.
    pub fn display_name(&self) -> String {
        match self.shorthand {
            Some(c) => format!("-{c}, --{}", self.name),
            None => format!("--{}", self.name),
        }
    }
}
