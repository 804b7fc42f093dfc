//! Values handed down the command tree to hooks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Request-scoped values plus a cancellation flag.
///
/// A context set on the root before execution becomes the default for the
/// resolved command when it has none of its own. The engine never checks
/// [`is_cancelled`](Context::is_cancelled) itself; long-running hooks do.
///
/// # Examples
///
/// ```
/// use cmdtree_core::Context;
///
/// let ctx = Context::background().with_value("request-id", "42");
/// let child = ctx.with_value("user", "alice");
/// assert_eq!(child.value("request-id"), Some("42"));
///
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Arc<BTreeMap<String, String>>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// An empty, never-cancelled context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context with one more value; cancellation stays shared.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());
        Self {
            values: Arc::new(values),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Marks this context and every context derived from it as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
