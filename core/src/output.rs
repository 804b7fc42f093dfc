//! Output and input streams for commands.
//!
//! Every command may carry its own `out`, `err` and `input` stream; unset
//! streams fall back to the nearest ancestor's, then to the process's
//! standard streams.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::tree::{CommandId, CommandTree};

/// Shared writable stream.
pub type Sink = Rc<RefCell<dyn Write>>;

/// Shared readable stream.
pub type Source = Rc<RefCell<dyn Read>>;

/// Wraps a writer as a [`Sink`].
pub fn sink(writer: impl Write + 'static) -> Sink {
    Rc::new(RefCell::new(writer))
}

/// Wraps a reader as a [`Source`].
pub fn source(reader: impl Read + 'static) -> Source {
    Rc::new(RefCell::new(reader))
}

/// In-memory writer whose clones share one buffer.
///
/// Handy for capturing command output in tests:
///
/// ```
/// use std::io::Write;
/// use cmdtree_core::SharedBuffer;
///
/// let buf = SharedBuffer::default();
/// let mut writer = buf.clone();
/// write!(writer, "hello").unwrap();
/// assert_eq!(buf.contents(), "hello");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CommandTree {
    fn nearest<T: Clone>(
        &self,
        id: CommandId,
        pick: impl Fn(&crate::Command) -> &Option<T>,
    ) -> Option<T> {
        self.lineage(id)
            .into_iter()
            .find_map(|node| pick(self.get(node)).clone())
    }

    /// `out` stream, defaulting to stdout.
    pub fn out_or_stdout(&self, id: CommandId) -> Sink {
        self.nearest(id, |c| &c.out)
            .unwrap_or_else(|| sink(io::stdout()))
    }

    /// `out` stream, defaulting to stderr.
    pub fn out_or_stderr(&self, id: CommandId) -> Sink {
        self.nearest(id, |c| &c.out)
            .unwrap_or_else(|| sink(io::stderr()))
    }

    /// `err` stream, defaulting to stderr.
    pub fn err_or_stderr(&self, id: CommandId) -> Sink {
        self.nearest(id, |c| &c.err)
            .unwrap_or_else(|| sink(io::stderr()))
    }

    /// `input` stream, defaulting to stdin.
    pub fn in_or_stdin(&self, id: CommandId) -> Source {
        self.nearest(id, |c| &c.input)
            .unwrap_or_else(|| source(io::stdin()))
    }

    /// Writes a line to the `out` stream (stderr when unset).
    pub fn println(&self, id: CommandId, line: &str) {
        let out = self.out_or_stderr(id);
        let _ = writeln!(out.borrow_mut(), "{line}");
    }

    /// Writes a line to the `err` stream.
    pub fn print_err_ln(&self, id: CommandId, line: &str) {
        let err = self.err_or_stderr(id);
        let _ = writeln!(err.borrow_mut(), "{line}");
    }
}
