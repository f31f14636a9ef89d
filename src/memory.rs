//! An in-memory terminal, for exercising raw-mode code without a real tty.
//!
//! [`MemoryTerminal`] is a cheap handle over shared state: keep one clone to
//! feed input and inspect the mode while another is owned by a
//! [`RawTerminal`](crate::RawTerminal).

use crate::backend::Backend;
use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// The terminal attributes raw mode cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub echo: bool,
    pub canonical: bool,
    /// Minimum number of bytes a read waits for.
    pub min_read_bytes: u8,
    /// Inter-byte read timeout, in tenths of a second.
    pub read_timeout: u8,
    /// Everything else the terminal keeps; raw mode leaves it alone.
    pub other_flags: u32,
}

impl Attributes {
    /// These attributes with echo and line buffering off and reads returning
    /// immediately.
    pub fn raw(self) -> Self {
        Self {
            echo: false,
            canonical: false,
            min_read_bytes: 0,
            read_timeout: 0,
            ..self
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            echo: true,
            canonical: true,
            min_read_bytes: 1,
            read_timeout: 0,
            other_flags: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTerminal {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    attributes: Attributes,
    input: VecDeque<u8>,
    read_error: Option<io::ErrorKind>,
    detached: bool,
    captures: usize,
    restores: usize,
}

impl MemoryTerminal {
    /// An interactive terminal with default attributes and no pending input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Input that is not a terminal at all.
    pub fn detached() -> Self {
        let terminal = Self::new();
        terminal.detach();
        terminal
    }

    pub fn push_input(&self, bytes: &[u8]) {
        self.inner().input.extend(bytes);
    }

    /// Make every following read fail with the given error.
    pub fn fail_reads(&self, kind: io::ErrorKind) {
        self.inner().read_error = Some(kind);
    }

    /// Take the terminal away, so that mode changes fail.
    pub fn detach(&self) {
        self.inner().detached = true;
    }

    pub fn reattach(&self) {
        self.inner().detached = false;
    }

    pub fn attributes(&self) -> Attributes {
        self.inner().attributes
    }

    pub fn set_attributes(&self, attributes: Attributes) {
        self.inner().attributes = attributes;
    }

    /// Number of times the configuration has been captured.
    pub fn captures(&self) -> usize {
        self.inner().captures
    }

    /// Number of times a saved configuration has been put back.
    pub fn restores(&self) -> usize {
        self.inner().restores
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_a_terminal() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "not a terminal")
}

impl Backend for MemoryTerminal {
    type Saved = Attributes;

    fn enter_raw_mode(&mut self) -> io::Result<Attributes> {
        let mut inner = self.inner();

        if inner.detached {
            return Err(not_a_terminal());
        }

        let saved = inner.attributes;
        inner.captures += 1;
        inner.attributes = saved.raw();

        Ok(saved)
    }

    fn restore_mode(&mut self, saved: &Attributes) -> io::Result<()> {
        let mut inner = self.inner();

        if inner.detached {
            return Err(not_a_terminal());
        }

        inner.attributes = *saved;
        inner.restores += 1;

        Ok(())
    }

    fn poll_byte(&mut self) -> io::Result<Option<u8>> {
        let mut inner = self.inner();

        if let Some(kind) = inner.read_error {
            return Err(io::Error::new(kind, "simulated read failure"));
        }

        Ok(inner.input.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_keeps_unrelated_flags() {
        let attributes = Attributes {
            other_flags: 0b1010,
            ..Attributes::default()
        };
        let raw = attributes.raw();

        assert!(!raw.echo);
        assert!(!raw.canonical);
        assert_eq!(raw.min_read_bytes, 0);
        assert_eq!(raw.read_timeout, 0);
        assert_eq!(raw.other_flags, 0b1010);
    }
}
