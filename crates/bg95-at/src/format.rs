//! Bounded command buffer used by parameter formatters.
//!
//! A command that does not fit its buffer must never reach the modem
//! truncated, so every push checks capacity first and fails with
//! [`AtError::InvalidSize`] without writing anything.
//!
//! Quoted fields have no escape syntax on the wire: a `"` would close the
//! field early and a CR or LF would end the command line, letting the rest
//! of the text run as a second command. [`CommandBuffer::push_quoted`]
//! rejects all three.

use std::fmt;

use crate::error::{AtError, AtResult};

/// Default capacity for a formatted command suffix.
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;

/// Capacity-bounded text buffer for a command's parameter suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    buf: String,
    capacity: usize,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_COMMAND_CAPACITY)
    }
}

impl CommandBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        CommandBuffer {
            buf: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of bytes the buffer accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Get the buffer contents.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append text, failing if it would exceed capacity.
    pub fn push_str(&mut self, s: &str) -> AtResult<()> {
        let needed = self.buf.len() + s.len();
        if needed > self.capacity {
            return Err(AtError::InvalidSize {
                capacity: self.capacity,
                needed,
            });
        }
        self.buf.push_str(s);
        Ok(())
    }

    /// Append a single character.
    pub fn push(&mut self, c: char) -> AtResult<()> {
        let mut tmp = [0u8; 4];
        self.push_str(c.encode_utf8(&mut tmp))
    }

    /// Append a field separator.
    pub fn push_separator(&mut self) -> AtResult<()> {
        self.push(',')
    }

    /// Append a double-quoted string field.
    ///
    /// Fails with [`AtError::InvalidArgument`] if `s` contains a `"`, CR or
    /// LF, before writing anything.
    pub fn push_quoted(&mut self, s: &str) -> AtResult<()> {
        check_quotable(s)?;
        let needed = self.buf.len() + s.len() + 2;
        if needed > self.capacity {
            return Err(AtError::InvalidSize {
                capacity: self.capacity,
                needed,
            });
        }
        self.buf.push('"');
        self.buf.push_str(s);
        self.buf.push('"');
        Ok(())
    }

    /// Append any displayable value, typically an integer field.
    pub fn push_value<T: fmt::Display>(&mut self, value: T) -> AtResult<()> {
        self.push_str(&value.to_string())
    }
}

/// Check that `s` can sit inside a quoted field without ending the field
/// or the command line.
pub fn check_quotable(s: &str) -> AtResult<()> {
    match s.find(|c: char| matches!(c, '"' | '\r' | '\n')) {
        Some(pos) => Err(AtError::invalid_argument(format!(
            "quoted field {:?} contains {:?} at byte {}",
            s,
            &s[pos..pos + 1],
            pos
        ))),
        None => Ok(()),
    }
}

impl fmt::Write for CommandBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s).map_err(|_| fmt::Error)
    }
}

impl fmt::Display for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}
