//! Fixed-capacity text buffers shared between callers and the formatter
//!
//! A [`BoundedBuffer`] never grows past the capacity it was created with.
//! Text that does not fit is cut at the last complete character and the
//! buffer remembers that it was truncated, so callers can report it.

use std::fmt;

/// Result of rendering into a bounded buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Bytes held in the buffer after rendering
    pub written: usize,
    /// Whether any text was discarded because the buffer was full
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct BoundedBuffer {
    text: String,
    capacity: usize,
    truncated: bool,
}

impl BoundedBuffer {
    /// Allocate a buffer holding at most `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
            truncated: false,
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.truncated = false;
    }

    /// Append as much of `s` as fits, returning the number of bytes accepted
    pub fn push_str(&mut self, s: &str) -> usize {
        let room = self.capacity - self.text.len();
        if s.len() <= room {
            self.text.push_str(s);
            return s.len();
        }

        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.truncated = true;
        cut
    }

    pub fn push(&mut self, c: char) -> bool {
        let mut utf8 = [0u8; 4];
        let encoded = c.encode_utf8(&mut utf8);
        self.push_str(encoded) == encoded.len()
    }

    /// Replace the content with `s`, truncating if needed
    pub fn load(&mut self, s: &str) -> RenderStats {
        self.clear();
        self.push_str(s);
        self.stats()
    }

    /// Drop one trailing `\n` (and a preceding `\r`), if present
    ///
    /// Safe on an empty buffer.
    pub fn strip_trailing_newline(&mut self) -> bool {
        if self.text.ends_with('\n') {
            self.text.pop();
            if self.text.ends_with('\r') {
                self.text.pop();
            }
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.text.len() == self.capacity
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            written: self.text.len(),
            truncated: self.truncated,
        }
    }
}

impl fmt::Write for BoundedBuffer {
    // Overflow is not an error: it is recorded in the truncated flag instead.
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl fmt::Display for BoundedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
