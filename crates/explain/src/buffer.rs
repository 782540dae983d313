//! Bounded text buffer every explanation is written through.
//!
//! Writes never grow the buffer past its capacity. Anything that does not fit
//! is dropped on a character boundary; a full buffer simply stops growing, so
//! there is no error path for the callers to handle.

use core::fmt;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

/// Bounded, truncating text accumulator.
#[derive(Clone, Debug)]
pub struct Buffer {
    text: String,
    capacity: usize,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Capacity used by the entry points that size their own buffers.
    pub const DEFAULT_CAPACITY: usize = 3000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` bytes of text.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True once anything has been written; callers use it to decide whether
    /// a separator is needed before the next clause.
    pub fn has_written(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.text.len() >= self.capacity
    }

    /// Append text, truncating silently at capacity.
    pub fn puts(&mut self, s: &str) {
        let room = self.capacity.saturating_sub(self.text.len());
        if s.len() <= room {
            self.text.push_str(s);
            return;
        }
        let mut end = room;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        self.text.push_str(&s[..end]);
    }

    pub fn putc(&mut self, c: char) {
        let mut tmp = [0u8; 4];
        self.puts(c.encode_utf8(&mut tmp));
    }

    /// Append `s` in double quotes, escaping quotes, backslashes and control
    /// characters so user-supplied strings are never ambiguous.
    pub fn puts_quoted(&mut self, s: &str) {
        self.puts_quoted_bytes(s.as_bytes());
    }

    /// Same as [`Buffer::puts_quoted`] for file names, which need not be UTF-8.
    pub fn puts_quoted_os(&mut self, s: &OsStr) {
        self.puts_quoted_bytes(s.as_bytes());
    }

    fn puts_quoted_bytes(&mut self, bytes: &[u8]) {
        self.putc('"');
        for chunk in bytes.utf8_chunks() {
            for c in chunk.valid().chars() {
                self.put_escaped(c);
            }
            for b in chunk.invalid() {
                self.octal_escape(*b);
            }
        }
        self.putc('"');
    }

    fn put_escaped(&mut self, c: char) {
        match c {
            '"' => self.puts("\\\""),
            '\\' => self.puts("\\\\"),
            '\n' => self.puts("\\n"),
            '\t' => self.puts("\\t"),
            '\r' => self.puts("\\r"),
            '\x07' => self.puts("\\a"),
            '\x08' => self.puts("\\b"),
            '\x0c' => self.puts("\\f"),
            '\x0b' => self.puts("\\v"),
            c if c.is_control() && (c as u32) < 0x100 => self.octal_escape(c as u8),
            c => self.putc(c),
        }
    }

    fn octal_escape(&mut self, b: u8) {
        let _ = fmt::Write::write_fmt(self, format_args!("\\{b:03o}"));
    }

    /// Append `/segment`, without doubling a slash already at the end.
    pub fn path_join(&mut self, segment: &str) {
        let segment = segment.trim_start_matches('/');
        if !self.text.ends_with('/') {
            self.putc('/');
        }
        self.puts(segment);
    }

    /// Current write position, for a later [`Buffer::truncate`].
    pub fn position(&self) -> usize {
        self.text.len()
    }

    /// Roll back to a position returned by [`Buffer::position`].
    pub fn truncate(&mut self, pos: usize) {
        if pos < self.text.len() && self.text.is_char_boundary(pos) {
            self.text.truncate(pos);
        }
    }

    /// Copy into caller storage, always leaving it NUL-terminated when it is
    /// non-empty. Returns the number of text bytes copied.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        copy_terminated(&self.text, dst)
    }
}

/// Copy `text` into `dst` as a C string, truncating on a character boundary.
pub(crate) fn copy_terminated(text: &str, dst: &mut [u8]) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let mut end = text.len().min(room);
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    dst[..end].copy_from_slice(&text.as_bytes()[..end]);
    dst[end] = 0;
    end
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.puts(s);
        Ok(())
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_puts_truncates_at_capacity() {
        let mut buf = Buffer::with_capacity(8);
        buf.puts("hello");
        buf.puts(" world");
        assert_eq!(buf.as_str(), "hello wo");
        assert!(buf.is_full());
        buf.puts("more");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut buf = Buffer::with_capacity(5);
        buf.puts("abcdé");
        assert_eq!(buf.as_str(), "abcd");
    }

    #[test]
    fn test_formatted_append() {
        let mut buf = Buffer::new();
        let _ = write!(buf, "fildes = {}", 3);
        assert_eq!(buf.as_str(), "fildes = 3");
    }

    #[test]
    fn test_quoted_escapes() {
        let mut buf = Buffer::new();
        buf.puts_quoted("a\"b\\c\nd\x01");
        assert_eq!(buf.as_str(), "\"a\\\"b\\\\c\\nd\\001\"");
    }

    #[test]
    fn test_quoted_non_utf8() {
        let mut buf = Buffer::new();
        buf.puts_quoted_os(OsStr::from_bytes(b"ab\xffc"));
        assert_eq!(buf.as_str(), "\"ab\\377c\"");
    }

    #[test]
    fn test_quoted_mixed_invalid_sequences() {
        let mut buf = Buffer::new();
        // a truncated three-byte sequence, then a lone continuation byte
        buf.puts_quoted_os(OsStr::from_bytes(b"\xe2\x82-\x80\xc3\xa9\n"));
        assert_eq!(buf.as_str(), "\"\\342\\202-\\200\u{e9}\\n\"");
    }

    #[test]
    fn test_path_join() {
        let mut buf = Buffer::new();
        buf.puts("/tmp/");
        buf.path_join("x");
        buf.path_join("/y");
        assert_eq!(buf.as_str(), "/tmp/x/y");
    }

    #[test]
    fn test_position_and_truncate() {
        let mut buf = Buffer::new();
        buf.puts("keep");
        let pos = buf.position();
        buf.puts(" discard");
        buf.truncate(pos);
        assert_eq!(buf.as_str(), "keep");
        assert!(buf.has_written());
    }

    #[test]
    fn test_copy_to_always_terminates() {
        let mut buf = Buffer::new();
        buf.puts("a long explanation");
        for n in 1..24 {
            let mut dst = vec![0xAAu8; n];
            let copied = buf.copy_to(&mut dst);
            assert!(copied < n);
            assert_eq!(dst[copied], 0);
        }
        let mut empty: [u8; 0] = [];
        assert_eq!(buf.copy_to(&mut empty), 0);
    }
}
