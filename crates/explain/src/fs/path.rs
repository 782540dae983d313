//! Pathname component walking.
//!
//! Splits a pathname into the components the kernel would look up one at a
//! time, keeping for each the text of the pathname that leads to it, so an
//! explanation can cite "the "foo" directory in the pathname "/a/b" directory"
//! exactly as the caller wrote it.
//!
//! Normalization during iteration:
//! - Repeated slashes are collapsed
//! - A trailing slash is remembered (it forces directory semantics) but yields
//!   no component
//! - `.` and `..` are yielded as-is; the kernel resolves them like any other
//!   name

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// A single lookup step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step<'a> {
    /// Pathname text before this component, without its trailing slash.
    /// `"/"` for a component directly under the root, empty for the first
    /// component of a relative pathname.
    pub prefix: &'a [u8],
    /// The component itself.
    pub name: &'a [u8],
    /// Whether this is the final component.
    pub last: bool,
}

impl<'a> Step<'a> {
    pub fn name_os(&self) -> &'a OsStr {
        OsStr::from_bytes(self.name)
    }

    pub fn prefix_os(&self) -> &'a OsStr {
        OsStr::from_bytes(self.prefix)
    }

    /// Pathname text up to and including this component.
    pub fn through(&self, path: &'a [u8]) -> &'a Path {
        let start = self.name.as_ptr() as usize - path.as_ptr() as usize;
        Path::new(OsStr::from_bytes(&path[..start + self.name.len()]))
    }

    pub fn is_dot(&self) -> bool {
        self.name == b"."
    }

    pub fn is_dot_dot(&self) -> bool {
        self.name == b".."
    }
}

/// Iterator over the lookup steps of a pathname.
pub struct Steps<'a> {
    path: &'a [u8],
    front: usize,
}

impl<'a> Steps<'a> {
    pub fn new(path: &'a [u8]) -> Self {
        Self { path, front: 0 }
    }

    /// Whether the pathname starts at the root directory.
    pub fn is_absolute(&self) -> bool {
        self.path.first() == Some(&b'/')
    }

    /// Whether the pathname ends in a slash after at least one component.
    pub fn has_trailing_slash(&self) -> bool {
        self.path.len() > 1 && self.path.ends_with(b"/") && self.path.iter().any(|&b| b != b'/')
    }

    fn next_component(&self, from: usize) -> Option<(usize, usize)> {
        let mut start = from;
        while start < self.path.len() && self.path[start] == b'/' {
            start += 1;
        }
        if start >= self.path.len() {
            return None;
        }
        let end = self.path[start..]
            .iter()
            .position(|&b| b == b'/')
            .map_or(self.path.len(), |n| start + n);
        Some((start, end))
    }

    fn prefix_before(&self, start: usize) -> &'a [u8] {
        let mut end = start;
        while end > 1 && self.path[end - 1] == b'/' {
            end -= 1;
        }
        if end == 1 && self.path[0] == b'/' {
            return &self.path[..1];
        }
        &self.path[..end]
    }
}

impl<'a> Iterator for Steps<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, end) = self.next_component(self.front)?;
        self.front = end;
        Some(Step {
            prefix: self.prefix_before(start),
            name: &self.path[start..end],
            last: self.next_component(end).is_none(),
        })
    }
}
