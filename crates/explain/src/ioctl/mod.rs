//! ioctl request descriptors and the registry that picks one.
//!
//! Request numbers are not unique: `FIONREAD`, `TIOCINQ` and `SIOCINQ` share
//! one number. Every candidate for a number may carry a predicate looking at the
//! descriptor (is it a terminal? a socket?); the first accepting predicate
//! wins, then the predicate-less candidate, then the generic descriptor.

mod check;
mod table;

use core::ffi::c_void;
use core::fmt::Write;
use std::os::unix::io::RawFd;

use hashbrown::HashMap;
use nix::libc;
use spin::Lazy;

use crate::buffer::Buffer;
use crate::errno::{Errno, ErrnoGuard};
use crate::fs::{self, mode::FileKind};
use crate::generic;
use crate::options::Options;
use crate::probe::pointer::is_efault;

pub use check::{check_table, TableProblem};
pub use table::TABLE;

/// Which way the data argument flows, named from the caller's side as the
/// `_IOC` encoding does: `Read` means the kernel writes into it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// The argument is ignored or passed by value.
    None,
    Read,
    Write,
    ReadWrite,
}

/// Chooses between descriptors sharing a request number.
pub type Disambiguate = fn(fd: RawFd, request: u64, data: *const c_void) -> bool;

/// Request specific explanation; returns `false` to fall back to the generic
/// one.
pub type ExplainFn = fn(out: &mut Buffer, opts: &Options, errnum: Errno, fd: RawFd, data: *const c_void) -> bool;

/// Everything known about one ioctl request.
#[derive(Clone, Copy, Debug)]
pub struct IoControl {
    pub name: &'static str,
    pub number: u64,
    pub disambiguate: Option<Disambiguate>,
    pub direction: Direction,
    /// Size of the pointed-to data, 0 when the argument is not a pointer.
    pub data_size: usize,
    /// C type of the data argument, for messages.
    pub data_type: &'static str,
    pub explain: Option<ExplainFn>,
}

/// The descriptor used for request numbers nothing else claims.
pub static GENERIC: IoControl = IoControl {
    name: "",
    number: 0,
    disambiguate: None,
    direction: Direction::None,
    data_size: 0,
    data_type: "void *",
    explain: None,
};

impl IoControl {
    pub fn is_generic(&self) -> bool {
        self.name.is_empty()
    }

    /// Write the request argument: its name, or the number in hex.
    pub fn print_request(&self, out: &mut Buffer, request: u64) {
        if self.is_generic() {
            let _ = write!(out, "{request:#x}");
        } else {
            out.puts(self.name);
        }
    }

    /// Explain `errnum` for this request, specific first, then generic.
    pub fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno, fd: RawFd, data: *const c_void) {
        if errnum.0 == libc::EFAULT && self.data_size > 0 && is_efault(data.cast(), self.data_size) {
            generic::efault(out, "the data argument");
            let _ = write!(out, ", {} bytes are needed for a {}", self.data_size, self.data_type);
            return;
        }
        if let Some(f) = self.explain {
            let pos = out.position();
            if f(out, opts, errnum, fd, data) {
                return;
            }
            out.truncate(pos);
        }
        self.explain_generic(out, opts, errnum, fd);
    }

    fn explain_generic(&self, out: &mut Buffer, opts: &Options, errnum: Errno, fd: RawFd) {
        match errnum.0 {
            libc::EBADF => generic::ebadf(out, fd, "fildes"),
            libc::EFAULT => generic::efault(out, "the data argument"),
            libc::EINVAL => {
                out.puts("the request or data argument is not valid for this device");
            }
            libc::ENOTTY => {
                if self.is_generic() {
                    out.puts("the request does not apply to the kind of object the fildes argument refers to");
                } else {
                    let _ = write!(
                        out,
                        "the {} request does not apply to the kind of object the fildes argument refers to",
                        self.name
                    );
                }
                if let Ok(st) = fs::fstat(fd) {
                    let _ = write!(out, ", {}", st.kind().with_article());
                }
            }
            libc::EIO => generic::eio(out, opts, generic::Place::Fd(fd)),
            _ => generic::explain(out, errnum, "ioctl"),
        }
    }
}

/// Request number to candidate descriptors, in table order.
pub struct Registry {
    by_number: HashMap<u64, Vec<&'static IoControl>>,
}

static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::new(TABLE));

/// The process-wide registry over the built-in table.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

impl Registry {
    pub fn new(table: &'static [IoControl]) -> Self {
        let mut by_number: HashMap<u64, Vec<&'static IoControl>> = HashMap::new();
        for entry in table {
            by_number.entry(entry.number).or_default().push(entry);
        }
        Self { by_number }
    }

    /// Candidates for `request`, in table order.
    pub fn candidates(&self, request: u64) -> &[&'static IoControl] {
        self.by_number.get(&request).map_or(&[], Vec::as_slice)
    }

    /// The descriptor that best fits `request` on `fd`.
    pub fn find(&self, fd: RawFd, request: u64, data: *const c_void) -> &'static IoControl {
        let candidates = self.candidates(request);
        candidates
            .iter()
            .find(|c| c.disambiguate.is_some_and(|f| f(fd, request, data)))
            .or_else(|| candidates.iter().find(|c| c.disambiguate.is_none()))
            .copied()
            .unwrap_or(&GENERIC)
    }

    pub fn numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_number.keys().copied()
    }
}

// ============================================================================
// Predicates shared by the table
// ============================================================================

pub(crate) fn is_tty(fd: RawFd, _request: u64, _data: *const c_void) -> bool {
    let _guard = ErrnoGuard::new();
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(fd) == 1 }
}

pub(crate) fn is_socket(fd: RawFd, _request: u64, _data: *const c_void) -> bool {
    fs::fstat(fd).is_ok_and(|st| st.kind() == FileKind::Socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    use super::table::request;

    const FIONREAD: u64 = request(libc::FIONREAD);
    const TIOCGWINSZ: u64 = request(libc::TIOCGWINSZ);

    #[test]
    fn test_alias_resolved_by_descriptor_kind() {
        let (a, _b) = UnixStream::pair().unwrap();
        let found = registry().find(a.as_raw_fd(), FIONREAD, core::ptr::null());
        assert_eq!(found.name, "SIOCINQ");

        let file = tempfile::tempfile().unwrap();
        let found = registry().find(file.as_raw_fd(), FIONREAD, core::ptr::null());
        assert_eq!(found.name, "FIONREAD");
    }

    #[test]
    fn test_unknown_number_is_generic() {
        let found = registry().find(0, 0xdead_beef, core::ptr::null());
        assert!(found.is_generic());
        let mut out = Buffer::new();
        found.print_request(&mut out, 0xdead_beef);
        assert_eq!(out.as_str(), "0xdeadbeef");
    }

    #[test]
    fn test_enotty_on_regular_file() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        let desc = registry().find(fd, TIOCGWINSZ, core::ptr::null());
        assert_eq!(desc.name, "TIOCGWINSZ");
        let mut out = Buffer::new();
        desc.explain(&mut out, &Options::default(), Errno(libc::ENOTTY), fd, core::ptr::null());
        assert!(out.as_str().contains("not a terminal"), "{}", out.as_str());
    }

    #[test]
    fn test_efault_names_size() {
        let desc = registry().find(0, TIOCGWINSZ, core::ptr::null());
        let mut out = Buffer::new();
        desc.explain(&mut out, &Options::default(), Errno(libc::EFAULT), 0, 16 as *const c_void);
        assert!(out.as_str().contains("8 bytes are needed for a struct winsize"));
    }
}
