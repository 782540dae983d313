//! One explainer per system call.
//!
//! Each call is a struct of its arguments implementing
//! [`Explainable`](crate::Explainable). `describe` writes the call as it was
//! made; `explain` is a match on the error code that delegates to the shared
//! helpers in [`generic`](crate::generic), the path resolution simulator and
//! the probes.

mod accept;
mod access;
mod chdir;
mod close;
mod getaddrinfo;
mod getcwd;
mod ioctl;
mod link;
mod lseek;
mod mkdir;
mod open;
mod read;
mod rename;
mod rmdir;
mod symlink;
mod unlink;
mod utimensat;
mod write;

pub use accept::Accept;
pub use access::Access;
pub use chdir::Chdir;
pub use close::Close;
pub use getaddrinfo::Getaddrinfo;
pub use getcwd::Getcwd;
pub use ioctl::Ioctl;
pub use link::Link;
pub use lseek::Lseek;
pub use mkdir::Mkdir;
pub use open::Open;
pub use read::Read;
pub use rename::Rename;
pub use rmdir::Rmdir;
pub use symlink::Symlink;
pub use unlink::Unlink;
pub use utimensat::Utimensat;
pub use write::Write;

use core::fmt::Write as _;
use std::os::unix::io::RawFd;
use std::path::Path;

use crate::buffer::Buffer;
use crate::fs;
use crate::fs::resolve::{self, FinalComponent};

/// Names of the calls this crate explains.
pub const SUPPORTED: &[&str] = &[
    "accept",
    "accept4",
    "access",
    "chdir",
    "close",
    "getaddrinfo",
    "getcwd",
    "ioctl",
    "link",
    "lseek",
    "mkdir",
    "open",
    "read",
    "rename",
    "rmdir",
    "symlink",
    "unlink",
    "utimensat",
    "write",
];

/// Writes `name(arg = value, arg = value)`.
pub(crate) struct CallWriter<'b> {
    out: &'b mut Buffer,
    first: bool,
}

impl<'b> CallWriter<'b> {
    pub(crate) fn start(out: &'b mut Buffer, name: &str) -> Self {
        out.puts(name);
        out.putc('(');
        Self { out, first: true }
    }

    /// Begin the next argument; the value is written to the returned buffer.
    pub(crate) fn arg(&mut self, name: &str) -> &mut Buffer {
        if !self.first {
            self.out.puts(", ");
        }
        self.first = false;
        let _ = write!(self.out, "{name} = ");
        self.out
    }

    pub(crate) fn finish(self) {
        self.out.putc(')');
    }
}

/// `the fildes argument (3) refers to a regular file`, or nothing when the
/// descriptor cannot be examined. Returns whether anything was written.
pub(crate) fn print_fd_refers(out: &mut Buffer, fd: RawFd, arg: &str) -> bool {
    let Ok(st) = fs::fstat(fd) else {
        return false;
    };
    let _ = write!(out, "the {arg} argument ({fd}) refers to {}", st.kind().with_article());
    true
}

/// Entries of `dir` other than `.` and `..`.
pub(crate) fn count_entries(dir: &Path) -> Option<usize> {
    let _guard = crate::errno::ErrnoGuard::new();
    Some(std::fs::read_dir(dir).ok()?.filter_map(Result::ok).count())
}

/// The `"; note that pathname still exists"` suffix of the removal calls.
pub(crate) fn note_still_exists(out: &mut Buffer, arg: &str, path: &Path) {
    if out.has_written() && fs::lstat(path).is_ok() {
        let _ = write!(out, "; note that {arg} still exists");
    }
}

/// Path errors of a two-path call: the first path the simulator can explain
/// wins, otherwise one general sentence per path joined with `"; "`.
pub(crate) fn explain_two_paths(
    out: &mut Buffer,
    errnum: crate::errno::Errno,
    first: (&str, &Path, &FinalComponent),
    second: (&str, &Path, &FinalComponent),
) {
    for (arg, path, fc) in [first, second] {
        if resolve::explain(out, errnum, arg, path, fc).is_explained() {
            return;
        }
    }
    crate::generic::unresolved(out, errnum, first.0);
    out.puts("; ");
    crate::generic::unresolved(out, errnum, second.0);
}
