//! Explanations shared by many system calls.
//!
//! The per-call explainers handle the cases particular to their call and hand
//! everything else to these helpers. [`explain`] is the catch-all for error
//! codes that mean the same thing whichever call reports them.

use core::fmt::Write;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::path::Path;

use nix::libc;

use crate::buffer::Buffer;
use crate::errno::{Errno, ErrnoGuard};
use crate::fs::identity::Access;
use crate::fs::resolve::{self, FinalComponent};
use crate::fs::{MAX_SYMLINKS, NAME_MAX, PATH_MAX};
use crate::options::Options;
use crate::probe::{self, eio, fd_info, mount};

/// `EBADF`: not an open descriptor.
pub fn ebadf(out: &mut Buffer, fd: RawFd, arg: &str) {
    let _ = write!(out, "the {arg} argument ({fd}) does not refer to an open file descriptor");
    if fd < 0 {
        out.puts(", file descriptors are never negative");
    }
}

/// `EBADF` where the descriptor is open but in the wrong mode.
pub fn ebadf_mode(out: &mut Buffer, fd: RawFd, arg: &str, need: Access) {
    let Some(info) = fd_info(fd) else {
        ebadf(out, fd, arg);
        return;
    };
    let (ok, word) = if need.contains(Access::WRITE) {
        (info.writable(), "writing")
    } else {
        (info.readable(), "reading")
    };
    if ok {
        ebadf(out, fd, arg);
        return;
    }
    let _ = write!(out, "the {arg} argument ({fd}) is not open for {word}");
    if info.flags & libc::O_PATH != 0 {
        out.puts(", it was opened with O_PATH and only identifies a location");
    }
}

/// `EFAULT`: a pointer argument is not in the accessible address space.
pub fn efault(out: &mut Buffer, arg: &str) {
    let _ = write!(
        out,
        "{arg} refers to memory that is outside the process's accessible address space"
    );
}

pub fn eintr(out: &mut Buffer, call: &str) {
    let _ = write!(
        out,
        "the {call} system call was interrupted by a signal before it could complete"
    );
}

pub fn enomem(out: &mut Buffer) {
    out.puts("insufficient kernel memory was available");
}

/// `EMFILE`: the per-process descriptor limit.
pub fn emfile(out: &mut Buffer) {
    out.puts("the process already has the maximum number of file descriptors open");
    if let Some(limit) = open_files_limit() {
        let _ = write!(out, " ({limit})");
    }
}

/// `ENFILE`: the system-wide open file limit.
pub fn enfile(out: &mut Buffer) {
    out.puts("the system-wide limit on the total number of open files has been reached");
    let _guard = ErrnoGuard::new();
    if let Ok(text) = std::fs::read_to_string("/proc/sys/fs/file-nr") {
        let mut it = text.split_whitespace();
        if let (Some(used), Some(_), Some(max)) = (it.next(), it.next(), it.next()) {
            let _ = write!(out, " ({used} of {max})");
        }
    }
}

fn open_files_limit() -> Option<u64> {
    let _guard = ErrnoGuard::new();
    let mut rl = MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rl.as_mut_ptr()) } != 0 {
        return None;
    }
    // SAFETY: getrlimit returned 0.
    let rl = unsafe { rl.assume_init() };
    (rl.rlim_cur != libc::RLIM_INFINITY).then_some(rl.rlim_cur as u64)
}

/// Where a file lives, for the file system clauses.
#[derive(Clone, Copy, Debug)]
pub enum Place<'a> {
    Path(&'a Path),
    Fd(RawFd),
}

impl Place<'_> {
    fn mount(self) -> Option<mount::Mount> {
        match self {
            Place::Path(p) => probe::mount_point(p),
            Place::Fd(fd) => probe::mount_point_fd(fd),
        }
    }
}

fn print_mount(out: &mut Buffer, m: &mount::Mount) {
    out.puts(" (");
    out.puts_quoted_os(m.point.as_os_str());
    let _ = write!(out, " {} mounted from ", m.fs_type);
    out.puts_quoted(&m.source);
    out.putc(')');
}

/// `ENOSPC`: the file system is full.
pub fn enospc(out: &mut Buffer, opts: &Options, arg: &str, place: Place<'_>) {
    let _ = write!(out, "the file system containing {arg} has no room for more data");
    if !opts.extra_device_info {
        return;
    }
    let Some(m) = place.mount() else {
        return;
    };
    print_mount(out, &m);
    if let Some(usage) = m.usage() {
        if usage.out_of_inodes() {
            out.puts(", it has run out of inodes");
        } else {
            let _ = write!(out, ", it is {}% full", usage.percent_used());
        }
    }
}

/// `EROFS`: write access to something on a read-only file system.
pub fn erofs(out: &mut Buffer, arg: &str, place: Place<'_>) {
    let _ = write!(
        out,
        "write access was requested and {arg} refers to a file on a read-only file system"
    );
    if let Some(m) = place.mount() {
        print_mount(out, &m);
    }
}

/// `EIO` on a pathname or descriptor.
pub fn eio(out: &mut Buffer, opts: &Options, place: Place<'_>) {
    match place {
        Place::Path(p) => eio::explain_eio_path(out, opts, p),
        Place::Fd(fd) => eio::explain_eio_fd(out, opts, fd),
    }
}

/// `EAGAIN` on a non-blocking descriptor.
pub fn eagain(out: &mut Buffer, fd: RawFd, arg: &str) {
    let _ = write!(
        out,
        "the {arg} argument ({fd}) is marked non-blocking and the requested operation would block"
    );
}

pub fn enosys(out: &mut Buffer, call: &str) {
    let _ = write!(out, "the {call} system call is not implemented on this system");
}

/// Path errors: try the resolution simulator, then a general sentence.
pub fn path(out: &mut Buffer, errnum: Errno, arg: &str, path: &Path, fc: &FinalComponent) {
    if resolve::explain(out, errnum, arg, path, fc).is_explained() {
        return;
    }
    match errnum.0 {
        libc::ELOOP => {
            let _ = write!(
                out,
                "too many symbolic links were encountered in translating {arg}, more than {MAX_SYMLINKS}"
            );
        }
        libc::ENAMETOOLONG => {
            let _ = write!(
                out,
                "{arg} is too long, or a component is longer than {NAME_MAX} bytes, or the whole is longer than {} bytes",
                PATH_MAX - 1
            );
        }
        _ => unresolved(out, errnum, arg),
    }
}

/// Nothing in the current state explains the error; say what it means.
pub fn unresolved(out: &mut Buffer, errnum: Errno, arg: &str) {
    let text = errnum.strerror();
    let mut chars = text.chars();
    let first = chars.next().map(|c| c.to_lowercase().collect::<String>());
    let _ = write!(
        out,
        "{}{} while resolving {arg}, the file system may have changed since the call was made",
        first.unwrap_or_default(),
        chars.as_str()
    );
}

/// The catch-all for codes that mean the same thing for any call. Writes
/// nothing for codes it does not know.
pub fn explain(out: &mut Buffer, errnum: Errno, call: &str) {
    match errnum.0 {
        libc::EINTR => eintr(out, call),
        libc::ENOMEM => enomem(out),
        libc::EMFILE => emfile(out),
        libc::ENFILE => enfile(out),
        libc::ENOSYS => enosys(out, call),
        libc::EFAULT => efault(out, "a pointer argument"),
        libc::EPERM => {
            out.puts("the operation is not permitted to the process, it lacks the needed privilege");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::resolve::Want;

    #[test]
    fn test_ebadf_negative() {
        let mut out = Buffer::new();
        ebadf(&mut out, -1, "fildes");
        assert_eq!(
            out.as_str(),
            "the fildes argument (-1) does not refer to an open file descriptor, file descriptors are never negative"
        );
    }

    #[test]
    fn test_ebadf_wrong_mode() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("ro");
        std::fs::write(&path, b"x").unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let mut out = Buffer::new();
        ebadf_mode(
            &mut out,
            std::os::unix::io::AsRawFd::as_raw_fd(&file),
            "fildes",
            Access::WRITE,
        );
        assert!(out.as_str().ends_with("is not open for writing"));
    }

    #[test]
    fn test_unresolved_fallback() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut out = Buffer::new();
        // The file exists, so ENOENT has no explanation in the current state.
        path(
            &mut out,
            Errno(libc::ENOENT),
            "pathname",
            tmp.path(),
            &FinalComponent::new(Want::MUST_EXIST),
        );
        assert!(out.as_str().starts_with("no such file or directory while resolving pathname"));
    }

    #[test]
    fn test_catch_all() {
        let mut out = Buffer::new();
        explain(&mut out, Errno(libc::EINTR), "read");
        assert!(out.as_str().contains("read system call was interrupted"));

        let mut out = Buffer::new();
        explain(&mut out, Errno(libc::EXDEV), "read");
        assert!(out.is_empty());
    }
}
