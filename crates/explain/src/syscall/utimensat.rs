use core::fmt::Write as _;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use nix::libc;

use super::{print_fd_refers, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::identity::{Access, Identity};
use crate::fs::resolve::{self, FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::pointer::is_efault;
use crate::{format, fs};

const VALID_FLAGS: i32 = libc::AT_SYMLINK_NOFOLLOW | libc::AT_EMPTY_PATH;

/// `utimensat(dirfd, pathname, times, flags)`. A missing `pathname` is the
/// Linux form that changes the timestamps of `dirfd` itself.
#[derive(Clone, Copy, Debug)]
pub struct Utimensat<'a> {
    pub dirfd: RawFd,
    pub pathname: Option<&'a Path>,
    pub times: *const libc::timespec,
    pub flags: i32,
}

/// What the `times` argument asks for.
#[derive(Clone, Copy, Debug)]
enum Times {
    /// `NULL`, or both entries `UTIME_NOW`: write permission suffices.
    Now,
    /// Explicit values or `UTIME_OMIT`: ownership is required.
    Values([libc::timespec; 2]),
    Unreadable,
}

fn nsec_is_valid(nsec: libc::c_long) -> bool {
    (0..1_000_000_000).contains(&nsec) || nsec == libc::UTIME_NOW || nsec == libc::UTIME_OMIT
}

impl<'a> Utimensat<'a> {
    pub fn new(dirfd: RawFd, pathname: Option<&'a Path>, times: *const libc::timespec, flags: i32) -> Self {
        Self {
            dirfd,
            pathname,
            times,
            flags,
        }
    }

    fn times(&self) -> Times {
        if self.times.is_null() {
            return Times::Now;
        }
        if is_efault(self.times.cast(), 2 * core::mem::size_of::<libc::timespec>()) {
            return Times::Unreadable;
        }
        // SAFETY: is_efault showed both elements are readable.
        let pair = unsafe { *self.times.cast::<[libc::timespec; 2]>() };
        if pair.iter().all(|t| t.tv_nsec == libc::UTIME_NOW) {
            Times::Now
        } else {
            Times::Values(pair)
        }
    }

    fn is_relative(&self) -> bool {
        self.pathname.is_some_and(|p| !p.is_absolute()) && self.dirfd != libc::AT_FDCWD
    }

    /// The pathname as seen from the current directory.
    fn full_path(&self) -> Option<PathBuf> {
        let path = self.pathname?;
        if self.is_relative() {
            Some(fs::fd_path(self.dirfd)?.join(path))
        } else {
            Some(path.to_path_buf())
        }
    }

    fn request(&self, want: Want) -> FinalComponent {
        let fc = FinalComponent::new(Want::MUST_EXIST | want);
        if self.flags & libc::AT_SYMLINK_NOFOLLOW != 0 {
            fc.nofollow()
        } else {
            fc
        }
    }

    fn target_stat(&self) -> Option<fs::Stat> {
        match self.full_path() {
            Some(path) if self.flags & libc::AT_SYMLINK_NOFOLLOW != 0 => fs::lstat(&path).ok(),
            Some(path) => fs::stat(&path).ok(),
            None => fs::fstat(self.dirfd).ok(),
        }
    }

    /// Path errors, simulated from the directory `dirfd` refers to.
    fn path_error(&self, out: &mut Buffer, errnum: Errno, want: Want) -> bool {
        let Some(path) = self.full_path() else {
            return false;
        };
        resolve::explain(out, errnum, "pathname", &path, &self.request(want)).is_explained()
    }

    fn ebadf(&self, out: &mut Buffer) {
        generic::ebadf(out, self.dirfd, "dirfd");
        if self.pathname.is_some() {
            out.puts(", and pathname is relative");
        }
    }

    fn enotdir(&self, out: &mut Buffer, errnum: Errno) {
        let dirfd_not_dir = self.is_relative() && fs::fstat(self.dirfd).is_ok_and(|st| !st.is_dir());
        if dirfd_not_dir && print_fd_refers(out, self.dirfd, "dirfd") {
            out.puts(", not a directory, and pathname is relative");
            return;
        }
        if !self.path_error(out, errnum, Want::empty()) {
            generic::unresolved(out, errnum, "pathname");
        }
    }

    fn eacces(&self, out: &mut Buffer, errnum: Errno) {
        if self.path_error(out, errnum, Want::WANT_TO_WRITE) {
            return;
        }
        out.puts(
            "the times argument is NULL or both tv_nsec values are UTIME_NOW, and the process is \
             not the owner of the file, does not have write permission to it, and is not privileged",
        );
        let id = Identity::effective();
        if let Some(st) = self.target_stat().filter(|st| !id.permits(st, Access::WRITE)) {
            out.puts(", ");
            id.print_denial(out, &st, st.kind().name());
        }
    }

    fn eperm(&self, out: &mut Buffer, errnum: Errno) {
        let explicit = matches!(self.times(), Times::Values(_));
        if explicit && self.path_error(out, errnum, Want::WANT_TO_MODIFY_INODE) {
            return;
        }
        if explicit && self.pathname.is_none() {
            if let Some(st) = self.target_stat() {
                let id = Identity::effective();
                if !id.is_privileged() && id.uid != st.uid {
                    let _ = write!(
                        out,
                        "the times argument sets explicit values, and the process effective UID {} \
                         does not match the owner UID {} of the file, and the process is not privileged",
                        id.uid, st.uid
                    );
                    return;
                }
            }
        }
        out.puts("the file has its immutable or append-only attribute set");
    }

    fn einval(&self, out: &mut Buffer) {
        let bad = self.flags & !VALID_FLAGS;
        if bad != 0 {
            let _ = write!(out, "the flags argument contains unknown bits ({bad:#x})");
            return;
        }
        if let Times::Values(pair) = self.times() {
            for (i, t) in pair.iter().enumerate() {
                if !nsec_is_valid(t.tv_nsec) {
                    let _ = write!(
                        out,
                        "times[{i}].tv_nsec ({}) is not in the range 0 to 999999999 and is not \
                         UTIME_NOW or UTIME_OMIT",
                        t.tv_nsec
                    );
                    return;
                }
            }
        }
        if self.pathname.is_none() && self.flags & libc::AT_SYMLINK_NOFOLLOW != 0 {
            out.puts("pathname is NULL and the flags argument contains AT_SYMLINK_NOFOLLOW");
            return;
        }
        out.puts("the times argument or the flags argument is invalid");
    }
}

impl Explainable for Utimensat<'_> {
    type Code = Errno;
    const NAME: &'static str = "utimensat";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::dirfd(call.arg("dirfd"), self.dirfd);
        match self.pathname {
            Some(path) => format::path(call.arg("pathname"), path),
            None => call.arg("pathname").puts("NULL"),
        }
        format::timespec_pair(call.arg("times"), self.times);
        format::at_flags(call.arg("flags"), self.flags);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => self.ebadf(out),
            libc::EFAULT => match self.times() {
                Times::Unreadable => generic::efault(out, "the times argument"),
                _ => generic::efault(out, "pathname"),
            },
            libc::EINVAL => self.einval(out),
            libc::EACCES => self.eacces(out, errnum),
            libc::EPERM => self.eperm(out, errnum),
            libc::ENOTDIR => self.enotdir(out, errnum),
            libc::ENOENT | libc::ELOOP | libc::ENAMETOOLONG => match self.full_path() {
                Some(path) => generic::path(out, errnum, "pathname", &path, &self.request(Want::empty())),
                None => generic::unresolved(out, errnum, "pathname"),
            },
            libc::ESRCH => {
                out.puts("search permission is denied for one of the prefix components of pathname");
            }
            libc::EROFS => match self.full_path() {
                Some(path) => generic::erofs(out, "pathname", Place::Path(&path)),
                None => generic::erofs(out, "the dirfd argument", Place::Fd(self.dirfd)),
            },
            libc::EIO => match self.full_path() {
                Some(path) => generic::eio(out, opts, Place::Path(&path)),
                None => generic::eio(out, opts, Place::Fd(self.dirfd)),
            },
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}
