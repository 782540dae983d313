use core::fmt::Write as _;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::libc;

use super::{count_entries, note_still_exists, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::path::Steps;
use crate::fs::resolve::{FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::holders::{holders, print_pids};
use crate::probe::mount_point;
use crate::{format, fs};

#[derive(Clone, Copy, Debug)]
pub struct Rmdir<'a> {
    pub pathname: &'a Path,
}

impl<'a> Rmdir<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P) -> Self {
        Self {
            pathname: pathname.as_ref(),
        }
    }

    fn request() -> FinalComponent {
        FinalComponent::new(Want::MUST_EXIST | Want::MUST_BE_A_DIRECTORY | Want::WANT_TO_UNLINK).nofollow()
    }

    fn last_is_dot(&self) -> bool {
        Steps::new(self.pathname.as_os_str().as_bytes())
            .last()
            .is_some_and(|s| s.is_dot())
    }

    fn ebusy(&self, out: &mut Buffer) {
        out.puts("pathname is currently in use by the system or some process that prevents its removal");
        let is_mount = mount_point(self.pathname)
            .is_some_and(|m| fs::stat(&m.point).ok() == fs::stat(self.pathname).ok());
        if is_mount {
            out.puts(", it is a mount point");
        }
        if let Some(pids) = fs::lstat(self.pathname).ok().and_then(|st| holders(&st)) {
            if !pids.is_empty() {
                out.putc(' ');
                print_pids(out, &pids);
            }
        }
    }
}

impl Explainable for Rmdir<'_> {
    type Code = Errno;
    const NAME: &'static str = "rmdir";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::ENOTEMPTY | libc::EEXIST => {
                out.puts("pathname is not an empty directory");
                if let Some(n) = count_entries(self.pathname) {
                    let _ = write!(out, ", it contains entries other than \".\" and \"..\" ({n})");
                }
            }
            libc::EINVAL if self.last_is_dot() => {
                out.puts("pathname has \".\" as its last component");
            }
            libc::EBUSY => self.ebusy(out),
            libc::EACCES
            | libc::EPERM
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::ENAMETOOLONG => {
                generic::path(out, errnum, "pathname", self.pathname, &Self::request());
            }
            libc::EROFS => generic::erofs(out, "pathname", Place::Path(self.pathname)),
            libc::EFAULT => generic::efault(out, "pathname"),
            libc::EIO => generic::eio(out, opts, Place::Path(self.pathname)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
        note_still_exists(out, "pathname", self.pathname);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Diagnostic;

    #[test]
    fn test_not_empty_with_count() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("full");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("only"), b"").unwrap();
        let d = Diagnostic::build(&Options::default(), Errno(libc::ENOTEMPTY), &Rmdir::new(&dir));
        let text = d.to_string();
        assert!(text.contains("not an empty directory"), "{text}");
        assert!(text.contains("(1)"), "{text}");
        assert!(text.ends_with("; note that pathname still exists"), "{text}");
    }

    #[test]
    fn test_dot() {
        let mut out = Buffer::new();
        Rmdir::new("/tmp/.").explain(&mut out, &Options::default(), Errno(libc::EINVAL));
        assert!(out.as_str().starts_with("pathname has \".\" as its last component"));
    }

    #[test]
    fn test_missing_has_no_note() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut out = Buffer::new();
        Rmdir::new(&tmp.path().join("gone")).explain(&mut out, &Options::default(), Errno(libc::ENOENT));
        assert!(!out.as_str().contains("still exists"));
    }
}
