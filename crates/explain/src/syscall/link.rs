use core::fmt::Write as _;
use std::path::Path;

use nix::libc;

use super::{explain_two_paths, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::resolve::{FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::{Dialect, Options};
use crate::probe::mount_point;
use crate::{format, fs};

/// `link(oldpath, newpath)`: a new hard link to an existing file.
#[derive(Clone, Copy, Debug)]
pub struct Link<'a> {
    pub oldpath: &'a Path,
    pub newpath: &'a Path,
}

impl<'a> Link<'a> {
    pub fn new<P: AsRef<Path> + ?Sized, Q: AsRef<Path> + ?Sized>(oldpath: &'a P, newpath: &'a Q) -> Self {
        Self {
            oldpath: oldpath.as_ref(),
            newpath: newpath.as_ref(),
        }
    }

    fn old_request() -> FinalComponent {
        FinalComponent::new(Want::MUST_EXIST).nofollow()
    }

    fn new_request() -> FinalComponent {
        FinalComponent::new(Want::MUST_NOT_EXIST | Want::WANT_TO_CREATE).nofollow()
    }

    fn eperm(&self, out: &mut Buffer, opts: &Options) {
        let old_is_dir = fs::lstat(self.oldpath).is_ok_and(|st| st.is_dir());
        if old_is_dir {
            out.puts("oldpath is a directory, and hard links to directories are not permitted");
            return;
        }
        out.puts("the file system containing oldpath and newpath does not support the creation of hard links");
        if !opts.dialect_specific {
            return;
        }
        match opts.dialect {
            Dialect::Linux => out.puts(
                ", or the process does not own oldpath and cannot read and write it while \
                 fs.protected_hardlinks is enabled",
            ),
            Dialect::Bsd => out.puts(
                ", or oldpath has its immutable or append-only flag set, \
                 or the directory containing newpath has its immutable flag set",
            ),
        }
    }
}

impl Explainable for Link<'_> {
    type Code = Errno;
    const NAME: &'static str = "link";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("oldpath"), self.oldpath);
        format::path(call.arg("newpath"), self.newpath);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        let old = ("oldpath", self.oldpath, &Self::old_request());
        let new = ("newpath", self.newpath, &Self::new_request());
        match errnum.0 {
            libc::EACCES
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::ENAMETOOLONG
            | libc::EEXIST => explain_two_paths(out, errnum, old, new),
            libc::EPERM => self.eperm(out, opts),
            libc::EXDEV => {
                out.puts("oldpath and newpath are not on the same mounted file system");
                let a = mount_point(self.oldpath);
                let b = mount_point(self.newpath);
                if let (Some(a), Some(b)) = (a, b) {
                    out.puts(" (");
                    out.puts_quoted_os(a.point.as_os_str());
                    out.puts(" and ");
                    out.puts_quoted_os(b.point.as_os_str());
                    out.putc(')');
                }
            }
            libc::EMLINK => {
                out.puts("the file referred to by oldpath already has the maximum number of links to it");
                if let Ok(st) = fs::lstat(self.oldpath) {
                    let _ = write!(out, " ({})", st.nlink);
                }
            }
            libc::ENOSPC | libc::EDQUOT => {
                generic::enospc(out, opts, "newpath", Place::Path(self.newpath));
            }
            libc::EROFS => generic::erofs(out, "newpath", Place::Path(self.newpath)),
            libc::EFAULT => generic::efault(out, "oldpath or newpath"),
            libc::EIO => generic::eio(out, opts, Place::Path(self.newpath)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain_with(dialect: Dialect, link: &Link<'_>, errnum: i32) -> String {
        let opts = Options {
            dialect,
            ..Options::default()
        };
        let mut out = Buffer::new();
        link.explain(&mut out, &opts, Errno(errnum));
        out.into_string()
    }

    #[test]
    fn test_eperm_directory_in_both_dialects() {
        let tmp = tempfile::TempDir::new().unwrap();
        let new = tmp.path().join("new");
        let link = Link::new(tmp.path(), &new);
        for dialect in [Dialect::Linux, Dialect::Bsd] {
            let text = explain_with(dialect, &link, libc::EPERM);
            assert!(text.starts_with("oldpath is a directory"));
        }
    }

    #[test]
    fn test_eperm_file_states_dialect_disjunction() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old");
        std::fs::write(&old, b"").unwrap();
        let new = tmp.path().join("new");
        let link = Link::new(&old, &new);
        let text = explain_with(Dialect::Linux, &link, libc::EPERM);
        assert!(text.contains("does not support the creation of hard links, or"));
        let text = explain_with(Dialect::Bsd, &link, libc::EPERM);
        assert!(text.starts_with("the file system containing oldpath and newpath does not support"));
        assert!(text.contains(", or oldpath has its immutable or append-only flag set, or"));
    }

    #[test]
    fn test_eperm_without_dialect_detail() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old");
        std::fs::write(&old, b"").unwrap();
        let new = tmp.path().join("new");
        let opts = Options {
            dialect: Dialect::Bsd,
            dialect_specific: false,
            ..Options::default()
        };
        let mut out = Buffer::new();
        Link::new(&old, &new).explain(&mut out, &opts, Errno(libc::EPERM));
        assert_eq!(
            out.as_str(),
            "the file system containing oldpath and newpath does not support the creation of hard links"
        );
    }

    #[test]
    fn test_eexist_names_newpath() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old");
        let new = tmp.path().join("new");
        std::fs::write(&old, b"").unwrap();
        std::fs::write(&new, b"").unwrap();
        let text = explain_with(Dialect::Linux, &Link::new(&old, &new), libc::EEXIST);
        assert!(text.starts_with("newpath already exists"));
    }
}
