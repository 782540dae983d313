use core::fmt::Write as _;
use std::path::Path;

use nix::libc;

use super::{count_entries, explain_two_paths, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::resolve::{FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::holders::{holders, print_pids};
use crate::probe::mount_point;
use crate::{format, fs};

/// `rename(oldpath, newpath)`.
#[derive(Clone, Copy, Debug)]
pub struct Rename<'a> {
    pub oldpath: &'a Path,
    pub newpath: &'a Path,
}

impl<'a> Rename<'a> {
    pub fn new<P: AsRef<Path> + ?Sized, Q: AsRef<Path> + ?Sized>(oldpath: &'a P, newpath: &'a Q) -> Self {
        Self {
            oldpath: oldpath.as_ref(),
            newpath: newpath.as_ref(),
        }
    }

    fn old_request() -> FinalComponent {
        FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_UNLINK).nofollow()
    }

    fn new_request() -> FinalComponent {
        FinalComponent::new(Want::WANT_TO_CREATE).nofollow()
    }

    fn old_is_dir(&self) -> bool {
        fs::lstat(self.oldpath).is_ok_and(|st| st.is_dir())
    }

    fn new_stat(&self) -> Option<fs::Stat> {
        fs::lstat(self.newpath).ok()
    }
}

impl Explainable for Rename<'_> {
    type Code = Errno;
    const NAME: &'static str = "rename";

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
            libc::EISDIR => {
                out.puts("newpath is an existing directory, but oldpath is not a directory");
            }
            libc::ENOTEMPTY | libc::EEXIST => {
                out.puts("newpath is not an empty directory");
                if let Some(n) = count_entries(self.newpath) {
                    let _ = write!(out, ", it contains entries other than \".\" and \"..\" ({n})");
                }
            }
            libc::ENOTDIR => {
                let new_not_dir = self.new_stat().is_some_and(|st| !st.is_dir());
                if self.old_is_dir() && new_not_dir {
                    out.puts("oldpath is a directory, and newpath exists but is not a directory");
                } else {
                    explain_two_paths(out, errnum, old, new);
                }
            }
            libc::EINVAL => {
                out.puts("newpath contains a path prefix of oldpath, an attempt was made to make a directory a subdirectory of itself");
            }
            libc::EXDEV => {
                out.puts("oldpath and newpath are not on the same mounted file system");
                if let (Some(a), Some(b)) = (mount_point(self.oldpath), mount_point(self.newpath)) {
                    out.puts(" (");
                    out.puts_quoted_os(a.point.as_os_str());
                    out.puts(" and ");
                    out.puts_quoted_os(b.point.as_os_str());
                    out.putc(')');
                }
            }
            libc::EBUSY => {
                out.puts("oldpath or newpath is a directory that is in use by the system or some process");
                let pids = [self.oldpath, self.newpath]
                    .iter()
                    .filter_map(|p| fs::lstat(p).ok())
                    .filter_map(|st| holders(&st))
                    .flatten()
                    .collect::<Vec<_>>();
                if !pids.is_empty() {
                    out.putc(' ');
                    print_pids(out, &pids);
                }
            }
            libc::EMLINK => {
                out.puts("oldpath already has the maximum number of links to it, or it is a directory and the directory containing newpath has the maximum number of links");
            }
            libc::EACCES | libc::EPERM | libc::ENOENT | libc::ELOOP | libc::ENAMETOOLONG => {
                explain_two_paths(out, errnum, old, new);
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

    #[test]
    fn test_enotempty_counts() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old");
        let new = tmp.path().join("new");
        std::fs::create_dir(&old).unwrap();
        std::fs::create_dir(&new).unwrap();
        std::fs::write(new.join("a"), b"").unwrap();
        std::fs::write(new.join("b"), b"").unwrap();
        let mut out = Buffer::new();
        Rename::new(&old, &new).explain(&mut out, &Options::default(), Errno(libc::ENOTEMPTY));
        assert_eq!(
            out.as_str(),
            "newpath is not an empty directory, it contains entries other than \".\" and \"..\" (2)"
        );
    }

    #[test]
    fn test_missing_oldpath() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut out = Buffer::new();
        Rename::new(&tmp.path().join("gone"), &tmp.path().join("new")).explain(
            &mut out,
            &Options::default(),
            Errno(libc::ENOENT),
        );
        assert!(out.as_str().starts_with("there is no \"gone\""), "{}", out.as_str());
    }

    #[test]
    fn test_both_paths_inconclusive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let old = tmp.path().join("old");
        std::fs::write(&old, b"").unwrap();
        let mut out = Buffer::new();
        Rename::new(&old, &tmp.path().join("new")).explain(&mut out, &Options::default(), Errno(libc::EACCES));
        let (first, second) = out.as_str().split_once("; ").unwrap();
        assert!(first.contains("while resolving oldpath,"), "{first}");
        assert!(second.contains("while resolving newpath,"), "{second}");
        assert!(!out.as_str().contains("oldpath or newpath"));
    }
}
