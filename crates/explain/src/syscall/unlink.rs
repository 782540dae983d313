use std::path::Path;

use nix::libc;

use super::{note_still_exists, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::resolve::{self, FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::{Dialect, Options};
use crate::probe::holders::{holders, print_pids};
use crate::{format, fs};

/// `unlink(pathname)`.
#[derive(Clone, Copy, Debug)]
pub struct Unlink<'a> {
    pub pathname: &'a Path,
}

impl<'a> Unlink<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P) -> Self {
        Self {
            pathname: pathname.as_ref(),
        }
    }

    fn request() -> FinalComponent {
        FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_UNLINK).nofollow()
    }

    fn is_dir(&self) -> bool {
        fs::lstat(self.pathname).is_ok_and(|st| st.is_dir())
    }

    fn eperm(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        if resolve::explain(out, errnum, "pathname", self.pathname, &Self::request()).is_explained() {
            return;
        }
        if opts.dialect == Dialect::Bsd && self.is_dir() {
            out.puts("pathname refers to a directory, and directories may not be unlinked, use rmdir(2) instead");
            return;
        }
        out.puts(
            "the file system does not allow unlinking of files, or the directory containing \
             pathname has the sticky bit (S_ISVTX) set and the process is neither the owner of \
             the file nor of the directory",
        );
        if opts.dialect == Dialect::Bsd {
            out.puts(", or the file has its immutable or append-only flag set");
        }
    }

    fn ebusy(&self, out: &mut Buffer) {
        out.puts("pathname is currently in use by the system or some process that prevents its removal");
        if let Some(pids) = fs::lstat(self.pathname).ok().and_then(|st| holders(&st)) {
            if !pids.is_empty() {
                out.putc(' ');
                print_pids(out, &pids);
            }
        }
    }
}

impl Explainable for Unlink<'_> {
    type Code = Errno;
    const NAME: &'static str = "unlink";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EISDIR => {
                out.puts("pathname refers to a directory; use rmdir(2) instead");
            }
            libc::EPERM => self.eperm(out, opts, errnum),
            libc::EBUSY => self.ebusy(out),
            libc::EACCES | libc::ENOENT | libc::ENOTDIR | libc::ELOOP | libc::ENAMETOOLONG => {
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

    fn explain_with(dialect: Dialect, path: &Path, errnum: i32) -> String {
        let opts = Options {
            dialect,
            ..Options::default()
        };
        let mut out = Buffer::new();
        Unlink::new(path).explain(&mut out, &opts, Errno(errnum));
        out.into_string()
    }

    #[test]
    fn test_directory_per_dialect() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("d");
        std::fs::create_dir(&dir).unwrap();

        let linux = explain_with(Dialect::Linux, &dir, libc::EISDIR);
        assert_eq!(
            linux,
            "pathname refers to a directory; use rmdir(2) instead; note that pathname still exists"
        );

        let bsd = explain_with(Dialect::Bsd, &dir, libc::EPERM);
        assert!(bsd.starts_with("pathname refers to a directory, and directories may not be unlinked"), "{bsd}");
    }

    #[test]
    fn test_eperm_file_states_disjunction() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("f");
        std::fs::write(&file, b"").unwrap();
        let text = explain_with(Dialect::Linux, &file, libc::EPERM);
        assert!(text.starts_with("the file system does not allow unlinking of files, or"), "{text}");
        assert!(!text.contains("immutable"));
        let text = explain_with(Dialect::Bsd, &file, libc::EPERM);
        assert!(text.contains("immutable or append-only"), "{text}");
    }

    #[test]
    fn test_missing_has_no_note() {
        let tmp = tempfile::TempDir::new().unwrap();
        let text = explain_with(Dialect::Linux, &tmp.path().join("gone"), libc::ENOENT);
        assert!(text.starts_with("there is no \"gone\""), "{text}");
        assert!(!text.contains("still exists"));
    }
}
