use std::path::Path;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::mode::S_IFLNK;
use crate::fs::resolve::{self, FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::{format, fs};

/// `symlink(oldpath, newpath)`: `newpath` becomes a symbolic link whose
/// contents are `oldpath`. The target is never resolved by the kernel, only
/// stored, so most path errors belong to `newpath`.
#[derive(Clone, Copy, Debug)]
pub struct Symlink<'a> {
    pub oldpath: &'a Path,
    pub newpath: &'a Path,
}

impl<'a> Symlink<'a> {
    pub fn new<P: AsRef<Path> + ?Sized, Q: AsRef<Path> + ?Sized>(oldpath: &'a P, newpath: &'a Q) -> Self {
        Self {
            oldpath: oldpath.as_ref(),
            newpath: newpath.as_ref(),
        }
    }

    fn new_request() -> FinalComponent {
        FinalComponent::new(Want::MUST_NOT_EXIST | Want::WANT_TO_CREATE)
            .with_mode(S_IFLNK)
            .nofollow()
    }

    fn old_is_empty(&self) -> bool {
        self.oldpath.as_os_str().is_empty()
    }
}

impl Explainable for Symlink<'_> {
    type Code = Errno;
    const NAME: &'static str = "symlink";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("oldpath"), self.oldpath);
        format::path(call.arg("newpath"), self.newpath);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        let fc = Self::new_request();
        match errnum.0 {
            libc::ENOENT if self.old_is_empty() => {
                let any = FinalComponent::new(Want::empty());
                resolve::explain(out, errnum, "oldpath", self.oldpath, &any);
            }
            libc::ENAMETOOLONG if self.oldpath.as_os_str().len() >= fs::PATH_MAX => {
                let any = FinalComponent::new(Want::empty());
                resolve::explain(out, errnum, "oldpath", self.oldpath, &any);
            }
            libc::EACCES
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::ENAMETOOLONG
            | libc::EEXIST => generic::path(out, errnum, "newpath", self.newpath, &fc),
            libc::EPERM => {
                out.puts("the file system containing newpath does not support the creation of symbolic links");
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
