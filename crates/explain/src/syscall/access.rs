use core::fmt::Write as _;
use std::path::Path;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::identity::Identity;
use crate::fs::resolve::{FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::holders::{holders, print_pids};
use crate::{format, fs};

/// `access(pathname, mode)`: checked against the real user and group.
#[derive(Clone, Copy, Debug)]
pub struct Access<'a> {
    pub pathname: &'a Path,
    pub mode: i32,
}

impl<'a> Access<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P, mode: i32) -> Self {
        Self {
            pathname: pathname.as_ref(),
            mode,
        }
    }

    fn request(&self) -> FinalComponent {
        let mut want = Want::MUST_EXIST;
        if self.mode & libc::R_OK != 0 {
            want |= Want::WANT_TO_READ;
        }
        if self.mode & libc::W_OK != 0 {
            want |= Want::WANT_TO_WRITE;
        }
        if self.mode & libc::X_OK != 0 {
            want |= Want::WANT_TO_EXECUTE;
        }
        FinalComponent::new(want).with_identity(Identity::real())
    }
}

impl Explainable for Access<'_> {
    type Code = Errno;
    const NAME: &'static str = "access";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        format::access_mode(call.arg("mode"), self.mode);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EACCES
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::ENAMETOOLONG => {
                generic::path(out, errnum, "pathname", self.pathname, &self.request());
            }
            libc::EINVAL => {
                let bad = self.mode & !(libc::R_OK | libc::W_OK | libc::X_OK);
                let _ = write!(
                    out,
                    "the mode argument was incorrectly specified, it contains unknown bits ({bad:#x})"
                );
            }
            libc::EROFS => generic::erofs(out, "pathname", Place::Path(self.pathname)),
            libc::ETXTBSY => {
                out.puts("write access was requested to an executable which is currently being executed");
                if let Some(pids) = fs::stat(self.pathname).ok().and_then(|st| holders(&st)) {
                    if !pids.is_empty() {
                        out.putc(' ');
                        print_pids(out, &pids);
                    }
                }
            }
            libc::EFAULT => generic::efault(out, "pathname"),
            libc::EIO => generic::eio(out, opts, Place::Path(self.pathname)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}
