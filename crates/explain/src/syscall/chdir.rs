use std::path::Path;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::format;
use crate::fs::resolve::{FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;

#[derive(Clone, Copy, Debug)]
pub struct Chdir<'a> {
    pub pathname: &'a Path,
}

impl<'a> Chdir<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P) -> Self {
        Self {
            pathname: pathname.as_ref(),
        }
    }
}

impl Explainable for Chdir<'_> {
    type Code = Errno;
    const NAME: &'static str = "chdir";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EACCES
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::ENAMETOOLONG => {
                let fc = FinalComponent::new(Want::MUST_EXIST | Want::MUST_BE_A_DIRECTORY | Want::WANT_TO_SEARCH);
                generic::path(out, errnum, "pathname", self.pathname, &fc);
            }
            libc::EFAULT => generic::efault(out, "pathname"),
            libc::EIO => generic::eio(out, opts, Place::Path(self.pathname)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("plain");
        std::fs::write(&file, b"").unwrap();
        let mut out = Buffer::new();
        Chdir::new(&file).explain(&mut out, &Options::default(), Errno(libc::ENOTDIR));
        assert!(out.as_str().starts_with("the \"plain\" regular file"));
        assert!(out.as_str().ends_with("is not a directory"));
    }
}
