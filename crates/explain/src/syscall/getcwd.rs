use core::fmt::Write as _;
use std::os::unix::ffi::OsStrExt;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::format;
use crate::generic;
use crate::options::Options;
use crate::probe::pointer::is_efault;
use crate::probe::{current_dir, CwdLookup};

/// `getcwd(buf, size)`. The buffer is only ever described, never read.
#[derive(Clone, Copy, Debug)]
pub struct Getcwd {
    pub buf: *const u8,
    pub size: usize,
}

impl Getcwd {
    pub fn new(buf: *const u8, size: usize) -> Self {
        Self { buf, size }
    }
}

impl Explainable for Getcwd {
    type Code = Errno;
    const NAME: &'static str = "getcwd";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::pointer(call.arg("buf"), self.buf);
        format::size(call.arg("size"), self.size);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, _opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EINVAL if self.size == 0 && !self.buf.is_null() => {
                out.puts("the size argument is zero and buf is not NULL");
            }
            libc::ERANGE => {
                let _ = write!(
                    out,
                    "the size argument ({}) is less than the length of the current working directory's pathname plus its terminating NUL",
                    self.size
                );
                if let CwdLookup::Found(path) = current_dir() {
                    let _ = write!(out, " ({} bytes needed)", path.as_os_str().as_bytes().len() + 1);
                }
            }
            libc::ENOENT => match current_dir() {
                CwdLookup::OutsideRoot => {
                    out.puts("the current working directory is outside the process's root directory");
                }
                _ => out.puts("the current working directory has been unlinked"),
            },
            libc::EACCES => {
                out.puts(
                    "read or search permission was denied for a component of the current working directory's pathname",
                );
            }
            libc::ENAMETOOLONG => {
                out.puts("the current working directory's pathname is longer than PATH_MAX");
            }
            libc::EFAULT if is_efault(self.buf, self.size.max(1)) => generic::efault(out, "buf"),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erange_reports_needed_size() {
        let buf = [0u8; 2];
        let call = Getcwd::new(buf.as_ptr(), buf.len());
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::ERANGE));
        assert!(out.as_str().starts_with("the size argument (2) is less than"));
        if matches!(current_dir(), CwdLookup::Found(_)) {
            assert!(out.as_str().ends_with("bytes needed)"));
        }
    }

    #[test]
    fn test_efault() {
        let call = Getcwd::new(core::ptr::null(), 64);
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EFAULT));
        assert!(out.as_str().starts_with("buf refers to memory"));
    }
}
