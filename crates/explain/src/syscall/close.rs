use std::os::unix::io::RawFd;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::format;
use crate::generic::{self, Place};
use crate::options::Options;

#[derive(Clone, Copy, Debug)]
pub struct Close {
    pub fildes: RawFd,
}

impl Close {
    pub fn new(fildes: RawFd) -> Self {
        Self { fildes }
    }
}

impl Explainable for Close {
    type Code = Errno;
    const NAME: &'static str = "close";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::fd(call.arg("fildes"), self.fildes);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => generic::ebadf(out, self.fildes, "fildes"),
            libc::EIO => {
                generic::eio(out, opts, Place::Fd(self.fildes));
                out.puts(", data written earlier may not have reached the file");
            }
            libc::ENOSPC | libc::EDQUOT => {
                out.puts(
                    "data written earlier could not be flushed to the file system because it is full \
                     or the disk quota was exceeded; this is usually seen on network file systems",
                );
            }
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ebadf() {
        let mut out = Buffer::new();
        let call = Close::new(1_000_000);
        call.explain(&mut out, &Options::default(), Errno(libc::EBADF));
        assert_eq!(
            out.as_str(),
            "the fildes argument (1000000) does not refer to an open file descriptor"
        );
        let mut desc = Buffer::new();
        call.describe(&mut desc, Errno(libc::EBADF));
        assert_eq!(desc.as_str(), "close(fildes = 1000000)");
    }
}
