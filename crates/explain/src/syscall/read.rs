use std::os::unix::io::RawFd;

use nix::libc;

use super::{print_fd_refers, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::identity::Access;
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::pointer::is_efault;
use crate::{format, fs};

/// `read(fildes, data, data_size)`. The buffer is checked, never read.
#[derive(Clone, Copy, Debug)]
pub struct Read {
    pub fildes: RawFd,
    pub data: *const u8,
    pub data_size: usize,
}

impl Read {
    pub fn new(fildes: RawFd, data: *const u8, data_size: usize) -> Self {
        Self {
            fildes,
            data,
            data_size,
        }
    }
}

impl Explainable for Read {
    type Code = Errno;
    const NAME: &'static str = "read";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::fd(call.arg("fildes"), self.fildes);
        format::pointer(call.arg("data"), self.data);
        format::size(call.arg("data_size"), self.data_size);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => generic::ebadf_mode(out, self.fildes, "fildes", Access::READ),
            libc::EFAULT => {
                if is_efault(self.data, self.data_size) {
                    generic::efault(out, "the data argument");
                } else {
                    generic::efault(out, "part of the data argument");
                }
            }
            libc::EAGAIN => generic::eagain(out, self.fildes, "fildes"),
            libc::EISDIR => {
                if !print_fd_refers(out, self.fildes, "fildes") {
                    out.puts("the fildes argument refers to a directory");
                }
                out.puts(", use getdents(2) to read directories");
            }
            libc::EINVAL => {
                let direct = fs::fd_flags(self.fildes).is_some_and(|f| f & libc::O_DIRECT != 0);
                if direct {
                    out.puts(
                        "the file was opened with O_DIRECT and the data argument, the data_size \
                         argument or the file offset is not suitably aligned",
                    );
                } else if print_fd_refers(out, self.fildes, "fildes") {
                    out.puts(", which is unsuitable for reading");
                }
            }
            libc::EIO => generic::eio(out, opts, Place::Fd(self.fildes)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_ebadf_write_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = std::fs::File::create(tmp.path().join("w")).unwrap();
        let buf = [0u8; 4];
        let call = Read::new(file.as_raw_fd(), buf.as_ptr(), buf.len());
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EBADF));
        assert!(out.as_str().ends_with("is not open for reading"));
    }

    #[test]
    fn test_efault_on_bad_buffer() {
        let call = Read::new(0, 16 as *const u8, 32);
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EFAULT));
        assert!(out.as_str().starts_with("the data argument refers to memory"));
    }
}
