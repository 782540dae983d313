use core::fmt::Write as _;
use std::os::unix::io::RawFd;

use nix::libc;

use super::{print_fd_refers, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::{Errno, ErrnoGuard};
use crate::fs::identity::Access;
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::pointer::is_efault;
use crate::{format, fs};

/// `write(fildes, data, data_size)`.
#[derive(Clone, Copy, Debug)]
pub struct Write {
    pub fildes: RawFd,
    pub data: *const u8,
    pub data_size: usize,
}

impl Write {
    pub fn new(fildes: RawFd, data: *const u8, data_size: usize) -> Self {
        Self {
            fildes,
            data,
            data_size,
        }
    }
}

fn file_size_limit() -> Option<u64> {
    let _guard = ErrnoGuard::new();
    let mut rl = core::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success.
    if unsafe { libc::getrlimit(libc::RLIMIT_FSIZE, rl.as_mut_ptr()) } != 0 {
        return None;
    }
    // SAFETY: getrlimit returned 0.
    let rl = unsafe { rl.assume_init() };
    (rl.rlim_cur != libc::RLIM_INFINITY).then_some(rl.rlim_cur as u64)
}

impl Explainable for Write {
    type Code = Errno;
    const NAME: &'static str = "write";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::fd(call.arg("fildes"), self.fildes);
        format::pointer(call.arg("data"), self.data);
        format::size(call.arg("data_size"), self.data_size);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => generic::ebadf_mode(out, self.fildes, "fildes", Access::WRITE),
            libc::EFAULT => {
                if is_efault(self.data, self.data_size) {
                    generic::efault(out, "the data argument");
                } else {
                    generic::efault(out, "part of the data argument");
                }
            }
            libc::EAGAIN => generic::eagain(out, self.fildes, "fildes"),
            libc::EPIPE => {
                if print_fd_refers(out, self.fildes, "fildes") {
                    out.puts(" whose reading end is closed");
                } else {
                    out.puts("the fildes argument refers to a pipe or socket whose reading end is closed");
                }
                out.puts(", the process would also have been sent a SIGPIPE signal unless it is ignored");
            }
            libc::EFBIG => {
                out.puts("an attempt was made to write a file that exceeds the maximum file size");
                if let Some(limit) = file_size_limit() {
                    let _ = write!(out, " (RLIMIT_FSIZE is {limit})");
                }
            }
            libc::ENOSPC | libc::EDQUOT => {
                generic::enospc(out, opts, "the fildes argument", Place::Fd(self.fildes));
            }
            libc::EINVAL => {
                let direct = fs::fd_flags(self.fildes).is_some_and(|f| f & libc::O_DIRECT != 0);
                if direct {
                    out.puts(
                        "the file was opened with O_DIRECT and the data argument, the data_size \
                         argument or the file offset is not suitably aligned",
                    );
                } else if print_fd_refers(out, self.fildes, "fildes") {
                    out.puts(", which is unsuitable for writing");
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
    fn test_epipe() {
        let (rd, wr) = nix::unistd::pipe().unwrap();
        drop(rd);
        let data = b"x";
        let call = Write::new(wr.as_raw_fd(), data.as_ptr(), data.len());
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EPIPE));
        assert!(out.as_str().contains("refers to a named pipe whose reading end is closed"));
    }
}
