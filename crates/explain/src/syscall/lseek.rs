use core::fmt::Write as _;
use std::os::unix::io::RawFd;

use nix::libc;

use super::{print_fd_refers, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::{Errno, ErrnoGuard};
use crate::generic;
use crate::options::Options;
use crate::{format, fs};

#[derive(Clone, Copy, Debug)]
pub struct Lseek {
    pub fildes: RawFd,
    pub offset: i64,
    pub whence: i32,
}

impl Lseek {
    pub fn new(fildes: RawFd, offset: i64, whence: i32) -> Self {
        Self {
            fildes,
            offset,
            whence,
        }
    }

    /// Where the seek would have landed, when that can be worked out.
    fn target(&self) -> Option<i64> {
        let base = match self.whence {
            libc::SEEK_SET => 0,
            libc::SEEK_CUR => current_offset(self.fildes)?,
            libc::SEEK_END => fs::fstat(self.fildes).ok()?.size,
            _ => return None,
        };
        base.checked_add(self.offset)
    }
}

fn current_offset(fd: RawFd) -> Option<i64> {
    let _guard = ErrnoGuard::new();
    // SAFETY: a zero SEEK_CUR seek reports the offset without moving it.
    let pos = unsafe { libc::lseek(fd, 0, libc::SEEK_CUR) };
    (pos >= 0).then_some(pos)
}

impl Explainable for Lseek {
    type Code = Errno;
    const NAME: &'static str = "lseek";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::fd(call.arg("fildes"), self.fildes);
        format::int(call.arg("offset"), self.offset);
        format::whence(call.arg("whence"), self.whence);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, _opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => generic::ebadf(out, self.fildes, "fildes"),
            libc::EINVAL => match self.target() {
                Some(n) if n < 0 => {
                    let _ = write!(out, "the resulting file offset would be negative ({n})");
                }
                _ if !matches!(
                    self.whence,
                    libc::SEEK_SET | libc::SEEK_CUR | libc::SEEK_END | libc::SEEK_DATA | libc::SEEK_HOLE
                ) =>
                {
                    let _ = write!(
                        out,
                        "the whence argument ({}) is not one of SEEK_SET, SEEK_CUR, SEEK_END, SEEK_DATA or SEEK_HOLE",
                        self.whence
                    );
                }
                _ => out.puts("the resulting file offset would be beyond the end of a seekable device"),
            },
            libc::ENXIO => {
                out.puts("the whence argument is SEEK_DATA or SEEK_HOLE, and the offset is beyond the end of the file");
            }
            libc::EOVERFLOW => {
                out.puts("the resulting file offset cannot be represented in an off_t");
            }
            libc::ESPIPE => {
                if print_fd_refers(out, self.fildes, "fildes") {
                    out.puts(", which cannot seek");
                } else {
                    out.puts("the fildes argument is associated with a pipe, socket, or FIFO, which cannot seek");
                }
            }
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_negative_offset() {
        let file = tempfile::tempfile().unwrap();
        let call = Lseek::new(file.as_raw_fd(), -100, libc::SEEK_SET);
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EINVAL));
        assert_eq!(out.as_str(), "the resulting file offset would be negative (-100)");
    }

    #[test]
    fn test_bad_whence() {
        let file = tempfile::tempfile().unwrap();
        let call = Lseek::new(file.as_raw_fd(), 0, 77);
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::EINVAL));
        assert!(out.as_str().starts_with("the whence argument (77)"));
    }

    #[test]
    fn test_espipe_names_pipe() {
        let (rd, _wr) = nix::unistd::pipe().unwrap();
        let call = Lseek::new(rd.as_raw_fd(), 0, libc::SEEK_CUR);
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::ESPIPE));
        assert!(out.as_str().contains("refers to a named pipe, which cannot seek"));
    }
}
