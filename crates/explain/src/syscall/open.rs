use std::path::Path;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::mode::{FileKind, S_IFREG};
use crate::fs::resolve::{self, FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::probe::holders::{holders, print_pids};
use crate::{format, fs};

/// `open(pathname, flags, mode)`.
#[derive(Clone, Copy, Debug)]
pub struct Open<'a> {
    pub pathname: &'a Path,
    pub flags: i32,
    pub mode: u32,
}

impl<'a> Open<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P, flags: i32, mode: u32) -> Self {
        Self {
            pathname: pathname.as_ref(),
            flags,
            mode,
        }
    }

    fn creates(&self) -> bool {
        self.flags & libc::O_CREAT != 0 || self.flags & libc::O_TMPFILE == libc::O_TMPFILE
    }

    /// What the flags ask of the final component.
    fn request(&self) -> FinalComponent {
        let mut want = Want::empty();
        match self.flags & libc::O_ACCMODE {
            libc::O_RDONLY => want |= Want::WANT_TO_READ,
            libc::O_WRONLY => want |= Want::WANT_TO_WRITE,
            _ => want |= Want::WANT_TO_READ | Want::WANT_TO_WRITE,
        }
        if self.flags & libc::O_TRUNC != 0 {
            want |= Want::WANT_TO_WRITE;
        }
        if self.flags & libc::O_CREAT != 0 {
            want |= Want::WANT_TO_CREATE;
            if self.flags & libc::O_EXCL != 0 {
                want |= Want::MUST_NOT_EXIST;
            }
        } else {
            want |= Want::MUST_EXIST;
        }
        if self.flags & libc::O_DIRECTORY != 0 {
            want |= Want::MUST_BE_A_DIRECTORY;
        }
        if self.flags & libc::O_NOATIME != 0 {
            want |= Want::WANT_TO_MODIFY_INODE;
        }
        let fc = FinalComponent::new(want).with_mode(S_IFREG);
        if self.flags & (libc::O_NOFOLLOW | libc::O_EXCL) != 0 {
            fc.nofollow()
        } else {
            fc
        }
    }

    fn eloop(&self, out: &mut Buffer, errnum: Errno, fc: &FinalComponent) {
        let final_is_link = fs::lstat(self.pathname).is_ok_and(|st| st.is_symlink());
        if self.flags & libc::O_NOFOLLOW != 0 && final_is_link {
            out.puts("O_NOFOLLOW was specified but pathname refers to a symbolic link");
            return;
        }
        generic::path(out, errnum, "pathname", self.pathname, fc);
    }

    fn enxio(&self, out: &mut Buffer) {
        match fs::stat(self.pathname).map(|st| st.kind()) {
            Ok(FileKind::Fifo) => out.puts(
                "O_NONBLOCK | O_WRONLY is set, the named file is a FIFO, and no process has the FIFO open for reading",
            ),
            Ok(FileKind::Socket) => out.puts("pathname refers to a UNIX domain socket, which cannot be opened"),
            _ => out.puts("pathname refers to a device special file, and no corresponding device exists"),
        }
    }
}

impl Explainable for Open<'_> {
    type Code = Errno;
    const NAME: &'static str = "open";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        format::open_flags(call.arg("flags"), self.flags);
        if self.creates() {
            format::mode(call.arg("mode"), self.mode);
        }
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        let fc = self.request();
        match errnum.0 {
            libc::ELOOP => self.eloop(out, errnum, &fc),
            libc::EISDIR => {
                if !resolve::explain(out, errnum, "pathname", self.pathname, &fc).is_explained() {
                    out.puts("pathname refers to a directory, and the access requested involved writing");
                }
            }
            libc::EACCES
            | libc::ENOENT
            | libc::ENOTDIR
            | libc::EEXIST
            | libc::ENAMETOOLONG
            | libc::EPERM => {
                generic::path(out, errnum, "pathname", self.pathname, &fc);
            }
            libc::ENXIO => self.enxio(out),
            libc::ETXTBSY => {
                out.puts("pathname refers to an executable which is currently being executed, and write access was requested");
                if let Some(pids) = fs::stat(self.pathname).ok().and_then(|st| holders(&st)) {
                    if !pids.is_empty() {
                        out.putc(' ');
                        print_pids(out, &pids);
                    }
                }
            }
            libc::EFBIG | libc::EOVERFLOW => {
                out.puts("pathname refers to a regular file that is too large to be opened");
                if self.flags & libc::O_LARGEFILE == 0 && libc::O_LARGEFILE != 0 {
                    out.puts(", you need to use the O_LARGEFILE flag");
                }
            }
            libc::EINVAL => {
                if self.flags & libc::O_TMPFILE == libc::O_TMPFILE && self.flags & libc::O_ACCMODE == libc::O_RDONLY {
                    out.puts("O_TMPFILE was specified without O_WRONLY or O_RDWR");
                } else {
                    out.puts("the flags argument contains an invalid combination, or the file system does not support O_DIRECT");
                }
            }
            libc::EROFS => generic::erofs(out, "pathname", Place::Path(self.pathname)),
            libc::ENOSPC | libc::EDQUOT => {
                generic::enospc(out, opts, "pathname", Place::Path(self.pathname));
            }
            libc::EWOULDBLOCK => {
                out.puts("O_NONBLOCK was specified and an incompatible lease is held on the file");
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
    fn test_describe_mode_only_with_create() {
        let mut out = Buffer::new();
        Open::new("/x", libc::O_RDONLY, 0).describe(&mut out, Errno(libc::ENOENT));
        assert_eq!(out.as_str(), "open(pathname = \"/x\", flags = O_RDONLY)");

        let mut out = Buffer::new();
        Open::new("/x", libc::O_WRONLY | libc::O_CREAT, 0o644).describe(&mut out, Errno(libc::ENOENT));
        assert_eq!(
            out.as_str(),
            "open(pathname = \"/x\", flags = O_WRONLY | O_CREAT, mode = S_IRUSR | S_IWUSR | S_IRGRP | S_IROTH)"
        );
    }

    #[test]
    fn test_eisdir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut out = Buffer::new();
        Open::new(tmp.path(), libc::O_WRONLY, 0).explain(&mut out, &Options::default(), Errno(libc::EISDIR));
        assert!(out.as_str().starts_with("pathname refers to the"), "{}", out.as_str());
        assert!(out.as_str().contains("may not be opened for writing"));
    }

    #[test]
    fn test_nofollow_loop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink("/", &link).unwrap();
        let mut out = Buffer::new();
        Open::new(&link, libc::O_RDONLY | libc::O_NOFOLLOW, 0).explain(&mut out, &Options::default(), Errno(libc::ELOOP));
        assert_eq!(out.as_str(), "O_NOFOLLOW was specified but pathname refers to a symbolic link");
    }
}
