//! What an open file descriptor refers to.

use std::os::unix::io::RawFd;
use std::path::PathBuf;

use nix::libc;

use crate::fs::mode::FileKind;
use crate::fs::{self, Stat};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FdInfo {
    pub fd: RawFd,
    pub stat: Stat,
    /// File status flags from `F_GETFL`.
    pub flags: i32,
    /// Where `/proc/self/fd` says it points, when that is readable.
    pub path: Option<PathBuf>,
}

impl FdInfo {
    pub fn kind(&self) -> FileKind {
        self.stat.kind()
    }

    pub fn readable(&self) -> bool {
        matches!(self.flags & libc::O_ACCMODE, libc::O_RDONLY | libc::O_RDWR)
    }

    pub fn writable(&self) -> bool {
        matches!(self.flags & libc::O_ACCMODE, libc::O_WRONLY | libc::O_RDWR)
    }

    pub fn is_socket(&self) -> bool {
        self.kind() == FileKind::Socket
    }

    /// A path that names something other than a real file, such as
    /// `pipe:[1234]` or `anon_inode:[eventfd]`.
    pub fn is_pseudo_path(&self) -> bool {
        self.path
            .as_deref()
            .map_or(true, |p| !p.is_absolute())
    }
}

/// `fstat` and `F_GETFL` of `fd`, or `None` when it is not open.
pub fn fd_info(fd: RawFd) -> Option<FdInfo> {
    let stat = fs::fstat(fd).ok()?;
    let flags = fs::fd_flags(fd)?;
    Some(FdInfo {
        fd,
        stat,
        flags,
        path: fs::fd_path(fd),
    })
}
