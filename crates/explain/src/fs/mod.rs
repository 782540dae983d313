//! File system metadata access for explanations.
//!
//! Thin wrappers over `stat`-family calls that return [`Errno`] values
//! directly and leave the caller's `errno` untouched.

pub mod identity;
pub mod mode;
pub mod path;
pub mod resolve;

use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use nix::libc;

use crate::errno::{Errno, ErrnoGuard};
use mode::FileKind;

/// Longest pathname the kernel accepts, including the terminating NUL.
pub const PATH_MAX: usize = libc::PATH_MAX as usize;

/// Longest single pathname component.
pub const NAME_MAX: usize = 255;

/// Symbolic links the kernel follows during one lookup before `ELOOP`.
pub const MAX_SYMLINKS: usize = 40;

/// The metadata fields explanations use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: i64,
}

impl Stat {
    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        mode::is_dir(self.mode)
    }

    pub fn is_symlink(&self) -> bool {
        mode::is_lnk(self.mode)
    }

    /// Same device and inode.
    pub fn same_file(&self, other: &Stat) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }
}

impl From<libc::stat> for Stat {
    fn from(st: libc::stat) -> Self {
        Self {
            dev: st.st_dev as u64,
            ino: st.st_ino as u64,
            mode: st.st_mode as u32,
            nlink: st.st_nlink as u64,
            uid: st.st_uid,
            gid: st.st_gid,
            rdev: st.st_rdev as u64,
            size: st.st_size as i64,
        }
    }
}

/// `stat(2)`: follows symbolic links.
pub fn stat(path: &Path) -> Result<Stat, Errno> {
    let _guard = ErrnoGuard::new();
    nix::sys::stat::stat(path).map(Stat::from).map_err(Errno::from)
}

/// `lstat(2)`: does not follow a final symbolic link.
pub fn lstat(path: &Path) -> Result<Stat, Errno> {
    let _guard = ErrnoGuard::new();
    nix::sys::stat::lstat(path).map(Stat::from).map_err(Errno::from)
}

/// The closest of `path` and its ancestors that exists, with its metadata.
///
/// A relative name with no directory part lives in `.`, so that is the last
/// candidate tried.
pub fn existing_ancestor(path: &Path) -> Option<(&Path, Stat)> {
    let mut here = path;
    loop {
        if let Ok(st) = stat(here) {
            return Some((here, st));
        }
        here = match here.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            Some(_) if here != Path::new(".") => Path::new("."),
            _ => return None,
        };
    }
}

/// `fstat(2)` on a raw descriptor that may well be invalid.
pub fn fstat(fd: RawFd) -> Result<Stat, Errno> {
    let _guard = ErrnoGuard::new();
    let mut st = MaybeUninit::<libc::stat>::uninit();
    // SAFETY: fstat writes a full struct stat on success and nothing otherwise;
    // an invalid fd only yields EBADF.
    let rc = unsafe { libc::fstat(fd, st.as_mut_ptr()) };
    if rc < 0 {
        return Err(Errno::last());
    }
    // SAFETY: fstat returned 0, so the struct is initialised.
    Ok(Stat::from(unsafe { st.assume_init() }))
}

/// The file status flags (`O_RDONLY`, `O_APPEND`, ...) of an open descriptor.
pub fn fd_flags(fd: RawFd) -> Option<i32> {
    let _guard = ErrnoGuard::new();
    // SAFETY: F_GETFL takes no argument and does not touch memory.
    let rc = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    (rc >= 0).then_some(rc)
}

/// Whether `fd` names an open descriptor in this process.
pub fn fd_is_open(fd: RawFd) -> bool {
    let _guard = ErrnoGuard::new();
    // SAFETY: F_GETFD takes no argument and does not touch memory.
    fd >= 0 && unsafe { libc::fcntl(fd, libc::F_GETFD) } >= 0
}

/// The pathname an open descriptor refers to, from `/proc/self/fd`.
pub fn fd_path(fd: RawFd) -> Option<PathBuf> {
    if fd < 0 {
        return None;
    }
    let _guard = ErrnoGuard::new();
    std::fs::read_link(format!("/proc/self/fd/{fd}")).ok()
}

/// The `SO_TYPE` of a socket descriptor (`SOCK_STREAM`, ...).
pub fn socket_type(fd: RawFd) -> Option<i32> {
    let _guard = ErrnoGuard::new();
    let mut ty: libc::c_int = 0;
    let mut len = core::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: ty and len are valid for writes of the sizes given.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_TYPE,
            (&mut ty as *mut libc::c_int).cast(),
            &mut len,
        )
    };
    (rc == 0).then_some(ty)
}

/// Whether a socket descriptor is listening for connections.
pub fn socket_is_listening(fd: RawFd) -> Option<bool> {
    let _guard = ErrnoGuard::new();
    let mut on: libc::c_int = 0;
    let mut len = core::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: on and len are valid for writes of the sizes given.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ACCEPTCONN,
            (&mut on as *mut libc::c_int).cast(),
            &mut len,
        )
    };
    (rc == 0).then_some(on != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_stat_and_lstat_on_symlink() {
        let tmp = tempfile::TempDir::new().unwrap();
        let target = tmp.path().join("target");
        std::fs::write(&target, b"x").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(lstat(&link).unwrap().is_symlink());
        assert_eq!(stat(&link).unwrap().kind(), FileKind::Regular);
        assert!(stat(&link).unwrap().same_file(&stat(&target).unwrap()));
    }

    #[test]
    fn test_missing_path_reports_enoent() {
        assert_eq!(
            lstat(Path::new("/definitely/not/here")),
            Err(Errno(libc::ENOENT))
        );
    }

    #[test]
    fn test_fstat_bad_fd() {
        assert_eq!(fstat(-1), Err(Errno(libc::EBADF)));
        assert!(!fd_is_open(-1));
        assert!(fd_flags(-1).is_none());
    }

    #[test]
    fn test_fd_helpers_on_open_file() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        assert!(fd_is_open(fd));
        assert_eq!(fd_flags(fd).map(|f| f & libc::O_ACCMODE), Some(libc::O_RDWR));
        assert_eq!(fstat(fd).unwrap().kind(), FileKind::Regular);
        assert!(socket_type(fd).is_none());
    }

    #[test]
    fn test_existing_ancestor() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("a/b/c");
        let (here, st) = existing_ancestor(&missing).unwrap();
        assert_eq!(here, tmp.path());
        assert_eq!(st.kind(), FileKind::Directory);

        let (here, _) = existing_ancestor(Path::new("no-such-entry-here")).unwrap();
        assert_eq!(here, Path::new("."));
    }
}
