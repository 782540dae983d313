//! Where is the current working directory?
//!
//! Tried in order, stopping at the first answer that names the same inode as
//! `"."`:
//! 1. the `PWD` environment variable
//! 2. `/proc/self/cwd`, falling back to `getcwd(3)`
//! 3. climbing `..` and searching each parent for the child's inode
//!
//! The climb also tells an unlinked directory (no parent lists it) from one
//! outside the process's root (the climb tops out somewhere other than `/`).

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

use crate::errno::ErrnoGuard;
use crate::fs::{self, Stat};

/// Deepest directory the `..` climb will go before giving up.
const MAX_DEPTH: usize = 256;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CwdLookup {
    Found(PathBuf),
    /// The directory has been removed; no parent lists it any more.
    Unlinked,
    /// Reachable only by climbing past this process's root directory.
    OutsideRoot,
    /// Not even `"."` could be examined.
    Unknown,
}

impl CwdLookup {
    pub fn path(&self) -> Option<&Path> {
        match self {
            CwdLookup::Found(p) => Some(p),
            _ => None,
        }
    }
}

/// Find the current working directory by every available means.
pub fn current_dir() -> CwdLookup {
    let _guard = ErrnoGuard::new();
    let Ok(dot) = fs::stat(Path::new(".")) else {
        return CwdLookup::Unknown;
    };

    if let Some(pwd) = std::env::var_os("PWD").map(PathBuf::from) {
        if pwd.is_absolute() && fs::stat(&pwd).is_ok_and(|st| st.same_file(&dot)) {
            return CwdLookup::Found(pwd);
        }
    }

    if let Ok(link) = std::fs::read_link("/proc/self/cwd") {
        if link.as_os_str().as_bytes().ends_with(b" (deleted)") {
            return CwdLookup::Unlinked;
        }
        if fs::stat(&link).is_ok_and(|st| st.same_file(&dot)) {
            return CwdLookup::Found(link);
        }
    }

    match std::env::current_dir() {
        Ok(path) if fs::stat(&path).is_ok_and(|st| st.same_file(&dot)) => CwdLookup::Found(path),
        Err(e) if e.raw_os_error() == Some(nix::libc::ENOENT) => CwdLookup::Unlinked,
        _ => climb(&dot),
    }
}

/// Rebuild the path of `dot` by climbing `..` one level at a time.
pub(crate) fn climb(dot: &Stat) -> CwdLookup {
    let Ok(root) = fs::stat(Path::new("/")) else {
        return CwdLookup::Unknown;
    };

    let mut names: Vec<OsString> = Vec::new();
    let mut child = *dot;
    let mut up = PathBuf::from("..");

    for _ in 0..MAX_DEPTH {
        if child.same_file(&root) {
            return CwdLookup::Found(join_reversed(&names));
        }
        let Ok(parent) = fs::stat(&up) else {
            return CwdLookup::Unknown;
        };
        if parent.same_file(&child) {
            // `..` of a root is itself; this one is not ours.
            return CwdLookup::OutsideRoot;
        }
        match name_in(&up, &child) {
            Some(name) => names.push(name),
            None => return CwdLookup::Unlinked,
        }
        child = parent;
        up.push("..");
    }
    log::debug!("cwd: gave up climbing after {MAX_DEPTH} levels");
    CwdLookup::Unknown
}

/// The entry of `dir` that is `child`, matched by device and inode.
fn name_in(dir: &Path, child: &Stat) -> Option<OsString> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .find(|entry| {
            let name = entry.file_name();
            name != "." && name != ".." && fs::lstat(&entry.path()).is_ok_and(|st| st.same_file(child))
        })
        .map(|entry| entry.file_name())
}

fn join_reversed(names: &[OsString]) -> PathBuf {
    if names.is_empty() {
        return PathBuf::from("/");
    }
    let mut out = Vec::new();
    for name in names.iter().rev() {
        out.push(b'/');
        out.extend_from_slice(name.as_bytes());
    }
    PathBuf::from(OsString::from_vec(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_dir_matches_std() {
        let expected = std::env::current_dir().unwrap();
        match current_dir() {
            CwdLookup::Found(path) => {
                let a = fs::stat(&path).unwrap();
                let b = fs::stat(&expected).unwrap();
                assert!(a.same_file(&b));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_climb_from_here() {
        let dot = fs::stat(Path::new(".")).unwrap();
        if let CwdLookup::Found(path) = climb(&dot) {
            let st = fs::stat(&path).unwrap();
            assert!(st.same_file(&dot));
        }
    }

    #[test]
    fn test_join_reversed() {
        let names = vec![OsString::from("c"), OsString::from("b"), OsString::from("a")];
        assert_eq!(join_reversed(&names), PathBuf::from("/a/b/c"));
        assert_eq!(join_reversed(&[]), PathBuf::from("/"));
    }
}
