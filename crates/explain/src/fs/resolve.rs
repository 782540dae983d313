//! Path resolution simulator.
//!
//! Re-walks a pathname the way the kernel did, one component at a time,
//! against the file system as it is now, and finds the most specific reason
//! the lookup could have failed with a given errno. The caller describes what
//! it wanted from the final component with a [`FinalComponent`].
//!
//! The file system may have changed since the real call failed. When the walk
//! finds nothing matching the errno the result is [`Verdict::Inconclusive`] and
//! the caller falls back to a less specific sentence.

use core::fmt::Write;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use nix::libc;

use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::identity::{print_uid, Access, Identity};
use crate::fs::mode::{FileKind, S_IFMT, S_IFREG, S_ISVTX};
use crate::fs::path::{Step, Steps};
use crate::fs::{self, Stat, MAX_SYMLINKS, NAME_MAX, PATH_MAX};

bitflags! {
    /// What the caller wants from the final component.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Want: u32 {
        const MUST_EXIST = 1 << 0;
        const MUST_NOT_EXIST = 1 << 1;
        const MUST_BE_A_DIRECTORY = 1 << 2;
        const WANT_TO_READ = 1 << 3;
        const WANT_TO_WRITE = 1 << 4;
        const WANT_TO_EXECUTE = 1 << 5;
        const WANT_TO_SEARCH = 1 << 6;
        const WANT_TO_CREATE = 1 << 7;
        const WANT_TO_UNLINK = 1 << 8;
        const WANT_TO_MODIFY_INODE = 1 << 9;
        const FOLLOW_SYMLINK = 1 << 10;
    }
}

/// The request made of a pathname's final component.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FinalComponent {
    pub want: Want,
    /// File type to be created; only consulted with `WANT_TO_CREATE`.
    pub st_mode: u32,
    /// Credentials the kernel checks against.
    pub identity: Identity,
}

impl FinalComponent {
    /// A request checked against the effective IDs, following symlinks.
    pub fn new(want: Want) -> Self {
        Self {
            want: want | Want::FOLLOW_SYMLINK,
            st_mode: S_IFREG,
            identity: Identity::effective(),
        }
    }

    #[must_use]
    pub fn nofollow(mut self) -> Self {
        self.want.remove(Want::FOLLOW_SYMLINK);
        self
    }

    #[must_use]
    pub fn with_mode(mut self, st_mode: u32) -> Self {
        self.st_mode = st_mode;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    fn expected_kind(&self) -> Option<FileKind> {
        if self.want.contains(Want::MUST_BE_A_DIRECTORY) {
            return Some(FileKind::Directory);
        }
        if self.want.contains(Want::WANT_TO_CREATE) && self.st_mode & S_IFMT != 0 {
            return Some(FileKind::from_mode(self.st_mode));
        }
        None
    }
}

/// Outcome of a simulation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// A specific sentence was written.
    Explained,
    /// Nothing matching the errno was found; nothing was written.
    Inconclusive,
}

impl Verdict {
    pub fn is_explained(self) -> bool {
        self == Verdict::Explained
    }
}

/// A directory the walk passed through: either a component or the start.
#[derive(Clone, Copy, Debug)]
pub enum Dir<'a> {
    Root,
    Cwd,
    Component(Step<'a>),
}

/// One thing wrong with a pathname.
#[derive(Clone, Debug)]
pub enum Problem<'a> {
    Empty,
    TooLong { len: usize },
    NameTooLong { step: Step<'a> },
    Missing { step: Step<'a>, last: bool },
    Dangling { step: Step<'a>, target: PathBuf },
    NotADirectory { step: Step<'a>, kind: FileKind },
    NoSearch { dir: Dir<'a>, st: Stat },
    Loop { step: Step<'a> },
    Exists { step: Step<'a>, kind: FileKind },
    IsADirectory { step: Step<'a> },
    NoPermission { step: Step<'a>, st: Stat, access: Access },
    NoWriteToDir { dir: Dir<'a>, st: Stat, unlink: bool },
    Sticky { step: Step<'a>, st: Stat, dir_st: Stat },
    NotOwner { step: Step<'a>, st: Stat },
}

impl Problem<'_> {
    /// The errno the kernel reports for this problem.
    pub fn errno(&self) -> Errno {
        Errno(match self {
            Problem::Empty | Problem::Missing { .. } | Problem::Dangling { .. } => libc::ENOENT,
            Problem::TooLong { .. } | Problem::NameTooLong { .. } => libc::ENAMETOOLONG,
            Problem::NotADirectory { .. } => libc::ENOTDIR,
            Problem::NoSearch { .. }
            | Problem::NoPermission { .. }
            | Problem::NoWriteToDir { .. } => libc::EACCES,
            Problem::Loop { .. } => libc::ELOOP,
            Problem::Exists { .. } => libc::EEXIST,
            Problem::IsADirectory { .. } => libc::EISDIR,
            Problem::Sticky { .. } | Problem::NotOwner { .. } => libc::EPERM,
        })
    }
}

/// Explain why resolving `path` for `fc` failed with `errnum`.
///
/// `arg` is the argument name used in the sentence, e.g. `"pathname"`.
pub fn explain(out: &mut Buffer, errnum: Errno, arg: &str, path: &Path, fc: &FinalComponent) -> Verdict {
    let bytes = path.as_os_str().as_bytes();
    let problems = walk(bytes, fc);
    match problems.iter().find(|p| p.errno() == errnum) {
        Some(problem) => {
            print_problem(out, arg, problem, fc);
            Verdict::Explained
        }
        None => {
            log::debug!(
                "resolve: nothing in {:?} explains {} ({} candidates)",
                path,
                errnum,
                problems.len()
            );
            Verdict::Inconclusive
        }
    }
}

/// Everything wrong with `path` for `fc`, earliest first. Empty when the
/// lookup would succeed.
pub fn problems<'a>(path: &'a [u8], fc: &FinalComponent) -> Vec<Problem<'a>> {
    walk(path, fc)
}

fn dir_path<'a>(dir: Dir<'a>, path: &'a [u8]) -> &'a Path {
    match dir {
        Dir::Root => Path::new("/"),
        Dir::Cwd => Path::new("."),
        Dir::Component(step) => step.through(path),
    }
}

fn walk<'a>(path: &'a [u8], fc: &FinalComponent) -> Vec<Problem<'a>> {
    let mut found = Vec::new();
    if path.is_empty() {
        found.push(Problem::Empty);
        return found;
    }
    if path.len() >= PATH_MAX {
        found.push(Problem::TooLong { len: path.len() });
        return found;
    }

    let steps = Steps::new(path);
    let trailing_slash = steps.has_trailing_slash();
    let mut dir = if steps.is_absolute() { Dir::Root } else { Dir::Cwd };

    for step in steps {
        if step.name.len() > NAME_MAX {
            found.push(Problem::NameTooLong { step });
            return found;
        }

        let Ok(dir_st) = fs::stat(dir_path(dir, path)) else {
            // The directory vanished between steps; nothing reliable to say.
            return found;
        };
        if !fc.identity.permits(&dir_st, Access::EXECUTE) {
            found.push(Problem::NoSearch { dir, st: dir_st });
            return found;
        }

        let here = step.through(path);
        let follow = !step.last || trailing_slash || fc.want.contains(Want::FOLLOW_SYMLINK);
        let st = match fs::lstat(here) {
            Ok(lst) if lst.is_symlink() && follow => match follow_links(here) {
                Ok(st) => Some(st),
                Err(Hop::Loop) => {
                    found.push(Problem::Loop { step });
                    return found;
                }
                Err(Hop::Dangling(target)) => {
                    if step.last && fc.want.contains(Want::WANT_TO_CREATE) {
                        None
                    } else {
                        found.push(Problem::Dangling { step, target });
                        return found;
                    }
                }
                Err(Hop::Other) => return found,
            },
            Ok(lst) => Some(lst),
            Err(Errno(libc::ENOENT)) => None,
            Err(Errno(libc::ELOOP)) => {
                found.push(Problem::Loop { step });
                return found;
            }
            Err(Errno(libc::ENAMETOOLONG)) => {
                found.push(Problem::NameTooLong { step });
                return found;
            }
            Err(_) => return found,
        };

        if !step.last {
            match st {
                None => {
                    found.push(Problem::Missing { step, last: false });
                    return found;
                }
                Some(st) if !st.is_dir() => {
                    found.push(Problem::NotADirectory {
                        step,
                        kind: st.kind(),
                    });
                    return found;
                }
                Some(_) => {
                    dir = Dir::Component(step);
                    continue;
                }
            }
        }

        check_final(&mut found, fc, step, st, dir, dir_st, trailing_slash);
    }

    found
}

fn check_final<'a>(
    found: &mut Vec<Problem<'a>>,
    fc: &FinalComponent,
    step: Step<'a>,
    st: Option<Stat>,
    dir: Dir<'a>,
    dir_st: Stat,
    trailing_slash: bool,
) {
    let want = fc.want;
    let id = &fc.identity;

    let Some(st) = st else {
        if want.contains(Want::WANT_TO_CREATE) {
            if !id.permits(&dir_st, Access::WRITE) {
                found.push(Problem::NoWriteToDir {
                    dir,
                    st: dir_st,
                    unlink: false,
                });
            }
        } else if !want.contains(Want::MUST_NOT_EXIST) {
            found.push(Problem::Missing { step, last: true });
        }
        return;
    };

    if want.contains(Want::MUST_NOT_EXIST) {
        found.push(Problem::Exists {
            step,
            kind: st.kind(),
        });
    }
    let needs_dir = want.intersects(Want::MUST_BE_A_DIRECTORY | Want::WANT_TO_SEARCH) || trailing_slash;
    if needs_dir && !st.is_dir() {
        found.push(Problem::NotADirectory {
            step,
            kind: st.kind(),
        });
    }
    if want.contains(Want::WANT_TO_WRITE) && st.is_dir() {
        found.push(Problem::IsADirectory { step });
    }

    let mut access = Access::empty();
    if want.contains(Want::WANT_TO_READ) {
        access |= Access::READ;
    }
    if want.contains(Want::WANT_TO_WRITE) {
        access |= Access::WRITE;
    }
    if want.intersects(Want::WANT_TO_EXECUTE | Want::WANT_TO_SEARCH) {
        access |= Access::EXECUTE;
    }
    for bit in access.iter() {
        if !id.permits(&st, bit) {
            found.push(Problem::NoPermission {
                step,
                st,
                access: bit,
            });
        }
    }

    if want.contains(Want::WANT_TO_UNLINK) {
        if !id.permits(&dir_st, Access::WRITE) {
            found.push(Problem::NoWriteToDir {
                dir,
                st: dir_st,
                unlink: true,
            });
        }
        if dir_st.mode & S_ISVTX != 0
            && !id.is_privileged()
            && id.uid != st.uid
            && id.uid != dir_st.uid
        {
            found.push(Problem::Sticky { step, st, dir_st });
        }
    }

    if want.contains(Want::WANT_TO_MODIFY_INODE) && !id.is_privileged() && id.uid != st.uid {
        found.push(Problem::NotOwner { step, st });
    }
}

enum Hop {
    Loop,
    Dangling(PathBuf),
    Other,
}

/// Follow a chain of symbolic links starting at `link`, at most
/// [`MAX_SYMLINKS`] deep, returning the metadata of what it lands on.
fn follow_links(link: &Path) -> Result<Stat, Hop> {
    let mut current = link.to_path_buf();
    for _ in 0..=MAX_SYMLINKS {
        match fs::lstat(&current) {
            Ok(st) if st.is_symlink() => {
                let _guard = crate::errno::ErrnoGuard::new();
                let target = std::fs::read_link(&current).map_err(|_| Hop::Other)?;
                current = match current.parent() {
                    Some(parent) if target.is_relative() => parent.join(&target),
                    _ => target,
                };
            }
            Ok(st) => return Ok(st),
            Err(Errno(libc::ENOENT)) => return Err(Hop::Dangling(current)),
            Err(Errno(libc::ELOOP)) => return Err(Hop::Loop),
            Err(_) => return Err(Hop::Other),
        }
    }
    Err(Hop::Loop)
}

// ============================================================================
// Sentences
// ============================================================================

fn quoted_os(out: &mut Buffer, s: &[u8]) {
    out.puts_quoted_os(OsStr::from_bytes(s));
}

/// `the "name" regular file in the pathname "/prefix" directory`
fn print_subject(out: &mut Buffer, step: &Step<'_>, kind: &str) {
    out.puts("the ");
    quoted_os(out, step.name);
    let _ = write!(out, " {kind} ");
    print_where(out, step);
}

fn print_where(out: &mut Buffer, step: &Step<'_>) {
    if step.prefix.is_empty() {
        out.puts("in the current directory");
    } else {
        out.puts("in the pathname ");
        quoted_os(out, step.prefix);
        out.puts(" directory");
    }
}

fn print_dir(out: &mut Buffer, dir: Dir<'_>) {
    match dir {
        Dir::Root => out.puts("the root directory"),
        Dir::Cwd => out.puts("the current directory"),
        Dir::Component(step) => print_subject(out, &step, "directory"),
    }
}

fn access_word(access: Access) -> &'static str {
    if access.contains(Access::READ) {
        "read"
    } else if access.contains(Access::WRITE) {
        "write"
    } else {
        "execute"
    }
}

fn print_problem(out: &mut Buffer, arg: &str, problem: &Problem<'_>, fc: &FinalComponent) {
    match problem {
        Problem::Empty => {
            let _ = write!(
                out,
                "{arg} is the empty string; if you meant the current directory, use \".\" instead"
            );
        }
        Problem::TooLong { len } => {
            let _ = write!(
                out,
                "{arg} exceeds the system maximum path length ({len} > {})",
                PATH_MAX - 1
            );
        }
        Problem::NameTooLong { step } => {
            let _ = write!(out, "{arg} has a component, ");
            quoted_os(out, step.name);
            let _ = write!(
                out,
                ", that exceeds the system maximum file name length ({} > {NAME_MAX})",
                step.name.len()
            );
        }
        Problem::Missing { step, last } => {
            out.puts("there is no ");
            quoted_os(out, step.name);
            let kind = if !*last {
                "directory"
            } else {
                match fc.expected_kind() {
                    Some(kind) => kind.name(),
                    None => "directory entry",
                }
            };
            let _ = write!(out, " {kind} ");
            print_where(out, step);
            if !*last {
                let _ = write!(out, ", so {arg} cannot be resolved");
            }
        }
        Problem::Dangling { step, target } => {
            print_subject(out, step, "symbolic link");
            out.puts(" refers to ");
            out.puts_quoted_os(target.as_os_str());
            out.puts(", which does not exist");
        }
        Problem::NotADirectory { step, kind } => {
            print_subject(out, step, kind.name());
            if step.last {
                out.puts(" is not a directory");
            } else {
                out.puts(" is being used as a directory when it is not");
            }
        }
        Problem::NoSearch { dir, st } => {
            out.puts("the process does not have search permission to ");
            print_dir(out, *dir);
            out.puts(", ");
            fc.identity.print_denial(out, st, "directory");
        }
        Problem::Loop { step } => {
            let _ = write!(
                out,
                "too many symbolic links were encountered in translating {arg}, more than {MAX_SYMLINKS} starting at "
            );
            print_subject(out, step, "symbolic link");
            out.puts(", this is probably a loop");
        }
        Problem::Exists { step, kind } => {
            let _ = write!(out, "{arg} already exists, there is already {} named ", kind.with_article());
            quoted_os(out, step.name);
            out.putc(' ');
            print_where(out, step);
            if let Some(expected) = fc.expected_kind() {
                if expected != *kind {
                    let _ = write!(out, ", and it is not {}", expected.with_article());
                }
            }
        }
        Problem::IsADirectory { step } => {
            let _ = write!(out, "{arg} refers to ");
            print_subject(out, step, "directory");
            out.puts(", and directories may not be opened for writing");
        }
        Problem::NoPermission { step, st, access } => {
            let _ = write!(out, "the process does not have {} permission to ", access_word(*access));
            let kind = st.kind();
            print_subject(out, step, kind.name());
            out.puts(", ");
            fc.identity.print_denial(out, st, kind.name());
        }
        Problem::NoWriteToDir { dir, st, unlink } => {
            out.puts("the process does not have write permission to ");
            print_dir(out, *dir);
            let verb = if *unlink { "remove" } else { "create" };
            let _ = write!(out, ", this is needed to {verb} a directory entry, ");
            fc.identity.print_denial(out, st, "directory");
        }
        Problem::Sticky { step, st, dir_st } => {
            out.puts("the directory containing ");
            quoted_os(out, step.name);
            out.puts(" has the sticky bit (S_ISVTX) set, and the process effective UID ");
            print_uid(out, fc.identity.uid);
            out.puts(" is neither the owner of the file (");
            print_uid(out, st.uid);
            out.puts(") nor the owner of the directory (");
            print_uid(out, dir_st.uid);
            out.puts("), and the process is not privileged");
        }
        Problem::NotOwner { step, st } => {
            out.puts("the process effective UID ");
            print_uid(out, fc.identity.uid);
            out.puts(" does not match the owner UID ");
            print_uid(out, st.uid);
            out.puts(" of ");
            print_subject(out, step, st.kind().name());
            out.puts(", and the process is not privileged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::identity::IdKind;
    use crate::fs::mode::S_IFDIR;
    use std::os::unix::fs::PermissionsExt;

    fn run(errnum: i32, path: &Path, fc: &FinalComponent) -> (Verdict, String) {
        let mut out = Buffer::new();
        let verdict = explain(&mut out, Errno(errnum), "pathname", path, fc);
        (verdict, out.into_string())
    }

    #[test]
    fn test_empty_path() {
        let fc = FinalComponent::new(Want::MUST_EXIST);
        let (verdict, text) = run(libc::ENOENT, Path::new(""), &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("empty string"));
        assert!(text.contains("\".\""));
    }

    #[test]
    fn test_missing_intermediate_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("no")).unwrap();
        let path = tmp.path().join("no/such/dir/file");
        let fc = FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_READ);
        let (verdict, text) = run(libc::ENOENT, &path, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("there is no \"such\" directory"), "{text}");
        assert!(text.contains(&format!("{}/no\" directory", tmp.path().display())));
        assert!(!text.contains("\"file\""));
    }

    #[test]
    fn test_must_not_exist() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("present");
        std::fs::write(&path, b"").unwrap();
        let fc = FinalComponent::new(Want::MUST_NOT_EXIST | Want::WANT_TO_CREATE).with_mode(S_IFDIR);
        let (verdict, text) = run(libc::EEXIST, &path, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("already exists"));
        assert!(text.contains("a regular file named \"present\""));
        assert!(text.contains("it is not a directory"));
    }

    #[test]
    fn test_non_directory_prefix() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("plain"), b"").unwrap();
        let path = tmp.path().join("plain/leaf");
        let fc = FinalComponent::new(Want::MUST_EXIST);
        let (verdict, text) = run(libc::ENOTDIR, &path, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("the \"plain\" regular file"));
        assert!(text.contains("being used as a directory"));
        assert!(!text.contains("leaf"));
    }

    #[test]
    fn test_symlink_loop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        std::os::unix::fs::symlink(&b, &a).unwrap();
        std::os::unix::fs::symlink(&a, &b).unwrap();
        let fc = FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_READ);
        let (verdict, text) = run(libc::ELOOP, &a, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("too many symbolic links"));

        // Not following the final link means no loop at all.
        let (verdict, _) = run(libc::ELOOP, &a, &fc.clone().nofollow());
        assert_eq!(verdict, Verdict::Inconclusive);
    }

    #[test]
    fn test_permission_fidelity() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let path = tmp.path().join("secret");
        std::fs::write(&path, b"x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        let owner = fs::stat(&path).unwrap();
        let stranger = Identity::with_ids(
            owner.uid.wrapping_add(4242),
            owner.gid.wrapping_add(4242),
            vec![],
            IdKind::Real,
        );
        let fc = FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_READ).with_identity(stranger);

        let (verdict, text) = run(libc::EACCES, &path, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("does not have read permission"), "{text}");

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o604)).unwrap();
        let (verdict, text) = run(libc::EACCES, &path, &fc);
        assert_eq!(verdict, Verdict::Inconclusive);
        assert!(text.is_empty());
    }

    #[test]
    fn test_race_is_inconclusive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("there");
        std::fs::write(&path, b"").unwrap();
        let fc = FinalComponent::new(Want::MUST_EXIST);
        let (verdict, text) = run(libc::ENOENT, &path, &fc);
        assert_eq!(verdict, Verdict::Inconclusive);
        assert!(text.is_empty());
    }

    #[test]
    fn test_name_too_long() {
        let long = "x".repeat(NAME_MAX + 1);
        let path = PathBuf::from(format!("/tmp/{long}"));
        let fc = FinalComponent::new(Want::MUST_EXIST);
        let (verdict, text) = run(libc::ENAMETOOLONG, &path, &fc);
        assert!(verdict.is_explained());
        assert!(text.contains("(256 > 255)"));
    }
}
