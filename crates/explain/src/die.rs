//! Call, and on failure explain on stderr and exit.
//!
//! `mkdir_or_die("/srv/data", 0o755)` either succeeds or prints
//!
//! ```text
//! prog: mkdir(pathname = "/srv/data", mode = ...) failed, Permission denied
//! (13, EACCES) because ...
//! ```
//!
//! and exits with `EXIT_FAILURE`. The program name prefix and the wrapping
//! follow the `program-name` and `hanging-indent` options.

use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use nix::fcntl::{self, AtFlags, OFlag, AT_FDCWD};
use nix::libc;
use nix::sys::stat::Mode;
use nix::unistd::{self, AccessFlags, UnlinkatFlags, Whence};

use crate::assemble::{Diagnostic, Explainable};
use crate::errno::Errno;
use crate::options::{options, Options};
use crate::syscall;

/// Width `_or_die` messages are wrapped to when a hanging indent is set.
pub const LINE_WIDTH: usize = 80;

fn program_name() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    let name = Path::new(&arg0).file_name()?;
    Some(name.to_string_lossy().into_owned())
}

/// The text `_or_die` prints, without the trailing newline.
pub fn render(opts: &Options, program: Option<&str>, diagnostic: &Diagnostic) -> String {
    let mut text = String::new();
    if let (true, Some(name)) = (opts.program_name, program) {
        text.push_str(name);
        text.push_str(": ");
    }
    text.push_str(&diagnostic.to_string());
    if opts.hanging_indent == 0 {
        text
    } else {
        wrap(&text, LINE_WIDTH, opts.hanging_indent)
    }
}

/// Break `text` into lines of at most `width` columns at spaces; every line
/// after the first starts with `indent` spaces. Words longer than a line are
/// left whole.
pub fn wrap(text: &str, width: usize, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::with_capacity(text.len() + text.len() / width.max(1) * (indent + 1));
    let mut col = 0;
    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let len = word.chars().count();
        if col > 0 && col + 1 + len > width {
            out.push('\n');
            out.push_str(&pad);
            col = indent;
        } else if col > 0 {
            out.push(' ');
            col += 1;
        }
        out.push_str(word);
        col += len;
    }
    out
}

/// Print the explanation of `call` failing with `code` and exit.
pub fn die<C: Explainable>(code: C::Code, call: &C) -> ! {
    let diagnostic = crate::explain_errno(code, call);
    let opts = options();
    eprintln!("{}", render(opts, program_name().as_deref(), &diagnostic));
    std::process::exit(libc::EXIT_FAILURE)
}

/// Unwrap `result`, or explain `call` and exit.
pub fn or_die<T, C: Explainable<Code = Errno>>(result: nix::Result<T>, call: &C) -> T {
    match result {
        Ok(value) => value,
        Err(e) => die(Errno(e as i32), call),
    }
}

pub fn access_or_die(pathname: &Path, mode: AccessFlags) {
    let result = unistd::access(pathname, mode);
    or_die(result, &syscall::Access::new(pathname, mode.bits()));
}

pub fn chdir_or_die(pathname: &Path) {
    or_die(unistd::chdir(pathname), &syscall::Chdir::new(pathname));
}

/// Close `fildes`, which is consumed either way.
pub fn close_or_die(fildes: OwnedFd) {
    let raw = fildes.as_raw_fd();
    or_die(unistd::close(fildes), &syscall::Close::new(raw));
}

pub fn getcwd_or_die() -> PathBuf {
    // nix grows its own buffer, which reads as getcwd(NULL, 0).
    or_die(unistd::getcwd(), &syscall::Getcwd::new(core::ptr::null(), 0))
}

pub fn link_or_die(oldpath: &Path, newpath: &Path) {
    let result = unistd::linkat(AT_FDCWD, oldpath, AT_FDCWD, newpath, AtFlags::empty());
    or_die(result, &syscall::Link::new(oldpath, newpath));
}

pub fn lseek_or_die<Fd: AsFd>(fildes: Fd, offset: i64, whence: Whence) -> i64 {
    let raw = fildes.as_fd().as_raw_fd();
    let result = unistd::lseek(fildes, offset as libc::off_t, whence);
    i64::from(or_die(result, &syscall::Lseek::new(raw, offset, whence as i32)))
}

pub fn mkdir_or_die(pathname: &Path, mode: Mode) {
    let result = unistd::mkdir(pathname, mode);
    or_die(result, &syscall::Mkdir::new(pathname, u32::from(mode.bits())));
}

pub fn open_or_die(pathname: &Path, flags: OFlag, mode: Mode) -> OwnedFd {
    let result = fcntl::open(pathname, flags, mode);
    or_die(result, &syscall::Open::new(pathname, flags.bits(), u32::from(mode.bits())))
}

pub fn read_or_die<Fd: AsFd>(fildes: Fd, data: &mut [u8]) -> usize {
    let raw = fildes.as_fd().as_raw_fd();
    let (ptr, len) = (data.as_ptr(), data.len());
    or_die(unistd::read(fildes, data), &syscall::Read::new(raw, ptr, len))
}

pub fn rename_or_die(oldpath: &Path, newpath: &Path) {
    let result = fcntl::renameat(AT_FDCWD, oldpath, AT_FDCWD, newpath);
    or_die(result, &syscall::Rename::new(oldpath, newpath));
}

pub fn rmdir_or_die(pathname: &Path) {
    let result = unistd::unlinkat(AT_FDCWD, pathname, UnlinkatFlags::RemoveDir);
    or_die(result, &syscall::Rmdir::new(pathname));
}

pub fn symlink_or_die(oldpath: &Path, newpath: &Path) {
    let result = unistd::symlinkat(oldpath, AT_FDCWD, newpath);
    or_die(result, &syscall::Symlink::new(oldpath, newpath));
}

pub fn unlink_or_die(pathname: &Path) {
    or_die(unistd::unlink(pathname), &syscall::Unlink::new(pathname));
}

pub fn write_or_die<Fd: AsFd>(fildes: Fd, data: &[u8]) -> usize {
    let raw = fildes.as_fd().as_raw_fd();
    let result = unistd::write(fildes, data);
    or_die(result, &syscall::Write::new(raw, data.as_ptr(), data.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::Close;

    #[test]
    fn test_wrap_hanging_indent() {
        let text = "aaaa bbbb cccc dddd";
        assert_eq!(wrap(text, 11, 2), "aaaa bbbb\n  cccc dddd");
        assert_eq!(wrap(text, 80, 4), text);
    }

    #[test]
    fn test_wrap_keeps_long_words() {
        assert_eq!(wrap("abcdefghijkl x", 5, 1), "abcdefghijkl\n x");
    }

    #[test]
    fn test_render_prefix_and_indent() {
        let d = Diagnostic::build(&Options::default(), Errno(libc::EBADF), &Close::new(-1));
        let plain = render(&Options::default(), Some("prog"), &d);
        assert!(plain.starts_with("prog: close(fildes = -1) failed"));
        assert!(!plain.contains('\n'));

        let opts = Options {
            program_name: false,
            hanging_indent: 4,
            ..Options::default()
        };
        let wrapped = render(&opts, Some("prog"), &d);
        assert!(wrapped.starts_with("close("));
        for line in wrapped.lines() {
            assert!(line.chars().count() <= LINE_WIDTH, "{line}");
        }
        assert!(wrapped.lines().skip(1).all(|l| l.starts_with("    ")));
    }

    #[test]
    fn test_success_passes_through() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("made");
        mkdir_or_die(&dir, Mode::from_bits_truncate(0o755));
        assert!(dir.is_dir());
        rmdir_or_die(&dir);
        assert!(!dir.exists());
        assert_eq!(getcwd_or_die(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_descriptor_wrappers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data");
        let fd = open_or_die(&path, OFlag::O_RDWR | OFlag::O_CREAT, Mode::from_bits_truncate(0o600));
        assert_eq!(write_or_die(&fd, b"hello"), 5);
        assert_eq!(lseek_or_die(&fd, 1, Whence::SeekSet), 1);
        let mut buf = [0u8; 8];
        assert_eq!(read_or_die(&fd, &mut buf), 4);
        assert_eq!(&buf[..4], b"ello");
        close_or_die(fd);

        let moved = tmp.path().join("moved");
        rename_or_die(&path, &moved);
        link_or_die(&moved, &path);
        symlink_or_die(&moved, &tmp.path().join("sym"));
        unlink_or_die(&path);
        access_or_die(&moved, AccessFlags::R_OK);
        assert!(!path.exists());
    }
}
