//! The built-in ioctl descriptors.

use core::ffi::c_void;
use core::fmt::Write;
use std::os::unix::io::RawFd;

use nix::libc;

use super::{is_socket, is_tty, Direction, IoControl};
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::{self, mode::FileKind};
use crate::options::Options;

/// The kernel takes the request as an unsigned int; widen without sign extension.
pub(crate) const fn request(code: libc::Ioctl) -> u64 {
    code as u32 as u64
}

const TCGETS: u64 = request(libc::TCGETS);
const TCSETS: u64 = request(libc::TCSETS);
const TIOCOUTQ: u64 = request(libc::TIOCOUTQ);
const TIOCGWINSZ: u64 = request(libc::TIOCGWINSZ);
const TIOCSWINSZ: u64 = request(libc::TIOCSWINSZ);
const FIONREAD: u64 = request(libc::FIONREAD);
const FIONBIO: u64 = request(libc::FIONBIO);
const FIONCLEX: u64 = request(libc::FIONCLEX);
const FIOCLEX: u64 = request(libc::FIOCLEX);
const FIOASYNC: u64 = request(libc::FIOASYNC);
const BLKSSZGET: u64 = request(libc::BLKSSZGET);
const BLKROGET: u64 = request(nix::request_code_none!(0x12, 94));
const BLKGETSIZE64: u64 = request(nix::request_code_read!(0x12, 114, core::mem::size_of::<usize>()));
const FS_IOC_GETFLAGS: u64 = request(nix::request_code_read!(b'f', 1, core::mem::size_of::<libc::c_long>()));

const INT: usize = core::mem::size_of::<libc::c_int>();
const LONG: usize = core::mem::size_of::<libc::c_long>();

/// Fill in the defaults shared by most rows.
const fn entry(name: &'static str, number: u64, direction: Direction, data_size: usize, data_type: &'static str) -> IoControl {
    IoControl {
        name,
        number,
        disambiguate: None,
        direction,
        data_size,
        data_type,
        explain: None,
    }
}

pub static TABLE: &[IoControl] = &[
    IoControl {
        explain: Some(not_a_terminal),
        ..entry("TCGETS", TCGETS, Direction::Read, core::mem::size_of::<libc::termios>(), "struct termios")
    },
    IoControl {
        explain: Some(not_a_terminal),
        ..entry("TCSETS", TCSETS, Direction::Write, core::mem::size_of::<libc::termios>(), "struct termios")
    },
    IoControl {
        explain: Some(not_a_terminal),
        ..entry("TIOCGWINSZ", TIOCGWINSZ, Direction::Read, core::mem::size_of::<libc::winsize>(), "struct winsize")
    },
    IoControl {
        explain: Some(not_a_terminal),
        ..entry("TIOCSWINSZ", TIOCSWINSZ, Direction::Write, core::mem::size_of::<libc::winsize>(), "struct winsize")
    },
    entry("FIONREAD", FIONREAD, Direction::Read, INT, "int"),
    IoControl {
        disambiguate: Some(is_tty),
        explain: Some(not_a_terminal),
        ..entry("TIOCINQ", FIONREAD, Direction::Read, INT, "int")
    },
    IoControl {
        disambiguate: Some(is_socket),
        explain: Some(socket_queue),
        ..entry("SIOCINQ", FIONREAD, Direction::Read, INT, "int")
    },
    IoControl {
        explain: Some(not_a_terminal),
        ..entry("TIOCOUTQ", TIOCOUTQ, Direction::Read, INT, "int")
    },
    IoControl {
        disambiguate: Some(is_socket),
        explain: Some(socket_queue),
        ..entry("SIOCOUTQ", TIOCOUTQ, Direction::Read, INT, "int")
    },
    entry("FIONBIO", FIONBIO, Direction::Write, INT, "int"),
    entry("FIONCLEX", FIONCLEX, Direction::None, 0, "void"),
    entry("FIOCLEX", FIOCLEX, Direction::None, 0, "void"),
    entry("FIOASYNC", FIOASYNC, Direction::Write, INT, "int"),
    IoControl {
        explain: Some(not_a_block_device),
        ..entry("BLKROGET", BLKROGET, Direction::Read, INT, "int")
    },
    IoControl {
        explain: Some(not_a_block_device),
        ..entry("BLKSSZGET", BLKSSZGET, Direction::Read, INT, "int")
    },
    IoControl {
        explain: Some(not_a_block_device),
        ..entry("BLKGETSIZE64", BLKGETSIZE64, Direction::Read, 8, "uint64_t")
    },
    IoControl {
        explain: Some(no_inode_flags),
        ..entry("FS_IOC_GETFLAGS", FS_IOC_GETFLAGS, Direction::Read, LONG, "long")
    },
];

fn print_fd_kind(out: &mut Buffer, fd: RawFd) -> Option<FileKind> {
    let kind = fs::fstat(fd).ok()?.kind();
    let _ = write!(out, "the fildes argument ({fd}) refers to {}", kind.with_article());
    Some(kind)
}

fn not_a_terminal(out: &mut Buffer, _opts: &Options, errnum: Errno, fd: RawFd, _data: *const c_void) -> bool {
    if errnum.0 != libc::ENOTTY {
        return false;
    }
    if print_fd_kind(out, fd).is_none() {
        return false;
    }
    out.puts(", not a terminal");
    true
}

fn not_a_block_device(out: &mut Buffer, _opts: &Options, errnum: Errno, fd: RawFd, _data: *const c_void) -> bool {
    if errnum.0 != libc::ENOTTY {
        return false;
    }
    match print_fd_kind(out, fd) {
        Some(FileKind::BlockDevice) => {
            out.puts(", but its driver does not support this request");
            true
        }
        Some(_) => {
            out.puts(", not a block special device");
            true
        }
        None => false,
    }
}

fn socket_queue(out: &mut Buffer, _opts: &Options, errnum: Errno, fd: RawFd, _data: *const c_void) -> bool {
    if errnum.0 != libc::EINVAL {
        return false;
    }
    let _ = write!(out, "the fildes argument ({fd}) refers to a socket that is listening, ");
    out.puts("listening sockets have no data queue");
    fs::socket_is_listening(fd).unwrap_or(false)
}

fn no_inode_flags(out: &mut Buffer, _opts: &Options, errnum: Errno, fd: RawFd, _data: *const c_void) -> bool {
    if errnum.0 != libc::ENOTTY {
        return false;
    }
    let _ = write!(
        out,
        "the file system holding the fildes argument ({fd}) does not support inode flags"
    );
    if let Some(m) = crate::probe::mount_point_fd(fd) {
        let _ = write!(out, " ({} on ", m.fs_type);
        out.puts_quoted_os(m.point.as_os_str());
        out.putc(')');
    }
    true
}
