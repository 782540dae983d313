//! Argument formatters for system call descriptions.
//!
//! Each writes one argument value the way a reader would write it in C:
//! symbolic flag names joined by `|`, file descriptors annotated with what
//! they refer to, pointers in hex (and never dereferenced unless they have
//! been checked first).

use core::fmt::Write;
use std::os::unix::io::RawFd;
use std::path::Path;

use bitflags::Flags;
use nix::fcntl::{AtFlags, OFlag};
use nix::libc;
use nix::sys::socket::SockFlag;
use nix::unistd::AccessFlags;

use crate::buffer::Buffer;
use crate::fs;
use crate::fs::mode::print_mode_arg;
use crate::probe::pointer::is_efault;

/// A row of a flag table: the bits and their name.
pub type FlagName = (i64, &'static str);

/// Names nix also defines for bits that have a better-known name.
pub const OPEN_ALIASES: &[&str] = &["O_ACCMODE", "O_RDONLY", "O_WRONLY", "O_RDWR", "O_NDELAY", "O_FSYNC", "O_RSYNC"];
pub const AT_ALIASES: &[&str] = &["AT_EACCESS"];

/// The flag table of a nix flag type, wider flags first so that `O_SYNC` is
/// not printed as `O_DSYNC` plus a remainder. `aliases` are left out.
pub fn table_of<F>(aliases: &[&str]) -> Vec<FlagName>
where
    F: Flags,
    F::Bits: Into<i64>,
{
    let mut table: Vec<FlagName> = F::FLAGS
        .iter()
        .filter(|flag| flag.is_named() && !aliases.contains(&flag.name()))
        .map(|flag| (flag.value().bits().into(), flag.name()))
        .collect();
    table.sort_by_key(|&(bits, _)| core::cmp::Reverse(bits.count_ones()));
    table
}

/// The bits of one flag name of `F`, case-insensitively.
pub fn flag_value<F>(name: &str) -> Option<i64>
where
    F: Flags,
    F::Bits: Into<i64>,
{
    F::from_name(&name.to_ascii_uppercase()).map(|flag| flag.bits().into())
}

pub fn open_flag_value(name: &str) -> Option<i64> {
    flag_value::<OFlag>(name)
}

pub fn access_mode_value(name: &str) -> Option<i64> {
    flag_value::<AccessFlags>(name)
}

pub fn at_flag_value(name: &str) -> Option<i64> {
    flag_value::<AtFlags>(name)
}

pub fn accept_flag_value(name: &str) -> Option<i64> {
    flag_value::<SockFlag>(name)
}

pub fn mode_value(name: &str) -> Option<i64> {
    flag_value::<nix::sys::stat::Mode>(name)
}

/// Write `value` with the names nix gives `F`.
pub fn named<F>(out: &mut Buffer, value: i64, zero: Option<&str>, aliases: &[&str])
where
    F: Flags,
    F::Bits: Into<i64>,
{
    flags(out, value, &table_of::<F>(aliases), zero);
}

/// Write `value` as `NAME | NAME | 0x40`, rows matched greedily in order.
///
/// `zero` is printed when `value` is 0 (`"0"` when `None`).
pub fn flags(out: &mut Buffer, value: i64, table: &[FlagName], zero: Option<&str>) {
    if value == 0 {
        out.puts(zero.unwrap_or("0"));
        return;
    }
    let mut rest = value;
    let mut first = true;
    for &(bits, name) in table {
        if bits != 0 && rest & bits == bits {
            if !first {
                out.puts(" | ");
            }
            out.puts(name);
            rest &= !bits;
            first = false;
        }
    }
    if rest != 0 {
        if !first {
            out.puts(" | ");
        }
        let _ = write!(out, "{rest:#x}");
    }
}

/// A file descriptor and, when known, the file it refers to.
pub fn fd(out: &mut Buffer, fd: RawFd) {
    let _ = write!(out, "{fd}");
    if let Some(path) = fs::fd_path(fd) {
        out.putc(' ');
        out.puts_quoted_os(path.as_os_str());
    }
}

/// A directory descriptor of the `*at` calls.
pub fn dirfd(out: &mut Buffer, dirfd: RawFd) {
    if dirfd == libc::AT_FDCWD {
        out.puts("AT_FDCWD");
    } else {
        fd(out, dirfd);
    }
}

pub fn path(out: &mut Buffer, path: &Path) {
    out.puts_quoted_os(path.as_os_str());
}

pub fn pointer<T>(out: &mut Buffer, ptr: *const T) {
    if ptr.is_null() {
        out.puts("NULL");
    } else {
        let _ = write!(out, "{ptr:p}");
    }
}

/// `access(2)` mode: `F_OK` or a combination of `R_OK`, `W_OK`, `X_OK`.
pub fn access_mode(out: &mut Buffer, mode: i32) {
    named::<AccessFlags>(out, i64::from(mode), Some("F_OK"), &[]);
}

/// `open(2)` flags: the access mode, then the other bits.
pub fn open_flags(out: &mut Buffer, value: i32) {
    let acc = match value & libc::O_ACCMODE {
        libc::O_RDONLY => "O_RDONLY",
        libc::O_WRONLY => "O_WRONLY",
        libc::O_RDWR => "O_RDWR",
        _ => "3",
    };
    out.puts(acc);
    let rest = i64::from(value & !libc::O_ACCMODE);
    if rest != 0 {
        out.puts(" | ");
        named::<OFlag>(out, rest, None, OPEN_ALIASES);
    }
}

pub const WHENCE: &[(i32, &str)] = &[
    (libc::SEEK_SET, "SEEK_SET"),
    (libc::SEEK_CUR, "SEEK_CUR"),
    (libc::SEEK_END, "SEEK_END"),
    (libc::SEEK_DATA, "SEEK_DATA"),
    (libc::SEEK_HOLE, "SEEK_HOLE"),
];

/// `lseek(2)` whence.
pub fn whence(out: &mut Buffer, whence: i32) {
    match WHENCE.iter().find(|&&(value, _)| value == whence) {
        Some(&(_, name)) => out.puts(name),
        None => {
            let _ = write!(out, "{whence}");
        }
    }
}

/// The value of a `SEEK_*` name, case-insensitively.
pub fn whence_value(name: &str) -> Option<i32> {
    WHENCE
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|&(value, _)| value)
}

/// `accept4(2)` flags.
pub fn accept_flags(out: &mut Buffer, value: i32) {
    named::<SockFlag>(out, i64::from(value), None, &[]);
}

/// `*at(2)` flags.
pub fn at_flags(out: &mut Buffer, value: i32) {
    named::<AtFlags>(out, i64::from(value), None, AT_ALIASES);
}

/// A permission mode argument, `S_IRWXU | S_IRGRP | ...`.
pub fn mode(out: &mut Buffer, value: u32) {
    print_mode_arg(out, value);
}

/// One `timespec`, spelling out the `UTIME_*` specials.
pub fn timespec(out: &mut Buffer, ts: &libc::timespec) {
    match ts.tv_nsec {
        libc::UTIME_NOW => out.puts("UTIME_NOW"),
        libc::UTIME_OMIT => out.puts("UTIME_OMIT"),
        nsec => {
            let _ = write!(out, "{{ {}, {} }}", ts.tv_sec, nsec);
        }
    }
}

/// The `times` array of `utimensat(2)`, checked before it is read.
pub fn timespec_pair(out: &mut Buffer, times: *const libc::timespec) {
    if times.is_null() {
        out.puts("NULL");
        return;
    }
    let size = 2 * core::mem::size_of::<libc::timespec>();
    if is_efault(times.cast(), size) {
        pointer(out, times);
        return;
    }
    // SAFETY: is_efault showed both elements are readable.
    let pair = unsafe { &*times.cast::<[libc::timespec; 2]>() };
    out.putc('{');
    timespec(out, &pair[0]);
    out.puts(", ");
    timespec(out, &pair[1]);
    out.putc('}');
}

/// A signed integer argument.
pub fn int(out: &mut Buffer, value: i64) {
    let _ = write!(out, "{value}");
}

/// A size argument.
pub fn size(out: &mut Buffer, value: usize) {
    let _ = write!(out, "{value}");
}
