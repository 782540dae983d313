//! POSIX file mode bits and the words used for file types in explanations.

use core::fmt::Write;

use nix::libc;
use nix::sys::stat::Mode;

use crate::buffer::Buffer;
use crate::format::table_of;

// ============================================================================
// File Type Constants (high bits of st_mode)
// ============================================================================

/// Bit mask for extracting file type
pub const S_IFMT: u32 = libc::S_IFMT as u32;
pub const S_IFSOCK: u32 = libc::S_IFSOCK as u32;
pub const S_IFLNK: u32 = libc::S_IFLNK as u32;
pub const S_IFREG: u32 = libc::S_IFREG as u32;
pub const S_IFBLK: u32 = libc::S_IFBLK as u32;
pub const S_IFDIR: u32 = libc::S_IFDIR as u32;
pub const S_IFCHR: u32 = libc::S_IFCHR as u32;
pub const S_IFIFO: u32 = libc::S_IFIFO as u32;

// ============================================================================
// Permission Bits (low bits of st_mode)
// ============================================================================

const fn bits(mode: Mode) -> u32 {
    mode.bits() as u32
}

pub const S_ISUID: u32 = bits(Mode::S_ISUID);
pub const S_ISGID: u32 = bits(Mode::S_ISGID);
/// Sticky bit; on a directory, restricts unlink/rename to owners
pub const S_ISVTX: u32 = bits(Mode::S_ISVTX);
pub const S_IRUSR: u32 = bits(Mode::S_IRUSR);
pub const S_IWUSR: u32 = bits(Mode::S_IWUSR);
pub const S_IXUSR: u32 = bits(Mode::S_IXUSR);
pub const S_IRGRP: u32 = bits(Mode::S_IRGRP);
pub const S_IWGRP: u32 = bits(Mode::S_IWGRP);
pub const S_IXGRP: u32 = bits(Mode::S_IXGRP);
pub const S_IROTH: u32 = bits(Mode::S_IROTH);
pub const S_IWOTH: u32 = bits(Mode::S_IWOTH);
pub const S_IXOTH: u32 = bits(Mode::S_IXOTH);

/// Shifts that bring each class's `rwx` bits down to the low three bits
pub const S_IRWXU_SHIFT: u32 = 6;
pub const S_IRWXG_SHIFT: u32 = 3;
pub const S_IRWXO_SHIFT: u32 = 0;

#[inline]
pub const fn is_dir(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFDIR
}

#[inline]
pub const fn is_lnk(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFLNK
}

/// The kind of object a mode describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    BlockDevice,
    CharDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileKind {
    pub const fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileKind::Regular,
            S_IFDIR => FileKind::Directory,
            S_IFLNK => FileKind::Symlink,
            S_IFBLK => FileKind::BlockDevice,
            S_IFCHR => FileKind::CharDevice,
            S_IFIFO => FileKind::Fifo,
            S_IFSOCK => FileKind::Socket,
            _ => FileKind::Unknown,
        }
    }

    /// The words used in explanations: "regular file", "directory", ...
    pub const fn name(self) -> &'static str {
        match self {
            FileKind::Regular => "regular file",
            FileKind::Directory => "directory",
            FileKind::Symlink => "symbolic link",
            FileKind::BlockDevice => "block special device",
            FileKind::CharDevice => "character special device",
            FileKind::Fifo => "named pipe",
            FileKind::Socket => "socket",
            FileKind::Unknown => "file",
        }
    }

    /// Same as [`FileKind::name`] with the indefinite article.
    pub const fn with_article(self) -> &'static str {
        match self {
            FileKind::Regular => "a regular file",
            FileKind::Directory => "a directory",
            FileKind::Symlink => "a symbolic link",
            FileKind::BlockDevice => "a block special device",
            FileKind::CharDevice => "a character special device",
            FileKind::Fifo => "a named pipe",
            FileKind::Socket => "a socket",
            FileKind::Unknown => "a file",
        }
    }

    pub const fn is_device(self) -> bool {
        matches!(self, FileKind::BlockDevice | FileKind::CharDevice)
    }
}

/// Write a permission value the way `ls -l` prints it, e.g. `rwxr-x---`.
pub fn print_rwx(out: &mut Buffer, mode: u32) {
    const BITS: [(u32, char); 9] = [
        (S_IRUSR, 'r'),
        (S_IWUSR, 'w'),
        (S_IXUSR, 'x'),
        (S_IRGRP, 'r'),
        (S_IWGRP, 'w'),
        (S_IXGRP, 'x'),
        (S_IROTH, 'r'),
        (S_IWOTH, 'w'),
        (S_IXOTH, 'x'),
    ];
    for (bit, c) in BITS {
        out.putc(if mode & bit != 0 { c } else { '-' });
    }
}

/// Write a mode argument symbolically, e.g. `S_IRWXU | S_IRGRP | 05`; bits
/// without a name are printed in octal.
pub fn print_mode_arg(out: &mut Buffer, mode: u32) {
    let mut rest = i64::from(mode);
    let mut first = true;
    for (bits, name) in table_of::<Mode>(&[]) {
        if bits != 0 && rest & bits == bits {
            if !first {
                out.puts(" | ");
            }
            out.puts(name);
            rest &= !bits;
            first = false;
        }
    }
    if rest != 0 || first {
        if !first {
            out.puts(" | ");
        }
        if rest == 0 {
            out.putc('0');
        } else {
            let _ = write!(out, "0{rest:o}");
        }
    }
}
