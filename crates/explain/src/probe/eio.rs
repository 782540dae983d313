//! Low-level I/O errors, and which device they came from.
//!
//! The device is found by searching `/dev` for a block or character special
//! file whose device number is the one the file lives on (or, for a device
//! node, the one it is). Symbolic links under `/dev` are not followed, the
//! search goes at most eight directories deep, and the shortest matching path
//! wins so `/dev/sda1` is preferred over `/dev/disk/by-id/...`.

use core::fmt::Write;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use nix::libc;
use nix::sys::stat::{major, minor};

use crate::buffer::Buffer;
use crate::errno::ErrnoGuard;
use crate::fs::mode::FileKind;
use crate::fs::{self, Stat};
use crate::options::Options;
use crate::probe::fd::fd_info;

const DEV_ROOT: &str = "/dev";
const MAX_DEPTH: usize = 8;

/// The device a file's I/O goes through.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Device {
    pub path: PathBuf,
    pub kind: FileKind,
    pub rdev: u64,
}

/// The device `st` is stored on or, when it is itself a device node, the
/// device it names.
pub fn device_for(st: &Stat) -> Option<Device> {
    let (rdev, want_block) = match st.kind() {
        FileKind::BlockDevice => (st.rdev, Some(true)),
        FileKind::CharDevice => (st.rdev, Some(false)),
        _ => (st.dev, Some(true)),
    };
    let _guard = ErrnoGuard::new();
    find_device(Path::new(DEV_ROOT), rdev, want_block)
}

/// Search `root` for a device node numbered `rdev`.
pub fn find_device(root: &Path, rdev: u64, want_block: Option<bool>) -> Option<Device> {
    let mut best: Option<Device> = None;
    search(root, rdev, want_block, 0, &mut best);
    best
}

fn search(dir: &Path, rdev: u64, want_block: Option<bool>, depth: usize, best: &mut Option<Device>) {
    if depth > MAX_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let Ok(st) = fs::lstat(&path) else {
            continue;
        };
        let kind = st.kind();
        if kind == FileKind::Directory {
            search(&path, rdev, want_block, depth + 1, best);
            continue;
        }
        let kind_ok = match want_block {
            Some(true) => kind == FileKind::BlockDevice,
            Some(false) => kind == FileKind::CharDevice,
            None => kind.is_device(),
        };
        if !kind_ok || st.rdev != rdev {
            continue;
        }
        let shorter = best
            .as_ref()
            .map_or(true, |b| path.as_os_str().len() < b.path.as_os_str().len());
        if shorter {
            *best = Some(Device { path, kind, rdev });
        }
    }
}

/// `EIO` on a descriptor.
pub fn explain_eio_fd(out: &mut Buffer, opts: &Options, fd: RawFd) {
    out.puts("a low-level I/O error occurred, probably in hardware");
    let Some(info) = fd_info(fd) else {
        return;
    };
    if opts.extra_device_info {
        print_device(out, &info.stat);
    }
    let preceding = match info.flags & libc::O_ACCMODE {
        libc::O_RDONLY => "read(2)",
        libc::O_WRONLY => "write(2)",
        _ => "read(2) or write(2)",
    };
    let _ = write!(out, ", possibly as a result of a preceding {preceding} system call");
}

/// `EIO` on a pathname.
pub fn explain_eio_path(out: &mut Buffer, opts: &Options, path: &Path) {
    out.puts("a low-level I/O error occurred, probably in hardware");
    if !opts.extra_device_info {
        return;
    }
    if let Some((_, st)) = fs::existing_ancestor(path) {
        print_device(out, &st);
    }
}

fn print_device(out: &mut Buffer, st: &Stat) {
    match device_for(st) {
        Some(dev) => {
            let _ = write!(out, " in the {} ", dev.kind.name());
            out.puts_quoted_os(dev.path.as_os_str());
        }
        None if st.dev != 0 => {
            let _ = write!(
                out,
                " on the device numbered {}:{}",
                major(st.dev),
                minor(st.dev)
            );
        }
        None => {}
    }
}
