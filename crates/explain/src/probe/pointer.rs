//! Is this pointer readable?
//!
//! The kernel, not a signal handler, does the checking: one byte from every
//! page the range touches is written into a pipe. `write(2)` copies from user
//! memory and fails with `EFAULT` instead of faulting the process.

use nix::libc;
use std::os::fd::AsRawFd;

use crate::errno::{Errno, ErrnoGuard};

const PAGE: usize = 4096;

/// Whether any byte of `ptr..ptr+len` is outside the readable address space.
pub fn is_efault(ptr: *const u8, len: usize) -> bool {
    if ptr.is_null() {
        return true;
    }
    if len == 0 {
        return false;
    }
    let _guard = ErrnoGuard::new();
    let Ok((rd, wr)) = nix::unistd::pipe() else {
        log::debug!("is_efault: no pipe, assuming {ptr:p} is readable");
        return false;
    };

    let start = ptr as usize;
    let Some(end) = start.checked_add(len - 1) else {
        return true;
    };
    let mut addr = start;
    loop {
        if probe_byte(rd.as_raw_fd(), wr.as_raw_fd(), addr) {
            return true;
        }
        if addr >= end {
            return false;
        }
        // Next page start, or the last byte.
        addr = ((addr / PAGE) + 1).saturating_mul(PAGE).min(end);
    }
}

/// Whether the NUL-terminated string at `ptr` runs into unreadable memory
/// within `max` bytes.
pub fn is_efault_str(ptr: *const libc::c_char, max: usize) -> bool {
    let mut p = ptr.cast::<u8>();
    for _ in 0..max {
        if is_efault(p, 1) {
            return true;
        }
        // SAFETY: the byte at p was just shown to be readable.
        if unsafe { *p } == 0 {
            return false;
        }
        p = p.wrapping_add(1);
    }
    false
}

fn probe_byte(rd: i32, wr: i32, addr: usize) -> bool {
    // SAFETY: write(2) reads one byte at addr from user space on our behalf and
    // reports EFAULT rather than faulting when the address is not mapped.
    let n = unsafe { libc::write(wr, addr as *const libc::c_void, 1) };
    if n < 0 {
        return Errno::last().0 == libc::EFAULT;
    }
    let mut sink = 0u8;
    // SAFETY: sink is a valid one-byte buffer; drains the byte just written.
    unsafe { libc::read(rd, (&mut sink as *mut u8).cast(), 1) };
    false
}
