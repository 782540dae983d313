//! Which processes are using a file.
//!
//! Scans `/proc/<pid>/{cwd,exe,root,fd/*}` for links that resolve to the same
//! device and inode. Processes we may not inspect are skipped silently.

use core::fmt::Write;
use std::path::Path;

use crate::buffer::Buffer;
use crate::errno::ErrnoGuard;
use crate::fs::{self, Stat};

pub type Pid = i32;

/// Process IDs holding `target`, in ascending order, or `None` when `/proc`
/// cannot be read at all.
pub fn holders(target: &Stat) -> Option<Vec<Pid>> {
    holders_in(Path::new("/proc"), target)
}

fn holders_in(proc_root: &Path, target: &Stat) -> Option<Vec<Pid>> {
    let _guard = ErrnoGuard::new();
    let entries = match std::fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("holders: cannot read {}: {e}", proc_root.display());
            return None;
        }
    };

    let mut pids: Vec<Pid> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let pid: Pid = entry.file_name().to_str()?.parse().ok()?;
            process_holds(&entry.path(), target).then_some(pid)
        })
        .collect();
    pids.sort_unstable();
    Some(pids)
}

fn process_holds(dir: &Path, target: &Stat) -> bool {
    let refers = |link: &Path| fs::stat(link).is_ok_and(|st| st.same_file(target));

    if ["cwd", "exe", "root"]
        .iter()
        .any(|name| refers(&dir.join(name)))
    {
        return true;
    }
    let Ok(fds) = std::fs::read_dir(dir.join("fd")) else {
        return false;
    };
    fds.filter_map(Result::ok).any(|fd| refers(&fd.path()))
}

/// Write `(pid 123, 456)`.
pub fn print_pids(out: &mut Buffer, pids: &[Pid]) {
    out.puts("(pid");
    for (i, pid) in pids.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        let _ = write!(out, "{sep}{pid}");
    }
    out.putc(')');
}
