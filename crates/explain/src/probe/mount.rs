//! Which file system a path or descriptor lives on.
//!
//! Mount points come from `/proc/self/mountinfo`, matched by device number.
//! When several mounts share a device (bind mounts) the longest mount point
//! that is a prefix of the path wins.

use std::os::unix::ffi::OsStringExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use nix::sys::stat::{major, minor};

use crate::errno::ErrnoGuard;
use crate::fs::{self, Stat};

const MOUNTINFO: &str = "/proc/self/mountinfo";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mount {
    pub point: PathBuf,
    pub fs_type: String,
    pub source: String,
    pub read_only: bool,
    pub major: u64,
    pub minor: u64,
}

/// Space and inode counts from `statvfs`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Usage {
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_available: u64,
}

impl Usage {
    /// Percentage of blocks in use, as `df` reports it.
    pub fn percent_used(&self) -> u64 {
        if self.blocks == 0 {
            return 0;
        }
        let used = self.blocks.saturating_sub(self.blocks_available);
        used.saturating_mul(100) / self.blocks
    }

    pub fn out_of_inodes(&self) -> bool {
        self.files > 0 && self.files_available == 0
    }
}

impl Mount {
    pub fn usage(&self) -> Option<Usage> {
        let _guard = ErrnoGuard::new();
        let vfs = nix::sys::statvfs::statvfs(&self.point).ok()?;
        Some(Usage {
            block_size: vfs.fragment_size() as u64,
            blocks: vfs.blocks() as u64,
            blocks_available: vfs.blocks_available() as u64,
            files: vfs.files() as u64,
            files_available: vfs.files_available() as u64,
        })
    }
}

/// The mount holding `path`, or holding its nearest existing ancestor when
/// `path` itself does not exist yet.
pub fn mount_point(path: &Path) -> Option<Mount> {
    let (here, st) = fs::existing_ancestor(path)?;
    let absolute = absolute(here);
    best_match(&read_mounts()?, &st, absolute.as_deref())
}

/// The mount holding whatever `fd` refers to.
pub fn mount_point_fd(fd: RawFd) -> Option<Mount> {
    let st = fs::fstat(fd).ok()?;
    let path = fs::fd_path(fd).filter(|p| p.is_absolute());
    best_match(&read_mounts()?, &st, path.as_deref())
}

fn absolute(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let _guard = ErrnoGuard::new();
    std::env::current_dir().ok().map(|cwd| cwd.join(path))
}

fn read_mounts() -> Option<Vec<Mount>> {
    let _guard = ErrnoGuard::new();
    match std::fs::read_to_string(MOUNTINFO) {
        Ok(text) => Some(parse_mountinfo(&text)),
        Err(e) => {
            log::debug!("mount: cannot read {MOUNTINFO}: {e}");
            None
        }
    }
}

fn best_match(mounts: &[Mount], st: &Stat, path: Option<&Path>) -> Option<Mount> {
    let dev = (major(st.dev), minor(st.dev));
    let same_device = || mounts.iter().filter(move |m| (m.major, m.minor) == dev);
    let covers = |m: &&Mount| path.map_or(true, |p| p.starts_with(&m.point));

    same_device()
        .filter(covers)
        .max_by_key(|m| m.point.as_os_str().len())
        .or_else(|| same_device().next())
        .or_else(|| {
            let p = path?;
            mounts
                .iter()
                .filter(|m| p.starts_with(&m.point))
                .max_by_key(|m| m.point.as_os_str().len())
        })
        .cloned()
}

/// Parse the text of a `mountinfo` file.
///
/// Lines look like
/// `36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue`.
pub fn parse_mountinfo(text: &str) -> Vec<Mount> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Mount> {
    let (left, right) = line.split_once(" - ")?;
    let mut fields = left.split(' ');
    let _id = fields.next()?;
    let _parent = fields.next()?;
    let (major, minor) = fields.next()?.split_once(':')?;
    let _root = fields.next()?;
    let point = fields.next()?;
    let mount_opts = fields.next()?;

    let mut right = right.split(' ');
    let fs_type = right.next()?;
    let source = right.next().unwrap_or("none");
    let super_opts = right.next().unwrap_or("");

    let ro = |opts: &str| opts.split(',').any(|o| o == "ro");
    Some(Mount {
        point: PathBuf::from(std::ffi::OsString::from_vec(unescape(point))),
        fs_type: fs_type.to_string(),
        source: String::from_utf8_lossy(&unescape(source)).into_owned(),
        read_only: ro(mount_opts) || ro(super_opts),
        major: major.parse().ok()?,
        minor: minor.parse().ok()?,
    })
}

/// Undo the `\040`-style octal escapes the kernel uses for spaces and tabs.
fn unescape(field: &str) -> Vec<u8> {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 4 <= bytes.len()
            && bytes[i + 1..i + 4].iter().all(|b| (b'0'..=b'7').contains(b))
        {
            let v = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push((v & 0xff) as u8);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
22 1 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw,errors=remount-ro
40 22 0:35 / /proc rw,nosuid,nodev,noexec,relatime shared:13 - proc proc rw
51 22 8:2 / /home rw,relatime shared:30 - ext4 /dev/sda2 rw
52 22 8:2 /srv /mnt/with\\040space ro,relatime shared:31 - ext4 /dev/sda2 rw
";

    fn stat_on(major: u64, minor: u64) -> Stat {
        Stat {
            dev: nix::sys::stat::makedev(major, minor),
            ino: 1,
            mode: 0,
            nlink: 1,
            uid: 0,
            gid: 0,
            rdev: 0,
            size: 0,
        }
    }

    #[test]
    fn test_parse() {
        let mounts = parse_mountinfo(SAMPLE);
        assert_eq!(mounts.len(), 4);
        assert_eq!(mounts[0].point, PathBuf::from("/"));
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[0].source, "/dev/sda1");
        assert!(!mounts[0].read_only);
        assert_eq!(mounts[3].point, PathBuf::from("/mnt/with space"));
        assert!(mounts[3].read_only);
    }

    #[test]
    fn test_longest_prefix_wins_among_same_device() {
        let mounts = parse_mountinfo(SAMPLE);
        let st = stat_on(8, 2);
        let m = best_match(&mounts, &st, Some(Path::new("/mnt/with space/x"))).unwrap();
        assert_eq!(m.point, PathBuf::from("/mnt/with space"));
        let m = best_match(&mounts, &st, Some(Path::new("/home/user/x"))).unwrap();
        assert_eq!(m.point, PathBuf::from("/home"));
    }

    #[test]
    fn test_unknown_device_falls_back_to_path() {
        let mounts = parse_mountinfo(SAMPLE);
        let m = best_match(&mounts, &stat_on(99, 9), Some(Path::new("/proc/1"))).unwrap();
        assert_eq!(m.point, PathBuf::from("/proc"));
        assert!(best_match(&mounts, &stat_on(99, 9), None).is_none());
    }

    #[test]
    fn test_bare_relative_name_uses_cwd() {
        let name = Path::new("no-such-entry-for-mount-lookup");
        let here = mount_point(Path::new("."));
        assert_eq!(mount_point(name), here);
        if let Some(m) = here {
            assert!(m.point.is_absolute());
        }
    }

    #[test]
    fn test_live_root() {
        if let Some(m) = mount_point(Path::new("/")) {
            assert!(m.point.is_absolute());
        }
    }

    #[test]
    fn test_usage_percent() {
        let u = Usage {
            block_size: 4096,
            blocks: 200,
            blocks_available: 0,
            files: 10,
            files_available: 0,
        };
        assert_eq!(u.percent_used(), 100);
        assert!(u.out_of_inodes());
    }
}
