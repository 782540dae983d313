//! Process credentials and the permission checks the kernel makes with them.

use core::fmt::Write;

use bitflags::bitflags;
use nix::unistd::{Gid, Group, Uid, User};

use crate::buffer::Buffer;
use crate::errno::ErrnoGuard;
use crate::fs::mode::{S_IRWXG_SHIFT, S_IRWXO_SHIFT, S_IRWXU_SHIFT};
use crate::fs::Stat;

bitflags! {
    /// Access a process wants to an inode, in `rwx` bit order.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Access: u32 {
        const READ = 0o4;
        const WRITE = 0o2;
        /// Execute for files, search for directories.
        const EXECUTE = 0o1;
    }
}

/// Which credentials the kernel checks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdKind {
    /// `access(2)` and friends check the real IDs.
    Real,
    Effective,
}

impl IdKind {
    fn word(self) -> &'static str {
        match self {
            IdKind::Real => "real",
            IdKind::Effective => "effective",
        }
    }
}

/// The user and groups a permission check is made for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
    pub kind: IdKind,
}

/// Which of the three permission classes applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Class {
    Owner,
    Group,
    Other,
}

impl Identity {
    /// The real user and group of this process.
    pub fn real() -> Self {
        Self::new(Uid::current().as_raw(), Gid::current().as_raw(), IdKind::Real)
    }

    /// The effective user and group of this process.
    pub fn effective() -> Self {
        Self::new(
            Uid::effective().as_raw(),
            Gid::effective().as_raw(),
            IdKind::Effective,
        )
    }

    fn new(uid: u32, gid: u32, kind: IdKind) -> Self {
        let _guard = ErrnoGuard::new();
        let groups = nix::unistd::getgroups()
            .map(|gs| gs.into_iter().map(Gid::as_raw).collect())
            .unwrap_or_default();
        Self {
            uid,
            gid,
            groups,
            kind,
        }
    }

    /// An arbitrary identity, for checks made on someone else's behalf.
    pub fn with_ids(uid: u32, gid: u32, groups: Vec<u32>, kind: IdKind) -> Self {
        Self {
            uid,
            gid,
            groups,
            kind,
        }
    }

    /// The superuser bypasses permission bits.
    pub fn is_privileged(&self) -> bool {
        self.uid == 0
    }

    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }

    pub fn class_for(&self, st: &Stat) -> Class {
        if self.uid == st.uid {
            Class::Owner
        } else if self.in_group(st.gid) {
            Class::Group
        } else {
            Class::Other
        }
    }

    /// The `rwx` bits of `st` that apply to this identity.
    pub fn applicable_bits(&self, st: &Stat) -> u32 {
        let shift = match self.class_for(st) {
            Class::Owner => S_IRWXU_SHIFT,
            Class::Group => S_IRWXG_SHIFT,
            Class::Other => S_IRWXO_SHIFT,
        };
        (st.mode >> shift) & 0o7
    }

    /// Whether the kernel would grant `want` on `st`.
    pub fn permits(&self, st: &Stat, want: Access) -> bool {
        if self.is_privileged() {
            // Root still needs some execute bit on a non-directory.
            if want.contains(Access::EXECUTE) && !st.is_dir() {
                return st.mode & 0o111 != 0;
            }
            return true;
        }
        let bits = Access::from_bits_truncate(self.applicable_bits(st));
        bits.contains(want)
    }

    /// Explain which permission class applied to `st` and why it fell short.
    ///
    /// `what` names the object, e.g. "directory" or "regular file".
    pub fn print_denial(&self, out: &mut Buffer, st: &Stat, what: &str) {
        let kind = self.kind.word();
        let bits = self.applicable_bits(st);
        let _ = write!(out, "the process {kind} UID ");
        print_uid(out, self.uid);
        match self.class_for(st) {
            Class::Owner => {
                let _ = write!(out, " matches the {what} owner, and the owner permission mode is ");
            }
            Class::Group => {
                let _ = write!(out, " does not match the {what} owner UID ");
                print_uid(out, st.uid);
                if self.gid == st.gid {
                    let _ = write!(out, ", and the process {kind} GID ");
                } else {
                    out.puts(", and a process supplementary group ");
                }
                print_gid(out, st.gid);
                let _ = write!(out, " matches the {what} group, and the group permission mode is ");
            }
            Class::Other => {
                let _ = write!(out, " does not match the {what} owner UID ");
                print_uid(out, st.uid);
                let _ = write!(out, ", and the process {kind} GID ");
                print_gid(out, self.gid);
                let _ = write!(out, " does not match the {what} group GID ");
                print_gid(out, st.gid);
                out.puts(", nor do any of the process supplementary groups, so the others permission mode is ");
            }
        }
        print_rwx3(out, bits);
        if !self.is_privileged() {
            out.puts(", and the process is not privileged");
        }
    }
}

/// Write a UID as `1000 "alice"`, or just the number for unknown users.
pub fn print_uid(out: &mut Buffer, uid: u32) {
    let _ = write!(out, "{uid}");
    let _guard = ErrnoGuard::new();
    if let Ok(Some(user)) = User::from_uid(Uid::from_raw(uid)) {
        out.putc(' ');
        out.puts_quoted(&user.name);
    }
}

/// Write a GID as `100 "users"`, or just the number for unknown groups.
pub fn print_gid(out: &mut Buffer, gid: u32) {
    let _ = write!(out, "{gid}");
    let _guard = ErrnoGuard::new();
    if let Ok(Some(group)) = Group::from_gid(Gid::from_raw(gid)) {
        out.putc(' ');
        out.puts_quoted(&group.name);
    }
}

fn print_rwx3(out: &mut Buffer, bits: u32) {
    out.putc('"');
    out.putc(if bits & 0o4 != 0 { 'r' } else { '-' });
    out.putc(if bits & 0o2 != 0 { 'w' } else { '-' });
    out.putc(if bits & 0o1 != 0 { 'x' } else { '-' });
    out.putc('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mode::{S_IFDIR, S_IFREG};

    fn file(mode: u32, uid: u32, gid: u32) -> Stat {
        Stat {
            dev: 1,
            ino: 2,
            mode: S_IFREG | mode,
            nlink: 1,
            uid,
            gid,
            rdev: 0,
            size: 0,
        }
    }

    fn user(uid: u32, gid: u32, groups: Vec<u32>) -> Identity {
        Identity::with_ids(uid, gid, groups, IdKind::Effective)
    }

    #[test]
    fn test_owner_group_other_classes() {
        let st = file(0o640, 1000, 100);
        assert!(user(1000, 1000, vec![]).permits(&st, Access::READ | Access::WRITE));
        assert!(user(2000, 100, vec![]).permits(&st, Access::READ));
        assert!(!user(2000, 100, vec![]).permits(&st, Access::WRITE));
        assert!(user(2000, 2000, vec![100]).permits(&st, Access::READ));
        assert!(!user(3000, 3000, vec![]).permits(&st, Access::READ));
    }

    #[test]
    fn test_owner_class_is_not_widened_by_other_bits() {
        // Owner gets the owner bits only, even when "other" would allow more.
        let st = file(0o004, 1000, 100);
        assert!(!user(1000, 1000, vec![]).permits(&st, Access::READ));
        assert!(user(2000, 2000, vec![]).permits(&st, Access::READ));
    }

    #[test]
    fn test_root_bypass() {
        let st = file(0o000, 1000, 100);
        let root = user(0, 0, vec![]);
        assert!(root.permits(&st, Access::READ | Access::WRITE));
        assert!(!root.permits(&st, Access::EXECUTE));
        let dir = Stat {
            mode: S_IFDIR,
            ..st
        };
        assert!(root.permits(&dir, Access::EXECUTE));
    }

    #[test]
    fn test_denial_text_for_other_class() {
        let st = file(0o600, 4001, 4001);
        let mut out = Buffer::new();
        user(4002, 4002, vec![]).print_denial(&mut out, &st, "regular file");
        let text = out.as_str();
        assert!(text.starts_with("the process effective UID 4002"));
        assert!(text.contains("does not match the regular file owner UID 4001"));
        assert!(text.contains("the others permission mode is \"---\""));
        assert!(text.ends_with("and the process is not privileged"));
    }
}
