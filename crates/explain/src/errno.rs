//! Error codes and their symbolic names.
//!
//! Provides the [`Errno`] newtype, the static `errno` symbol table, the
//! [`ErrorDomain`] trait shared with the getaddrinfo code space, and the
//! [`ErrnoGuard`] that keeps probes from clobbering the caller's `errno`.
//!
//! ## Tables
//!
//! Tables are declared with [`define_code_table!`]:
//!
//! ```ignore
//! define_code_table! {
//!     /// Known errno values.
//!     pub static ERRNO_TABLE: [CodeInfo] = {
//!         EPERM,
//!         ENOENT,
//!         EAI_NODATA = -5,
//!     };
//! }
//! ```
//!
//! A bare name takes its value from `libc`; `NAME = value` spells it out
//! for codes the platform headers do not export. When two rows share a value
//! (`EAGAIN`/`EWOULDBLOCK`) the first row names it.

use serde::Serialize;

/// One row of a code table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CodeInfo {
    pub value: i32,
    pub name: &'static str,
}

/// Macro to define a static table of named codes.
#[macro_export]
macro_rules! define_code_table {
    (
        $(#[$meta:meta])*
        $vis:vis static $table:ident: [CodeInfo] = {
            $( $name:ident $(= $value:expr)? ),* $(,)?
        };
    ) => {
        $(#[$meta])*
        $vis static $table: &[$crate::errno::CodeInfo] = &[
            $(
                $crate::errno::CodeInfo {
                    value: $crate::define_code_table!(@value $name $(= $value)?),
                    name: stringify!($name),
                },
            )*
        ];
    };

    // Helpers to pick the row value
    (@value $name:ident = $value:expr) => { $value };
    (@value $name:ident) => { $crate::libc::$name };
}

define_code_table! {
    /// Every errno value the platform defines, in numeric order.
    pub static ERRNO_TABLE: [CodeInfo] = {
        EPERM, ENOENT, ESRCH, EINTR, EIO, ENXIO, E2BIG, ENOEXEC, EBADF,
        ECHILD, EAGAIN, EWOULDBLOCK, ENOMEM, EACCES, EFAULT, ENOTBLK, EBUSY,
        EEXIST, EXDEV, ENODEV, ENOTDIR, EISDIR, EINVAL, ENFILE, EMFILE,
        ENOTTY, ETXTBSY, EFBIG, ENOSPC, ESPIPE, EROFS, EMLINK, EPIPE, EDOM,
        ERANGE, EDEADLK, EDEADLOCK, ENAMETOOLONG, ENOLCK, ENOSYS, ENOTEMPTY,
        ELOOP, ENOMSG, EIDRM, ECHRNG, EL2NSYNC, EL3HLT, EL3RST, ELNRNG,
        EUNATCH, ENOCSI, EL2HLT, EBADE, EBADR, EXFULL, ENOANO, EBADRQC,
        EBADSLT, EBFONT, ENOSTR, ENODATA, ETIME, ENOSR, ENONET, ENOPKG,
        EREMOTE, ENOLINK, EADV, ESRMNT, ECOMM, EPROTO, EMULTIHOP, EDOTDOT,
        EBADMSG, EOVERFLOW, ENOTUNIQ, EBADFD, EREMCHG, ELIBACC, ELIBBAD,
        ELIBSCN, ELIBMAX, ELIBEXEC, EILSEQ, ERESTART, ESTRPIPE, EUSERS,
        ENOTSOCK, EDESTADDRREQ, EMSGSIZE, EPROTOTYPE, ENOPROTOOPT,
        EPROTONOSUPPORT, ESOCKTNOSUPPORT, EOPNOTSUPP, ENOTSUP, EPFNOSUPPORT,
        EAFNOSUPPORT, EADDRINUSE, EADDRNOTAVAIL, ENETDOWN, ENETUNREACH,
        ENETRESET, ECONNABORTED, ECONNRESET, ENOBUFS, EISCONN, ENOTCONN,
        ESHUTDOWN, ETOOMANYREFS, ETIMEDOUT, ECONNREFUSED, EHOSTDOWN,
        EHOSTUNREACH, EALREADY, EINPROGRESS, ESTALE, EUCLEAN, ENOTNAM,
        ENAVAIL, EISNAM, EREMOTEIO, EDQUOT, ENOMEDIUM, EMEDIUMTYPE,
        ECANCELED, ENOKEY, EKEYEXPIRED, EKEYREVOKED, EKEYREJECTED,
        EOWNERDEAD, ENOTRECOVERABLE, ERFKILL, EHWPOISON,
    };
}

/// Look a value up in a code table; the first matching row wins.
pub(crate) fn lookup_value(table: &'static [CodeInfo], value: i32) -> Option<&'static CodeInfo> {
    table.iter().find(|row| row.value == value)
}

/// Look a name up in a code table, ignoring ASCII case.
pub(crate) fn lookup_name(table: &'static [CodeInfo], name: &str) -> Option<&'static CodeInfo> {
    table.iter().find(|row| row.name.eq_ignore_ascii_case(name))
}

/// An error code space with its own numbers, names and messages.
///
/// `errno` values and getaddrinfo return codes overlap numerically, so each
/// gets its own type rather than a sign convention.
pub trait ErrorDomain: Copy + core::fmt::Debug {
    /// Raw numeric value.
    fn raw(self) -> i32;

    /// Symbolic name (`ENOENT`, `EAI_NONAME`), when known.
    fn symbol(self) -> Option<&'static str>;

    /// The platform's own message for this code.
    fn message(self) -> String;
}

/// An `errno` value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Errno(pub i32);

impl Errno {
    /// The calling thread's current `errno`.
    #[inline]
    #[must_use]
    pub fn last() -> Self {
        Self(nix::errno::Errno::last_raw())
    }

    /// Store this value in the calling thread's `errno`.
    #[inline]
    pub fn set_last(self) {
        nix::errno::Errno::set_raw(self.0);
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Symbolic name, e.g. `"ENOENT"`.
    pub fn name(self) -> Option<&'static str> {
        lookup_value(ERRNO_TABLE, self.0).map(|row| row.name)
    }

    /// Parse a symbolic name (`"ENOENT"`, case-insensitive) or a decimal number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(n) = text.parse::<i32>() {
            return Some(Self(n));
        }
        lookup_name(ERRNO_TABLE, text).map(|row| Self(row.value))
    }

    /// The platform message, as `strerror` would give it.
    pub fn strerror(self) -> String {
        match nix::errno::Errno::from_raw(self.0) {
            nix::errno::Errno::UnknownErrno => format!("unknown error {}", self.0),
            known => known.desc().to_string(),
        }
    }
}

impl From<nix::errno::Errno> for Errno {
    fn from(e: nix::errno::Errno) -> Self {
        Self(e as i32)
    }
}

impl ErrorDomain for Errno {
    fn raw(self) -> i32 {
        self.0
    }

    fn symbol(self) -> Option<&'static str> {
        self.name()
    }

    fn message(self) -> String {
        self.strerror()
    }
}

impl core::fmt::Display for Errno {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Restores the calling thread's `errno` when dropped.
///
/// Every public entry point and every probe holds one, so explaining an error
/// never changes the `errno` the caller is looking at.
#[must_use]
pub struct ErrnoGuard {
    saved: i32,
}

impl ErrnoGuard {
    pub fn new() -> Self {
        Self {
            saved: nix::errno::Errno::last_raw(),
        }
    }

    /// The value that will be restored.
    pub fn saved(&self) -> Errno {
        Errno(self.saved)
    }
}

impl Default for ErrnoGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        nix::errno::Errno::set_raw(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::libc;

    #[test]
    fn test_names() {
        assert_eq!(Errno(libc::ENOENT).name(), Some("ENOENT"));
        assert_eq!(Errno(libc::EACCES).name(), Some("EACCES"));
        assert_eq!(Errno(99999).name(), None);
    }

    #[test]
    fn test_alias_first_row_wins() {
        assert_eq!(Errno(libc::EAGAIN).name(), Some("EAGAIN"));
        assert_eq!(Errno(libc::EDEADLK).name(), Some("EDEADLK"));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Errno::parse("enoent"), Some(Errno(libc::ENOENT)));
        assert_eq!(Errno::parse("EWOULDBLOCK"), Some(Errno(libc::EAGAIN)));
        assert_eq!(Errno::parse("13"), Some(Errno(13)));
        assert_eq!(Errno::parse("ENOTHING"), None);
    }

    #[test]
    fn test_strerror() {
        assert_eq!(Errno(libc::ENOENT).strerror(), "No such file or directory");
        assert_eq!(Errno(99999).strerror(), "unknown error 99999");
    }

    #[test]
    fn test_table_has_no_duplicate_names() {
        for (i, row) in ERRNO_TABLE.iter().enumerate() {
            assert!(
                ERRNO_TABLE[i + 1..].iter().all(|other| other.name != row.name),
                "{} listed twice",
                row.name
            );
        }
    }

    #[test]
    fn test_guard_restores() {
        Errno(libc::EXDEV).set_last();
        {
            let _guard = ErrnoGuard::new();
            Errno(libc::ENOENT).set_last();
        }
        assert_eq!(Errno::last(), Errno(libc::EXDEV));
    }
}
