//! The getaddrinfo return-code space.
//!
//! `getaddrinfo` and `getnameinfo` report failure through their return value,
//! not `errno`, using a separate set of small negative codes. `EAI_SYSTEM`
//! means "look at `errno` instead".

use std::ffi::CStr;

use serde::Serialize;

use crate::define_code_table;
use crate::errno::{lookup_name, lookup_value, CodeInfo, ErrorDomain};

define_code_table! {
    /// getaddrinfo return codes as glibc numbers them.
    pub static GAI_TABLE: [CodeInfo] = {
        EAI_BADFLAGS = -1,
        EAI_NONAME = -2,
        EAI_AGAIN = -3,
        EAI_FAIL = -4,
        EAI_NODATA = -5,
        EAI_FAMILY = -6,
        EAI_SOCKTYPE = -7,
        EAI_SERVICE = -8,
        EAI_ADDRFAMILY = -9,
        EAI_MEMORY = -10,
        EAI_SYSTEM = -11,
        EAI_OVERFLOW = -12,
    };
}

pub const EAI_BADFLAGS: i32 = -1;
pub const EAI_NONAME: i32 = -2;
pub const EAI_AGAIN: i32 = -3;
pub const EAI_FAIL: i32 = -4;
pub const EAI_NODATA: i32 = -5;
pub const EAI_FAMILY: i32 = -6;
pub const EAI_SOCKTYPE: i32 = -7;
pub const EAI_SERVICE: i32 = -8;
pub const EAI_ADDRFAMILY: i32 = -9;
pub const EAI_MEMORY: i32 = -10;
pub const EAI_SYSTEM: i32 = -11;
pub const EAI_OVERFLOW: i32 = -12;

/// A getaddrinfo return code.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GaiCode(pub i32);

impl GaiCode {
    pub fn name(self) -> Option<&'static str> {
        lookup_value(GAI_TABLE, self.0).map(|row| row.name)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(n) = text.parse::<i32>() {
            return Some(Self(n));
        }
        lookup_name(GAI_TABLE, text).map(|row| Self(row.value))
    }

    /// The resolver's own message, as `gai_strerror` gives it.
    pub fn strerror(self) -> String {
        // SAFETY: gai_strerror returns a pointer to a static string (or null).
        let ptr = unsafe { nix::libc::gai_strerror(self.0) };
        if ptr.is_null() {
            return format!("unknown getaddrinfo error {}", self.0);
        }
        // SAFETY: non-null pointers from gai_strerror are NUL-terminated.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

impl ErrorDomain for GaiCode {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(GaiCode(EAI_NONAME).name(), Some("EAI_NONAME"));
        assert_eq!(GaiCode(EAI_SYSTEM).name(), Some("EAI_SYSTEM"));
        assert_eq!(GaiCode(-1000).name(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(GaiCode::parse("eai_again"), Some(GaiCode(EAI_AGAIN)));
        assert_eq!(GaiCode::parse("-8"), Some(GaiCode(EAI_SERVICE)));
    }

    #[test]
    fn test_strerror_is_not_empty() {
        assert!(!GaiCode(EAI_NONAME).strerror().is_empty());
    }
}
