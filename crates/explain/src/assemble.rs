//! Putting a message together.
//!
//! ```text
//! <call description> failed, <strerror> (<N>, <SYMBOL>) because <explanation>
//! ```
//!
//! The number is left out when the `numeric-errno` option is off, the symbol
//! when the code has none, and the whole `because` clause when there is
//! nothing to say beyond the error text.

use core::fmt;

use serde::Serialize;

use crate::buffer::Buffer;
use crate::errno::ErrorDomain;
use crate::options::Options;

/// A system call, with its arguments, that can explain its own failures.
pub trait Explainable {
    /// The error code space the call reports in.
    type Code: ErrorDomain;

    /// Name of the call, e.g. `"open"`.
    const NAME: &'static str;

    /// Write `name(arg = value, ...)`. May depend on `code` (an `EFAULT`
    /// pointer is never dereferenced).
    fn describe(&self, out: &mut Buffer, code: Self::Code);

    /// Write why the call failed with `code`; write nothing when there is
    /// nothing to add to the error text.
    fn explain(&self, out: &mut Buffer, opts: &Options, code: Self::Code);
}

/// A fully assembled explanation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    /// The call with its arguments.
    pub call: String,
    pub code: i32,
    pub symbol: Option<&'static str>,
    /// The platform's text for the code.
    pub message: String,
    pub explanation: String,
    #[serde(skip)]
    numeric: bool,
}

impl Diagnostic {
    /// Run `call`'s description and explanation for `code`.
    pub fn build<C: Explainable>(opts: &Options, code: C::Code, call: &C) -> Self {
        let mut desc = Buffer::new();
        call.describe(&mut desc, code);
        let mut expl = Buffer::new();
        call.explain(&mut expl, opts, code);
        log::trace!("{} {:?}: {} byte explanation", C::NAME, code, expl.len());
        Self {
            call: desc.into_string(),
            code: code.raw(),
            symbol: code.symbol(),
            message: code.message(),
            explanation: expl.into_string(),
            numeric: opts.numeric_errno,
        }
    }

    pub fn has_explanation(&self) -> bool {
        !self.explanation.is_empty()
    }

    /// Write the whole message into `out`, truncating at its capacity.
    pub fn write_to(&self, out: &mut Buffer) {
        let _ = fmt::Write::write_fmt(out, format_args!("{self}"));
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed, {} ", self.call, self.message)?;
        match (self.numeric, self.symbol) {
            (true, Some(sym)) => write!(f, "({}, {sym})", self.code)?,
            (false, Some(sym)) => write!(f, "({sym})")?,
            (_, None) => write!(f, "({})", self.code)?,
        }
        if self.has_explanation() {
            write!(f, " because {}", self.explanation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::Errno;
    use nix::libc;

    struct Fake;

    impl Explainable for Fake {
        type Code = Errno;
        const NAME: &'static str = "fake";

        fn describe(&self, out: &mut Buffer, _code: Errno) {
            out.puts("fake(x = 1)");
        }

        fn explain(&self, out: &mut Buffer, _opts: &Options, code: Errno) {
            if code.0 == libc::ENOENT {
                out.puts("it was never there");
            }
        }
    }

    #[test]
    fn test_full_form() {
        let d = Diagnostic::build(&Options::default(), Errno(libc::ENOENT), &Fake);
        assert_eq!(
            d.to_string(),
            "fake(x = 1) failed, No such file or directory (2, ENOENT) because it was never there"
        );
    }

    #[test]
    fn test_no_because_when_empty() {
        let d = Diagnostic::build(&Options::default(), Errno(libc::EXDEV), &Fake);
        assert!(d.to_string().ends_with("(18, EXDEV)"));
        assert!(!d.to_string().contains("because"));
    }

    #[test]
    fn test_numeric_off_and_unknown_symbol() {
        let opts = Options {
            numeric_errno: false,
            ..Options::default()
        };
        let d = Diagnostic::build(&opts, Errno(libc::ENOENT), &Fake);
        assert!(d.to_string().contains("(ENOENT) because"));

        let d = Diagnostic::build(&opts, Errno(9999), &Fake);
        assert!(d.to_string().ends_with("unknown error 9999 (9999)"));
    }

    #[test]
    fn test_idempotent() {
        let a = Diagnostic::build(&Options::default(), Errno(libc::ENOENT), &Fake);
        let b = Diagnostic::build(&Options::default(), Errno(libc::ENOENT), &Fake);
        assert_eq!(a, b);
    }
}
