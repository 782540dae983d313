//! Explain why a system call failed.
//!
//! `strerror` says *what* went wrong; this crate looks at the process and the
//! file system as they are now and says *why*:
//!
//! ```text
//! rmdir(pathname = "/tmp/full") failed, Directory not empty (39, ENOTEMPTY)
//! because pathname is not an empty directory, it contains entries other
//! than "." and ".." (1); note that pathname still exists
//! ```
//!
//! Each supported call is a struct of its arguments in [`syscall`]. Pass one
//! to [`explain`] right after the call fails, or to [`explain_errno`] with a
//! saved error code:
//!
//! ```no_run
//! use explain::syscall::Rmdir;
//!
//! if std::fs::remove_dir("/tmp/full").is_err() {
//!     eprintln!("{}", explain::explain(&Rmdir::new("/tmp/full")));
//! }
//! ```
//!
//! Explaining never changes `errno` and never fails. Probes that cannot look
//! at something (no `/proc`, a vanished file) just leave their detail out.

pub use nix::libc;

mod assemble;
mod buffer;
mod compat;
pub mod die;
pub mod errno;
pub mod format;
pub mod fs;
pub mod gai;
pub mod generic;
pub mod ioctl;
mod options;
pub mod probe;
pub mod syscall;

pub use assemble::{Diagnostic, Explainable};
pub use buffer::Buffer;
pub use compat::{explain_errno_string, last_message};
pub use errno::{CodeInfo, Errno, ErrnoGuard, ErrorDomain, ERRNO_TABLE};
pub use gai::{GaiCode, GAI_TABLE};
pub use options::{options, Dialect, Options, ENV_VAR};

/// Explain `call` failing with `code`, using the process options.
pub fn explain_errno<C: Explainable>(code: C::Code, call: &C) -> Diagnostic {
    let _guard = ErrnoGuard::new();
    Diagnostic::build(options(), code, call)
}

/// Explain `call` failing with the calling thread's current `errno`.
pub fn explain<C: Explainable<Code = Errno>>(call: &C) -> Diagnostic {
    explain_errno(Errno::last(), call)
}

/// Write the explanation of `call` failing with `code` into `dst` as a
/// NUL-terminated string, truncated to fit. Returns the text length.
///
/// Safe to call from any number of threads at once.
pub fn message_errno<C: Explainable>(dst: &mut [u8], code: C::Code, call: &C) -> usize {
    let text = explain_errno(code, call).to_string();
    buffer::copy_terminated(&text, dst)
}

/// [`message_errno`] with the current `errno`.
pub fn message<C: Explainable<Code = Errno>>(dst: &mut [u8], call: &C) -> usize {
    message_errno(dst, Errno::last(), call)
}

/// The symbolic name of an `errno` value, e.g. `"ENOENT"`.
pub fn errno_name(code: i32) -> Option<&'static str> {
    Errno(code).name()
}

/// Parse `ENOENT` or `2` into an `errno` value.
pub fn errno_parse(text: &str) -> Option<Errno> {
    Errno::parse(text)
}
