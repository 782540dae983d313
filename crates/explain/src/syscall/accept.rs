use core::fmt::Write as _;
use std::os::unix::io::RawFd;

use nix::libc;

use super::{print_fd_refers, CallWriter};
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::generic;
use crate::options::Options;
use crate::probe::pointer::is_efault;
use crate::{format, fs};

const VALID_FLAGS: i32 = libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC;

/// `accept(fildes, addr, addrlen)`, or `accept4` when `flags` is given.
#[derive(Clone, Copy, Debug)]
pub struct Accept {
    pub fildes: RawFd,
    pub addr: *const libc::sockaddr,
    pub addrlen: *const libc::socklen_t,
    pub flags: Option<i32>,
}

fn socket_type_name(ty: i32) -> Option<&'static str> {
    match ty {
        libc::SOCK_STREAM => Some("SOCK_STREAM"),
        libc::SOCK_DGRAM => Some("SOCK_DGRAM"),
        libc::SOCK_SEQPACKET => Some("SOCK_SEQPACKET"),
        libc::SOCK_RAW => Some("SOCK_RAW"),
        libc::SOCK_RDM => Some("SOCK_RDM"),
        _ => None,
    }
}

impl Accept {
    pub fn new(fildes: RawFd, addr: *const libc::sockaddr, addrlen: *const libc::socklen_t) -> Self {
        Self {
            fildes,
            addr,
            addrlen,
            flags: None,
        }
    }

    /// The `accept4` form.
    pub fn with_flags(self, flags: i32) -> Self {
        Self {
            flags: Some(flags),
            ..self
        }
    }

    fn name(&self) -> &'static str {
        if self.flags.is_some() {
            "accept4"
        } else {
            Self::NAME
        }
    }

    /// The value `*addrlen` when it can be read.
    fn addrlen_value(&self) -> Option<libc::socklen_t> {
        if is_efault(self.addrlen.cast(), core::mem::size_of::<libc::socklen_t>()) {
            return None;
        }
        // SAFETY: is_efault showed the value is readable.
        Some(unsafe { *self.addrlen })
    }

    fn enotsock(&self, out: &mut Buffer) {
        if print_fd_refers(out, self.fildes, "fildes") {
            out.puts(", not a socket");
        } else {
            let _ = write!(out, "the fildes argument ({}) does not refer to a socket", self.fildes);
        }
    }

    fn einval(&self, out: &mut Buffer) {
        let bad = self.flags.unwrap_or(0) & !VALID_FLAGS;
        if bad != 0 {
            let _ = write!(out, "the flags argument contains unknown bits ({bad:#x})");
            return;
        }
        if fs::socket_is_listening(self.fildes) == Some(false) {
            let _ = write!(
                out,
                "the fildes argument ({}) refers to a socket that is not listening for connections, \
                 use listen(2) first",
                self.fildes
            );
            return;
        }
        if !self.addr.is_null() && self.addrlen_value().is_some_and(|len| (len as i32) < 0) {
            out.puts("the addrlen argument is negative");
            return;
        }
        out.puts("the socket is not listening for connections, or the addrlen argument is invalid");
    }

    fn eopnotsupp(&self, out: &mut Buffer) {
        let _ = write!(out, "the fildes argument ({}) refers to a socket", self.fildes);
        if let Some(name) = fs::socket_type(self.fildes).and_then(socket_type_name) {
            let _ = write!(out, " of type {name}");
        }
        out.puts(", and only SOCK_STREAM sockets accept connections");
    }

    fn efault(&self, out: &mut Buffer) {
        if self.addr.is_null() {
            generic::efault(out, "the addrlen argument");
            return;
        }
        match self.addrlen_value() {
            None => generic::efault(out, "the addrlen argument"),
            Some(len) if is_efault(self.addr.cast(), len as usize) => generic::efault(out, "the addr argument"),
            Some(_) => generic::efault(out, "the addr or addrlen argument"),
        }
    }
}

impl Explainable for Accept {
    type Code = Errno;
    const NAME: &'static str = "accept";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, self.name());
        format::fd(call.arg("fildes"), self.fildes);
        format::pointer(call.arg("addr"), self.addr);
        match self.addrlen_value() {
            Some(len) => {
                let _ = write!(call.arg("addrlen"), "{{ {len} }}");
            }
            None => format::pointer(call.arg("addrlen"), self.addrlen),
        }
        if let Some(flags) = self.flags {
            format::accept_flags(call.arg("flags"), flags);
        }
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, _opts: &Options, errnum: Errno) {
        match errnum.0 {
            libc::EBADF => generic::ebadf(out, self.fildes, "fildes"),
            libc::ENOTSOCK => self.enotsock(out),
            libc::EINVAL => self.einval(out),
            libc::EOPNOTSUPP => self.eopnotsupp(out),
            libc::EAGAIN => {
                let _ = write!(
                    out,
                    "the fildes argument ({}) is marked non-blocking and no connections are present to be accepted",
                    self.fildes
                );
            }
            libc::EFAULT => self.efault(out),
            libc::ECONNABORTED => out.puts("a connection has been aborted by the peer before it could be accepted"),
            libc::EPROTO => out.puts("a protocol error occurred on the new connection"),
            libc::EPERM => out.puts("firewall rules forbid the connection"),
            libc::ENOBUFS => generic::enomem(out),
            _ => generic::explain(out, errnum, self.name()),
        }
    }
}
