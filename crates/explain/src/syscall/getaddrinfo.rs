use core::fmt::Write as _;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::{Errno, ErrorDomain};
use crate::format::{self, FlagName};
use crate::gai::{self, GaiCode};
use crate::generic;
use crate::options::Options;
use crate::probe::pointer::is_efault;

const AI_FLAGS: &[FlagName] = &[
    (libc::AI_PASSIVE as i64, "AI_PASSIVE"),
    (libc::AI_CANONNAME as i64, "AI_CANONNAME"),
    (libc::AI_NUMERICHOST as i64, "AI_NUMERICHOST"),
    (libc::AI_V4MAPPED as i64, "AI_V4MAPPED"),
    (libc::AI_ALL as i64, "AI_ALL"),
    (libc::AI_ADDRCONFIG as i64, "AI_ADDRCONFIG"),
    (libc::AI_NUMERICSERV as i64, "AI_NUMERICSERV"),
];

fn known_flags() -> i32 {
    AI_FLAGS.iter().fold(0, |acc, &(bits, _)| acc | bits as i32)
}

fn family_name(family: i32) -> Option<&'static str> {
    match family {
        libc::AF_UNSPEC => Some("AF_UNSPEC"),
        libc::AF_INET => Some("AF_INET"),
        libc::AF_INET6 => Some("AF_INET6"),
        libc::AF_UNIX => Some("AF_UNIX"),
        _ => None,
    }
}

fn socktype_name(ty: i32) -> Option<&'static str> {
    match ty {
        0 => Some("0"),
        libc::SOCK_STREAM => Some("SOCK_STREAM"),
        libc::SOCK_DGRAM => Some("SOCK_DGRAM"),
        libc::SOCK_RAW => Some("SOCK_RAW"),
        libc::SOCK_SEQPACKET => Some("SOCK_SEQPACKET"),
        _ => None,
    }
}

fn print_named(out: &mut Buffer, value: i32, name: Option<&str>) {
    match name {
        Some(name) => out.puts(name),
        None => {
            let _ = write!(out, "{value}");
        }
    }
}

/// The fields of `hints` the explanations look at.
#[derive(Clone, Copy, Debug)]
struct Hints {
    flags: i32,
    family: i32,
    socktype: i32,
    protocol: i32,
}

/// `getaddrinfo(node, service, hints, res)`.
///
/// Failures are reported in the resolver's own code space ([`GaiCode`]).
/// `EAI_SYSTEM` means the real cause is in `errno`, which is captured when
/// the value is constructed.
#[derive(Clone, Copy, Debug)]
pub struct Getaddrinfo<'a> {
    pub node: Option<&'a str>,
    pub service: Option<&'a str>,
    pub hints: *const libc::addrinfo,
    pub system_errno: Errno,
}

impl<'a> Getaddrinfo<'a> {
    pub fn new(node: Option<&'a str>, service: Option<&'a str>, hints: *const libc::addrinfo) -> Self {
        Self {
            node,
            service,
            hints,
            system_errno: Errno::last(),
        }
    }

    pub fn with_system_errno(self, system_errno: Errno) -> Self {
        Self { system_errno, ..self }
    }

    fn hints(&self) -> Option<Hints> {
        if self.hints.is_null() || is_efault(self.hints.cast(), core::mem::size_of::<libc::addrinfo>()) {
            return None;
        }
        // SAFETY: is_efault showed the whole struct is readable.
        let h = unsafe { &*self.hints };
        Some(Hints {
            flags: h.ai_flags,
            family: h.ai_family,
            socktype: h.ai_socktype,
            protocol: h.ai_protocol,
        })
    }

    fn print_hints(out: &mut Buffer, h: &Hints) {
        out.puts("{ ai_flags = ");
        format::flags(out, i64::from(h.flags), AI_FLAGS, None);
        out.puts(", ai_family = ");
        print_named(out, h.family, family_name(h.family));
        out.puts(", ai_socktype = ");
        print_named(out, h.socktype, socktype_name(h.socktype));
        let _ = write!(out, ", ai_protocol = {} }}", h.protocol);
    }

    fn print_family(&self, out: &mut Buffer) {
        if let Some(h) = self.hints() {
            out.puts(" (");
            print_named(out, h.family, family_name(h.family));
            out.putc(')');
        }
    }

    fn badflags(&self, out: &mut Buffer) {
        let flags = self.hints().map_or(0, |h| h.flags);
        let unknown = flags & !known_flags();
        if unknown != 0 {
            let _ = write!(out, "hints.ai_flags contains unknown bits ({unknown:#x})");
        } else if flags & libc::AI_CANONNAME != 0 && self.node.is_none() {
            out.puts("hints.ai_flags includes AI_CANONNAME and node is NULL");
        } else {
            out.puts("hints.ai_flags contains an invalid combination of flags");
        }
    }

    fn noname(&self, out: &mut Buffer) {
        let numeric_serv = self.hints().is_some_and(|h| h.flags & libc::AI_NUMERICSERV != 0);
        let numeric_host = self.hints().is_some_and(|h| h.flags & libc::AI_NUMERICHOST != 0);
        match (self.node, self.service) {
            (None, None) => out.puts("both node and service are NULL, at least one must be given"),
            (_, Some(service)) if numeric_serv && service.parse::<u16>().is_err() => {
                out.puts("hints.ai_flags includes AI_NUMERICSERV and service ");
                out.puts_quoted(service);
                out.puts(" is not a numeric port number");
            }
            (Some(node), _) if numeric_host && node.parse::<std::net::IpAddr>().is_err() => {
                out.puts("hints.ai_flags includes AI_NUMERICHOST and node ");
                out.puts_quoted(node);
                out.puts(" is not a numeric network address");
            }
            (Some(node), _) => {
                out.puts("the node ");
                out.puts_quoted(node);
                out.puts(" is not known to the name service, or the service is not known");
            }
            (None, Some(service)) => {
                out.puts("the service ");
                out.puts_quoted(service);
                out.puts(" is not known");
            }
        }
    }

    /// `EAI_SYSTEM`: the errno domain carries the actual cause.
    fn system(&self, out: &mut Buffer) {
        let e = self.system_errno;
        out.puts("a system error occurred, ");
        out.puts(&e.message());
        match e.symbol() {
            Some(sym) => {
                let _ = write!(out, " ({}, {sym})", e.raw());
            }
            None => {
                let _ = write!(out, " ({})", e.raw());
            }
        }
        let mark = out.position();
        out.puts(", ");
        let before = out.position();
        generic::explain(out, e, Self::NAME);
        if out.position() == before {
            out.truncate(mark);
        }
    }
}

impl Explainable for Getaddrinfo<'_> {
    type Code = GaiCode;
    const NAME: &'static str = "getaddrinfo";

    fn describe(&self, out: &mut Buffer, _code: GaiCode) {
        let mut call = CallWriter::start(out, Self::NAME);
        let arg = call.arg("node");
        match self.node {
            Some(node) => arg.puts_quoted(node),
            None => arg.puts("NULL"),
        }
        let arg = call.arg("service");
        match self.service {
            Some(service) => arg.puts_quoted(service),
            None => arg.puts("NULL"),
        }
        let arg = call.arg("hints");
        match self.hints() {
            Some(h) => Self::print_hints(arg, &h),
            None => format::pointer(arg, self.hints),
        }
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, _opts: &Options, code: GaiCode) {
        match code.0 {
            gai::EAI_ADDRFAMILY => {
                out.puts("the specified network host does not have any network addresses in the requested address family");
                self.print_family(out);
            }
            gai::EAI_AGAIN => {
                out.puts("the name server returned a temporary failure indication, try again later");
            }
            gai::EAI_BADFLAGS => self.badflags(out),
            gai::EAI_FAIL => out.puts("the name server returned a permanent failure indication"),
            gai::EAI_FAMILY => {
                out.puts("the requested address family is not supported");
                self.print_family(out);
            }
            gai::EAI_MEMORY => generic::enomem(out),
            gai::EAI_NODATA => {
                out.puts("the specified network host exists, but does not have any network addresses defined");
            }
            gai::EAI_NONAME => self.noname(out),
            gai::EAI_SERVICE => {
                out.puts("the requested service is not available for the requested socket type");
                if let Some(service) = self.service {
                    out.puts(" (");
                    out.puts_quoted(service);
                    out.putc(')');
                }
            }
            gai::EAI_SOCKTYPE => {
                out.puts("the requested socket type is not supported");
                if let Some(h) = self.hints() {
                    out.puts(" (");
                    print_named(out, h.socktype, socktype_name(h.socktype));
                    out.putc(')');
                }
            }
            gai::EAI_OVERFLOW => out.puts("an argument buffer was too small for the result"),
            gai::EAI_SYSTEM => self.system(out),
            other => log::debug!("getaddrinfo: no explanation for code {other}"),
        }
    }
}
