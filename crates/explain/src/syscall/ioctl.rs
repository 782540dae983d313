use core::ffi::c_void;
use std::os::unix::io::RawFd;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::format;
use crate::ioctl::{registry, IoControl};
use crate::options::Options;

/// `ioctl(fildes, request, data)`. The request is looked up in the registry
/// against the live descriptor, so aliased numbers print under the name that
/// applies to it.
#[derive(Clone, Copy, Debug)]
pub struct Ioctl {
    pub fildes: RawFd,
    pub request: u64,
    pub data: *const c_void,
}

impl Ioctl {
    pub fn new(fildes: RawFd, request: u64, data: *const c_void) -> Self {
        Self { fildes, request, data }
    }

    pub fn control(&self) -> &'static IoControl {
        registry().find(self.fildes, self.request, self.data)
    }
}

impl Explainable for Ioctl {
    type Code = Errno;
    const NAME: &'static str = "ioctl";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let control = self.control();
        let mut call = CallWriter::start(out, Self::NAME);
        format::fd(call.arg("fildes"), self.fildes);
        control.print_request(call.arg("request"), self.request);
        format::pointer(call.arg("data"), self.data);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        self.control().explain(out, opts, errnum, self.fildes, self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::libc;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_aliased_number_named_by_descriptor() {
        let sock = nix::sys::socket::socket(
            nix::sys::socket::AddressFamily::Inet,
            nix::sys::socket::SockType::Stream,
            nix::sys::socket::SockFlag::empty(),
            None,
        )
        .unwrap();
        let call = Ioctl::new(sock.as_raw_fd(), libc::FIONREAD as u64, core::ptr::null());
        let mut out = Buffer::new();
        call.describe(&mut out, Errno(libc::EINVAL));
        assert!(out.as_str().contains("request = SIOCINQ"), "{}", out.as_str());

        let file = tempfile::tempfile().unwrap();
        let call = Ioctl::new(file.as_raw_fd(), libc::FIONREAD as u64, core::ptr::null());
        let mut out = Buffer::new();
        call.describe(&mut out, Errno(libc::EINVAL));
        assert!(out.as_str().contains("request = FIONREAD"), "{}", out.as_str());
    }

    #[test]
    fn test_unknown_request_prints_hex() {
        let call = Ioctl::new(0, 0xdead_beef, core::ptr::null());
        let mut out = Buffer::new();
        call.describe(&mut out, Errno(libc::ENOTTY));
        assert!(out.as_str().contains("request = 0xdeadbeef"), "{}", out.as_str());
    }

    #[test]
    fn test_tcgets_on_file() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        let call = Ioctl::new(fd, libc::TCGETS as u64, core::ptr::null());
        let mut out = Buffer::new();
        call.explain(&mut out, &Options::default(), Errno(libc::ENOTTY));
        assert_eq!(
            out.as_str(),
            format!("the fildes argument ({fd}) refers to a regular file, not a terminal")
        );
    }
}
