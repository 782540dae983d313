use core::fmt::Write as _;
use std::path::Path;

use nix::libc;

use super::CallWriter;
use crate::assemble::Explainable;
use crate::buffer::Buffer;
use crate::errno::Errno;
use crate::fs::mode::S_IFDIR;
use crate::fs::resolve::{self, FinalComponent, Want};
use crate::generic::{self, Place};
use crate::options::Options;
use crate::{format, fs};

#[derive(Clone, Copy, Debug)]
pub struct Mkdir<'a> {
    pub pathname: &'a Path,
    pub mode: u32,
}

impl<'a> Mkdir<'a> {
    pub fn new<P: AsRef<Path> + ?Sized>(pathname: &'a P, mode: u32) -> Self {
        Self {
            pathname: pathname.as_ref(),
            mode,
        }
    }

    fn request() -> FinalComponent {
        FinalComponent::new(Want::MUST_NOT_EXIST | Want::WANT_TO_CREATE)
            .nofollow()
            .with_mode(S_IFDIR)
    }

    /// `ENOTDIR` where the walk itself is fine: the final component is
    /// already there as something other than a directory.
    fn exists_not_dir(&self, out: &mut Buffer) -> bool {
        match fs::lstat(self.pathname) {
            Ok(st) if !st.is_dir() => {
                let _ = write!(
                    out,
                    "pathname already exists and is not a directory, it is {}",
                    st.kind().with_article()
                );
                true
            }
            _ => false,
        }
    }
}

impl Explainable for Mkdir<'_> {
    type Code = Errno;
    const NAME: &'static str = "mkdir";

    fn describe(&self, out: &mut Buffer, _errnum: Errno) {
        let mut call = CallWriter::start(out, Self::NAME);
        format::path(call.arg("pathname"), self.pathname);
        format::mode(call.arg("mode"), self.mode);
        call.finish();
    }

    fn explain(&self, out: &mut Buffer, opts: &Options, errnum: Errno) {
        let fc = Self::request();
        match errnum.0 {
            libc::ENOTDIR => {
                if !resolve::explain(out, errnum, "pathname", self.pathname, &fc).is_explained()
                    && !self.exists_not_dir(out)
                {
                    generic::unresolved(out, errnum, "pathname");
                }
            }
            libc::EACCES | libc::ENOENT | libc::EEXIST | libc::ELOOP | libc::ENAMETOOLONG => {
                generic::path(out, errnum, "pathname", self.pathname, &fc);
            }
            libc::EMLINK => {
                out.puts("the parent directory already has the maximum number of links to it");
                if let Some(parent) = self.pathname.parent() {
                    let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
                    if let Ok(st) = fs::stat(parent) {
                        let _ = write!(out, " ({})", st.nlink);
                    }
                }
            }
            libc::ENOSPC | libc::EDQUOT => {
                generic::enospc(out, opts, "pathname", Place::Path(self.pathname));
            }
            libc::EROFS => generic::erofs(out, "pathname", Place::Path(self.pathname)),
            libc::EPERM => {
                out.puts("the file system containing pathname does not support the creation of directories");
            }
            libc::EFAULT => generic::efault(out, "pathname"),
            libc::EIO => generic::eio(out, opts, Place::Path(self.pathname)),
            _ => generic::explain(out, errnum, Self::NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Diagnostic;

    #[test]
    fn test_existing_regular_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("file");
        std::fs::write(&path, b"").unwrap();
        let call = Mkdir::new(&path, 0o755);

        for errnum in [libc::EEXIST, libc::ENOTDIR] {
            let d = Diagnostic::build(&Options::default(), Errno(errnum), &call);
            let text = d.to_string();
            assert!(text.contains("already exists"), "{text}");
            assert!(text.contains("not a directory"), "{text}");
        }
    }

    #[test]
    fn test_describe_mode() {
        let mut out = Buffer::new();
        Mkdir::new("/tmp/x", 0o750).describe(&mut out, Errno(libc::EEXIST));
        assert_eq!(
            out.as_str(),
            "mkdir(pathname = \"/tmp/x\", mode = S_IRWXU | S_IRGRP | S_IXGRP)"
        );
    }
}
