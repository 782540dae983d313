//! Turning command-line words into call values.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use explain::libc;
use explain::syscall::{
    Accept, Access, Chdir, Close, Getaddrinfo, Getcwd, Ioctl, Link, Lseek, Mkdir, Open, Read, Rename, Rmdir,
    Symlink, Unlink, Utimensat, Write,
};
use explain::{format, Diagnostic, Errno, GaiCode, Options};

/// Name to bits, from the library's formatters so both directions agree.
type Lookup = fn(&str) -> Option<i64>;

const OPEN_FLAGS: Lookup = format::open_flag_value;
const ACCESS_MODES: Lookup = format::access_mode_value;
const AT_FLAGS: Lookup = format::at_flag_value;
const SOCK_FLAGS: Lookup = format::accept_flag_value;
const MODE_BITS: Lookup = format::mode_value;
const WHENCE: Lookup = whence_value;

fn whence_value(name: &str) -> Option<i64> {
    format::whence_value(name).map(i64::from)
}

/// An integer in decimal, `0x` hex or leading-zero octal, optionally negative.
pub fn parse_int(text: &str) -> Result<i64> {
    let (neg, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse()
    }
    .with_context(|| format!("{text:?} is not a number"))?;
    Ok(if neg { -value } else { value })
}

/// `A|B|0x40`: names known to `lookup`, or numbers.
pub fn parse_flags(text: &str, lookup: Lookup) -> Result<i64> {
    text.split('|')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .try_fold(0i64, |acc, word| -> Result<i64> {
            let bits = match lookup(word) {
                Some(bits) => bits,
                None => parse_int(word).with_context(|| format!("unknown flag {word:?}"))?,
            };
            Ok(acc | bits)
        })
}

pub fn parse_fd(text: &str) -> Result<i32> {
    if text.eq_ignore_ascii_case("AT_FDCWD") {
        return Ok(libc::AT_FDCWD);
    }
    let fd = parse_int(text)?;
    i32::try_from(fd).map_err(|_| anyhow!("{text:?} is not a file descriptor"))
}

fn parse_request(text: &str) -> Result<u64> {
    if let Some(entry) = explain::ioctl::TABLE.iter().find(|e| e.name.eq_ignore_ascii_case(text)) {
        return Ok(entry.number);
    }
    let value = parse_int(text)?;
    Ok(value as u64)
}

fn nullable(text: &str) -> Option<&str> {
    (!text.eq_ignore_ascii_case("NULL")).then_some(text)
}

/// The positional arguments of one call.
struct Args<'a> {
    call: &'a str,
    words: &'a [String],
    next: usize,
}

impl<'a> Args<'a> {
    fn new(call: &'a str, words: &'a [String]) -> Self {
        Self { call, words, next: 0 }
    }

    fn required(&mut self, what: &str) -> Result<&'a str> {
        let word = self
            .words
            .get(self.next)
            .ok_or_else(|| anyhow!("{}: missing {what} argument", self.call))?;
        self.next += 1;
        Ok(word)
    }

    fn optional(&mut self) -> Option<&'a str> {
        let word = self.words.get(self.next)?;
        self.next += 1;
        Some(word)
    }

    fn fd(&mut self, what: &str) -> Result<i32> {
        parse_fd(self.required(what)?)
    }

    fn path(&mut self, what: &str) -> Result<&'a Path> {
        Ok(Path::new(self.required(what)?))
    }

    fn flags(&mut self, lookup: Lookup, default: i64) -> Result<i32> {
        match self.optional() {
            Some(word) => Ok(parse_flags(word, lookup)? as i32),
            None => Ok(default as i32),
        }
    }

    fn size(&mut self, default: usize) -> Result<usize> {
        match self.optional() {
            Some(word) => usize::try_from(parse_int(word)?).context("size must not be negative"),
            None => Ok(default),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.next < self.words.len() {
            bail!("{}: unexpected argument {:?}", self.call, self.words[self.next]);
        }
        Ok(())
    }
}

fn errno(text: &str) -> Result<Errno> {
    Errno::parse(text).ok_or_else(|| anyhow!("{text:?} is not a known errno name or number"))
}

/// Build the diagnostic for `name(args...)` failing with `code`.
pub fn diagnose(opts: &Options, code: &str, name: &str, words: &[String]) -> Result<Diagnostic> {
    let mut args = Args::new(name, words);
    let diagnostic = match name {
        "accept" | "accept4" => {
            let fd = args.fd("fildes")?;
            let mut call = Accept::new(fd, core::ptr::null(), core::ptr::null());
            if name == "accept4" {
                call = call.with_flags(args.flags(SOCK_FLAGS, 0)?);
            }
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &call)
        }
        "access" => {
            let path = args.path("pathname")?;
            let mode = args.flags(ACCESS_MODES, i64::from(libc::F_OK))?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Access::new(path, mode))
        }
        "chdir" => {
            let path = args.path("pathname")?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Chdir::new(path))
        }
        "close" => {
            let fd = args.fd("fildes")?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Close::new(fd))
        }
        "getaddrinfo" => {
            let node = nullable(args.required("node")?);
            let service = args.optional().and_then(nullable);
            let system = args.optional().map(errno).transpose()?.unwrap_or(Errno(0));
            args.finish()?;
            let gai = GaiCode::parse(code).ok_or_else(|| anyhow!("{code:?} is not a getaddrinfo code"))?;
            let call = Getaddrinfo::new(node, service, core::ptr::null()).with_system_errno(system);
            Diagnostic::build(opts, gai, &call)
        }
        "getcwd" => {
            let size = args.size(explain::fs::PATH_MAX)?;
            args.finish()?;
            let buf = vec![0u8; size];
            Diagnostic::build(opts, errno(code)?, &Getcwd::new(buf.as_ptr(), size))
        }
        "ioctl" => {
            let fd = args.fd("fildes")?;
            let request = parse_request(args.required("request")?)?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Ioctl::new(fd, request, core::ptr::null()))
        }
        "link" | "rename" | "symlink" => {
            let old = args.path("oldpath")?;
            let new = args.path("newpath")?;
            args.finish()?;
            let code = errno(code)?;
            match name {
                "link" => Diagnostic::build(opts, code, &Link::new(old, new)),
                "rename" => Diagnostic::build(opts, code, &Rename::new(old, new)),
                _ => Diagnostic::build(opts, code, &Symlink::new(old, new)),
            }
        }
        "lseek" => {
            let fd = args.fd("fildes")?;
            let offset = parse_int(args.required("offset")?)?;
            let whence = args.flags(WHENCE, i64::from(libc::SEEK_SET))?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Lseek::new(fd, offset, whence))
        }
        "mkdir" => {
            let path = args.path("pathname")?;
            let mode = args.flags(MODE_BITS, 0o777)?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Mkdir::new(path, mode as u32))
        }
        "open" => {
            let path = args.path("pathname")?;
            let flags = args.flags(OPEN_FLAGS, i64::from(libc::O_RDONLY))?;
            let mode = args.flags(MODE_BITS, 0o666)?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Open::new(path, flags, mode as u32))
        }
        "read" | "write" => {
            let fd = args.fd("fildes")?;
            let size = args.size(0)?;
            args.finish()?;
            let buf = vec![0u8; size];
            if name == "read" {
                Diagnostic::build(opts, errno(code)?, &Read::new(fd, buf.as_ptr(), size))
            } else {
                Diagnostic::build(opts, errno(code)?, &Write::new(fd, buf.as_ptr(), size))
            }
        }
        "rmdir" | "unlink" => {
            let path = args.path("pathname")?;
            args.finish()?;
            if name == "rmdir" {
                Diagnostic::build(opts, errno(code)?, &Rmdir::new(path))
            } else {
                Diagnostic::build(opts, errno(code)?, &Unlink::new(path))
            }
        }
        "utimensat" => {
            let dirfd = args.fd("dirfd")?;
            let path = nullable(args.required("pathname")?).map(Path::new);
            let flags = args.flags(AT_FLAGS, 0)?;
            args.finish()?;
            Diagnostic::build(opts, errno(code)?, &Utimensat::new(dirfd, path, core::ptr::null(), flags))
        }
        other => bail!("{other:?} is not a supported call, see `explain list`"),
    };
    log::debug!("{name}: explanation is {} bytes", diagnostic.explanation.len());
    Ok(diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-100").unwrap(), -100);
        assert_eq!(parse_int("0x1f").unwrap(), 31);
        assert_eq!(parse_int("0755").unwrap(), 0o755);
        assert!(parse_int("ten").is_err());
    }

    #[test]
    fn test_parse_flags_mixes_names_and_numbers() {
        let v = parse_flags("O_WRONLY|o_creat|0x100000", OPEN_FLAGS).unwrap();
        assert_eq!(v, i64::from(libc::O_WRONLY | libc::O_CREAT) | 0x10_0000);
        assert!(parse_flags("O_BOGUS", OPEN_FLAGS).is_err());
        assert_eq!(parse_flags("S_IRWXU|S_IRGRP", MODE_BITS).unwrap(), 0o740);
        assert_eq!(parse_flags("seek_end", WHENCE).unwrap(), i64::from(libc::SEEK_END));
    }

    #[test]
    fn test_described_flags_parse_back() {
        let d = diagnose(&Options::default(), "EEXIST", "open", &words(&["/x", "O_WRONLY|O_CREAT|O_EXCL", "0640"])).unwrap();
        assert!(d.call.contains("flags = O_WRONLY | O_CREAT | O_EXCL"), "{}", d.call);
        assert!(d.call.contains("mode = S_IRUSR | S_IWUSR | S_IRGRP"), "{}", d.call);
    }

    #[test]
    fn test_diagnose_lseek() {
        let d = diagnose(&Options::default(), "EINVAL", "lseek", &words(&["-1", "-100", "SEEK_SET"])).unwrap();
        assert_eq!(d.call, "lseek(fildes = -1, offset = -100, whence = SEEK_SET)");
    }

    #[test]
    fn test_diagnose_getaddrinfo_uses_gai_codes() {
        let d = diagnose(&Options::default(), "EAI_NONAME", "getaddrinfo", &words(&["NULL", "NULL"])).unwrap();
        assert_eq!(d.symbol, Some("EAI_NONAME"));
        assert!(d.explanation.starts_with("both node and service are NULL"));
    }

    #[test]
    fn test_diagnose_rejects_extra_and_unknown() {
        assert!(diagnose(&Options::default(), "EBADF", "close", &words(&["1", "2"])).is_err());
        assert!(diagnose(&Options::default(), "EBADF", "frobnicate", &[]).is_err());
        assert!(diagnose(&Options::default(), "ENOTANERRNO", "close", &words(&["1"])).is_err());
    }
}
