//! Runtime options.
//!
//! Read once from the `EXPLAIN_OPTIONS` environment variable the first time an
//! explanation is produced and immutable afterwards.
//!
//! ## Syntax
//!
//! Options are separated by commas or whitespace. Each is one of `name`,
//! `no-name`, `name=true|false|yes|no|on|off|1|0`, or `name=value` for the
//! valued options (`hanging-indent=4`, `dialect=bsd`).
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `numeric-errno` | on | show the number inside the errno parentheses |
//! | `dialect-specific` | on | add platform specific hints |
//! | `debug` | off | warn about options that are not recognised |
//! | `program-name` | on | prefix `_or_die` messages with the program name |
//! | `extra-device-info` | on | allow `/dev` and `/proc` scans |
//! | `hanging-indent` | 0 | wrap `_or_die` messages with this indent |
//! | `dialect` | native | `linux` or `bsd` link/unlink semantics |

use spin::Once;

/// Environment variable holding the option string.
pub const ENV_VAR: &str = "EXPLAIN_OPTIONS";

/// Which kernel's semantics to assume where platforms disagree on the errno
/// for the same condition (hard links to directories, unlinking directories).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    /// Linux: `unlink` of a directory is `EISDIR`, `link` to one is `EPERM`.
    Linux,
    /// 4.4BSD and descendants: both are `EPERM`.
    Bsd,
}

impl Dialect {
    /// The dialect of the platform this crate was built for.
    pub const fn native() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android")) {
            Dialect::Linux
        } else {
            Dialect::Bsd
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub numeric_errno: bool,
    pub dialect_specific: bool,
    pub debug: bool,
    pub program_name: bool,
    pub extra_device_info: bool,
    pub hanging_indent: usize,
    pub dialect: Dialect,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            numeric_errno: true,
            dialect_specific: true,
            debug: false,
            program_name: true,
            extra_device_info: true,
            hanging_indent: 0,
            dialect: Dialect::native(),
        }
    }
}

static OPTIONS: Once<Options> = Once::new();

/// The process-wide options, read from the environment on first use.
pub fn options() -> &'static Options {
    OPTIONS.call_once(Options::from_env)
}

impl Options {
    /// Options from `EXPLAIN_OPTIONS`, or the defaults when it is unset.
    pub fn from_env() -> Self {
        match std::env::var(ENV_VAR) {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::default(),
        }
    }

    /// Parse an option string. Unrecognised entries are ignored, with a
    /// warning when `debug` is among the options.
    pub fn parse(text: &str) -> Self {
        let mut opts = Self::default();
        let mut unknown = Vec::new();

        for item in text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
        {
            if !opts.apply(item) {
                unknown.push(item);
            }
        }

        if opts.debug {
            for item in unknown {
                log::warn!("{ENV_VAR}: option {item:?} not recognised");
            }
        }
        opts
    }

    fn apply(&mut self, item: &str) -> bool {
        let (name, value) = match item.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (item.trim(), None),
        };
        let name = name.to_ascii_lowercase().replace('_', "-");

        match (name.as_str(), value) {
            ("hanging-indent", Some(v)) => match v.parse::<usize>() {
                Ok(n) => {
                    self.hanging_indent = n.min(40);
                    true
                }
                Err(_) => false,
            },
            ("dialect", Some(v)) => match v.to_ascii_lowercase().as_str() {
                "linux" => {
                    self.dialect = Dialect::Linux;
                    true
                }
                "bsd" => {
                    self.dialect = Dialect::Bsd;
                    true
                }
                _ => false,
            },
            (flag, value) => {
                let (flag, on) = match (flag.strip_prefix("no-"), value) {
                    (Some(rest), None) => (rest, Some(false)),
                    (None, None) => (flag, Some(true)),
                    (None, Some(v)) => (flag, parse_bool(v)),
                    (Some(_), Some(_)) => (flag, None),
                };
                let Some(on) = on else {
                    return false;
                };
                match flag {
                    "numeric-errno" => self.numeric_errno = on,
                    "dialect-specific" => self.dialect_specific = on,
                    "debug" => self.debug = on,
                    "program-name" => self.program_name = on,
                    "extra-device-info" => self.extra_device_info = on,
                    _ => return false,
                }
                true
            }
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = Options::parse("");
        assert_eq!(opts, Options::default());
        assert!(opts.numeric_errno);
        assert!(!opts.debug);
    }

    #[test]
    fn test_negation_forms() {
        let opts = Options::parse("no-numeric-errno, program-name=false debug");
        assert!(!opts.numeric_errno);
        assert!(!opts.program_name);
        assert!(opts.debug);
    }

    #[test]
    fn test_valued_options() {
        let opts = Options::parse("hanging-indent=4,dialect=bsd");
        assert_eq!(opts.hanging_indent, 4);
        assert_eq!(opts.dialect, Dialect::Bsd);
    }

    #[test]
    fn test_unknown_options_are_ignored() {
        let opts = Options::parse("frobnicate,dialect=plan9,numeric-errno=maybe");
        assert_eq!(opts, Options::default());
    }
}
