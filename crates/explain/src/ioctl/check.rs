//! Offline consistency checks for the descriptor table.
//!
//! Run by the test suite and by `explain check-ioctl-table`; never on the
//! explanation path.

use core::fmt;

use serde::Serialize;

use super::{Direction, IoControl};

use nix::sys::ioctl::{DIRMASK, DIRSHIFT, READ, SIZEMASK, SIZESHIFT, WRITE};

/// Something wrong with the table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum TableProblem {
    /// More than one descriptor for a number has no predicate, so the choice
    /// between them is arbitrary.
    Ambiguous { number: u64, names: Vec<&'static str> },
    /// The size encoded in the request number disagrees with the declared
    /// data size.
    SizeMismatch {
        name: &'static str,
        encoded: usize,
        declared: usize,
    },
    /// The direction encoded in the request number disagrees with the
    /// declared direction.
    DirectionMismatch { name: &'static str },
    /// A name used for two different numbers.
    DuplicateName { name: &'static str },
}

impl fmt::Display for TableProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableProblem::Ambiguous { number, names } => {
                write!(f, "{number:#x}: ambiguous between {}", names.join(", "))
            }
            TableProblem::SizeMismatch {
                name,
                encoded,
                declared,
            } => write!(f, "{name}: number encodes {encoded} bytes, declared {declared}"),
            TableProblem::DirectionMismatch { name } => {
                write!(f, "{name}: number encodes a different direction")
            }
            TableProblem::DuplicateName { name } => write!(f, "{name}: name used twice"),
        }
    }
}

// Field layout is per architecture; nix carries the `_IOC` constants.
fn encoded_size(number: u64) -> usize {
    ((number >> SIZESHIFT as u64) & SIZEMASK as u64) as usize
}

fn encoded_direction(number: u64) -> Direction {
    let dir = (number >> DIRSHIFT as u64) & DIRMASK as u64;
    let (read, write) = (u64::from(READ), u64::from(WRITE));
    if dir == read | write {
        Direction::ReadWrite
    } else if dir == read {
        Direction::Read
    } else if dir == write {
        Direction::Write
    } else {
        Direction::None
    }
}

/// Check `table` for ambiguity and for data sizes that disagree with the
/// `_IOC` encoding. Legacy numbers with no encoded size are only checked for
/// ambiguity.
pub fn check_table(table: &'static [IoControl]) -> Vec<TableProblem> {
    let mut problems = Vec::new();

    let mut seen: Vec<u64> = Vec::new();
    for entry in table {
        if seen.contains(&entry.number) {
            continue;
        }
        seen.push(entry.number);
        let names: Vec<&'static str> = table
            .iter()
            .filter(|e| e.number == entry.number && e.disambiguate.is_none())
            .map(|e| e.name)
            .collect();
        if names.len() > 1 {
            problems.push(TableProblem::Ambiguous {
                number: entry.number,
                names,
            });
        }
    }

    for (i, entry) in table.iter().enumerate() {
        if table[..i]
            .iter()
            .any(|e| e.name == entry.name && e.number != entry.number)
        {
            problems.push(TableProblem::DuplicateName { name: entry.name });
        }

        let encoded = encoded_size(entry.number);
        if encoded == 0 {
            continue;
        }
        if encoded != entry.data_size {
            problems.push(TableProblem::SizeMismatch {
                name: entry.name,
                encoded,
                declared: entry.data_size,
            });
        }
        if encoded_direction(entry.number) != entry.direction {
            problems.push(TableProblem::DirectionMismatch { name: entry.name });
        }
    }

    if !problems.is_empty() {
        log::warn!("ioctl table: {} problems", problems.len());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioctl::table::request;
    use crate::ioctl::TABLE;
    use nix::libc;

    const READ_INT: u64 = request(nix::request_code_read!(b'x', 1, 4));

    #[test]
    fn test_builtin_table_is_consistent() {
        let problems = check_table(TABLE);
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn test_detects_ambiguity_and_size() {
        static BAD: &[IoControl] = &[
            IoControl {
                name: "ONE",
                number: READ_INT,
                disambiguate: None,
                direction: Direction::Read,
                data_size: 8,
                data_type: "long",
                explain: None,
            },
            IoControl {
                name: "TWO",
                number: READ_INT,
                disambiguate: None,
                direction: Direction::Read,
                data_size: 4,
                data_type: "int",
                explain: None,
            },
        ];
        let problems = check_table(BAD);
        assert!(problems.contains(&TableProblem::Ambiguous {
            number: READ_INT,
            names: vec!["ONE", "TWO"],
        }));
        assert!(problems.contains(&TableProblem::SizeMismatch {
            name: "ONE",
            encoded: 4,
            declared: 8,
        }));
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_encoding_helpers() {
        let blkgetsize64 = request(nix::request_code_read!(0x12, 114, 8));
        assert_eq!(encoded_size(blkgetsize64), 8);
        assert_eq!(encoded_direction(blkgetsize64), Direction::Read);
        let writes = request(nix::request_code_write!(b'x', 2, 16));
        assert_eq!(encoded_direction(writes), Direction::Write);
        assert_eq!(encoded_size(request(libc::TCGETS)), 0);
    }
}
