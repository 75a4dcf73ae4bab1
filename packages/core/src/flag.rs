//! Open flags.
//!
//! A [`FileFlag`] is the parsed access intent of an `open` call. The
//! dispatcher validates the flag's direction before any content operation;
//! backends consult the two action planners to decide what `open` does when
//! the path does or does not exist.

use crate::api_error::{ApiError, FsResult};

/// What `open` should do for a path, given the parsed flag and whether the
/// path exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Proceed with the existing file.
    Nop,
    /// Fail the open.
    Throw,
    /// Proceed after discarding the existing contents.
    Truncate,
    /// Create the file, then proceed.
    Create,
}

const FLAGS: [&str; 12] = [
    "r", "rs", "r+", "rs+", "w", "wx", "w+", "wx+", "a", "ax", "a+", "ax+",
];

/// A validated open-flag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFlag {
    repr: &'static str,
}

impl FileFlag {
    /// Parses a flag string; anything outside the supported table is EINVAL.
    pub fn parse(flag: &str) -> FsResult<FileFlag> {
        match FLAGS.iter().find(|f| **f == flag) {
            Some(repr) => Ok(FileFlag { repr }),
            None => Err(ApiError::invalid_argument(format!(
                "Invalid flag: {}",
                flag
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.repr
    }

    pub fn is_readable(&self) -> bool {
        self.repr.contains('r') || self.repr.contains('+')
    }

    pub fn is_writeable(&self) -> bool {
        self.repr.contains('w') || self.repr.contains('a') || self.repr.contains('+')
    }

    pub fn is_truncating(&self) -> bool {
        self.repr.contains('w')
    }

    pub fn is_appendable(&self) -> bool {
        self.repr.contains('a')
    }

    pub fn is_synchronous(&self) -> bool {
        self.repr.contains('s')
    }

    pub fn is_exclusive(&self) -> bool {
        self.repr.contains('x')
    }

    /// What `open` does when the path exists.
    pub fn path_exists_action(&self) -> ActionType {
        if self.is_exclusive() {
            ActionType::Throw
        } else if self.is_truncating() {
            ActionType::Truncate
        } else {
            ActionType::Nop
        }
    }

    /// What `open` does when the path does not exist. `r+` is writeable but
    /// never creates; it requires the file to already exist.
    pub fn path_not_exists_action(&self) -> ActionType {
        if (self.is_writeable() || self.is_appendable()) && self.repr != "r+" {
            ActionType::Create
        } else {
            ActionType::Throw
        }
    }
}
