//! The public filesystem error type.
//!
//! Errors mirror POSIX errno semantics: callers distinguish kinds by
//! matching [`ErrorCode`], the way they would branch on `errno`. Backends
//! report their own failures (permission, exists, not-a-directory) through
//! the same type and they pass through the dispatcher unchanged.

use portfs_buf::BufferError;

/// POSIX-style error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    EPERM,
    ENOENT,
    EIO,
    EBADF,
    EACCES,
    EBUSY,
    EEXIST,
    ENOTDIR,
    EISDIR,
    EINVAL,
    EFBIG,
    ENOSPC,
    EROFS,
    ENOTEMPTY,
    ENOTSUP,
}

impl ErrorCode {
    /// The conventional errno number for this code.
    pub fn errno(self) -> i32 {
        match self {
            ErrorCode::EPERM => 1,
            ErrorCode::ENOENT => 2,
            ErrorCode::EIO => 5,
            ErrorCode::EBADF => 9,
            ErrorCode::EACCES => 13,
            ErrorCode::EBUSY => 16,
            ErrorCode::EEXIST => 17,
            ErrorCode::ENOTDIR => 20,
            ErrorCode::EISDIR => 21,
            ErrorCode::EINVAL => 22,
            ErrorCode::EFBIG => 27,
            ErrorCode::ENOSPC => 28,
            ErrorCode::EROFS => 30,
            ErrorCode::ENOTEMPTY => 39,
            ErrorCode::ENOTSUP => 95,
        }
    }

    /// Canonical human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::EPERM => "Operation not permitted.",
            ErrorCode::ENOENT => "No such file or directory.",
            ErrorCode::EIO => "Input/output error.",
            ErrorCode::EBADF => "Bad file descriptor.",
            ErrorCode::EACCES => "Permission denied.",
            ErrorCode::EBUSY => "Resource busy or locked.",
            ErrorCode::EEXIST => "File exists.",
            ErrorCode::ENOTDIR => "File is not a directory.",
            ErrorCode::EISDIR => "File is a directory.",
            ErrorCode::EINVAL => "Invalid argument.",
            ErrorCode::EFBIG => "File is too big.",
            ErrorCode::ENOSPC => "No space left on disk.",
            ErrorCode::EROFS => "Cannot modify a read-only file system.",
            ErrorCode::ENOTEMPTY => "Directory is not empty.",
            ErrorCode::ENOTSUP => "Operation is not supported.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A filesystem error: a code, a message defaulting to the code's canonical
/// description, and the offending path when one is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub path: Option<String>,
}

impl ApiError {
    /// An error carrying the code's canonical description.
    pub fn new(code: ErrorCode) -> ApiError {
        ApiError {
            code,
            message: code.description().to_string(),
            path: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> ApiError {
        ApiError {
            code,
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(code: ErrorCode, path: impl Into<String>) -> ApiError {
        ApiError {
            code,
            message: code.description().to_string(),
            path: Some(path.into()),
        }
    }

    pub fn not_found(path: impl Into<String>) -> ApiError {
        ApiError::with_path(ErrorCode::ENOENT, path)
    }

    pub fn bad_fd() -> ApiError {
        ApiError::with_message(ErrorCode::EBADF, "Invalid file descriptor.")
    }

    pub fn invalid_argument(message: impl Into<String>) -> ApiError {
        ApiError::with_message(ErrorCode::EINVAL, message)
    }

    pub fn not_supported() -> ApiError {
        ApiError::new(ErrorCode::ENOTSUP)
    }

    /// The conventional errno number for this error's code.
    pub fn errno(&self) -> i32 {
        self.code.errno()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, ", '{}'", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<BufferError> for ApiError {
    fn from(e: BufferError) -> ApiError {
        ApiError::with_message(ErrorCode::EINVAL, e.to_string())
    }
}

pub type FsResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_message_and_path() {
        let e = ApiError::new(ErrorCode::ENOENT);
        assert_eq!(format!("{}", e), "ENOENT: No such file or directory.");

        let e = ApiError::with_path(ErrorCode::EISDIR, "/tmp");
        assert_eq!(format!("{}", e), "EISDIR: File is a directory., '/tmp'");
    }

    #[test]
    fn errno_numbers_match_posix() {
        assert_eq!(ErrorCode::EPERM.errno(), 1);
        assert_eq!(ErrorCode::ENOENT.errno(), 2);
        assert_eq!(ErrorCode::EBADF.errno(), 9);
        assert_eq!(ErrorCode::EINVAL.errno(), 22);
        assert_eq!(ErrorCode::ENOTEMPTY.errno(), 39);
        assert_eq!(ErrorCode::ENOTSUP.errno(), 95);
    }

    #[test]
    fn buffer_errors_become_einval() {
        let e: ApiError = BufferError::UnsupportedWidth(9).into();
        assert_eq!(e.code, ErrorCode::EINVAL);
        assert!(e.message.contains("9"));
    }
}
