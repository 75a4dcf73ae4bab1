//! Call-boundary argument types.
//!
//! The coercions an untyped frontend would do by inspecting runtime types
//! live here as small enums and option structs, resolved once at the call
//! boundary: a mode may arrive as a number or an octal string, a time as
//! epoch seconds or a calendar timestamp, file data as bytes or text.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use portfs_buf::Buffer;

use crate::api_error::{ApiError, FsResult};

/// A file mode: numeric, or an octal string like `"755"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeArg {
    Number(u32),
    Octal(String),
}

impl ModeArg {
    /// Canonical integer mode; an unparsable octal string falls back to
    /// `default`.
    pub fn to_mode(&self, default: u32) -> u32 {
        match self {
            ModeArg::Number(n) => *n,
            ModeArg::Octal(s) => u32::from_str_radix(s, 8).unwrap_or(default),
        }
    }

    /// Like [`ModeArg::to_mode`], but an unparsable string is EINVAL.
    /// Used by the `chmod` family, which has no sensible default.
    pub fn to_mode_strict(&self) -> FsResult<u32> {
        match self {
            ModeArg::Number(n) => Ok(*n),
            ModeArg::Octal(s) => u32::from_str_radix(s, 8)
                .map_err(|_| ApiError::invalid_argument("Invalid mode.")),
        }
    }
}

impl From<u32> for ModeArg {
    fn from(n: u32) -> ModeArg {
        ModeArg::Number(n)
    }
}

impl From<&str> for ModeArg {
    fn from(s: &str) -> ModeArg {
        ModeArg::Octal(s.to_string())
    }
}

impl From<String> for ModeArg {
    fn from(s: String) -> ModeArg {
        ModeArg::Octal(s)
    }
}

/// A file timestamp: epoch seconds, or a calendar timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeArg {
    Seconds(f64),
    Timestamp(SystemTime),
}

impl TimeArg {
    /// Canonical timestamp; a non-finite or negative seconds value is
    /// EINVAL.
    pub fn to_timestamp(&self) -> FsResult<SystemTime> {
        match self {
            TimeArg::Timestamp(t) => Ok(*t),
            TimeArg::Seconds(s) if s.is_finite() && *s >= 0.0 => {
                Ok(UNIX_EPOCH + Duration::from_secs_f64(*s))
            }
            TimeArg::Seconds(_) => Err(ApiError::invalid_argument("Invalid time.")),
        }
    }
}

impl From<f64> for TimeArg {
    fn from(s: f64) -> TimeArg {
        TimeArg::Seconds(s)
    }
}

impl From<u64> for TimeArg {
    fn from(s: u64) -> TimeArg {
        TimeArg::Seconds(s as f64)
    }
}

impl From<SystemTime> for TimeArg {
    fn from(t: SystemTime) -> TimeArg {
        TimeArg::Timestamp(t)
    }
}

/// File content for whole-file writes: raw bytes, or text encoded at the
/// call boundary.
#[derive(Debug, Clone)]
pub enum FileData {
    Buffer(Buffer),
    Text(String),
}

impl FileData {
    pub fn into_buffer(self, encoding: &str) -> FsResult<Buffer> {
        match self {
            FileData::Buffer(buf) => Ok(buf),
            FileData::Text(text) => Ok(Buffer::from_text(&text, encoding)?),
        }
    }
}

impl From<Buffer> for FileData {
    fn from(buf: Buffer) -> FileData {
        FileData::Buffer(buf)
    }
}

impl From<&str> for FileData {
    fn from(text: &str) -> FileData {
        FileData::Text(text.to_string())
    }
}

impl From<String> for FileData {
    fn from(text: String) -> FileData {
        FileData::Text(text)
    }
}

impl From<&[u8]> for FileData {
    fn from(data: &[u8]) -> FileData {
        FileData::Buffer(Buffer::from_slice(data))
    }
}

#[derive(Debug, Clone)]
pub struct ReadFileOptions {
    /// Encoding for the text variants; `None` means raw bytes.
    pub encoding: Option<String>,
    pub flag: String,
}

impl Default for ReadFileOptions {
    fn default() -> Self {
        ReadFileOptions {
            encoding: None,
            flag: "r".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteFileOptions {
    pub encoding: String,
    pub flag: String,
    pub mode: ModeArg,
}

impl Default for WriteFileOptions {
    fn default() -> Self {
        WriteFileOptions {
            encoding: "utf8".to_string(),
            flag: "w".to_string(),
            mode: ModeArg::Number(0o644),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppendFileOptions {
    pub encoding: String,
    pub flag: String,
    pub mode: ModeArg,
}

impl Default for AppendFileOptions {
    fn default() -> Self {
        AppendFileOptions {
            encoding: "utf8".to_string(),
            flag: "a".to_string(),
            mode: ModeArg::Number(0o644),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadStreamOptions {
    /// Decode chunks as text under this encoding instead of yielding bytes.
    pub encoding: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_coercion_defaults_on_bad_octal() {
        assert_eq!(ModeArg::from(0o755).to_mode(0o644), 0o755);
        assert_eq!(ModeArg::from("755").to_mode(0o644), 0o755);
        assert_eq!(ModeArg::from("not-octal").to_mode(0o644), 0o644);
    }

    #[test]
    fn strict_mode_rejects_bad_octal() {
        assert_eq!(ModeArg::from("700").to_mode_strict().unwrap(), 0o700);
        assert!(ModeArg::from("9z").to_mode_strict().is_err());
    }

    #[test]
    fn time_coercion() {
        let t = TimeArg::from(2.0).to_timestamp().unwrap();
        assert_eq!(t, UNIX_EPOCH + Duration::from_secs(2));

        let now = SystemTime::now();
        assert_eq!(TimeArg::from(now).to_timestamp().unwrap(), now);

        assert!(TimeArg::Seconds(f64::NAN).to_timestamp().is_err());
        assert!(TimeArg::Seconds(-1.0).to_timestamp().is_err());
    }

    #[test]
    fn file_data_encodes_text() {
        let buf = FileData::from("hi").into_buffer("utf8").unwrap();
        assert_eq!(buf.to_vec(), b"hi".to_vec());

        let raw = Buffer::from_slice(&[1, 2]);
        let buf = FileData::from(raw.clone()).into_buffer("utf8").unwrap();
        assert!(buf.equals(&raw));
    }
}
