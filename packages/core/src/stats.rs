//! Stat records.

use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// The result of a `stat` call.
///
/// `size` is `None` when the backend does not know the file's size, which
/// happens for entries built from a directory listing that carries no
/// per-file sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub file_type: FileType,
    pub size: Option<u64>,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Stats {
    pub fn new(file_type: FileType, size: Option<u64>, mode: u32) -> Stats {
        let now = SystemTime::now();
        Stats {
            file_type,
            size,
            mode,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// A regular file with the default file mode.
    pub fn file(size: u64) -> Stats {
        Stats::new(FileType::File, Some(size), 0o644)
    }

    /// A directory. Directories report the conventional 4096-byte size.
    pub fn directory() -> Stats {
        Stats::new(FileType::Directory, Some(4096), 0o777)
    }

    /// A file whose size is unknown, as produced by listing ingestion.
    /// Listing-derived entries are read-only.
    pub fn unknown_size_file() -> Stats {
        Stats::new(FileType::File, None, 0o555)
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}
