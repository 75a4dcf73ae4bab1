//! Portable virtual filesystem.
//!
//! One crate pulling the pieces together: the [`Fs`] dispatcher and its
//! backend traits from `portfs-core`, the [`buf::Buffer`] byte layer, the
//! [`index::FileIndex`] directory index, and the in-memory [`mem::MemFs`]
//! backend.
//!
//! ```
//! use portfs::{Fs, WriteFileOptions, ReadFileOptions};
//! use portfs::mem::MemFs;
//!
//! # fn main() -> Result<(), portfs::ApiError> {
//! let fs = Fs::new(Box::new(MemFs::new()))?;
//! fs.write_file("/greeting", "hello", &WriteFileOptions::default())?;
//! let text = fs.read_file_text("/greeting", &ReadFileOptions::default())?;
//! assert_eq!(text, "hello");
//! # Ok(())
//! # }
//! ```

pub use portfs_buf as buf;
pub use portfs_index as index;
pub use portfs_mem as mem;

pub use portfs_core::{
    path, task, ActionType, ApiError, AppendFileOptions, ErrorCode, Fd, File, FileData, FileFlag,
    FileSystem, FileType, Fs, FsResult, ModeArg, OpHook, ReadFileOptions, ReadStream,
    ReadStreamOptions, Stats, StreamChunk, SymlinkType, TimeArg, WriteFileOptions, FIRST_FD,
};

pub use portfs_buf::Buffer;
