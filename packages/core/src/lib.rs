//! Filesystem dispatch over pluggable backends.
//!
//! The [`Fs`] dispatcher fronts a single [`FileSystem`] backend: it owns
//! the file-descriptor table, normalizes and validates paths, flags, modes
//! and timestamps, and offers every operation both synchronously and as an
//! `_async` twin that defers one scheduling tick before running.
//!
//! Backends implement [`FileSystem`] (path-level operations) and [`File`]
//! (handle-level operations); most content operations have defaults
//! derived from `open`, so a minimal backend implements only the
//! primitives.

mod api_error;
mod backend;
mod file;
mod flag;
mod fs;
mod hook;
mod options;
pub mod path;
mod stats;
pub mod task;

pub use api_error::{ApiError, ErrorCode, FsResult};
pub use backend::{FileSystem, SymlinkType};
pub use file::File;
pub use flag::{ActionType, FileFlag};
pub use fs::{Fd, Fs, ReadStream, StreamChunk, FIRST_FD};
pub use hook::OpHook;
pub use options::{
    AppendFileOptions, FileData, ModeArg, ReadFileOptions, ReadStreamOptions, TimeArg,
    WriteFileOptions,
};
pub use stats::{FileType, Stats};
