//! In-memory backend.
//!
//! [`MemFs`] keeps a whole filesystem in process memory: structure in a
//! `portfs_index::FileIndex`, content in `portfs_buf::Buffer`s. Nothing
//! persists past the value's lifetime. It implements only the primitive
//! operations; content operations come from the `FileSystem` defaults.

mod file;
mod fs;

pub use file::MemFile;
pub use fs::{MemFs, MemNode};
