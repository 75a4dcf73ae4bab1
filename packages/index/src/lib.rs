//! Inode-indexed directory trees.
//!
//! A [`FileIndex`] maps absolute directory paths to shared [`DirInode`]
//! nodes whose listings hold the files. Backends that know their namespace
//! up front (a JSON listing, an archive's table of contents, an in-memory
//! tree) keep one of these and attach their own payload type to each node.

mod index;
mod inode;

pub use index::FileIndex;
pub use inode::{DirInode, FileInode, Inode};
