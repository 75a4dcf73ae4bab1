//! The open-file capability.

use std::time::SystemTime;

use async_trait::async_trait;
use portfs_buf::Buffer;

use crate::api_error::FsResult;
use crate::stats::Stats;
use crate::task;

/// An open file handle, as produced by a backend's `open`.
///
/// Every operation comes in a sync/async pair; the async defaults defer one
/// scheduling tick and run the sync form, so a backend only overrides the
/// `_async` methods when it has genuinely asynchronous I/O underneath.
///
/// Positional `read`/`write` take `position: None` to mean "use the
/// handle's tracked cursor"; the handle advances its cursor exactly when
/// the position was implicit. Append-mode handles write at end-of-file and
/// move the cursor there regardless.
#[async_trait]
pub trait File: Send + Sync + std::fmt::Debug {
    fn stat(&self) -> FsResult<Stats>;

    async fn stat_async(&self) -> FsResult<Stats> {
        task::defer().await;
        self.stat()
    }

    fn close(&mut self) -> FsResult<()>;

    async fn close_async(&mut self) -> FsResult<()> {
        task::defer().await;
        self.close()
    }

    fn truncate(&mut self, len: u64) -> FsResult<()>;

    async fn truncate_async(&mut self, len: u64) -> FsResult<()> {
        task::defer().await;
        self.truncate(len)
    }

    fn sync(&mut self) -> FsResult<()>;

    async fn sync_async(&mut self) -> FsResult<()> {
        task::defer().await;
        self.sync()
    }

    fn datasync(&mut self) -> FsResult<()> {
        self.sync()
    }

    async fn datasync_async(&mut self) -> FsResult<()> {
        task::defer().await;
        self.datasync()
    }

    /// Writes `length` bytes of `buffer` starting at `offset` into the file
    /// at `position` (or the cursor when `None`); returns bytes written.
    fn write(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize>;

    async fn write_async(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        task::defer().await;
        self.write(buffer, offset, length, position)
    }

    /// Reads up to `length` bytes from the file at `position` (or the
    /// cursor when `None`) into `buffer` at `offset`; returns bytes read,
    /// clamped at end-of-file.
    fn read(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize>;

    async fn read_async(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        task::defer().await;
        self.read(buffer, offset, length, position)
    }

    fn chown(&mut self, uid: u32, gid: u32) -> FsResult<()>;

    async fn chown_async(&mut self, uid: u32, gid: u32) -> FsResult<()> {
        task::defer().await;
        self.chown(uid, gid)
    }

    fn chmod(&mut self, mode: u32) -> FsResult<()>;

    async fn chmod_async(&mut self, mode: u32) -> FsResult<()> {
        task::defer().await;
        self.chmod(mode)
    }

    fn utimes(&mut self, atime: SystemTime, mtime: SystemTime) -> FsResult<()>;

    async fn utimes_async(&mut self, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        task::defer().await;
        self.utimes(atime, mtime)
    }

    /// The handle's current cursor position.
    fn get_pos(&self) -> u64;
}
