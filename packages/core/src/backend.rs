//! The backend filesystem capability.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use portfs_buf::Buffer;

use crate::api_error::{ApiError, ErrorCode, FsResult};
use crate::file::File;
use crate::flag::FileFlag;
use crate::stats::Stats;
use crate::task;

/// The kind of node a symlink points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkType {
    File,
    Dir,
}

/// A path-resolving filesystem backend, the dispatcher's single delegate.
///
/// All paths arriving here are absolute and normalized; the dispatcher has
/// already rejected empty and NUL-bearing paths and validated flags.
///
/// Only the primitive operations are required. The content operations
/// (`truncate`, `read_file`, `write_file`, `append_file`) have defaults
/// derived from `open`; `exists` derives from `stat`; `realpath` from the
/// cache and `exists`; the link and ownership families default to ENOTSUP.
/// Every `_async` method defaults to a one-tick deferral followed by the
/// sync form.
#[async_trait]
pub trait FileSystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the backend can run in this environment. The dispatcher
    /// refuses to initialize with an unavailable backend.
    fn is_available(&self) -> bool {
        true
    }

    fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()>;

    async fn rename_async(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        task::defer().await;
        self.rename(old_path, new_path)
    }

    fn stat(&self, path: &str, follow_links: bool) -> FsResult<Stats>;

    async fn stat_async(&self, path: &str, follow_links: bool) -> FsResult<Stats> {
        task::defer().await;
        self.stat(path, follow_links)
    }

    fn open(&self, path: &str, flag: FileFlag, mode: u32) -> FsResult<Box<dyn File>>;

    async fn open_async(&self, path: &str, flag: FileFlag, mode: u32) -> FsResult<Box<dyn File>> {
        task::defer().await;
        self.open(path, flag, mode)
    }

    fn unlink(&self, path: &str) -> FsResult<()>;

    async fn unlink_async(&self, path: &str) -> FsResult<()> {
        task::defer().await;
        self.unlink(path)
    }

    fn rmdir(&self, path: &str) -> FsResult<()>;

    async fn rmdir_async(&self, path: &str) -> FsResult<()> {
        task::defer().await;
        self.rmdir(path)
    }

    fn mkdir(&self, path: &str, mode: u32) -> FsResult<()>;

    async fn mkdir_async(&self, path: &str, mode: u32) -> FsResult<()> {
        task::defer().await;
        self.mkdir(path, mode)
    }

    fn readdir(&self, path: &str) -> FsResult<Vec<String>>;

    async fn readdir_async(&self, path: &str) -> FsResult<Vec<String>> {
        task::defer().await;
        self.readdir(path)
    }

    fn truncate(&self, path: &str, len: u64) -> FsResult<()> {
        let mut file = self.open(path, FileFlag::parse("r+")?, 0o644)?;
        let result = file.truncate(len);
        result.and(file.close())
    }

    async fn truncate_async(&self, path: &str, len: u64) -> FsResult<()> {
        task::defer().await;
        self.truncate(path, len)
    }

    fn read_file(&self, path: &str, flag: FileFlag) -> FsResult<Buffer> {
        let mut file = self.open(path, flag, 0o644)?;
        let result = read_all(file.as_mut());
        let closed = file.close();
        match result {
            Ok(buffer) => closed.map(|_| buffer),
            Err(e) => Err(e),
        }
    }

    async fn read_file_async(&self, path: &str, flag: FileFlag) -> FsResult<Buffer> {
        task::defer().await;
        self.read_file(path, flag)
    }

    fn write_file(&self, path: &str, data: &Buffer, flag: FileFlag, mode: u32) -> FsResult<()> {
        let mut file = self.open(path, flag, mode)?;
        let result = file.write(data, 0, data.len(), Some(0)).map(|_| ());
        result.and(file.close())
    }

    async fn write_file_async(
        &self,
        path: &str,
        data: &Buffer,
        flag: FileFlag,
        mode: u32,
    ) -> FsResult<()> {
        task::defer().await;
        self.write_file(path, data, flag, mode)
    }

    fn append_file(&self, path: &str, data: &Buffer, flag: FileFlag, mode: u32) -> FsResult<()> {
        let mut file = self.open(path, flag, mode)?;
        let result = file.write(data, 0, data.len(), None).map(|_| ());
        result.and(file.close())
    }

    async fn append_file_async(
        &self,
        path: &str,
        data: &Buffer,
        flag: FileFlag,
        mode: u32,
    ) -> FsResult<()> {
        task::defer().await;
        self.append_file(path, data, flag, mode)
    }

    fn link(&self, _src_path: &str, _dst_path: &str) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    async fn link_async(&self, src_path: &str, dst_path: &str) -> FsResult<()> {
        task::defer().await;
        self.link(src_path, dst_path)
    }

    fn symlink(&self, _src_path: &str, _dst_path: &str, _kind: SymlinkType) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    async fn symlink_async(&self, src_path: &str, dst_path: &str, kind: SymlinkType) -> FsResult<()> {
        task::defer().await;
        self.symlink(src_path, dst_path, kind)
    }

    fn readlink(&self, _path: &str) -> FsResult<String> {
        Err(ApiError::not_supported())
    }

    async fn readlink_async(&self, path: &str) -> FsResult<String> {
        task::defer().await;
        self.readlink(path)
    }

    fn chown(&self, _path: &str, _follow_links: bool, _uid: u32, _gid: u32) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    async fn chown_async(&self, path: &str, follow_links: bool, uid: u32, gid: u32) -> FsResult<()> {
        task::defer().await;
        self.chown(path, follow_links, uid, gid)
    }

    fn chmod(&self, _path: &str, _follow_links: bool, _mode: u32) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    async fn chmod_async(&self, path: &str, follow_links: bool, mode: u32) -> FsResult<()> {
        task::defer().await;
        self.chmod(path, follow_links, mode)
    }

    fn utimes(&self, _path: &str, _atime: SystemTime, _mtime: SystemTime) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    async fn utimes_async(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        task::defer().await;
        self.utimes(path, atime, mtime)
    }

    fn realpath(&self, path: &str, cache: &HashMap<String, String>) -> FsResult<String> {
        if let Some(resolved) = cache.get(path) {
            return Ok(resolved.clone());
        }
        if self.exists(path) {
            Ok(path.to_string())
        } else {
            Err(ApiError::not_found(path))
        }
    }

    async fn realpath_async(&self, path: &str, cache: &HashMap<String, String>) -> FsResult<String> {
        task::defer().await;
        self.realpath(path, cache)
    }

    fn exists(&self, path: &str) -> bool {
        self.stat(path, false).is_ok()
    }

    async fn exists_async(&self, path: &str) -> bool {
        task::defer().await;
        self.exists(path)
    }
}

fn read_all(file: &mut dyn File) -> FsResult<Buffer> {
    let stats = file.stat()?;
    let size = stats.size.ok_or_else(|| {
        ApiError::with_message(ErrorCode::EIO, "Backend did not report a file size.")
    })? as usize;
    let buffer = Buffer::alloc(size);
    file.read(&buffer, 0, size, Some(0))?;
    Ok(buffer)
}
