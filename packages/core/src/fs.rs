//! The filesystem dispatcher.
//!
//! [`Fs`] is the single front door to a backend filesystem. It owns the
//! file-descriptor table, validates and normalizes every argument before
//! anything reaches the backend, and exposes each operation as a
//! synchronous method plus an `_async` twin with identical validation.
//!
//! Async twins defer one scheduling tick, delegate to the backend's
//! `_async` form, and report their terminal result to the optional
//! interception hook. They never panic past the dispatcher: validation
//! failures travel through the returned `Result` like backend failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::debug;
use portfs_buf::Buffer;

use crate::api_error::{ApiError, FsResult};
use crate::backend::{FileSystem, SymlinkType};
use crate::file::File;
use crate::flag::FileFlag;
use crate::hook::OpHook;
use crate::options::{
    AppendFileOptions, FileData, ModeArg, ReadFileOptions, ReadStreamOptions, TimeArg,
    WriteFileOptions,
};
use crate::path;
use crate::stats::Stats;
use crate::task;

/// A file descriptor: an opaque integer handle into the dispatcher's table.
pub type Fd = u64;

/// First descriptor handed out; stays clear of the conventional stdio
/// handles 0-2, which are not separately modeled.
pub const FIRST_FD: Fd = 100;

const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o777;

fn normalize_path(p: &str) -> FsResult<String> {
    if p.contains('\0') {
        Err(ApiError::invalid_argument(
            "Path must be a string without null bytes.",
        ))
    } else if p.is_empty() {
        Err(ApiError::invalid_argument("Path must not be empty."))
    } else {
        Ok(path::resolve(p))
    }
}

/// One chunk from a [`ReadStream`]: bytes, or text when the stream was
/// opened with an encoding.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    Data(Buffer),
    Text(String),
}

/// Minimal read-only stream. The whole file is read eagerly at
/// construction and yielded as a single chunk on the next scheduling tick;
/// partial or backpressured reads are not supported.
#[derive(Debug)]
pub struct ReadStream {
    chunk: Option<StreamChunk>,
}

impl ReadStream {
    /// The single content chunk, then `None` forever after.
    pub async fn next(&mut self) -> Option<StreamChunk> {
        task::defer().await;
        self.chunk.take()
    }
}

pub struct Fs {
    root: Box<dyn FileSystem>,
    fds: Mutex<HashMap<Fd, Box<dyn File>>>,
    next_fd: AtomicU64,
    hook: Option<Box<dyn OpHook>>,
}

impl Fs {
    pub const F_OK: u32 = 0;
    pub const R_OK: u32 = 4;
    pub const W_OK: u32 = 2;
    pub const X_OK: u32 = 1;

    /// Initializes a dispatcher over `root`. A backend whose availability
    /// probe fails is EINVAL.
    pub fn new(root: Box<dyn FileSystem>) -> FsResult<Fs> {
        Fs::build(root, None)
    }

    /// Like [`Fs::new`], with an interception hook observing every
    /// asynchronous operation's terminal result.
    pub fn with_hook(root: Box<dyn FileSystem>, hook: Box<dyn OpHook>) -> FsResult<Fs> {
        Fs::build(root, Some(hook))
    }

    fn build(root: Box<dyn FileSystem>, hook: Option<Box<dyn OpHook>>) -> FsResult<Fs> {
        if !root.is_available() {
            return Err(ApiError::invalid_argument(
                "Tried to initialize with an unavailable file system.",
            ));
        }
        debug!("initialized dispatcher over backend '{}'", root.name());
        Ok(Fs {
            root,
            fds: Mutex::new(HashMap::new()),
            next_fd: AtomicU64::new(FIRST_FD),
            hook,
        })
    }

    /// The backend this dispatcher was initialized with.
    pub fn root_fs(&self) -> &dyn FileSystem {
        self.root.as_ref()
    }

    fn finish<T>(&self, op: &'static str, result: FsResult<T>) -> FsResult<T> {
        if let Some(hook) = &self.hook {
            hook.on_complete(op, result.as_ref().err());
        }
        result
    }

    fn register_fd(&self, file: Box<dyn File>) -> Fd {
        let fd = self.next_fd.fetch_add(1, Ordering::SeqCst);
        self.fds
            .lock()
            .expect("descriptor table lock poisoned")
            .insert(fd, file);
        fd
    }

    fn with_fd<T>(&self, fd: Fd, f: impl FnOnce(&mut dyn File) -> FsResult<T>) -> FsResult<T> {
        let mut fds = self.fds.lock().expect("descriptor table lock poisoned");
        match fds.get_mut(&fd) {
            Some(file) => f(file.as_mut()),
            None => Err(ApiError::bad_fd()),
        }
    }

    // File and directory operations.

    pub fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        self.root
            .rename(&normalize_path(old_path)?, &normalize_path(new_path)?)
    }

    pub async fn rename_async(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .rename_async(&normalize_path(old_path)?, &normalize_path(new_path)?)
                .await
        }
        .await;
        self.finish("rename", result)
    }

    /// Whether `path` exists. Never errors: any failure, including a path
    /// error, reports as "does not exist".
    pub fn exists(&self, path: &str) -> bool {
        match normalize_path(path) {
            Ok(p) => self.root.exists(&p),
            Err(_) => false,
        }
    }

    pub async fn exists_async(&self, path: &str) -> bool {
        task::defer().await;
        let found = match normalize_path(path) {
            Ok(p) => self.root.exists_async(&p).await,
            Err(_) => false,
        };
        if let Some(hook) = &self.hook {
            hook.on_complete("exists", None);
        }
        found
    }

    pub fn stat(&self, path: &str) -> FsResult<Stats> {
        self.root.stat(&normalize_path(path)?, true)
    }

    pub async fn stat_async(&self, path: &str) -> FsResult<Stats> {
        let result = async {
            task::defer().await;
            self.root.stat_async(&normalize_path(path)?, true).await
        }
        .await;
        self.finish("stat", result)
    }

    /// Like `stat`, but a trailing symlink is stat-ed itself rather than
    /// followed.
    pub fn lstat(&self, path: &str) -> FsResult<Stats> {
        self.root.stat(&normalize_path(path)?, false)
    }

    pub async fn lstat_async(&self, path: &str) -> FsResult<Stats> {
        let result = async {
            task::defer().await;
            self.root.stat_async(&normalize_path(path)?, false).await
        }
        .await;
        self.finish("lstat", result)
    }

    pub fn truncate(&self, path: &str, len: u64) -> FsResult<()> {
        self.root.truncate(&normalize_path(path)?, len)
    }

    pub async fn truncate_async(&self, path: &str, len: u64) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root.truncate_async(&normalize_path(path)?, len).await
        }
        .await;
        self.finish("truncate", result)
    }

    pub fn unlink(&self, path: &str) -> FsResult<()> {
        self.root.unlink(&normalize_path(path)?)
    }

    pub async fn unlink_async(&self, path: &str) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root.unlink_async(&normalize_path(path)?).await
        }
        .await;
        self.finish("unlink", result)
    }

    /// Opens `path` under the given flag string, allocating a descriptor.
    /// `mode` defaults to `0o644`.
    pub fn open(&self, path: &str, flag: &str, mode: Option<ModeArg>) -> FsResult<Fd> {
        let flag = FileFlag::parse(flag)?;
        let mode = mode
            .map(|m| m.to_mode(DEFAULT_FILE_MODE))
            .unwrap_or(DEFAULT_FILE_MODE);
        let file = self.root.open(&normalize_path(path)?, flag, mode)?;
        Ok(self.register_fd(file))
    }

    pub async fn open_async(&self, path: &str, flag: &str, mode: Option<ModeArg>) -> FsResult<Fd> {
        let result = async {
            task::defer().await;
            let flag = FileFlag::parse(flag)?;
            let mode = mode
                .map(|m| m.to_mode(DEFAULT_FILE_MODE))
                .unwrap_or(DEFAULT_FILE_MODE);
            let file = self.root.open_async(&normalize_path(path)?, flag, mode).await?;
            Ok(self.register_fd(file))
        }
        .await;
        self.finish("open", result)
    }

    pub fn read_file(&self, path: &str, options: &ReadFileOptions) -> FsResult<Buffer> {
        let flag = FileFlag::parse(&options.flag)?;
        if !flag.is_readable() {
            return Err(ApiError::invalid_argument(
                "Flag passed to read_file must allow for reading.",
            ));
        }
        self.root.read_file(&normalize_path(path)?, flag)
    }

    pub async fn read_file_async(&self, path: &str, options: &ReadFileOptions) -> FsResult<Buffer> {
        let result = async {
            task::defer().await;
            let flag = FileFlag::parse(&options.flag)?;
            if !flag.is_readable() {
                return Err(ApiError::invalid_argument(
                    "Flag passed to read_file must allow for reading.",
                ));
            }
            self.root.read_file_async(&normalize_path(path)?, flag).await
        }
        .await;
        self.finish("read_file", result)
    }

    /// Whole-file read decoded as text under the options' encoding
    /// (default utf8).
    pub fn read_file_text(&self, path: &str, options: &ReadFileOptions) -> FsResult<String> {
        let buffer = self.read_file(path, options)?;
        let encoding = options.encoding.as_deref().unwrap_or("utf8");
        Ok(buffer.to_text(encoding, 0, buffer.len())?)
    }

    pub async fn read_file_text_async(
        &self,
        path: &str,
        options: &ReadFileOptions,
    ) -> FsResult<String> {
        let result = async {
            task::defer().await;
            let flag = FileFlag::parse(&options.flag)?;
            if !flag.is_readable() {
                return Err(ApiError::invalid_argument(
                    "Flag passed to read_file must allow for reading.",
                ));
            }
            let buffer = self.root.read_file_async(&normalize_path(path)?, flag).await?;
            let encoding = options.encoding.as_deref().unwrap_or("utf8");
            Ok(buffer.to_text(encoding, 0, buffer.len())?)
        }
        .await;
        self.finish("read_file_text", result)
    }

    pub fn write_file(
        &self,
        path: &str,
        data: impl Into<FileData>,
        options: &WriteFileOptions,
    ) -> FsResult<()> {
        let flag = FileFlag::parse(&options.flag)?;
        if !flag.is_writeable() {
            return Err(ApiError::invalid_argument(
                "Flag passed to write_file must allow for writing.",
            ));
        }
        let buffer = data.into().into_buffer(&options.encoding)?;
        let mode = options.mode.to_mode(DEFAULT_FILE_MODE);
        self.root
            .write_file(&normalize_path(path)?, &buffer, flag, mode)
    }

    pub async fn write_file_async(
        &self,
        path: &str,
        data: impl Into<FileData>,
        options: &WriteFileOptions,
    ) -> FsResult<()> {
        let data = data.into();
        let result = async {
            task::defer().await;
            let flag = FileFlag::parse(&options.flag)?;
            if !flag.is_writeable() {
                return Err(ApiError::invalid_argument(
                    "Flag passed to write_file must allow for writing.",
                ));
            }
            let buffer = data.into_buffer(&options.encoding)?;
            let mode = options.mode.to_mode(DEFAULT_FILE_MODE);
            self.root
                .write_file_async(&normalize_path(path)?, &buffer, flag, mode)
                .await
        }
        .await;
        self.finish("write_file", result)
    }

    pub fn append_file(
        &self,
        path: &str,
        data: impl Into<FileData>,
        options: &AppendFileOptions,
    ) -> FsResult<()> {
        let flag = FileFlag::parse(&options.flag)?;
        if !flag.is_appendable() {
            return Err(ApiError::invalid_argument(
                "Flag passed to append_file must allow for appending.",
            ));
        }
        let buffer = data.into().into_buffer(&options.encoding)?;
        let mode = options.mode.to_mode(DEFAULT_FILE_MODE);
        self.root
            .append_file(&normalize_path(path)?, &buffer, flag, mode)
    }

    pub async fn append_file_async(
        &self,
        path: &str,
        data: impl Into<FileData>,
        options: &AppendFileOptions,
    ) -> FsResult<()> {
        let data = data.into();
        let result = async {
            task::defer().await;
            let flag = FileFlag::parse(&options.flag)?;
            if !flag.is_appendable() {
                return Err(ApiError::invalid_argument(
                    "Flag passed to append_file must allow for appending.",
                ));
            }
            let buffer = data.into_buffer(&options.encoding)?;
            let mode = options.mode.to_mode(DEFAULT_FILE_MODE);
            self.root
                .append_file_async(&normalize_path(path)?, &buffer, flag, mode)
                .await
        }
        .await;
        self.finish("append_file", result)
    }

    // File descriptor operations.

    pub fn fstat(&self, fd: Fd) -> FsResult<Stats> {
        self.with_fd(fd, |file| file.stat())
    }

    pub async fn fstat_async(&self, fd: Fd) -> FsResult<Stats> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.stat())
        }
        .await;
        self.finish("fstat", result)
    }

    /// Closes the descriptor. The handle leaves the table only after the
    /// backend confirms the close succeeded; a failed close leaves it
    /// allocated.
    pub fn close(&self, fd: Fd) -> FsResult<()> {
        let mut fds = self.fds.lock().expect("descriptor table lock poisoned");
        let file = fds.get_mut(&fd).ok_or_else(ApiError::bad_fd)?;
        file.close()?;
        fds.remove(&fd);
        Ok(())
    }

    pub async fn close_async(&self, fd: Fd) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.close(fd)
        }
        .await;
        self.finish("close", result)
    }

    pub fn ftruncate(&self, fd: Fd, len: u64) -> FsResult<()> {
        self.with_fd(fd, |file| file.truncate(len))
    }

    pub async fn ftruncate_async(&self, fd: Fd, len: u64) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.truncate(len))
        }
        .await;
        self.finish("ftruncate", result)
    }

    pub fn fsync(&self, fd: Fd) -> FsResult<()> {
        self.with_fd(fd, |file| file.sync())
    }

    pub async fn fsync_async(&self, fd: Fd) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.sync())
        }
        .await;
        self.finish("fsync", result)
    }

    pub fn fdatasync(&self, fd: Fd) -> FsResult<()> {
        self.with_fd(fd, |file| file.datasync())
    }

    pub async fn fdatasync_async(&self, fd: Fd) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.datasync())
        }
        .await;
        self.finish("fdatasync", result)
    }

    /// Writes `length` bytes of `buffer` from `offset` at `position`, or at
    /// the handle's cursor when `position` is `None` (the cursor then
    /// advances past the written bytes).
    pub fn write(
        &self,
        fd: Fd,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        self.with_fd(fd, |file| file.write(buffer, offset, length, position))
    }

    pub async fn write_async(
        &self,
        fd: Fd,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.write(buffer, offset, length, position))
        }
        .await;
        self.finish("write", result)
    }

    /// Legacy string write: encodes `text` and writes it at `position` (or
    /// the cursor); returns bytes written.
    pub fn write_str(
        &self,
        fd: Fd,
        text: &str,
        position: Option<u64>,
        encoding: &str,
    ) -> FsResult<usize> {
        let buffer = Buffer::from_text(text, encoding)?;
        let length = buffer.len();
        self.with_fd(fd, |file| file.write(&buffer, 0, length, position))
    }

    pub async fn write_str_async(
        &self,
        fd: Fd,
        text: &str,
        position: Option<u64>,
        encoding: &str,
    ) -> FsResult<usize> {
        let result = async {
            task::defer().await;
            self.write_str(fd, text, position, encoding)
        }
        .await;
        self.finish("write_str", result)
    }

    /// Reads up to `length` bytes into `buffer` at `offset`, from
    /// `position` or the handle's cursor; returns bytes read.
    pub fn read(
        &self,
        fd: Fd,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        self.with_fd(fd, |file| file.read(buffer, offset, length, position))
    }

    pub async fn read_async(
        &self,
        fd: Fd,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.read(buffer, offset, length, position))
        }
        .await;
        self.finish("read", result)
    }

    /// Legacy string read: reads up to `length` bytes and decodes what was
    /// read; returns the text and the byte count.
    pub fn read_str(
        &self,
        fd: Fd,
        length: usize,
        position: Option<u64>,
        encoding: &str,
    ) -> FsResult<(String, usize)> {
        let buffer = Buffer::alloc(length);
        let read = self.with_fd(fd, |file| file.read(&buffer, 0, length, position))?;
        let text = buffer.to_text(encoding, 0, read)?;
        Ok((text, read))
    }

    pub async fn read_str_async(
        &self,
        fd: Fd,
        length: usize,
        position: Option<u64>,
        encoding: &str,
    ) -> FsResult<(String, usize)> {
        let result = async {
            task::defer().await;
            self.read_str(fd, length, position, encoding)
        }
        .await;
        self.finish("read_str", result)
    }

    pub fn fchown(&self, fd: Fd, uid: u32, gid: u32) -> FsResult<()> {
        self.with_fd(fd, |file| file.chown(uid, gid))
    }

    pub async fn fchown_async(&self, fd: Fd, uid: u32, gid: u32) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.with_fd(fd, |file| file.chown(uid, gid))
        }
        .await;
        self.finish("fchown", result)
    }

    pub fn fchmod(&self, fd: Fd, mode: ModeArg) -> FsResult<()> {
        let mode = mode.to_mode_strict()?;
        self.with_fd(fd, |file| file.chmod(mode))
    }

    pub async fn fchmod_async(&self, fd: Fd, mode: ModeArg) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.fchmod(fd, mode)
        }
        .await;
        self.finish("fchmod", result)
    }

    pub fn futimes(&self, fd: Fd, atime: TimeArg, mtime: TimeArg) -> FsResult<()> {
        let atime = atime.to_timestamp()?;
        let mtime = mtime.to_timestamp()?;
        self.with_fd(fd, |file| file.utimes(atime, mtime))
    }

    pub async fn futimes_async(&self, fd: Fd, atime: TimeArg, mtime: TimeArg) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.futimes(fd, atime, mtime)
        }
        .await;
        self.finish("futimes", result)
    }

    // Directory operations.

    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        self.root.rmdir(&normalize_path(path)?)
    }

    pub async fn rmdir_async(&self, path: &str) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root.rmdir_async(&normalize_path(path)?).await
        }
        .await;
        self.finish("rmdir", result)
    }

    /// Creates a directory. `mode` defaults to `0o777`.
    pub fn mkdir(&self, path: &str, mode: Option<ModeArg>) -> FsResult<()> {
        let mode = mode
            .map(|m| m.to_mode(DEFAULT_DIR_MODE))
            .unwrap_or(DEFAULT_DIR_MODE);
        self.root.mkdir(&normalize_path(path)?, mode)
    }

    pub async fn mkdir_async(&self, path: &str, mode: Option<ModeArg>) -> FsResult<()> {
        let result = async {
            task::defer().await;
            let mode = mode
                .map(|m| m.to_mode(DEFAULT_DIR_MODE))
                .unwrap_or(DEFAULT_DIR_MODE);
            self.root.mkdir_async(&normalize_path(path)?, mode).await
        }
        .await;
        self.finish("mkdir", result)
    }

    /// Names of the entries in a directory, excluding `.` and `..`.
    pub fn readdir(&self, path: &str) -> FsResult<Vec<String>> {
        self.root.readdir(&normalize_path(path)?)
    }

    pub async fn readdir_async(&self, path: &str) -> FsResult<Vec<String>> {
        let result = async {
            task::defer().await;
            self.root.readdir_async(&normalize_path(path)?).await
        }
        .await;
        self.finish("readdir", result)
    }

    // Symlink operations.

    pub fn link(&self, src_path: &str, dst_path: &str) -> FsResult<()> {
        self.root
            .link(&normalize_path(src_path)?, &normalize_path(dst_path)?)
    }

    pub async fn link_async(&self, src_path: &str, dst_path: &str) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .link_async(&normalize_path(src_path)?, &normalize_path(dst_path)?)
                .await
        }
        .await;
        self.finish("link", result)
    }

    pub fn symlink(&self, src_path: &str, dst_path: &str, kind: SymlinkType) -> FsResult<()> {
        self.root
            .symlink(&normalize_path(src_path)?, &normalize_path(dst_path)?, kind)
    }

    pub async fn symlink_async(
        &self,
        src_path: &str,
        dst_path: &str,
        kind: SymlinkType,
    ) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .symlink_async(&normalize_path(src_path)?, &normalize_path(dst_path)?, kind)
                .await
        }
        .await;
        self.finish("symlink", result)
    }

    pub fn readlink(&self, path: &str) -> FsResult<String> {
        self.root.readlink(&normalize_path(path)?)
    }

    pub async fn readlink_async(&self, path: &str) -> FsResult<String> {
        let result = async {
            task::defer().await;
            self.root.readlink_async(&normalize_path(path)?).await
        }
        .await;
        self.finish("readlink", result)
    }

    // Property operations.

    pub fn chown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        self.root.chown(&normalize_path(path)?, true, uid, gid)
    }

    pub async fn chown_async(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .chown_async(&normalize_path(path)?, true, uid, gid)
                .await
        }
        .await;
        self.finish("chown", result)
    }

    pub fn lchown(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        self.root.chown(&normalize_path(path)?, false, uid, gid)
    }

    pub async fn lchown_async(&self, path: &str, uid: u32, gid: u32) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .chown_async(&normalize_path(path)?, false, uid, gid)
                .await
        }
        .await;
        self.finish("lchown", result)
    }

    pub fn chmod(&self, path: &str, mode: ModeArg) -> FsResult<()> {
        let mode = mode.to_mode_strict()?;
        self.root.chmod(&normalize_path(path)?, true, mode)
    }

    pub async fn chmod_async(&self, path: &str, mode: ModeArg) -> FsResult<()> {
        let result = async {
            task::defer().await;
            let mode = mode.to_mode_strict()?;
            self.root
                .chmod_async(&normalize_path(path)?, true, mode)
                .await
        }
        .await;
        self.finish("chmod", result)
    }

    pub fn lchmod(&self, path: &str, mode: ModeArg) -> FsResult<()> {
        let mode = mode.to_mode_strict()?;
        self.root.chmod(&normalize_path(path)?, false, mode)
    }

    pub async fn lchmod_async(&self, path: &str, mode: ModeArg) -> FsResult<()> {
        let result = async {
            task::defer().await;
            let mode = mode.to_mode_strict()?;
            self.root
                .chmod_async(&normalize_path(path)?, false, mode)
                .await
        }
        .await;
        self.finish("lchmod", result)
    }

    pub fn utimes(&self, path: &str, atime: TimeArg, mtime: TimeArg) -> FsResult<()> {
        self.root.utimes(
            &normalize_path(path)?,
            atime.to_timestamp()?,
            mtime.to_timestamp()?,
        )
    }

    pub async fn utimes_async(&self, path: &str, atime: TimeArg, mtime: TimeArg) -> FsResult<()> {
        let result = async {
            task::defer().await;
            self.root
                .utimes_async(
                    &normalize_path(path)?,
                    atime.to_timestamp()?,
                    mtime.to_timestamp()?,
                )
                .await
        }
        .await;
        self.finish("utimes", result)
    }

    /// Resolves `path` through the backend's realpath, consulting `cache`
    /// for known resolutions first.
    pub fn realpath(&self, path: &str, cache: &HashMap<String, String>) -> FsResult<String> {
        self.root.realpath(&normalize_path(path)?, cache)
    }

    pub async fn realpath_async(
        &self,
        path: &str,
        cache: &HashMap<String, String>,
    ) -> FsResult<String> {
        let result = async {
            task::defer().await;
            self.root.realpath_async(&normalize_path(path)?, cache).await
        }
        .await;
        self.finish("realpath", result)
    }

    // Unsupported operations.

    pub fn access(&self, _path: &str, _mode: u32) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    pub async fn access_async(&self, _path: &str, _mode: u32) -> FsResult<()> {
        task::defer().await;
        self.finish("access", Err(ApiError::not_supported()))
    }

    pub fn watch(&self, _path: &str) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    pub fn watch_file(&self, _path: &str) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    pub fn unwatch_file(&self, _path: &str) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    pub fn create_write_stream(&self, _path: &str) -> FsResult<()> {
        Err(ApiError::not_supported())
    }

    /// Opens a read stream over `path`. The file is read in full here; the
    /// stream yields it as one chunk after a scheduling tick.
    pub fn create_read_stream(
        &self,
        path: &str,
        options: &ReadStreamOptions,
    ) -> FsResult<ReadStream> {
        let contents = self.read_file(path, &ReadFileOptions::default())?;
        let chunk = match &options.encoding {
            Some(encoding) => {
                StreamChunk::Text(contents.to_text(encoding, 0, contents.len())?)
            }
            None => StreamChunk::Data(contents),
        };
        Ok(ReadStream { chunk: Some(chunk) })
    }
}

impl std::fmt::Debug for Fs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fs")
            .field("backend", &self.root.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_error::ErrorCode;
    use async_trait::async_trait;

    struct StubFs {
        available: bool,
    }

    impl FileSystem for StubFs {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn is_available(&self) -> bool {
            self.available
        }

        fn rename(&self, _old: &str, _new: &str) -> FsResult<()> {
            Ok(())
        }

        fn stat(&self, path: &str, _follow_links: bool) -> FsResult<Stats> {
            if path == "/present" {
                Ok(Stats::file(0))
            } else {
                Err(ApiError::not_found(path))
            }
        }

        fn open(&self, _path: &str, _flag: FileFlag, _mode: u32) -> FsResult<Box<dyn File>> {
            Err(ApiError::not_supported())
        }

        fn unlink(&self, _path: &str) -> FsResult<()> {
            Ok(())
        }

        fn rmdir(&self, _path: &str) -> FsResult<()> {
            Ok(())
        }

        fn mkdir(&self, _path: &str, _mode: u32) -> FsResult<()> {
            Ok(())
        }

        fn readdir(&self, _path: &str) -> FsResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn fs() -> Fs {
        Fs::new(Box::new(StubFs { available: true })).unwrap()
    }

    #[test]
    fn refuses_an_unavailable_backend() {
        let err = Fs::new(Box::new(StubFs { available: false })).unwrap_err();
        assert_eq!(err.code, ErrorCode::EINVAL);
    }

    #[test]
    fn rejects_bad_paths_before_the_backend() {
        let fs = fs();
        assert_eq!(fs.unlink("").unwrap_err().code, ErrorCode::EINVAL);
        assert_eq!(fs.unlink("/a\0b").unwrap_err().code, ErrorCode::EINVAL);
    }

    #[test]
    fn exists_swallows_path_errors() {
        let fs = fs();
        assert!(fs.exists("/present"));
        assert!(!fs.exists("/absent"));
        assert!(!fs.exists("/bad\0path"));
        assert!(!fs.exists(""));
    }

    #[test]
    fn unknown_descriptors_are_ebadf() {
        let fs = fs();
        assert_eq!(fs.fstat(7).unwrap_err().code, ErrorCode::EBADF);
        assert_eq!(fs.close(FIRST_FD).unwrap_err().code, ErrorCode::EBADF);
        assert_eq!(fs.fsync(0).unwrap_err().code, ErrorCode::EBADF);
    }

    #[test]
    fn content_flag_direction_is_checked_first() {
        let fs = fs();
        let write_only = ReadFileOptions {
            encoding: None,
            flag: "w".to_string(),
        };
        assert_eq!(
            fs.read_file("/present", &write_only).unwrap_err().code,
            ErrorCode::EINVAL
        );
        let read_only = WriteFileOptions {
            flag: "r".to_string(),
            ..WriteFileOptions::default()
        };
        assert_eq!(
            fs.write_file("/x", "data", &read_only).unwrap_err().code,
            ErrorCode::EINVAL
        );
        let not_append = AppendFileOptions {
            flag: "w".to_string(),
            ..AppendFileOptions::default()
        };
        assert_eq!(
            fs.append_file("/x", "data", &not_append).unwrap_err().code,
            ErrorCode::EINVAL
        );
    }

    #[test]
    fn unsupported_operations_are_enotsup() {
        let fs = fs();
        assert_eq!(fs.access("/x", Fs::F_OK).unwrap_err().code, ErrorCode::ENOTSUP);
        assert_eq!(fs.watch("/x").unwrap_err().code, ErrorCode::ENOTSUP);
        assert_eq!(fs.watch_file("/x").unwrap_err().code, ErrorCode::ENOTSUP);
        assert_eq!(fs.unwatch_file("/x").unwrap_err().code, ErrorCode::ENOTSUP);
        assert_eq!(
            fs.create_write_stream("/x").unwrap_err().code,
            ErrorCode::ENOTSUP
        );
    }

    #[test]
    fn chmod_rejects_unparsable_modes() {
        let fs = fs();
        assert_eq!(
            fs.chmod("/present", ModeArg::from("9z")).unwrap_err().code,
            ErrorCode::EINVAL
        );
    }

    #[test]
    fn access_mode_constants() {
        assert_eq!(Fs::F_OK, 0);
        assert_eq!(Fs::R_OK, 4);
        assert_eq!(Fs::W_OK, 2);
        assert_eq!(Fs::X_OK, 1);
    }

    // A backend whose sync and async content reads are distinguishable, to
    // pin which form each entry point delegates to.
    struct AsyncBackedFs;

    #[async_trait]
    impl FileSystem for AsyncBackedFs {
        fn name(&self) -> &'static str {
            "async-backed"
        }

        fn rename(&self, _old: &str, _new: &str) -> FsResult<()> {
            Ok(())
        }

        fn stat(&self, _path: &str, _follow_links: bool) -> FsResult<Stats> {
            Ok(Stats::file(0))
        }

        fn open(&self, _path: &str, _flag: FileFlag, _mode: u32) -> FsResult<Box<dyn File>> {
            Err(ApiError::not_supported())
        }

        fn unlink(&self, _path: &str) -> FsResult<()> {
            Ok(())
        }

        fn rmdir(&self, _path: &str) -> FsResult<()> {
            Ok(())
        }

        fn mkdir(&self, _path: &str, _mode: u32) -> FsResult<()> {
            Ok(())
        }

        fn readdir(&self, _path: &str) -> FsResult<Vec<String>> {
            Ok(Vec::new())
        }

        fn read_file(&self, _path: &str, _flag: FileFlag) -> FsResult<Buffer> {
            Err(ApiError::with_message(ErrorCode::EIO, "sync read path taken"))
        }

        async fn read_file_async(&self, _path: &str, _flag: FileFlag) -> FsResult<Buffer> {
            Ok(Buffer::from_slice(b"from the async path"))
        }
    }

    #[tokio::test]
    async fn async_content_reads_use_the_backend_async_form() {
        let fs = Fs::new(Box::new(AsyncBackedFs)).unwrap();

        let buf = fs
            .read_file_async("/f", &ReadFileOptions::default())
            .await
            .unwrap();
        assert_eq!(buf.to_vec(), b"from the async path".to_vec());

        let text = fs
            .read_file_text_async("/f", &ReadFileOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "from the async path");

        // The sync entry point still reports the sync backend's result.
        assert_eq!(
            fs.read_file("/f", &ReadFileOptions::default())
                .unwrap_err()
                .code,
            ErrorCode::EIO
        );
    }
}
