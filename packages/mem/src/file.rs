//! Open handles over in-memory nodes.

use std::sync::Arc;
use std::time::SystemTime;

use portfs_buf::Buffer;
use portfs_core::{ApiError, ErrorCode, File, FileFlag, FsResult, Stats};
use portfs_index::FileInode;

use crate::fs::MemNode;

/// A handle onto one in-memory file node.
///
/// The node itself is shared: two handles opened on the same path see each
/// other's writes immediately. Each handle tracks its own cursor.
pub struct MemFile {
    inode: Arc<FileInode<MemNode>>,
    path: String,
    flag: FileFlag,
    pos: u64,
}

impl MemFile {
    pub(crate) fn new(inode: Arc<FileInode<MemNode>>, path: String, flag: FileFlag) -> MemFile {
        MemFile {
            inode,
            path,
            flag,
            pos: 0,
        }
    }

    fn check_readable(&self) -> FsResult<()> {
        if self.flag.is_readable() {
            Ok(())
        } else {
            Err(ApiError::with_message(
                ErrorCode::EPERM,
                "File not opened with a readable mode.",
            ))
        }
    }

    fn check_writeable(&self) -> FsResult<()> {
        if self.flag.is_writeable() {
            Ok(())
        } else {
            Err(ApiError::with_message(
                ErrorCode::EPERM,
                "File not opened with a writeable mode.",
            ))
        }
    }
}

/// `[offset, offset + length)` must lie inside `buffer`; an overflowing
/// sum is as out-of-range as any other.
fn check_source_range(buffer: &Buffer, offset: usize, length: usize) -> FsResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= buffer.len() => Ok(()),
        _ => Err(ApiError::invalid_argument("Length extends beyond buffer.")),
    }
}

/// A copy of `content` resized to `new_len`; growth is zero-filled.
fn resized(content: &Buffer, new_len: usize) -> Buffer {
    let next = Buffer::alloc(new_len);
    content.copy_to(&next, 0, 0, content.len().min(new_len));
    next
}

impl File for MemFile {
    fn stat(&self) -> FsResult<Stats> {
        Ok(self.inode.data().stats())
    }

    fn close(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn truncate(&mut self, len: u64) -> FsResult<()> {
        self.check_writeable()?;
        let mut node = self.inode.data_mut();
        node.content = resized(&node.content, len as usize);
        let now = SystemTime::now();
        node.mtime = now;
        node.ctime = now;
        Ok(())
    }

    fn sync(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn write(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        self.check_writeable()?;
        check_source_range(buffer, offset, length)?;
        let mut node = self.inode.data_mut();
        let pos = if self.flag.is_appendable() {
            node.content.len() as u64
        } else {
            position.unwrap_or(self.pos)
        } as usize;
        let end = pos + length;
        if end > node.content.len() {
            node.content = resized(&node.content, end);
        }
        let written = buffer.copy_to(&node.content, pos, offset, offset + length);
        node.mtime = SystemTime::now();
        if position.is_none() || self.flag.is_appendable() {
            self.pos = (pos + written) as u64;
        }
        Ok(written)
    }

    fn read(
        &mut self,
        buffer: &Buffer,
        offset: usize,
        length: usize,
        position: Option<u64>,
    ) -> FsResult<usize> {
        self.check_readable()?;
        check_source_range(buffer, offset, length)?;
        let mut node = self.inode.data_mut();
        let pos = position.unwrap_or(self.pos) as usize;
        // Reads past end-of-file clamp to zero bytes.
        let read = if pos >= node.content.len() {
            0
        } else {
            node.content.copy_to(buffer, offset, pos, pos + length)
        };
        node.atime = SystemTime::now();
        if position.is_none() {
            self.pos += read as u64;
        }
        Ok(read)
    }

    fn chown(&mut self, uid: u32, gid: u32) -> FsResult<()> {
        let mut node = self.inode.data_mut();
        node.uid = uid;
        node.gid = gid;
        node.ctime = SystemTime::now();
        Ok(())
    }

    fn chmod(&mut self, mode: u32) -> FsResult<()> {
        let mut node = self.inode.data_mut();
        node.mode = mode;
        node.ctime = SystemTime::now();
        Ok(())
    }

    fn utimes(&mut self, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        let mut node = self.inode.data_mut();
        node.atime = atime;
        node.mtime = mtime;
        node.ctime = SystemTime::now();
        Ok(())
    }

    fn get_pos(&self) -> u64 {
        self.pos
    }
}

impl std::fmt::Debug for MemFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemFile")
            .field("path", &self.path)
            .field("flag", &self.flag.as_str())
            .field("pos", &self.pos)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(flag: &str) -> MemFile {
        let inode = Arc::new(FileInode::new(MemNode::new(0o644)));
        MemFile::new(inode, "/f".to_string(), FileFlag::parse(flag).unwrap())
    }

    #[test]
    fn implicit_positions_advance_the_cursor() {
        let mut file = open("w+");
        let data = Buffer::from_slice(b"hello");
        assert_eq!(file.write(&data, 0, 5, None).unwrap(), 5);
        assert_eq!(file.get_pos(), 5);

        // An explicit position leaves the cursor alone.
        assert_eq!(file.write(&data, 0, 5, Some(0)).unwrap(), 5);
        assert_eq!(file.get_pos(), 5);

        let out = Buffer::alloc(5);
        assert_eq!(file.read(&out, 0, 5, Some(0)).unwrap(), 5);
        assert_eq!(out.to_vec(), b"hello".to_vec());
    }

    #[test]
    fn reads_clamp_at_end_of_file() {
        let mut file = open("w+");
        let data = Buffer::from_slice(b"ab");
        file.write(&data, 0, 2, None).unwrap();

        let out = Buffer::alloc(10);
        assert_eq!(file.read(&out, 0, 10, Some(0)).unwrap(), 2);
        assert_eq!(file.read(&out, 0, 10, Some(99)).unwrap(), 0);
    }

    #[test]
    fn append_writes_at_end_regardless_of_position() {
        let mut file = open("a+");
        let data = Buffer::from_slice(b"one");
        file.write(&data, 0, 3, None).unwrap();
        // Position is ignored in append mode.
        file.write(&Buffer::from_slice(b"two"), 0, 3, Some(0)).unwrap();
        assert_eq!(file.get_pos(), 6);

        let out = Buffer::alloc(6);
        file.read(&out, 0, 6, Some(0)).unwrap();
        assert_eq!(out.to_vec(), b"onetwo".to_vec());
    }

    #[test]
    fn direction_is_enforced() {
        let mut reader = open("r");
        let err = reader
            .write(&Buffer::from_slice(b"x"), 0, 1, None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EPERM);
        assert_eq!(err.message, "File not opened with a writeable mode.");

        let mut writer = open("w");
        let out = Buffer::alloc(1);
        let err = writer.read(&out, 0, 1, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::EPERM);
        assert_eq!(err.message, "File not opened with a readable mode.");
    }

    #[test]
    fn source_range_must_fit_the_buffer() {
        let mut file = open("w+");
        let small = Buffer::alloc(2);
        assert_eq!(
            file.write(&small, 1, 2, None).unwrap_err().code,
            ErrorCode::EINVAL
        );
        assert_eq!(
            file.read(&small, 1, 2, None).unwrap_err().code,
            ErrorCode::EINVAL
        );
        // An offset + length sum past usize::MAX is out of range, not a
        // panic.
        assert_eq!(
            file.write(&small, usize::MAX, 2, None).unwrap_err().code,
            ErrorCode::EINVAL
        );
        assert_eq!(
            file.read(&small, 2, usize::MAX, None).unwrap_err().code,
            ErrorCode::EINVAL
        );
    }

    #[test]
    fn truncate_shrinks_and_grows_with_zero_fill() {
        let mut file = open("w+");
        file.write(&Buffer::from_slice(b"abcdef"), 0, 6, None).unwrap();
        file.truncate(3).unwrap();
        assert_eq!(file.stat().unwrap().size, Some(3));

        file.truncate(5).unwrap();
        let out = Buffer::alloc(5);
        file.read(&out, 0, 5, Some(0)).unwrap();
        assert_eq!(out.to_vec(), vec![b'a', b'b', b'c', 0, 0]);
    }
}
