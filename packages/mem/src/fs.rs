//! The in-memory backend.

use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use log::debug;
use portfs_buf::Buffer;
use portfs_core::{
    ActionType, ApiError, ErrorCode, File, FileFlag, FileSystem, FsResult, FileType, Stats, path,
};
use portfs_index::{DirInode, FileIndex, FileInode, Inode};

use crate::file::MemFile;

/// Payload of one in-memory node: the content buffer plus the stat fields.
/// Directory nodes carry one too (with an empty buffer) so mkdir's mode and
/// the ownership calls have somewhere to live.
#[derive(Debug)]
pub struct MemNode {
    pub content: Buffer,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl MemNode {
    pub fn new(mode: u32) -> MemNode {
        let now = SystemTime::now();
        MemNode {
            content: Buffer::alloc(0),
            mode,
            uid: 0,
            gid: 0,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    pub(crate) fn stats(&self) -> Stats {
        Stats {
            file_type: FileType::File,
            size: Some(self.content.len() as u64),
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }

    fn dir_stats(&self) -> Stats {
        Stats {
            file_type: FileType::Directory,
            size: Some(4096),
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}

/// A filesystem held entirely in memory, gone when dropped.
///
/// Structure lives in a [`FileIndex`]; every node's payload is a
/// [`MemNode`]. Since nodes are shared by handle, concurrently open files
/// on one path observe each other's writes.
pub struct MemFs {
    index: RwLock<FileIndex<MemNode>>,
}

impl MemFs {
    pub fn new() -> MemFs {
        MemFs {
            index: RwLock::new(FileIndex::new()),
        }
    }

    fn get_inode(&self, p: &str) -> Option<Inode<MemNode>> {
        self.index.read().expect("index lock poisoned").get_inode(p)
    }

    /// The file node at `p`, or the errno a file operation reports there.
    fn get_file(&self, p: &str) -> FsResult<Arc<FileInode<MemNode>>> {
        match self.get_inode(p) {
            Some(Inode::File(file)) => Ok(file),
            Some(Inode::Dir(_)) => Err(ApiError::with_path(ErrorCode::EISDIR, p)),
            None => Err(ApiError::not_found(p)),
        }
    }

    fn require_parent_dir(&self, p: &str) -> FsResult<()> {
        let parent = path::dirname(p);
        match self.get_inode(&parent) {
            Some(Inode::Dir(_)) => Ok(()),
            Some(Inode::File(_)) => Err(ApiError::with_path(ErrorCode::ENOTDIR, parent)),
            None => Err(ApiError::not_found(parent)),
        }
    }
}

impl Default for MemFs {
    fn default() -> MemFs {
        MemFs::new()
    }
}

impl FileSystem for MemFs {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        if old_path == new_path {
            return match self.get_inode(old_path) {
                Some(_) => Ok(()),
                None => Err(ApiError::not_found(old_path)),
            };
        }
        let source = self
            .get_inode(old_path)
            .ok_or_else(|| ApiError::not_found(old_path))?;
        if source.is_dir() && new_path.starts_with(&format!("{}/", old_path)) {
            return Err(ApiError::with_message(
                ErrorCode::EINVAL,
                "Cannot move a directory inside itself.",
            ));
        }
        self.require_parent_dir(new_path)?;
        match self.get_inode(new_path) {
            Some(Inode::Dir(_)) => {
                return Err(ApiError::with_path(ErrorCode::EEXIST, new_path));
            }
            Some(Inode::File(_)) if source.is_dir() => {
                return Err(ApiError::with_path(ErrorCode::ENOTDIR, new_path));
            }
            Some(Inode::File(_)) => {
                // A plain file target is replaced.
                self.index
                    .write()
                    .expect("index lock poisoned")
                    .remove_path(new_path);
            }
            None => {}
        }
        let mut index = self.index.write().expect("index lock poisoned");
        let moved = index
            .remove_path(old_path)
            .ok_or_else(|| ApiError::not_found(old_path))?;
        if !index.add_tree(new_path, moved.clone()) {
            index.add_tree(old_path, moved);
            return Err(ApiError::with_path(ErrorCode::EEXIST, new_path));
        }
        Ok(())
    }

    fn stat(&self, p: &str, _follow_links: bool) -> FsResult<Stats> {
        match self.get_inode(p) {
            Some(Inode::File(file)) => Ok(file.data().stats()),
            Some(Inode::Dir(dir)) => Ok(match dir.data().as_ref() {
                Some(node) => node.dir_stats(),
                None => Stats::directory(),
            }),
            None => Err(ApiError::not_found(p)),
        }
    }

    fn open(&self, p: &str, flag: FileFlag, mode: u32) -> FsResult<Box<dyn File>> {
        match self.get_inode(p) {
            Some(Inode::Dir(_)) => Err(ApiError::with_path(ErrorCode::EISDIR, p)),
            Some(Inode::File(file)) => {
                match flag.path_exists_action() {
                    ActionType::Throw => {
                        return Err(ApiError::with_path(ErrorCode::EEXIST, p));
                    }
                    ActionType::Truncate => {
                        let mut node = file.data_mut();
                        node.content = Buffer::alloc(0);
                        let now = SystemTime::now();
                        node.mtime = now;
                        node.ctime = now;
                    }
                    ActionType::Nop | ActionType::Create => {}
                }
                Ok(Box::new(MemFile::new(file, p.to_string(), flag)))
            }
            None => match flag.path_not_exists_action() {
                ActionType::Create => {
                    self.require_parent_dir(p)?;
                    let file = Arc::new(FileInode::new(MemNode::new(mode)));
                    self.index
                        .write()
                        .expect("index lock poisoned")
                        .add_path(p, Inode::File(Arc::clone(&file)));
                    debug!("created {} mode {:o}", p, mode);
                    Ok(Box::new(MemFile::new(file, p.to_string(), flag)))
                }
                _ => Err(ApiError::not_found(p)),
            },
        }
    }

    fn unlink(&self, p: &str) -> FsResult<()> {
        self.get_file(p)?;
        self.index
            .write()
            .expect("index lock poisoned")
            .remove_path(p);
        Ok(())
    }

    fn rmdir(&self, p: &str) -> FsResult<()> {
        match self.get_inode(p) {
            None => Err(ApiError::not_found(p)),
            Some(Inode::File(_)) => Err(ApiError::with_path(ErrorCode::ENOTDIR, p)),
            Some(Inode::Dir(_)) if p == "/" => Err(ApiError::with_path(ErrorCode::EPERM, p)),
            Some(Inode::Dir(dir)) => {
                if !dir.is_empty() {
                    return Err(ApiError::with_path(ErrorCode::ENOTEMPTY, p));
                }
                self.index
                    .write()
                    .expect("index lock poisoned")
                    .remove_path(p);
                Ok(())
            }
        }
    }

    fn mkdir(&self, p: &str, mode: u32) -> FsResult<()> {
        if self.get_inode(p).is_some() {
            return Err(ApiError::with_path(ErrorCode::EEXIST, p));
        }
        self.require_parent_dir(p)?;
        let dir = Arc::new(DirInode::new(Some(MemNode::new(mode))));
        self.index
            .write()
            .expect("index lock poisoned")
            .add_path(p, Inode::Dir(dir));
        Ok(())
    }

    fn readdir(&self, p: &str) -> FsResult<Vec<String>> {
        match self.get_inode(p) {
            Some(Inode::Dir(dir)) => {
                let mut names = dir.listing();
                names.sort_unstable();
                Ok(names)
            }
            Some(Inode::File(_)) => Err(ApiError::with_path(ErrorCode::ENOTDIR, p)),
            None => Err(ApiError::not_found(p)),
        }
    }

    fn chown(&self, p: &str, _follow_links: bool, uid: u32, gid: u32) -> FsResult<()> {
        self.update_node(p, |node| {
            node.uid = uid;
            node.gid = gid;
        })
    }

    fn chmod(&self, p: &str, _follow_links: bool, mode: u32) -> FsResult<()> {
        self.update_node(p, |node| {
            node.mode = mode;
        })
    }

    fn utimes(&self, p: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        self.update_node(p, |node| {
            node.atime = atime;
            node.mtime = mtime;
        })
    }
}

impl MemFs {
    /// Applies `f` to the node payload at `p`, giving a payload-less
    /// directory one first.
    fn update_node(&self, p: &str, f: impl FnOnce(&mut MemNode)) -> FsResult<()> {
        match self.get_inode(p) {
            Some(Inode::File(file)) => {
                let mut node = file.data_mut();
                f(&mut node);
                node.ctime = SystemTime::now();
                Ok(())
            }
            Some(Inode::Dir(dir)) => {
                let mut data = dir.data_mut();
                let node = data.get_or_insert_with(|| MemNode::new(0o777));
                f(node);
                node.ctime = SystemTime::now();
                Ok(())
            }
            None => Err(ApiError::not_found(p)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(s: &str) -> FileFlag {
        FileFlag::parse(s).unwrap()
    }

    #[test]
    fn open_create_requires_the_parent() {
        let fs = MemFs::new();
        let err = fs.open("/no/such/file", flag("w"), 0o644).unwrap_err();
        assert_eq!(err.code, ErrorCode::ENOENT);
        assert_eq!(err.path.as_deref(), Some("/no/such"));
    }

    #[test]
    fn exclusive_open_refuses_an_existing_file() {
        let fs = MemFs::new();
        fs.open("/f", flag("w"), 0o644).unwrap();
        assert_eq!(
            fs.open("/f", flag("wx"), 0o644).unwrap_err().code,
            ErrorCode::EEXIST
        );
    }

    #[test]
    fn truncating_open_discards_content() {
        let fs = MemFs::new();
        let mut file = fs.open("/f", flag("w"), 0o644).unwrap();
        file.write(&Buffer::from_slice(b"data"), 0, 4, None).unwrap();
        file.close().unwrap();

        let file = fs.open("/f", flag("w"), 0o644).unwrap();
        assert_eq!(file.stat().unwrap().size, Some(0));
    }

    #[test]
    fn read_plus_requires_an_existing_file() {
        let fs = MemFs::new();
        assert_eq!(
            fs.open("/f", flag("r+"), 0o644).unwrap_err().code,
            ErrorCode::ENOENT
        );
    }

    #[test]
    fn directories_cannot_be_opened() {
        let fs = MemFs::new();
        fs.mkdir("/d", 0o777).unwrap();
        assert_eq!(
            fs.open("/d", flag("r"), 0o644).unwrap_err().code,
            ErrorCode::EISDIR
        );
    }

    #[test]
    fn directory_removal_errnos() {
        let fs = MemFs::new();
        fs.mkdir("/d", 0o777).unwrap();
        fs.open("/d/f", flag("w"), 0o644).unwrap();

        assert_eq!(fs.unlink("/d").unwrap_err().code, ErrorCode::EISDIR);
        assert_eq!(fs.rmdir("/d/f").unwrap_err().code, ErrorCode::ENOTDIR);
        assert_eq!(fs.rmdir("/d").unwrap_err().code, ErrorCode::ENOTEMPTY);
        assert_eq!(fs.rmdir("/").unwrap_err().code, ErrorCode::EPERM);

        fs.unlink("/d/f").unwrap();
        fs.rmdir("/d").unwrap();
        assert_eq!(fs.stat("/d", true).unwrap_err().code, ErrorCode::ENOENT);
    }

    #[test]
    fn mkdir_does_not_create_parents() {
        let fs = MemFs::new();
        assert_eq!(fs.mkdir("/a/b", 0o777).unwrap_err().code, ErrorCode::ENOENT);
        fs.mkdir("/a", 0o777).unwrap();
        fs.mkdir("/a/b", 0o777).unwrap();
        assert_eq!(fs.mkdir("/a", 0o777).unwrap_err().code, ErrorCode::EEXIST);
    }

    #[test]
    fn rename_moves_subtrees() {
        let fs = MemFs::new();
        fs.mkdir("/a", 0o777).unwrap();
        fs.mkdir("/a/b", 0o777).unwrap();
        let mut f = fs.open("/a/b/f", flag("w"), 0o644).unwrap();
        f.write(&Buffer::from_slice(b"x"), 0, 1, None).unwrap();
        f.close().unwrap();

        fs.rename("/a", "/z").unwrap();
        assert!(fs.stat("/z/b/f", true).unwrap().is_file());
        assert_eq!(fs.stat("/a", true).unwrap_err().code, ErrorCode::ENOENT);
    }

    #[test]
    fn rename_into_own_subtree_is_einval() {
        let fs = MemFs::new();
        fs.mkdir("/a", 0o777).unwrap();
        fs.mkdir("/a/b", 0o777).unwrap();
        assert_eq!(
            fs.rename("/a", "/a/b/c").unwrap_err().code,
            ErrorCode::EINVAL
        );
    }

    #[test]
    fn rename_onto_a_directory_is_eexist() {
        let fs = MemFs::new();
        fs.mkdir("/a", 0o777).unwrap();
        fs.mkdir("/b", 0o777).unwrap();
        assert_eq!(fs.rename("/a", "/b").unwrap_err().code, ErrorCode::EEXIST);
    }

    #[test]
    fn rename_replaces_a_plain_file_target() {
        let fs = MemFs::new();
        let mut f = fs.open("/one", flag("w"), 0o644).unwrap();
        f.write(&Buffer::from_slice(b"one"), 0, 3, None).unwrap();
        f.close().unwrap();
        fs.open("/two", flag("w"), 0o644).unwrap();

        fs.rename("/one", "/two").unwrap();
        assert_eq!(fs.stat("/one", true).unwrap_err().code, ErrorCode::ENOENT);
        assert_eq!(fs.stat("/two", true).unwrap().size, Some(3));
    }

    #[test]
    fn property_updates_apply_to_files_and_directories() {
        let fs = MemFs::new();
        fs.mkdir("/d", 0o777).unwrap();
        fs.open("/f", flag("w"), 0o644).unwrap();

        fs.chmod("/f", true, 0o600).unwrap();
        assert_eq!(fs.stat("/f", true).unwrap().mode, 0o600);
        fs.chown("/d", true, 3, 4).unwrap();
        let stats = fs.stat("/d", true).unwrap();
        assert_eq!((stats.uid, stats.gid), (3, 4));
        assert_eq!(
            fs.chmod("/missing", true, 0o600).unwrap_err().code,
            ErrorCode::ENOENT
        );
    }

    #[test]
    fn shared_nodes_see_each_others_writes() {
        let fs = MemFs::new();
        let mut a = fs.open("/f", flag("w+"), 0o644).unwrap();
        let mut b = fs.open("/f", flag("r"), 0o644).unwrap();

        a.write(&Buffer::from_slice(b"hi"), 0, 2, None).unwrap();
        let out = Buffer::alloc(2);
        assert_eq!(b.read(&out, 0, 2, Some(0)).unwrap(), 2);
        assert_eq!(out.to_vec(), b"hi".to_vec());
    }
}
