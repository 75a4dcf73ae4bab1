//! The flat directory index.

use std::collections::HashMap;
use std::sync::Arc;

use portfs_core::path;
use portfs_core::Stats;

use crate::inode::{DirInode, FileInode, Inode};

/// An index over a tree of absolute paths.
///
/// Internally a single-level map from *directory* paths to their
/// [`DirInode`]s; file nodes live only in their parent's listing. The root
/// directory always exists and is never removed.
///
/// Can serve as a partial index of a larger tree, though missing
/// directories then read as absent rather than unknown.
#[derive(Debug)]
pub struct FileIndex<T> {
    index: HashMap<String, Arc<DirInode<T>>>,
}

impl<T> FileIndex<T> {
    pub fn new() -> FileIndex<T> {
        let mut index = HashMap::new();
        index.insert("/".to_string(), Arc::new(DirInode::new(None)));
        FileIndex { index }
    }

    /// Adds `path`, creating any missing parent directories. `true` if it
    /// was added, or if the identical directory node is already indexed
    /// there; `false` when the name is taken by a different node.
    ///
    /// Parents created on the way to a failed add are not cleaned up.
    pub fn add_path(&mut self, path: &str, inode: Inode<T>) -> bool {
        if let Some(existing) = self.index.get(path) {
            return match &inode {
                Inode::Dir(dir) => Arc::ptr_eq(existing, dir),
                Inode::File(_) => false,
            };
        }
        let (dirpath, itemname) = split_path(path);
        if !self.index.contains_key(&dirpath) && path != "/" {
            let parent = Arc::new(DirInode::new(None));
            if !self.add_path(&dirpath, Inode::Dir(parent)) {
                return false;
            }
        }
        if path != "/" {
            let parent = self
                .index
                .get(&dirpath)
                .expect("parent directory was just indexed");
            if !parent.add(&itemname, inode.clone()) {
                return false;
            }
        }
        if let Inode::Dir(dir) = inode {
            self.index.insert(path.to_string(), dir);
        }
        true
    }

    /// Like [`FileIndex::add_path`] without the exists pre-check, for bulk
    /// loads where the caller knows the path is fresh.
    pub fn add_path_fast(&mut self, path: &str, inode: Inode<T>) -> bool {
        let mark = path.rfind('/').unwrap_or(0);
        let parent_path = if mark == 0 {
            "/".to_string()
        } else {
            path[..mark].to_string()
        };
        let itemname = path[mark + 1..].to_string();
        if !self.index.contains_key(&parent_path) {
            let parent = Arc::new(DirInode::new(None));
            self.add_path_fast(&parent_path, Inode::Dir(parent));
        }
        let parent = self
            .index
            .get(&parent_path)
            .expect("parent directory was just indexed");
        if !parent.add(&itemname, inode.clone()) {
            return false;
        }
        if let Inode::Dir(dir) = inode {
            self.index.insert(path.to_string(), dir);
        }
        true
    }

    /// Reattaches a detached subtree at `path`: adds the node, then
    /// re-indexes every directory underneath it.
    pub fn add_tree(&mut self, path: &str, inode: Inode<T>) -> bool {
        if !self.add_path(path, inode.clone()) {
            return false;
        }
        if let Inode::Dir(dir) = inode {
            self.index_descendants(path, &dir);
        }
        true
    }

    fn index_descendants(&mut self, path: &str, dir: &Arc<DirInode<T>>) {
        for name in dir.listing() {
            if let Some(Inode::Dir(sub)) = dir.get(&name) {
                let child_path = format!("{}/{}", path, name);
                self.index.insert(child_path.clone(), Arc::clone(&sub));
                self.index_descendants(&child_path, &sub);
            }
        }
    }

    /// Removes `path` and, for a directory, its whole subtree. Returns the
    /// removed node, or `None` if it did not exist. The root is never
    /// removed.
    pub fn remove_path(&mut self, path: &str) -> Option<Inode<T>> {
        let (dirpath, itemname) = split_path(path);
        let parent = Arc::clone(self.index.get(&dirpath)?);
        let inode = parent.remove(&itemname)?;
        if let Inode::Dir(dir) = &inode {
            for child in dir.listing() {
                self.remove_path(&format!("{}/{}", path, child));
            }
            if path != "/" {
                self.index.remove(path);
            }
        }
        Some(inode)
    }

    /// The listing of the directory at `path`, or `None` if no such
    /// directory is indexed.
    pub fn ls(&self, path: &str) -> Option<Vec<String>> {
        self.index.get(path).map(|dir| dir.listing())
    }

    /// The node at `path`, or `None` if absent.
    pub fn get_inode(&self, path: &str) -> Option<Inode<T>> {
        let (dirpath, itemname) = split_path(path);
        let parent = self.index.get(&dirpath)?;
        if dirpath == path {
            return Some(Inode::Dir(Arc::clone(parent)));
        }
        parent.get(&itemname)
    }

    /// Runs `f` over every file node in the index.
    pub fn each_file(&self, mut f: impl FnMut(&Arc<FileInode<T>>)) {
        for dir in self.index.values() {
            for name in dir.listing() {
                if let Some(Inode::File(file)) = dir.get(&name) {
                    f(&file);
                }
            }
        }
    }
}

impl<T> Default for FileIndex<T> {
    fn default() -> FileIndex<T> {
        FileIndex::new()
    }
}

impl FileIndex<Stats> {
    /// Builds an index from a JSON directory listing, e.g.
    /// `{"etc": {"passwd": null}, "home": {}}`. A JSON object is a
    /// directory even when empty; any other value is a file of unknown
    /// size.
    pub fn from_listing(listing: &serde_json::Value) -> FileIndex<Stats> {
        let mut idx = FileIndex::new();
        let root = Arc::new(DirInode::new(None));
        idx.index.insert("/".to_string(), Arc::clone(&root));
        let mut queue: Vec<(String, &serde_json::Value, Arc<DirInode<Stats>>)> =
            vec![(String::new(), listing, root)];
        while let Some((pwd, tree, parent)) = queue.pop() {
            let entries = match tree.as_object() {
                Some(entries) => entries,
                None => continue,
            };
            for (name, children) in entries {
                let child_path = format!("{}/{}", pwd, name);
                let inode = if children.is_object() {
                    let dir = Arc::new(DirInode::new(None));
                    idx.index.insert(child_path.clone(), Arc::clone(&dir));
                    queue.push((child_path, children, Arc::clone(&dir)));
                    Inode::Dir(dir)
                } else {
                    Inode::File(Arc::new(FileInode::new(Stats::unknown_size_file())))
                };
                parent.add(name, inode);
            }
        }
        idx
    }
}

/// Splits a normalized absolute path into (parent directory, item name).
/// The root splits into (`"/"`, `""`).
fn split_path(p: &str) -> (String, String) {
    let dirpath = path::dirname(p);
    let skip = if dirpath == "/" {
        dirpath.len()
    } else {
        dirpath.len() + 1
    };
    let itemname = p[skip.min(p.len())..].to_string();
    (dirpath, itemname)
}
