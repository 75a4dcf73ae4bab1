//! Index inodes.
//!
//! An inode carries a backend-specific payload `T` (stats, content, an
//! upstream record id) behind interior mutability, so the same node can be
//! referenced from both the flat directory map and its parent's listing.
//! Identity is the `Arc` allocation: two handles name the same node exactly
//! when they point at the same allocation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A file node: just a payload.
#[derive(Debug)]
pub struct FileInode<T> {
    data: RwLock<T>,
}

impl<T> FileInode<T> {
    pub fn new(data: T) -> FileInode<T> {
        FileInode {
            data: RwLock::new(data),
        }
    }

    pub fn data(&self) -> RwLockReadGuard<'_, T> {
        self.data.read().expect("inode lock poisoned")
    }

    pub fn data_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.data.write().expect("inode lock poisoned")
    }
}

/// A directory node: an optional payload plus a listing of children by name.
#[derive(Debug)]
pub struct DirInode<T> {
    data: RwLock<Option<T>>,
    listing: RwLock<HashMap<String, Inode<T>>>,
}

impl<T> DirInode<T> {
    pub fn new(data: Option<T>) -> DirInode<T> {
        DirInode {
            data: RwLock::new(data),
            listing: RwLock::new(HashMap::new()),
        }
    }

    pub fn data(&self) -> RwLockReadGuard<'_, Option<T>> {
        self.data.read().expect("inode lock poisoned")
    }

    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Option<T>> {
        self.data.write().expect("inode lock poisoned")
    }

    /// Names of this directory's entries, in no particular order.
    pub fn listing(&self) -> Vec<String> {
        self.listing
            .read()
            .expect("inode lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.listing.read().expect("inode lock poisoned").is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Inode<T>> {
        self.listing
            .read()
            .expect("inode lock poisoned")
            .get(name)
            .cloned()
    }

    /// Adds an entry; `false` if the name is already taken. The inode is
    /// shared, not copied.
    pub fn add(&self, name: &str, inode: Inode<T>) -> bool {
        let mut listing = self.listing.write().expect("inode lock poisoned");
        if listing.contains_key(name) {
            return false;
        }
        listing.insert(name.to_string(), inode);
        true
    }

    /// Removes and returns an entry; `None` if absent.
    pub fn remove(&self, name: &str) -> Option<Inode<T>> {
        self.listing
            .write()
            .expect("inode lock poisoned")
            .remove(name)
    }
}

/// Either kind of node. Cloning clones the handle, never the payload.
#[derive(Debug)]
pub enum Inode<T> {
    File(Arc<FileInode<T>>),
    Dir(Arc<DirInode<T>>),
}

impl<T> Clone for Inode<T> {
    fn clone(&self) -> Inode<T> {
        match self {
            Inode::File(f) => Inode::File(Arc::clone(f)),
            Inode::Dir(d) => Inode::Dir(Arc::clone(d)),
        }
    }
}

impl<T> Inode<T> {
    pub fn is_file(&self) -> bool {
        matches!(self, Inode::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Inode::Dir(_))
    }

    pub fn as_file(&self) -> Option<&Arc<FileInode<T>>> {
        match self {
            Inode::File(f) => Some(f),
            Inode::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&Arc<DirInode<T>>> {
        match self {
            Inode::Dir(d) => Some(d),
            Inode::File(_) => None,
        }
    }

    /// Allocation identity: both handles name the very same node.
    pub fn ptr_eq(&self, other: &Inode<T>) -> bool {
        match (self, other) {
            (Inode::File(a), Inode::File(b)) => Arc::ptr_eq(a, b),
            (Inode::Dir(a), Inode::Dir(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_payload_is_shared_through_clones() {
        let file = Arc::new(FileInode::new(1));
        let a = Inode::File(Arc::clone(&file));
        let b = a.clone();
        *file.data_mut() = 2;
        assert_eq!(*b.as_file().unwrap().data(), 2);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn listing_add_and_remove() {
        let dir: DirInode<u32> = DirInode::new(None);
        let child = Inode::File(Arc::new(FileInode::new(0)));
        assert!(dir.add("a", child.clone()));
        assert!(!dir.add("a", child.clone()));
        assert_eq!(dir.listing(), vec!["a".to_string()]);
        assert!(dir.get("a").unwrap().ptr_eq(&child));
        assert!(dir.remove("a").unwrap().ptr_eq(&child));
        assert!(dir.remove("a").is_none());
        assert!(dir.is_empty());
    }

    #[test]
    fn kind_predicates() {
        let f: Inode<u32> = Inode::File(Arc::new(FileInode::new(0)));
        let d: Inode<u32> = Inode::Dir(Arc::new(DirInode::new(None)));
        assert!(f.is_file() && !f.is_dir());
        assert!(d.is_dir() && !d.is_file());
        assert!(!f.ptr_eq(&d));
    }
}
