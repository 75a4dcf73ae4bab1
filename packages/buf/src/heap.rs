//! Contiguous heap storage.

use crate::registry::StoreProvider;
use crate::store::ByteStore;

/// `Vec`-backed store. Always available and first in preference order.
pub struct HeapStore {
    data: Vec<u8>,
}

impl HeapStore {
    pub fn new(len: usize) -> Self {
        HeapStore {
            data: vec![0; len],
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        HeapStore { data }
    }
}

impl ByteStore for HeapStore {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) {
        out.copy_from_slice(&self.data[offset..offset + out.len()]);
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) {
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    fn fill(&mut self, value: u8, start: usize, end: usize) {
        self.data[start..end].fill(value);
    }

    fn copy_range(&self, start: usize, end: usize) -> Box<dyn ByteStore> {
        Box::new(HeapStore::from_vec(self.data[start..end].to_vec()))
    }
}

/// Registry entry for [`HeapStore`].
pub struct HeapProvider;

impl StoreProvider for HeapProvider {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn alloc(&self, len: usize) -> Box<dyn ByteStore> {
        Box::new(HeapStore::new(len))
    }
}
