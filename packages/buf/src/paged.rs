//! Sparse paged storage.

use crate::registry::StoreProvider;
use crate::store::ByteStore;

const PAGE_SIZE: usize = 4096;

/// Fixed-size pages allocated on first write. Reads of never-written pages
/// observe zeros; filling a whole page with zero releases it again. Suited
/// to large, mostly-empty buffers.
pub struct PagedStore {
    pages: Vec<Option<Box<[u8; PAGE_SIZE]>>>,
    len: usize,
}

impl PagedStore {
    pub fn new(len: usize) -> Self {
        PagedStore {
            pages: vec![None; len.div_ceil(PAGE_SIZE)],
            len,
        }
    }

    #[cfg(test)]
    fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_some()).count()
    }
}

impl ByteStore for PagedStore {
    fn len(&self) -> usize {
        self.len
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) {
        let mut pos = 0;
        while pos < out.len() {
            let abs = offset + pos;
            let page = abs / PAGE_SIZE;
            let at = abs % PAGE_SIZE;
            let n = (PAGE_SIZE - at).min(out.len() - pos);
            match &self.pages[page] {
                Some(p) => out[pos..pos + n].copy_from_slice(&p[at..at + n]),
                None => out[pos..pos + n].fill(0),
            }
            pos += n;
        }
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) {
        let mut pos = 0;
        while pos < data.len() {
            let abs = offset + pos;
            let page = abs / PAGE_SIZE;
            let at = abs % PAGE_SIZE;
            let n = (PAGE_SIZE - at).min(data.len() - pos);
            let p = self.pages[page].get_or_insert_with(|| Box::new([0; PAGE_SIZE]));
            p[at..at + n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
        }
    }

    fn fill(&mut self, value: u8, start: usize, end: usize) {
        let mut pos = start;
        while pos < end {
            let page = pos / PAGE_SIZE;
            let at = pos % PAGE_SIZE;
            let n = (PAGE_SIZE - at).min(end - pos);
            if value == 0 {
                if at == 0 && n == PAGE_SIZE {
                    self.pages[page] = None;
                } else if let Some(p) = &mut self.pages[page] {
                    p[at..at + n].fill(0);
                }
            } else {
                let p = self.pages[page].get_or_insert_with(|| Box::new([0; PAGE_SIZE]));
                p[at..at + n].fill(value);
            }
            pos += n;
        }
    }

    fn copy_range(&self, start: usize, end: usize) -> Box<dyn ByteStore> {
        let mut out = PagedStore::new(end - start);
        let mut scratch = [0u8; PAGE_SIZE];
        let mut pos = start;
        while pos < end {
            let n = (end - pos).min(PAGE_SIZE);
            self.read_at(pos, &mut scratch[..n]);
            // Keep the copy as sparse as the source.
            if scratch[..n].iter().any(|&b| b != 0) {
                out.write_at(pos - start, &scratch[..n]);
            }
            pos += n;
        }
        Box::new(out)
    }
}

/// Registry entry for [`PagedStore`].
pub struct PagedProvider;

impl StoreProvider for PagedProvider {
    fn name(&self) -> &'static str {
        "paged"
    }

    fn alloc(&self, len: usize) -> Box<dyn ByteStore> {
        Box::new(PagedStore::new(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_pages_read_zero_and_stay_unallocated() {
        let s = PagedStore::new(3 * PAGE_SIZE + 17);
        let mut out = [0xFFu8; 32];
        s.read_at(2 * PAGE_SIZE - 16, &mut out);
        assert_eq!(out, [0; 32]);
        assert_eq!(s.allocated_pages(), 0);
    }

    #[test]
    fn writes_spanning_pages_round_trip() {
        let mut s = PagedStore::new(2 * PAGE_SIZE);
        let data: Vec<u8> = (0..64).map(|i| i as u8 + 1).collect();
        s.write_at(PAGE_SIZE - 32, &data);
        let mut out = vec![0u8; 64];
        s.read_at(PAGE_SIZE - 32, &mut out);
        assert_eq!(out, data);
        assert_eq!(s.allocated_pages(), 2);
    }

    #[test]
    fn zero_fill_releases_whole_pages() {
        let mut s = PagedStore::new(2 * PAGE_SIZE);
        s.write_at(0, &[1u8; 2 * PAGE_SIZE]);
        assert_eq!(s.allocated_pages(), 2);
        s.fill(0, 0, PAGE_SIZE);
        assert_eq!(s.allocated_pages(), 1);
        let mut out = [0xFFu8; 4];
        s.read_at(10, &mut out);
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn copy_range_preserves_content() {
        let mut s = PagedStore::new(PAGE_SIZE * 2);
        s.write_at(100, &[7, 8, 9]);
        let dup = s.copy_range(99, 104);
        let mut out = [0u8; 5];
        dup.read_at(0, &mut out);
        assert_eq!(out, [0, 7, 8, 9, 0]);
        assert_eq!(dup.len(), 5);
    }
}
