//! Temp-file backed storage.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Mutex;

use log::warn;

use crate::registry::StoreProvider;
use crate::store::ByteStore;

const COPY_CHUNK: usize = 64 * 1024;

/// Byte storage spilled to an unlinked temporary file, for buffers that
/// should not live on the heap. The file is sized up front so reads of
/// never-written ranges observe zeros.
///
/// The access contract is infallible, so I/O failures after creation abort
/// the process.
pub struct TempFileStore {
    file: Mutex<File>,
    len: usize,
}

impl TempFileStore {
    pub fn new(len: usize) -> std::io::Result<Self> {
        let file = tempfile::tempfile()?;
        file.set_len(len as u64)?;
        Ok(TempFileStore {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ByteStore for TempFileStore {
    fn len(&self) -> usize {
        self.len
    }

    fn read_at(&self, offset: usize, out: &mut [u8]) {
        let mut file = self.file.lock().expect("temp file lock poisoned");
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.read_exact(out))
            .expect("temp file read failed");
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) {
        let file = self.file.get_mut().expect("temp file lock poisoned");
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.write_all(data))
            .expect("temp file write failed");
    }

    fn copy_range(&self, start: usize, end: usize) -> Box<dyn ByteStore> {
        let mut out =
            TempFileStore::new(end - start).expect("temp file storage became unavailable");
        let mut scratch = vec![0u8; COPY_CHUNK.min((end - start).max(1))];
        let mut pos = start;
        while pos < end {
            let n = (end - pos).min(scratch.len());
            self.read_at(pos, &mut scratch[..n]);
            out.write_at(pos - start, &scratch[..n]);
            pos += n;
        }
        Box::new(out)
    }
}

/// Registry entry for [`TempFileStore`]. The probe creates a real temp
/// file, so sandboxes without a writable temp directory fail selection.
pub struct TempFileProvider;

impl StoreProvider for TempFileProvider {
    fn name(&self) -> &'static str {
        "temp-file"
    }

    fn is_available(&self) -> bool {
        match tempfile::tempfile() {
            Ok(_) => true,
            Err(err) => {
                warn!("temp-file store unavailable: {err}");
                false
            }
        }
    }

    fn alloc(&self, len: usize) -> Box<dyn ByteStore> {
        Box::new(TempFileStore::new(len).expect("temp file storage became unavailable"))
    }
}
