//! Layered byte buffers for portfs.
//!
//! Two layers:
//! - [`ByteStore`]: raw, fixed-length byte storage. Several interchangeable
//!   implementations ([`HeapStore`], [`PagedStore`], [`TempFileStore`]),
//!   chosen through a probed preference registry.
//! - [`Buffer`]: a logical offset+length view over a shared store, with
//!   width- and endianness-aware integer access (1-6 bytes), string codecs,
//!   aliasing slices, isolating copies, fill, search, and concatenation.
//!
//! All file content in the filesystem layers above moves through [`Buffer`].
//!
//! # Example
//!
//! ```rust
//! use portfs_buf::Buffer;
//!
//! let buf = Buffer::alloc(8);
//! buf.write_uint_le(0xC0FFEE, 0, 3).unwrap();
//! assert_eq!(buf.read_uint_le(0, 3).unwrap(), 0xC0FFEE);
//!
//! let view = buf.slice(0, 3).unwrap();
//! view.write_u8(0xAA, 0).unwrap();
//! assert_eq!(buf.read_u8(0).unwrap(), 0xAA);
//! ```

pub use bytes::Bytes;

mod buffer;
pub mod encoding;
mod error;
mod heap;
mod paged;
mod registry;
mod store;
mod temp_file;

pub use buffer::Buffer;
pub use encoding::{is_encoding, Codec};
pub use error::{BufResult, BufferError};
pub use heap::{HeapProvider, HeapStore};
pub use paged::{PagedProvider, PagedStore};
pub use registry::{
    available_providers, default_provider, set_default_provider, StoreProvider, PROVIDERS,
};
pub use store::{ByteStore, ByteStoreExt};
pub use temp_file::{TempFileProvider, TempFileStore};
