//! Generic typed container format: Blobs, SuperBlobs and the Maker that
//! builds them.
//!
//! A [`Blob`] is a magic number and a total length framing an opaque
//! payload. A [`SuperBlob`] is a Blob whose payload is an index of
//! `(type, offset)` slots followed by the packed bytes of each sub-blob.
//! All integers are big-endian.
//!
//! Untrusted bytes only become a [`SuperBlob`] through
//! [`SuperBlob::parse`], which checks every bound before anything derived
//! from an offset is read. New containers are assembled with a [`Maker`].
//!
//! ```
//! use superblob::{BlobBuf, Maker, SuperBlob};
//!
//! const CONTAINER: u32 = 0xfade0cc0;
//!
//! let mut maker = Maker::new(CONTAINER);
//! maker.add(1, BlobBuf::new(0xfade7171, b"<plist/>")?);
//! let bytes = maker.make()?.into_vec();
//!
//! let sb = SuperBlob::parse(&bytes, CONTAINER)?;
//! assert_eq!(sb.find_blob(1).unwrap().payload(), b"<plist/>");
//! # Ok::<(), superblob::Error>(())
//! ```

pub mod blob;
mod bytes;
pub mod error;
pub mod maker;
pub mod superblob;

pub use blob::{Blob, BlobBuf, BLOB_HEADER_SIZE};
pub use error::{Error, FormatError};
pub use maker::Maker;
pub use superblob::{
    index_limit, Slot, Slots, SuperBlob, SuperBlobBuf, INDEX_ENTRY_SIZE, SUPERBLOB_HEADER_SIZE,
};

pub type Result<T> = std::result::Result<T, Error>;
