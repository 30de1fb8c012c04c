//! Maker: accumulate typed sub-blobs, then serialize them into a SuperBlob.
//!
//! The Maker is the only mutable representation of a container. Pieces are
//! kept in a map keyed by slot type, so adding a type twice replaces the
//! earlier piece, and [`Maker::make`] always lays slots out in ascending
//! type order regardless of the order they were added in.

use std::collections::BTreeMap;

use log::trace;

use crate::blob::{Blob, BlobBuf};
use crate::bytes::write_u32_be;
use crate::superblob::{index_limit, SuperBlob, SuperBlobBuf};
use crate::{Error, Result};

/// Builder for SuperBlobs.
///
/// # Example
///
/// ```
/// use superblob::{BlobBuf, Maker};
///
/// let mut maker = Maker::new(0xfade0cc0);
/// maker.add(0x1000, BlobBuf::new(0xfade0c02, &[0x22; 16]).unwrap());
/// maker.add(0x0000, BlobBuf::new(0xfade0c02, &[0x11; 16]).unwrap());
///
/// let superblob = maker.make().unwrap();
/// let view = superblob.view();
///
/// // Slots are ordered by type, not by insertion.
/// assert_eq!(view.get(0).unwrap().slot_type(), 0x0000);
/// assert_eq!(view.get(1).unwrap().slot_type(), 0x1000);
/// assert_eq!(u64::from(superblob.length()), maker.size());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maker {
    /// Magic written to the container header
    magic: u32,
    /// Owned sub-blobs by slot type
    pieces: BTreeMap<u32, BlobBuf>,
}

impl Maker {
    /// Create an empty Maker for containers carrying `magic`.
    pub fn new(magic: u32) -> Self {
        Self {
            magic,
            pieces: BTreeMap::new(),
        }
    }

    /// The container magic.
    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// Number of pieces currently held.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// True if no pieces are held.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Add `blob` under `slot_type`, returning the piece it replaces.
    pub fn add(&mut self, slot_type: u32, blob: BlobBuf) -> Option<BlobBuf> {
        self.pieces.insert(slot_type, blob)
    }

    /// Copy every present sub-blob of `superblob` into this Maker.
    ///
    /// Holes are skipped. Slots are added in index order, so if the source
    /// declares a type more than once the last occurrence wins.
    pub fn add_superblob(&mut self, superblob: &SuperBlob<'_>) {
        for slot in superblob.slots() {
            if let Some(blob) = slot.blob() {
                self.add(slot.slot_type(), blob.to_blob_buf());
            }
        }
    }

    /// Copy every piece of `other` into this Maker.
    pub fn add_maker(&mut self, other: &Maker) {
        for (&slot_type, blob) in &other.pieces {
            self.add(slot_type, blob.clone());
        }
    }

    /// Remove and return the piece for `slot_type`.
    pub fn remove(&mut self, slot_type: u32) -> Option<BlobBuf> {
        self.pieces.remove(&slot_type)
    }

    /// True if a piece is held for `slot_type`.
    pub fn contains(&self, slot_type: u32) -> bool {
        self.pieces.contains_key(&slot_type)
    }

    /// Borrow the piece for `slot_type`.
    pub fn get(&self, slot_type: u32) -> Option<Blob<'_>> {
        self.pieces.get(&slot_type).map(BlobBuf::blob)
    }

    /// Slot types held, in ascending order.
    pub fn types(&self) -> impl Iterator<Item = u32> + '_ {
        self.pieces.keys().copied()
    }

    /// Exact size in bytes that [`Maker::make`] would produce now.
    pub fn size(&self) -> u64 {
        self.size_with(&[])
    }

    /// Size as if additional sub-blobs of the given lengths were also present.
    ///
    /// Lets callers check a size budget before the remaining pieces exist,
    /// for example a signature whose length is known ahead of time.
    ///
    /// # Arguments
    ///
    /// * `extra` - Total lengths, header included, of sub-blobs not yet added
    ///
    /// # Returns
    ///
    /// The container size in bytes. Computed in `u64`, so it may exceed what
    /// [`Maker::make`] accepts.
    pub fn size_with(&self, extra: &[u32]) -> u64 {
        let slots = (self.pieces.len() + extra.len()) as u64;
        let pieces: u64 = self.pieces.values().map(|b| u64::from(b.length())).sum();
        let extra: u64 = extra.iter().copied().map(u64::from).sum();
        index_limit(slots) + pieces + extra
    }

    /// Serialize the current pieces into a new SuperBlob.
    ///
    /// Each call allocates a fresh buffer; earlier results are not affected
    /// by later changes to the Maker.
    ///
    /// # Returns
    ///
    /// A [`SuperBlobBuf`] holding the header, an index entry per piece in
    /// ascending slot type order, and the pieces in that same order.
    ///
    /// # Errors
    ///
    /// - [`Error::TooLarge`] if the container would exceed the 32-bit length
    ///   field.
    /// - [`Error::Alloc`] if the buffer cannot be allocated.
    ///
    /// In both cases the Maker is left unchanged.
    pub fn make(&self) -> Result<SuperBlobBuf> {
        let total = self.size();
        let length = u32::try_from(total).map_err(|_| Error::TooLarge(total))?;
        let count = u32::try_from(self.pieces.len()).map_err(|_| Error::TooLarge(total))?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(total as usize)?;

        // Header (big-endian)
        write_u32_be(&mut buf, self.magic);
        write_u32_be(&mut buf, length);
        write_u32_be(&mut buf, count);

        // Index entries; every offset is below `length`, so u32 cannot wrap.
        let mut offset = index_limit(count.into()) as u32;
        for (&slot_type, blob) in &self.pieces {
            write_u32_be(&mut buf, slot_type);
            write_u32_be(&mut buf, offset);
            offset += blob.length();
        }

        // Blob data
        for blob in self.pieces.values() {
            buf.extend_from_slice(blob.as_bytes());
        }

        trace!(
            "made superblob {:#010x}: {} slots, {} bytes",
            self.magic,
            count,
            length
        );
        Ok(SuperBlobBuf::from_made(buf, count))
    }
}
