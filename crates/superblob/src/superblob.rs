//! SuperBlob: a Blob whose payload is an indexed directory of sub-blobs.
//!
//! ## Structure
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ SuperBlob Header (12 bytes)        │
//! │  - magic (4 bytes)                 │
//! │  - length: total size (4 bytes)    │
//! │  - count: number of slots (4 bytes)│
//! ├────────────────────────────────────┤
//! │ Index Entry 0 (8 bytes)            │
//! │  - slot_type (4 bytes)             │
//! │  - offset (4 bytes, 0 = hole)      │
//! ├────────────────────────────────────┤
//! │ ... more index entries             │
//! ├────────────────────────────────────┤  <- ix_limit
//! │ Sub-blob data                      │
//! │ ... more sub-blob data             │
//! └────────────────────────────────────┘
//! ```
//!
//! Offsets are measured from the start of the SuperBlob. Readers must only
//! rely on the index; the packing order of sub-blobs is not part of the
//! format.
//!
//! A [`SuperBlob`] can only be obtained by validating bytes (or from a
//! [`crate::Maker`]), so every accessor works on data whose bounds have
//! already been checked.

use std::iter::FusedIterator;

use log::debug;

use crate::blob::{Blob, BLOB_HEADER_SIZE};
use crate::bytes::read_u32;
use crate::error::FormatError;
use crate::Result;

/// Size of the SuperBlob header in bytes (magic + length + count).
pub const SUPERBLOB_HEADER_SIZE: u32 = 12;

/// Size of each index entry in bytes (slot_type + offset).
pub const INDEX_ENTRY_SIZE: u32 = 8;

/// End of the header and index region for a directory of `count` slots.
///
/// Computed in `u64` so a hostile `count` cannot wrap.
pub fn index_limit(count: u64) -> u64 {
    u64::from(SUPERBLOB_HEADER_SIZE) + count * u64::from(INDEX_ENTRY_SIZE)
}

fn field(data: &[u8], offset: u64) -> std::result::Result<u32, FormatError> {
    read_u32(data, offset).ok_or(FormatError::Truncated {
        needed: offset + 4,
        available: data.len() as u64,
    })
}

/// A validated, borrowed SuperBlob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlob<'a> {
    data: &'a [u8],
    count: u32,
}

impl<'a> SuperBlob<'a> {
    /// Validate `data` as a SuperBlob with the given magic.
    ///
    /// # Example
    ///
    /// ```
    /// use superblob::{BlobBuf, Maker, SuperBlob};
    ///
    /// let mut maker = Maker::new(0xfade0cc0);
    /// maker.add(2, BlobBuf::new(0xfade0c01, &[0, 0, 0, 0]).unwrap());
    /// let made = maker.make().unwrap();
    ///
    /// let sb = SuperBlob::parse(made.as_bytes(), 0xfade0cc0).unwrap();
    /// assert_eq!(sb.count(), 1);
    /// assert!(sb.find_blob(2).is_some());
    /// ```
    pub fn parse(data: &'a [u8], magic: u32) -> std::result::Result<Self, FormatError> {
        Self::parse_bounded(data, magic, None)
    }

    /// Validate `data`, additionally rejecting declared lengths above
    /// `max_size`.
    ///
    /// The ceiling is checked against the header before any slot is looked
    /// at.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer starting with the container header
    /// * `magic` - Container magic the header must carry
    /// * `max_size` - Optional ceiling on the declared container length
    ///
    /// # Returns
    ///
    /// A validated view whose slots can be read without further checks, or
    /// the [`FormatError`] for the first violation found. Rejections are
    /// logged at debug level.
    pub fn parse_bounded(
        data: &'a [u8],
        magic: u32,
        max_size: Option<u32>,
    ) -> std::result::Result<Self, FormatError> {
        let result = Self::check(data, magic, max_size);
        if let Err(ref e) = result {
            debug!("rejected superblob: {}", e);
        }
        result
    }

    /// Boolean form of [`SuperBlob::parse_bounded`].
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer starting with the container header
    /// * `magic` - Container magic the header must carry
    /// * `max_size` - Optional ceiling on the declared container length
    pub fn validate(data: &[u8], magic: u32, max_size: Option<u32>) -> bool {
        SuperBlob::parse_bounded(data, magic, max_size).is_ok()
    }

    fn check(
        data: &'a [u8],
        magic: u32,
        max_size: Option<u32>,
    ) -> std::result::Result<Self, FormatError> {
        let blob = Blob::parse(data, magic, SUPERBLOB_HEADER_SIZE, max_size)?;
        let data = blob.as_bytes();
        let length = u64::from(blob.length());

        let count = field(data, 8)?;
        let ix_limit = index_limit(count.into());
        if ix_limit > length {
            return Err(FormatError::IndexOutOfBounds {
                count,
                length: blob.length(),
            });
        }

        // Slot order is irrelevant here; every slot is checked.
        for slot in (0..count).rev() {
            let entry = index_limit(slot.into());
            let offset = field(data, entry + 4)?;
            if offset == 0 {
                continue;
            }
            let start = u64::from(offset);
            if start < ix_limit {
                return Err(FormatError::OffsetOverlapsIndex {
                    slot,
                    offset,
                    ix_limit,
                });
            }
            if start + u64::from(BLOB_HEADER_SIZE) > length {
                return Err(FormatError::SubBlobExceedsContainer {
                    slot,
                    offset,
                    length: BLOB_HEADER_SIZE,
                    container: blob.length(),
                });
            }
            // Header is in bounds, so its length field may be read.
            let sub_length = field(data, start + 4)?;
            if start + u64::from(sub_length) > length {
                return Err(FormatError::SubBlobExceedsContainer {
                    slot,
                    offset,
                    length: sub_length,
                    container: blob.length(),
                });
            }
            if sub_length < BLOB_HEADER_SIZE {
                return Err(FormatError::SubBlobTooShort {
                    slot,
                    offset,
                    length: sub_length,
                });
            }
        }

        Ok(Self { data, count })
    }

    /// The container magic.
    pub fn magic(&self) -> u32 {
        self.as_blob().magic()
    }

    /// Total size in bytes, header included.
    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Number of index slots, holes included.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The container as a plain [`Blob`].
    pub fn as_blob(&self) -> Blob<'a> {
        Blob::from_validated(self.data)
    }

    /// The complete serialized container.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Slot at position `n`, or `None` if `n >= count()`.
    pub fn get(&self, n: u32) -> Option<Slot<'a>> {
        if n >= self.count {
            return None;
        }
        let entry = index_limit(n.into());
        Some(Slot {
            index: n,
            slot_type: read_u32(self.data, entry)?,
            offset: read_u32(self.data, entry + 4)?,
            container: self.data,
        })
    }

    /// Iterate over all slots in index order.
    pub fn slots(&self) -> Slots<'a> {
        Slots {
            superblob: *self,
            next: 0,
        }
    }

    /// First slot whose type is `slot_type`.
    ///
    /// The scan is linear. Validation does not enforce unique types, so for
    /// externally supplied containers with duplicates the first one wins.
    pub fn find(&self, slot_type: u32) -> Option<Slot<'a>> {
        self.slots().find(|slot| slot.slot_type() == slot_type)
    }

    /// Sub-blob for `slot_type`, treating a hole the same as a missing slot.
    pub fn find_blob(&self, slot_type: u32) -> Option<Blob<'a>> {
        self.find(slot_type).and_then(|slot| slot.blob())
    }

    /// True if a slot (hole or not) is declared for `slot_type`.
    pub fn contains(&self, slot_type: u32) -> bool {
        self.find(slot_type).is_some()
    }

    /// Copy into an owned buffer.
    pub fn to_superblob_buf(&self) -> SuperBlobBuf {
        SuperBlobBuf {
            data: self.data.to_vec(),
            count: self.count,
        }
    }
}

/// One entry of a SuperBlob index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    index: u32,
    slot_type: u32,
    offset: u32,
    container: &'a [u8],
}

impl<'a> Slot<'a> {
    /// Position in the index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Caller-defined type tag.
    pub fn slot_type(&self) -> u32 {
        self.slot_type
    }

    /// Offset of the sub-blob from the container start, 0 for a hole.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// True if the type is declared without a value.
    pub fn is_hole(&self) -> bool {
        self.offset == 0
    }

    /// The sub-blob, or `None` for a hole.
    pub fn blob(&self) -> Option<Blob<'a>> {
        if self.is_hole() {
            return None;
        }
        let rest = self.container.get(self.offset as usize..)?;
        Blob::parse_any(rest).ok()
    }

    /// The sub-blob, additionally checking its own magic.
    ///
    /// Returns `Ok(None)` for a hole.
    pub fn blob_with_magic(
        &self,
        magic: u32,
    ) -> std::result::Result<Option<Blob<'a>>, FormatError> {
        match self.blob() {
            None => Ok(None),
            Some(blob) => Blob::parse(blob.as_bytes(), magic, 0, None).map(Some),
        }
    }
}

/// Iterator over the slots of a [`SuperBlob`].
#[derive(Debug, Clone)]
pub struct Slots<'a> {
    superblob: SuperBlob<'a>,
    next: u32,
}

impl<'a> Iterator for Slots<'a> {
    type Item = Slot<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.superblob.get(self.next)?;
        self.next += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.superblob.count().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots<'_> {}

impl FusedIterator for Slots<'_> {}

/// An owned, validated SuperBlob buffer.
///
/// Produced by [`crate::Maker::make`] or by validating bytes with
/// [`SuperBlobBuf::from_vec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlobBuf {
    data: Vec<u8>,
    count: u32,
}

impl SuperBlobBuf {
    /// Validate and adopt `data`.
    ///
    /// Bytes past the declared length are dropped.
    ///
    /// # Arguments
    ///
    /// * `data` - Bytes read from storage or the wire
    /// * `magic` - Container magic the header must carry
    /// * `max_size` - Optional ceiling on the declared container length
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Format`] with the reason `data` was rejected.
    pub fn from_vec(mut data: Vec<u8>, magic: u32, max_size: Option<u32>) -> Result<Self> {
        let (length, count) = {
            let sb = SuperBlob::parse_bounded(&data, magic, max_size)?;
            (sb.length(), sb.count())
        };
        data.truncate(length as usize);
        Ok(Self { data, count })
    }

    /// Wrap bytes written by the maker, which are valid by construction.
    pub(crate) fn from_made(data: Vec<u8>, count: u32) -> Self {
        Self { data, count }
    }

    /// Borrow as a [`SuperBlob`] view.
    pub fn view(&self) -> SuperBlob<'_> {
        SuperBlob {
            data: &self.data,
            count: self.count,
        }
    }

    /// Total size in bytes, header included.
    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// The complete serialized container.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the underlying bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for SuperBlobBuf {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: u32 = 0xfade0cc0;

    /// Hand-assemble a container from raw (type, offset) slots and a body.
    fn raw(count: u32, slots: &[(u32, u32)], body: &[u8]) -> Vec<u8> {
        let length = 12 + slots.len() as u32 * 8 + body.len() as u32;
        let mut buf = Vec::new();
        buf.extend(&MAGIC.to_be_bytes());
        buf.extend(&length.to_be_bytes());
        buf.extend(&count.to_be_bytes());
        for (slot_type, offset) in slots {
            buf.extend(&slot_type.to_be_bytes());
            buf.extend(&offset.to_be_bytes());
        }
        buf.extend(body);
        buf
    }

    fn sub_blob(magic: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend(&magic.to_be_bytes());
        buf.extend(&(8 + payload.len() as u32).to_be_bytes());
        buf.extend(payload);
        buf
    }

    #[test]
    fn test_parse_empty() {
        let data = raw(0, &[], &[]);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        assert_eq!(sb.count(), 0);
        assert_eq!(sb.length(), 12);
        assert_eq!(sb.magic(), MAGIC);
        assert!(sb.get(0).is_none());
        assert_eq!(sb.slots().count(), 0);
    }

    #[test]
    fn test_parse_two_slots() {
        let mut body = sub_blob(0xfade0c02, &[0xab; 4]);
        body.extend(sub_blob(0xfade0c01, &[0, 0, 0, 0]));
        let data = raw(2, &[(0, 28), (2, 40)], &body);

        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        assert_eq!(sb.count(), 2);

        let first = sb.get(0).unwrap();
        assert_eq!(first.index(), 0);
        assert_eq!(first.slot_type(), 0);
        assert_eq!(first.offset(), 28);
        assert_eq!(first.blob().unwrap().payload(), &[0xab; 4]);

        let second = sb.find(2).unwrap();
        assert_eq!(second.index(), 1);
        assert_eq!(second.blob().unwrap().magic(), 0xfade0c01);
        assert!(second.blob_with_magic(0xfade0c01).unwrap().is_some());
        assert!(matches!(
            second.blob_with_magic(0xfade0c02),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_hole() {
        let data = raw(1, &[(5, 0)], &[]);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        let slot = sb.get(0).unwrap();
        assert!(slot.is_hole());
        assert!(slot.blob().is_none());
        assert_eq!(slot.blob_with_magic(0xfade7171), Ok(None));
        assert!(sb.contains(5));
        assert!(sb.find_blob(5).is_none());
        assert!(sb.find(6).is_none());
    }

    #[test]
    fn test_duplicate_types_first_wins() {
        let mut body = sub_blob(1, &[1]);
        body.extend(sub_blob(1, &[2]));
        let data = raw(2, &[(7, 28), (7, 37)], &body);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        assert_eq!(sb.find_blob(7).unwrap().payload(), &[1]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let data = raw(0, &[], &[]);
        assert!(matches!(
            SuperBlob::parse(&data, 0xfade0cc1),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_count() {
        let mut data = raw(0, &[], &[]);
        data.truncate(8);
        data[4..8].copy_from_slice(&8u32.to_be_bytes());
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::Truncated {
                needed: 12,
                available: 8
            })
        );
    }

    #[test]
    fn test_rejects_index_out_of_bounds() {
        let data = raw(3, &[(0, 0)], &[]);
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::IndexOutOfBounds {
                count: 3,
                length: 20
            })
        );
    }

    #[test]
    fn test_rejects_huge_count() {
        // 12 + u32::MAX * 8 wraps in 32-bit math; must not slip through.
        let data = raw(u32::MAX, &[(0, 0)], &[]);
        assert!(matches!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::IndexOutOfBounds { .. })
        ));
        let data = raw(0x2000_0000, &[(0, 0)], &[]);
        assert!(!SuperBlob::validate(&data, MAGIC, None));
    }

    #[test]
    fn test_rejects_offset_in_index() {
        let body = sub_blob(1, &[]);
        let data = raw(1, &[(0, 12)], &body);
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::OffsetOverlapsIndex {
                slot: 0,
                offset: 12,
                ix_limit: 20
            })
        );
    }

    #[test]
    fn test_rejects_sub_header_past_end() {
        let data = raw(1, &[(0, 24)], &[0; 8]);
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::SubBlobExceedsContainer {
                slot: 0,
                offset: 24,
                length: 8,
                container: 28
            })
        );
    }

    #[test]
    fn test_rejects_sub_length_past_end() {
        let mut body = sub_blob(1, &[0; 4]);
        body[4..8].copy_from_slice(&100u32.to_be_bytes());
        let data = raw(1, &[(0, 20)], &body);
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::SubBlobExceedsContainer {
                slot: 0,
                offset: 20,
                length: 100,
                container: 32
            })
        );
    }

    #[test]
    fn test_rejects_offset_overflow() {
        // offset + length would wrap a u32.
        let mut body = sub_blob(1, &[]);
        body[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        let data = raw(1, &[(0, 20)], &body);
        assert!(!SuperBlob::validate(&data, MAGIC, None));

        let data = raw(1, &[(0, u32::MAX)], &[]);
        assert!(!SuperBlob::validate(&data, MAGIC, None));
    }

    #[test]
    fn test_rejects_sub_length_below_header() {
        let mut body = sub_blob(1, &[0; 4]);
        body[4..8].copy_from_slice(&4u32.to_be_bytes());
        let data = raw(1, &[(0, 20)], &body);
        assert_eq!(
            SuperBlob::parse(&data, MAGIC),
            Err(FormatError::SubBlobTooShort {
                slot: 0,
                offset: 20,
                length: 4
            })
        );
    }

    #[test]
    fn test_max_size() {
        let data = raw(0, &[], &[]);
        assert!(SuperBlob::validate(&data, MAGIC, Some(12)));
        assert_eq!(
            SuperBlob::parse_bounded(&data, MAGIC, Some(11)),
            Err(FormatError::TooLarge {
                length: 12,
                max: 11
            })
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut data = raw(0, &[], &[]);
        data.extend(&[0xff; 16]);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        assert_eq!(sb.as_bytes().len(), 12);

        let owned = SuperBlobBuf::from_vec(data, MAGIC, None).unwrap();
        assert_eq!(owned.length(), 12);
        assert_eq!(owned.view().count(), 0);
    }

    #[test]
    fn test_slots_iterator() {
        let mut body = sub_blob(1, &[1]);
        body.extend(sub_blob(2, &[2, 2]));
        let data = raw(3, &[(10, 36), (20, 0), (30, 45)], &body);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();

        let slots = sb.slots();
        assert_eq!(slots.len(), 3);
        let types: Vec<u32> = slots.map(|s| s.slot_type()).collect();
        assert_eq!(types, vec![10, 20, 30]);
        let holes: Vec<bool> = sb.slots().map(|s| s.is_hole()).collect();
        assert_eq!(holes, vec![false, true, false]);
    }

    #[test]
    fn test_to_superblob_buf() {
        let body = sub_blob(1, &[9]);
        let data = raw(1, &[(4, 20)], &body);
        let sb = SuperBlob::parse(&data, MAGIC).unwrap();
        let owned = sb.to_superblob_buf();
        assert_eq!(owned.view(), sb);
        assert_eq!(owned.as_ref(), &data[..]);
        assert_eq!(owned.into_vec(), data);
    }

    #[test]
    fn test_from_vec_rejects() {
        let data = raw(1, &[(0, 12)], &sub_blob(1, &[]));
        let err = SuperBlobBuf::from_vec(data, MAGIC, None).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Format(FormatError::OffsetOverlapsIndex { .. })
        ));
    }
}
