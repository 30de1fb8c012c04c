//! Blob: the self-describing unit every container is built from.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ magic   (u32, big-endian)    │
//! │ length  (u32, big-endian)    │  total size, header included
//! ├──────────────────────────────┤
//! │ payload (length - 8 bytes)   │
//! └──────────────────────────────┘
//! ```
//!
//! [`Blob`] is a borrowed view that has passed validation. [`BlobBuf`] is
//! the owned form used when building containers.

use log::debug;

use crate::bytes::{checked_subrange, read_u32, write_u32_be};
use crate::error::FormatError;
use crate::{Error, Result};

/// Size of the Blob header in bytes (magic + length).
pub const BLOB_HEADER_SIZE: u32 = 8;

/// A validated, borrowed Blob.
///
/// The view covers exactly `length` bytes of the buffer it was parsed
/// from, so [`Blob::as_bytes`] never includes trailing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Validate `data` as a Blob with the given magic.
    ///
    /// Fails if the magic differs, if the declared length is below
    /// `min_size` (never less than the header), above `max_size` when one is
    /// given, or larger than `data` itself. Trailing bytes beyond the declared
    /// length are allowed and excluded from the view.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer starting with the Blob header
    /// * `expected_magic` - Magic the header must carry
    /// * `min_size` - Smallest acceptable declared length (raised to 8)
    /// * `max_size` - Optional ceiling on the declared length
    ///
    /// # Returns
    ///
    /// A view over the first `length` bytes of `data`, or the
    /// [`FormatError`] describing the first check that failed.
    ///
    /// # Example
    ///
    /// ```
    /// use superblob::Blob;
    ///
    /// let bytes = [0xfa, 0xde, 0x71, 0x71, 0, 0, 0, 10, b'h', b'i'];
    /// let blob = Blob::parse(&bytes, 0xfade7171, 0, None).unwrap();
    /// assert_eq!(blob.payload(), b"hi");
    /// ```
    pub fn parse(
        data: &'a [u8],
        expected_magic: u32,
        min_size: u32,
        max_size: Option<u32>,
    ) -> std::result::Result<Self, FormatError> {
        let magic = Self::header_field(data, 0)?;
        if magic != expected_magic {
            return Err(FormatError::BadMagic {
                expected: expected_magic,
                found: magic,
            });
        }
        let length = Self::header_field(data, 4)?;
        let min_size = min_size.max(BLOB_HEADER_SIZE);
        if length < min_size {
            return Err(FormatError::Truncated {
                needed: min_size.into(),
                available: length.into(),
            });
        }
        if let Some(max) = max_size {
            if length > max {
                return Err(FormatError::TooLarge { length, max });
            }
        }
        let data = checked_subrange(data, 0, length.into())?;
        Ok(Self { data })
    }

    /// Wrap bytes that already passed [`Blob::parse`].
    pub(crate) fn from_validated(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Validate `data` as a Blob of any magic.
    ///
    /// Used for sub-blobs, whose role-specific magic is checked by whoever
    /// interprets them.
    pub fn parse_any(data: &'a [u8]) -> std::result::Result<Self, FormatError> {
        let magic = Self::header_field(data, 0)?;
        Self::parse(data, magic, 0, None)
    }

    /// Boolean form of [`Blob::parse`].
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer starting with the Blob header
    /// * `expected_magic` - Magic the header must carry
    /// * `min_size` - Smallest acceptable declared length
    /// * `max_size` - Optional ceiling on the declared length
    ///
    /// # Returns
    ///
    /// `true` if [`Blob::parse`] would succeed. The rejection reason is
    /// logged at debug level.
    pub fn validate(
        data: &[u8],
        expected_magic: u32,
        min_size: u32,
        max_size: Option<u32>,
    ) -> bool {
        match Blob::parse(data, expected_magic, min_size, max_size) {
            Ok(_) => true,
            Err(e) => {
                debug!("rejected blob: {}", e);
                false
            }
        }
    }

    /// Read the magic of a buffer without validating anything else.
    pub fn peek_magic(data: &[u8]) -> Option<u32> {
        read_u32(data, 0)
    }

    /// Read the declared length of a buffer without validating anything else.
    pub fn peek_length(data: &[u8]) -> Option<u32> {
        read_u32(data, 4)
    }

    fn header_field(data: &[u8], offset: u64) -> std::result::Result<u32, FormatError> {
        read_u32(data, offset).ok_or(FormatError::Truncated {
            needed: BLOB_HEADER_SIZE.into(),
            available: data.len() as u64,
        })
    }

    /// The format identifier.
    pub fn magic(&self) -> u32 {
        // The header was bounds-checked in `parse`.
        read_u32(self.data, 0).unwrap_or_default()
    }

    /// Total size in bytes, header included.
    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Bytes following the header.
    pub fn payload(&self) -> &'a [u8] {
        &self.data[BLOB_HEADER_SIZE as usize..]
    }

    /// The complete Blob, header included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Copy this Blob into an owned buffer.
    pub fn to_blob_buf(&self) -> BlobBuf {
        BlobBuf {
            data: self.data.to_vec(),
        }
    }
}

/// An owned Blob whose header is consistent with its bytes.
///
/// This is what a [`crate::Maker`] stores for every slot.
///
/// # Example
///
/// ```
/// use superblob::BlobBuf;
///
/// let blob = BlobBuf::new(0xfade0b01, &[0x30, 0x00]).unwrap();
/// assert_eq!(blob.length(), 10);
/// assert_eq!(&blob.as_bytes()[..4], &0xfade0b01u32.to_be_bytes());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobBuf {
    data: Vec<u8>,
}

impl BlobBuf {
    /// Wrap `payload` in a Blob header carrying `magic`.
    ///
    /// # Arguments
    ///
    /// * `magic` - Format identifier written to the header
    /// * `payload` - Bytes copied after the header
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooLarge`] if the total does not fit in the 32-bit
    /// length field.
    pub fn new(magic: u32, payload: &[u8]) -> Result<Self> {
        let total = u64::from(BLOB_HEADER_SIZE) + payload.len() as u64;
        let length = u32::try_from(total).map_err(|_| Error::TooLarge(total))?;

        let mut data = Vec::with_capacity(total as usize);
        write_u32_be(&mut data, magic);
        write_u32_be(&mut data, length);
        data.extend_from_slice(payload);

        Ok(Self { data })
    }

    /// Adopt bytes that already start with a Blob header.
    ///
    /// The header must be complete and the declared length must not exceed
    /// the buffer. Bytes past the declared length are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if `data` does not start with a valid Blob.
    pub fn from_vec(mut data: Vec<u8>) -> Result<Self> {
        let length = Blob::parse_any(&data)?.length();
        if (length as usize) < data.len() {
            debug!(
                "dropping {} trailing bytes after blob",
                data.len() - length as usize
            );
            data.truncate(length as usize);
        }
        Ok(Self { data })
    }

    /// Borrow as a [`Blob`] view.
    pub fn blob(&self) -> Blob<'_> {
        Blob { data: &self.data }
    }

    /// The format identifier.
    pub fn magic(&self) -> u32 {
        self.blob().magic()
    }

    /// Total size in bytes, header included.
    pub fn length(&self) -> u32 {
        self.blob().length()
    }

    /// Bytes following the header.
    pub fn payload(&self) -> &[u8] {
        &self.data[BLOB_HEADER_SIZE as usize..]
    }

    /// The complete Blob, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the underlying bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl<'a> From<Blob<'a>> for BlobBuf {
    fn from(blob: Blob<'a>) -> Self {
        blob.to_blob_buf()
    }
}
