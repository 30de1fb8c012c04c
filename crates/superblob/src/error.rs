//! Error types for SuperBlob operations.
//!
//! This module defines two enums:
//!
//! - [`FormatError`] describes why a buffer was rejected as a Blob or
//!   SuperBlob. Rejection is the expected outcome for corrupt or hostile
//!   input, so these are returned by the validating constructors rather
//!   than raised as failures of an operation.
//! - [`enum@Error`] covers the failures of the fallible operations
//!   themselves, such as [`crate::Maker::make`] running out of memory.
//!
//! # See Also
//!
//! - [`crate::Result`] - Convenience type alias using [`enum@Error`]

use std::collections::TryReserveError;
use thiserror::Error;

/// Reason a buffer failed Blob or SuperBlob validation.
///
/// Offsets and lengths are reported as read from the wire so they can be
/// logged as-is.
///
/// # Examples
///
/// ```
/// use superblob::{FormatError, SuperBlob};
///
/// let bytes = 0xfade0cc0u32.to_be_bytes();
/// match SuperBlob::parse(&bytes, 0xfade0cc0) {
///     Err(FormatError::Truncated { needed, available }) => {
///         assert_eq!((needed, available), (8, 4));
///     }
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The header magic is not the one the caller expects.
    #[error("bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// Magic the caller asked for.
        expected: u32,
        /// Magic found in the header.
        found: u32,
    },

    /// The buffer or the declared length is shorter than required.
    ///
    /// `needed` is the number of bytes the structure requires, `available`
    /// the number actually present (buffer size or declared length,
    /// whichever was smaller).
    #[error("truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: u64,
        /// Bytes present.
        available: u64,
    },

    /// The declared length exceeds the caller-supplied ceiling.
    #[error("declared length {length} exceeds limit {max}")]
    TooLarge {
        /// Declared length.
        length: u32,
        /// Caller-supplied ceiling.
        max: u32,
    },

    /// The index implied by `count` does not fit in the container.
    #[error("index of {count} slots does not fit in {length} bytes")]
    IndexOutOfBounds {
        /// Slot count from the header.
        count: u32,
        /// Declared container length.
        length: u32,
    },

    /// A slot points into the header or index region.
    #[error("slot {slot}: offset {offset} overlaps index ending at {ix_limit}")]
    OffsetOverlapsIndex {
        /// Position of the slot in the index.
        slot: u32,
        /// Offending offset.
        offset: u32,
        /// End of the index region.
        ix_limit: u64,
    },

    /// A sub-blob's header or declared contents run past the container.
    #[error("slot {slot}: sub-blob {offset}+{length} exceeds container of {container} bytes")]
    SubBlobExceedsContainer {
        /// Position of the slot in the index.
        slot: u32,
        /// Sub-blob offset.
        offset: u32,
        /// Sub-blob length, or the header size when the header itself does
        /// not fit.
        length: u32,
        /// Declared container length.
        container: u32,
    },

    /// A sub-blob declares a length smaller than its own header.
    #[error("slot {slot}: sub-blob at {offset} declares length {length}, below the header")]
    SubBlobTooShort {
        /// Position of the slot in the index.
        slot: u32,
        /// Sub-blob offset.
        offset: u32,
        /// Declared sub-blob length.
        length: u32,
    },
}

/// Error type for SuperBlob operations.
///
/// All fallible operations in this crate return [`crate::Result<T>`], which
/// uses this error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Input did not validate.
    ///
    /// Wraps a [`FormatError`] when validation happens as part of a larger
    /// operation, for example [`crate::BlobBuf::from_vec`].
    #[error("Malformed blob: {0}")]
    Format(#[from] FormatError),

    /// The serialized size does not fit the 32-bit length field.
    ///
    /// Raised by [`crate::BlobBuf::new`] and [`crate::Maker::make`] instead
    /// of silently wrapping the header values.
    #[error("Blob too large: {0} bytes exceeds the 32-bit length field")]
    TooLarge(u64),

    /// The output buffer could not be allocated.
    ///
    /// The builder that was serializing is left unchanged and can be
    /// retried.
    #[error("Allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}
