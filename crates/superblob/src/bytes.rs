//! Big-endian field access over untrusted byte slices.
//!
//! Reading is split in two phases: [`checked_subrange`] establishes that a
//! byte range is inside the buffer, then the fixed-width readers decode
//! fields from that range. Every offset computation is done in `u64` so
//! that values taken from the wire cannot wrap before they are compared.

use crate::error::FormatError;

/// Returns `data[offset..offset + len]` if that range is fully inside `data`.
pub(crate) fn checked_subrange(data: &[u8], offset: u64, len: u64) -> Result<&[u8], FormatError> {
    let available = data.len() as u64;
    let end = offset.checked_add(len).ok_or(FormatError::Truncated {
        needed: u64::MAX,
        available,
    })?;
    if end > available {
        return Err(FormatError::Truncated {
            needed: end,
            available,
        });
    }
    // Both bounds are <= data.len(), so they fit in usize.
    Ok(&data[offset as usize..end as usize])
}

/// Reads a big-endian u32 at `offset`, or `None` if it is out of range.
pub(crate) fn read_u32(data: &[u8], offset: u64) -> Option<u32> {
    let field = checked_subrange(data, offset, 4).ok()?;
    let bytes: [u8; 4] = field.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

/// Appends a big-endian u32.
pub(crate) fn write_u32_be(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}
