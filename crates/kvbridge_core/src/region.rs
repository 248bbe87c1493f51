//! Bounds-checked byte region copies.
//!
//! Every copy validates `offset + len <= size` for both sides before a single
//! byte moves. A violation is reported, never truncated.

use crate::error::{MarshalError, MarshalResult, RegionSide};
use std::ops::Range;
use std::ptr;
use tracing::trace;

/// A raw byte region: base address plus length.
///
/// The region does not own its bytes and carries no lifetime. It exists for
/// callers that only have a pointer/length pair, such as the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRegion {
    base: *mut u8,
    len: usize,
}

impl RawRegion {
    /// Describes `len` bytes starting at `base`.
    ///
    /// # Safety
    ///
    /// Unless `len` is zero, `base` must be valid for reads of `len` bytes
    /// (and writes, if the region is used as a destination) for as long as
    /// the region is in use.
    #[must_use]
    pub const unsafe fn from_raw_parts(base: *mut u8, len: usize) -> Self {
        Self { base, len }
    }

    /// Describes a slice that will only be read from.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            base: slice.as_ptr().cast_mut(),
            len: slice.len(),
        }
    }

    /// Describes a slice that may be written to.
    #[must_use]
    pub fn from_mut_slice(slice: &mut [u8]) -> Self {
        Self {
            base: slice.as_mut_ptr(),
            len: slice.len(),
        }
    }

    /// Returns the base address.
    #[must_use]
    pub const fn base(&self) -> *mut u8 {
        self.base
    }

    /// Returns the length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the region is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn checked_range(
    side: RegionSide,
    offset: usize,
    len: usize,
    size: usize,
) -> MarshalResult<Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset..end),
        _ => Err(MarshalError::OutOfBounds {
            side,
            offset,
            len,
            size,
        }),
    }
}

/// Copies `length` bytes from `source[source_pos..]` into `dest[dest_pos..]`.
///
/// # Errors
///
/// Returns [`MarshalError::OutOfBounds`] if either range does not fit its
/// slice. The destination is untouched in that case.
pub fn copy(
    source: &[u8],
    source_pos: usize,
    dest: &mut [u8],
    dest_pos: usize,
    length: usize,
) -> MarshalResult<()> {
    let src = checked_range(RegionSide::Source, source_pos, length, source.len())?;
    let dst = checked_range(RegionSide::Destination, dest_pos, length, dest.len())?;
    dest[dst].copy_from_slice(&source[src]);
    trace!(source_pos, dest_pos, length, "copied region");
    Ok(())
}

/// Moves `length` bytes within one buffer. The ranges may overlap.
///
/// # Errors
///
/// Returns [`MarshalError::OutOfBounds`] if either range does not fit.
pub fn shift(
    buf: &mut [u8],
    source_pos: usize,
    dest_pos: usize,
    length: usize,
) -> MarshalResult<()> {
    let src = checked_range(RegionSide::Source, source_pos, length, buf.len())?;
    checked_range(RegionSide::Destination, dest_pos, length, buf.len())?;
    buf.copy_within(src, dest_pos);
    trace!(source_pos, dest_pos, length, "shifted region");
    Ok(())
}

/// Copies between two raw regions with `memmove` semantics.
///
/// The regions may be the same buffer or overlap arbitrarily.
///
/// # Errors
///
/// Returns [`MarshalError::OutOfBounds`] if a range does not fit its region
/// and [`MarshalError::NullRegion`] if a non-empty copy touches a null base.
///
/// # Safety
///
/// Both regions must satisfy the contract of [`RawRegion::from_raw_parts`];
/// `dest` must be writable.
pub unsafe fn copy_raw(
    source: RawRegion,
    source_pos: usize,
    dest: RawRegion,
    dest_pos: usize,
    length: usize,
) -> MarshalResult<()> {
    let src = checked_range(RegionSide::Source, source_pos, length, source.len)?;
    let dst = checked_range(RegionSide::Destination, dest_pos, length, dest.len)?;
    if length == 0 {
        return Ok(());
    }
    if source.base.is_null() {
        return Err(MarshalError::NullRegion {
            side: RegionSide::Source,
            len: length,
        });
    }
    if dest.base.is_null() {
        return Err(MarshalError::NullRegion {
            side: RegionSide::Destination,
            len: length,
        });
    }
    ptr::copy(source.base.add(src.start), dest.base.add(dst.start), length);
    trace!(source_pos, dest_pos, length, "copied raw region");
    Ok(())
}

/// Copies a whole raw region into an owned vector.
///
/// # Errors
///
/// Returns [`MarshalError::NullRegion`] for a null, non-empty region.
///
/// # Safety
///
/// `source` must satisfy the contract of [`RawRegion::from_raw_parts`].
pub unsafe fn copy_to_vec(source: RawRegion) -> MarshalResult<Vec<u8>> {
    let mut out = vec![0u8; source.len];
    copy_raw(source, 0, RawRegion::from_mut_slice(&mut out), 0, source.len)?;
    Ok(out)
}
