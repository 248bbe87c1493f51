//! Value descriptors on both sides of the boundary.
//!
//! A value is a `(base, length)` pair. The engine sees it as
//! [`NativeValue`] (ABI-identical to `MDBX_val`), the host stores it as a
//! pair of 64-bit integers ([`HostValue`]). Mapping between the two only
//! re-describes the pair; the bytes never move.

use crate::error::{MarshalError, MarshalResult};
use crate::region::{copy_to_vec, RawRegion};
use std::ffi::c_void;
use std::marker::PhantomData;

/// The engine-side value descriptor (`struct iovec` layout).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeValue {
    /// Address of the first byte.
    pub iov_base: *mut c_void,
    /// Length in bytes.
    pub iov_len: usize,
}

/// The host-side value descriptor: address and length as integers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HostValue {
    /// Address of the first byte, 0 for null.
    pub address: u64,
    /// Length in bytes.
    pub length: u64,
}

impl NativeValue {
    /// A null value with zero length.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            iov_base: std::ptr::null_mut(),
            iov_len: 0,
        }
    }

    /// A null-based value whose length carries a count.
    ///
    /// Used as the second element of a `MULTIPLE` put, where the engine reads
    /// the element count from the length and writes back how many it stored.
    #[must_use]
    pub const fn count(count: usize) -> Self {
        Self {
            iov_base: std::ptr::null_mut(),
            iov_len: count,
        }
    }

    /// Describes the bytes of a slice.
    ///
    /// The descriptor does not keep the slice alive. Prefer [`BorrowedValue`]
    /// when the value is handed to an engine call.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            iov_base: bytes.as_ptr().cast_mut().cast(),
            iov_len: bytes.len(),
        }
    }

    /// Returns true if the base address is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.iov_base.is_null()
    }

    /// Returns the described length.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.iov_len
    }

    /// Returns true if the described length is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.iov_len == 0
    }

    /// Views the described bytes.
    ///
    /// Returns `None` for a null value.
    ///
    /// # Safety
    ///
    /// A non-null value must describe `iov_len` readable bytes that stay
    /// valid and unmodified for `'a`.
    #[must_use]
    pub unsafe fn as_slice<'a>(&self) -> Option<&'a [u8]> {
        if self.is_null() {
            return None;
        }
        Some(std::slice::from_raw_parts(
            self.iov_base.cast::<u8>().cast_const(),
            self.iov_len,
        ))
    }

    /// Copies the described bytes into an owned vector.
    ///
    /// Returns `None` for a null value.
    ///
    /// # Safety
    ///
    /// A non-null value must describe `iov_len` readable bytes.
    #[must_use]
    pub unsafe fn to_vec(&self) -> Option<Vec<u8>> {
        if self.is_null() {
            return None;
        }
        let region = RawRegion::from_raw_parts(self.iov_base.cast(), self.iov_len);
        copy_to_vec(region).ok()
    }

    /// Returns the size the engine would reject, if any.
    ///
    /// A null value offends with size 0, whatever its length. A non-null
    /// value offends with its length when that exceeds `max`.
    #[must_use]
    pub fn offending_size(&self, max: usize) -> Option<usize> {
        if self.is_null() {
            Some(0)
        } else if self.iov_len > max {
            Some(self.iov_len)
        } else {
            None
        }
    }

    /// Checks the length against the engine's maximum.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::BadValSize`] if the value is null or too long.
    pub fn check_size(&self, max: usize) -> MarshalResult<()> {
        match self.offending_size(max) {
            Some(size) => Err(MarshalError::BadValSize { size, max }),
            None => Ok(()),
        }
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        Self::null()
    }
}

impl HostValue {
    /// Returns true if the address is zero.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.address == 0
    }
}

/// Maps an engine descriptor to the host representation.
#[must_use]
pub fn map_value(value: NativeValue) -> HostValue {
    HostValue {
        address: value.iov_base as usize as u64,
        length: value.iov_len as u64,
    }
}

/// Maps a host descriptor to the engine representation.
#[must_use]
pub fn map_host_value(value: HostValue) -> NativeValue {
    NativeValue {
        iov_base: value.address as usize as *mut c_void,
        iov_len: value.length as usize,
    }
}

impl From<NativeValue> for HostValue {
    fn from(value: NativeValue) -> Self {
        map_value(value)
    }
}

impl From<HostValue> for NativeValue {
    fn from(value: HostValue) -> Self {
        map_host_value(value)
    }
}

/// A value descriptor that borrows the bytes it describes.
///
/// The borrow ties the descriptor to its buffer so it cannot be handed to
/// the engine after the buffer is gone.
#[derive(Debug, Clone, Copy)]
pub struct BorrowedValue<'a> {
    raw: NativeValue,
    _bytes: PhantomData<&'a [u8]>,
}

impl<'a> BorrowedValue<'a> {
    /// Borrows `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            raw: NativeValue::from_slice(bytes),
            _bytes: PhantomData,
        }
    }

    /// Returns the engine descriptor.
    #[must_use]
    pub const fn native(&self) -> NativeValue {
        self.raw
    }

    /// Returns the length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.iov_len
    }

    /// Returns true if the value is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.iov_len == 0
    }

    /// Returns the borrowed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        // Built from a live `&'a [u8]`, which the marker keeps borrowed.
        unsafe { std::slice::from_raw_parts(self.raw.iov_base.cast::<u8>(), self.raw.iov_len) }
    }
}

impl<'a> From<&'a [u8]> for BorrowedValue<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for BorrowedValue<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a str> for BorrowedValue<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl<'a> From<&'a Vec<u8>> for BorrowedValue<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
