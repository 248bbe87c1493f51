//! Multi-value put adapter.
//!
//! The engine's put primitive takes a key and an array of data values. The
//! adapter turns the host's separate values into that array, in the order
//! given, and issues exactly one engine call.

use crate::error::{MarshalError, MarshalResult};
use crate::handle::HandleKind;
use crate::status::Status;
use crate::value::{BorrowedValue, NativeValue};
use std::ops::{BitOr, BitOrAssign};
use tracing::trace;

/// An opaque engine transaction.
///
/// Only ever used behind a pointer. Never dereference or modify directly.
#[repr(C)]
pub struct RawTxn {
    _private: [u8; 0],
}

/// Database handle within an environment.
pub type Dbi = u32;

/// Engine put flags.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PutFlags(u32);

impl PutFlags {
    /// Insert or overwrite.
    pub const UPSERT: PutFlags = PutFlags(0);
    /// Fail with `KEYEXIST` if the key is present.
    pub const NOOVERWRITE: PutFlags = PutFlags(0x10);
    /// Fail with `KEYEXIST` if the key/data pair is present (dupsort only).
    pub const NODUPDATA: PutFlags = PutFlags(0x20);
    /// Overwrite the current item.
    pub const CURRENT: PutFlags = PutFlags(0x40);
    /// Replace all duplicates of the key.
    pub const ALLDUPS: PutFlags = PutFlags(0x80);
    /// Reserve space without copying data.
    pub const RESERVE: PutFlags = PutFlags(0x1_0000);
    /// Append to the end of the database.
    pub const APPEND: PutFlags = PutFlags(0x2_0000);
    /// Append duplicate data.
    pub const APPENDDUP: PutFlags = PutFlags(0x4_0000);
    /// Store several contiguous dup-fixed items in one call.
    pub const MULTIPLE: PutFlags = PutFlags(0x8_0000);

    /// Wraps raw flag bits unchanged.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw flag bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: PutFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PutFlags {
    type Output = PutFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        PutFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PutFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The native engine as seen by the marshaling layer.
///
/// Implementations forward to the real engine; the layer never interprets
/// the status they return.
pub trait NativeEngine {
    /// Stores `data` under `key`.
    ///
    /// `data` is the engine's value array. The engine may write back into
    /// the descriptors (e.g. the stored count of a `MULTIPLE` put) but never
    /// into the bytes they describe.
    fn put(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: &NativeValue,
        data: &mut [NativeValue],
        flags: PutFlags,
    ) -> Status;

    /// Returns the engine's size of a handle struct.
    fn handle_size(&self, kind: HandleKind) -> usize;

    /// Returns the engine's maximum key size, if it has one.
    fn max_key_size(&self) -> Option<usize> {
        None
    }
}

impl<E: NativeEngine + ?Sized> NativeEngine for &E {
    fn put(
        &self,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: &NativeValue,
        data: &mut [NativeValue],
        flags: PutFlags,
    ) -> Status {
        (**self).put(txn, dbi, key, data, flags)
    }

    fn handle_size(&self, kind: HandleKind) -> usize {
        (**self).handle_size(kind)
    }

    fn max_key_size(&self) -> Option<usize> {
        (**self).max_key_size()
    }
}

/// Issues one engine put with `[first, second]` as the value array.
///
/// The status is returned unchanged.
pub fn put_multiple<E: NativeEngine + ?Sized>(
    engine: &E,
    txn: *mut RawTxn,
    dbi: Dbi,
    key: BorrowedValue<'_>,
    first: BorrowedValue<'_>,
    second: BorrowedValue<'_>,
    flags: PutFlags,
) -> Status {
    put_multiple_raw(
        engine,
        txn,
        dbi,
        key.native(),
        first.native(),
        second.native(),
        flags,
    )
}

/// Descriptor-level form of [`put_multiple`].
///
/// The caller keeps the described bytes alive for the duration of the call.
pub fn put_multiple_raw<E: NativeEngine + ?Sized>(
    engine: &E,
    txn: *mut RawTxn,
    dbi: Dbi,
    key: NativeValue,
    first: NativeValue,
    second: NativeValue,
    flags: PutFlags,
) -> Status {
    let mut data = [first, second];
    trace!(
        dbi,
        key_len = key.iov_len,
        first_len = first.iov_len,
        second_len = second.iov_len,
        flags = flags.bits(),
        "calling native put with two values"
    );
    engine.put(txn, dbi, &key, &mut data, flags)
}

/// Issues one engine put with an ordered sequence of values.
///
/// # Errors
///
/// Returns [`MarshalError::EmptyValueSequence`] without calling the engine
/// if `data` is empty. The engine status is otherwise returned unchanged.
pub fn put_values<E: NativeEngine + ?Sized>(
    engine: &E,
    txn: *mut RawTxn,
    dbi: Dbi,
    key: BorrowedValue<'_>,
    data: &[BorrowedValue<'_>],
    flags: PutFlags,
) -> MarshalResult<Status> {
    let mut natives: Vec<NativeValue> = data.iter().map(BorrowedValue::native).collect();
    put_raw(engine, txn, dbi, &key.native(), &mut natives, flags)
}

/// Descriptor-level form of [`put_values`].
///
/// # Errors
///
/// Returns [`MarshalError::EmptyValueSequence`] if `data` is empty.
pub fn put_raw<E: NativeEngine + ?Sized>(
    engine: &E,
    txn: *mut RawTxn,
    dbi: Dbi,
    key: &NativeValue,
    data: &mut [NativeValue],
    flags: PutFlags,
) -> MarshalResult<Status> {
    if data.is_empty() {
        return Err(MarshalError::EmptyValueSequence);
    }
    trace!(
        dbi,
        key_len = key.iov_len,
        values = data.len(),
        flags = flags.bits(),
        "calling native put"
    );
    Ok(engine.put(txn, dbi, key, data, flags))
}

/// Packed dup-fixed items stored under one key with a `MULTIPLE` put.
///
/// The engine receives `[(elements, element_size), (null, count)]` and
/// writes the number of items it stored back into the second length.
#[derive(Debug, Clone, Copy)]
pub struct DupFixedBatch<'a> {
    packed: &'a [u8],
    count: usize,
    element_size: usize,
}

/// Result of a dup-fixed batch put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Engine status, unchanged.
    pub status: Status,
    /// Number of items the engine reported as stored.
    pub stored: usize,
}

impl<'a> DupFixedBatch<'a> {
    /// Splits `packed` into `count` equal elements.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::UnevenBatch`] if `packed` is empty, `count`
    /// is zero, or the length is not an exact multiple of `count`.
    pub fn new(packed: &'a [u8], count: usize) -> MarshalResult<Self> {
        if packed.is_empty() || count == 0 || packed.len() % count != 0 {
            return Err(MarshalError::UnevenBatch {
                len: packed.len(),
                count,
            });
        }
        Ok(Self {
            packed,
            count,
            element_size: packed.len() / count,
        })
    }

    /// Returns the size of one element.
    #[must_use]
    pub const fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns the number of elements.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the element at `index`.
    #[must_use]
    pub fn element(&self, index: usize) -> Option<&'a [u8]> {
        self.packed
            .chunks_exact(self.element_size)
            .nth(index)
    }

    /// Stores the batch under `key`, adding `MULTIPLE` to `flags`.
    pub fn put<E: NativeEngine + ?Sized>(
        &self,
        engine: &E,
        txn: *mut RawTxn,
        dbi: Dbi,
        key: BorrowedValue<'_>,
        flags: PutFlags,
    ) -> BatchOutcome {
        let mut data = [
            NativeValue {
                iov_base: self.packed.as_ptr().cast_mut().cast(),
                iov_len: self.element_size,
            },
            NativeValue::count(self.count),
        ];
        let flags = flags | PutFlags::MULTIPLE;
        trace!(
            dbi,
            element_size = self.element_size,
            count = self.count,
            flags = flags.bits(),
            "calling native put for dup-fixed batch"
        );
        let status = engine.put(txn, dbi, &key.native(), &mut data, flags);
        BatchOutcome {
            status,
            stored: data[1].iov_len,
        }
    }
}
