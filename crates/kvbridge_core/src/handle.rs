//! Opaque handle copies.
//!
//! Engine structs such as cursors have a layout the host cannot see. They
//! are moved as byte blobs whose size always comes from the engine, so a
//! layout change between engine versions cannot desynchronise the binding.

use crate::error::{MarshalError, MarshalResult};
use crate::put::NativeEngine;
use crate::status::Status;
use std::fmt;
use std::ptr;
use tracing::trace;

/// Kinds of engine structs the layer can copy.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// A cursor.
    Cursor = 0,
    /// A transaction.
    Transaction = 1,
    /// Environment information.
    EnvInfo = 2,
    /// Database statistics.
    Stat = 3,
    /// Engine build information.
    BuildInfo = 4,
}

impl HandleKind {
    /// All handle kinds.
    pub const ALL: [HandleKind; 5] = [
        HandleKind::Cursor,
        HandleKind::Transaction,
        HandleKind::EnvInfo,
        HandleKind::Stat,
        HandleKind::BuildInfo,
    ];

    /// Returns the code passed to the engine's sizing facility.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Parses a sizing facility code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Cursor => "cursor",
            HandleKind::Transaction => "transaction",
            HandleKind::EnvInfo => "envinfo",
            HandleKind::Stat => "stat",
            HandleKind::BuildInfo => "buildinfo",
        };
        f.write_str(name)
    }
}

/// Copies `bytes` bytes from `src` to `dst` as an undifferentiated blob.
///
/// Always returns [`Status::SUCCESS`]; the status channel is reserved.
///
/// # Safety
///
/// - `src` must be readable and `dst` writable for `bytes` bytes
/// - `bytes` must be the engine's own size for the struct, never a literal
pub unsafe fn copy_handle_raw(src: *const u8, dst: *mut u8, bytes: usize) -> Status {
    if bytes > 0 {
        ptr::copy(src, dst, bytes);
    }
    Status::SUCCESS
}

/// Copies exactly the engine's size of a `kind` struct from `src` to `dst`.
///
/// Bytes past the engine size are left untouched on both sides.
///
/// # Errors
///
/// Returns [`MarshalError::HandleSizeMismatch`] if either buffer is shorter
/// than the engine's size.
pub fn copy_handle<E: NativeEngine + ?Sized>(
    engine: &E,
    kind: HandleKind,
    src: &[u8],
    dst: &mut [u8],
) -> MarshalResult<Status> {
    let native = engine.handle_size(kind);
    let available = src.len().min(dst.len());
    if available < native {
        return Err(MarshalError::HandleSizeMismatch {
            kind,
            native,
            available,
        });
    }
    dst[..native].copy_from_slice(&src[..native]);
    trace!(%kind, bytes = native, "copied opaque handle");
    Ok(Status::SUCCESS)
}

/// An owned copy of an engine struct, sized by the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct HandleBuf {
    kind: HandleKind,
    bytes: Box<[u8]>,
}

impl HandleBuf {
    /// Allocates a zeroed buffer of the engine's size for `kind`.
    pub fn for_kind<E: NativeEngine + ?Sized>(engine: &E, kind: HandleKind) -> Self {
        Self {
            kind,
            bytes: vec![0u8; engine.handle_size(kind)].into_boxed_slice(),
        }
    }

    /// Captures a handle from a byte view.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::HandleSizeMismatch`] if `src` is shorter than
    /// the engine's size.
    pub fn capture<E: NativeEngine + ?Sized>(
        engine: &E,
        kind: HandleKind,
        src: &[u8],
    ) -> MarshalResult<Self> {
        let mut buf = Self::for_kind(engine, kind);
        copy_handle(engine, kind, src, &mut buf.bytes)?;
        Ok(buf)
    }

    /// Captures a handle from an engine pointer.
    ///
    /// # Safety
    ///
    /// `src` must point to a live engine struct of this `kind`.
    pub unsafe fn capture_raw<E: NativeEngine + ?Sized>(
        engine: &E,
        kind: HandleKind,
        src: *const u8,
    ) -> Self {
        let mut buf = Self::for_kind(engine, kind);
        copy_handle_raw(src, buf.bytes.as_mut_ptr(), buf.bytes.len());
        buf
    }

    /// Writes the captured bytes back to an engine struct.
    ///
    /// # Safety
    ///
    /// `dst` must point to writable storage for an engine struct of this
    /// `kind`.
    pub unsafe fn restore_raw(&self, dst: *mut u8) -> Status {
        copy_handle_raw(self.bytes.as_ptr(), dst, self.bytes.len())
    }

    /// Returns the handle kind.
    #[must_use]
    pub const fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Returns the captured bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the captured bytes mutably.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Returns the size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the engine reports a zero-sized struct.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for HandleBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleBuf")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::put::{Dbi, PutFlags, RawTxn};
    use crate::value::NativeValue;

    struct Sized48;

    impl NativeEngine for Sized48 {
        fn put(
            &self,
            _txn: *mut RawTxn,
            _dbi: Dbi,
            _key: &NativeValue,
            _data: &mut [NativeValue],
            _flags: PutFlags,
        ) -> Status {
            Status::SUCCESS
        }

        fn handle_size(&self, kind: HandleKind) -> usize {
            match kind {
                HandleKind::Cursor => 48,
                _ => 16,
            }
        }
    }

    #[test]
    fn copies_exact_size() {
        let src: Vec<u8> = (0..64).collect();
        let mut dst = vec![0xEEu8; 64];
        copy_handle(&Sized48, HandleKind::Cursor, &src, &mut dst).unwrap();
        assert_eq!(&dst[..48], &src[..48]);
        assert!(dst[48..].iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn rejects_short_destination() {
        let src = [1u8; 48];
        let mut dst = [0u8; 47];
        let err = copy_handle(&Sized48, HandleKind::Cursor, &src, &mut dst).unwrap_err();
        assert_eq!(
            err,
            MarshalError::HandleSizeMismatch {
                kind: HandleKind::Cursor,
                native: 48,
                available: 47,
            }
        );
        assert_eq!(dst, [0u8; 47]);
    }

    #[test]
    fn raw_copy_stops_at_size() {
        let src = [7u8; 16];
        let mut dst = [0u8; 20];
        let status = unsafe { copy_handle_raw(src.as_ptr(), dst.as_mut_ptr(), 16) };
        assert!(status.is_success());
        assert_eq!(&dst[..16], &src);
        assert_eq!(&dst[16..], &[0u8; 4]);
    }

    #[test]
    fn capture_and_restore() {
        let cursor: Vec<u8> = (100..148).collect();
        let buf = unsafe { HandleBuf::capture_raw(&Sized48, HandleKind::Cursor, cursor.as_ptr()) };
        assert_eq!(buf.len(), 48);
        assert_eq!(buf.as_bytes(), &cursor[..]);

        let mut relocated = vec![0u8; 48];
        unsafe { buf.restore_raw(relocated.as_mut_ptr()) };
        assert_eq!(relocated, cursor);

        let again = HandleBuf::capture(&Sized48, HandleKind::Cursor, &relocated).unwrap();
        assert_eq!(again, buf);
    }

    #[test]
    fn kind_codes_round_trip() {
        for kind in HandleKind::ALL {
            assert_eq!(HandleKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(HandleKind::from_code(99), None);
    }
}
