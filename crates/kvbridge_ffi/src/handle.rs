//! Opaque handle copies.

use crate::engine;
use crate::error::{result_call, status_call, store, FfiError, KvBridgeResult};
use kvbridge_core::{copy_handle_raw, HandleKind, NativeEngine};
use std::ffi::c_int;

/// Copies `bytes` bytes of an engine struct from `src` to `dst`.
///
/// Returns 0, or `EINVAL` with the last error set if a pointer is null.
///
/// # Safety
///
/// `src` must be readable and `dst` writable for `bytes` bytes, and
/// `bytes` must be the engine's size for the struct.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_copy_handle(src: *const u8, dst: *mut u8, bytes: usize) -> c_int {
    status_call(|| {
        if bytes > 0 && src.is_null() {
            return Err(FfiError::NullPointer("src"));
        }
        if bytes > 0 && dst.is_null() {
            return Err(FfiError::NullPointer("dst"));
        }
        Ok(copy_handle_raw(src, dst, bytes))
    })
}

/// Copies a cursor, sized by the installed engine.
///
/// # Safety
///
/// `src` must point to a live engine cursor and `dst` to writable storage
/// of the engine's cursor size.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_copy_cursor(src: *const u8, dst: *mut u8) -> c_int {
    status_call(|| {
        let bytes = engine::installed()?.handle_size(HandleKind::Cursor);
        if src.is_null() || dst.is_null() {
            return Err(FfiError::NullPointer("cursor"));
        }
        Ok(copy_handle_raw(src, dst, bytes))
    })
}

/// Reports the installed engine's size for a handle kind.
///
/// # Safety
///
/// `out_size` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_handle_size(kind: u32, out_size: *mut usize) -> KvBridgeResult {
    result_call(|| {
        let kind = HandleKind::from_code(kind)
            .ok_or_else(|| FfiError::InvalidArgument(format!("unknown handle kind {kind}")))?;
        let size = engine::installed()?.handle_size(kind);
        store(out_size, size, "out_size")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::test_api;
    use crate::engine::{kvbridge_install_engine, kvbridge_uninstall_engine};
    use crate::test_support::engine_lock;
    use kvbridge_core::Status;

    #[test]
    fn copies_exact_bytes() {
        let src: Vec<u8> = (1..=32).collect();
        let mut dst = [0xEEu8; 32];
        let code = unsafe { kvbridge_copy_handle(src.as_ptr(), dst.as_mut_ptr(), 16) };
        assert_eq!(code, 0);
        assert_eq!(&dst[..16], &src[..16]);
        assert!(dst[16..].iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn null_handle_is_einval() {
        let mut dst = [0u8; 4];
        let code = unsafe { kvbridge_copy_handle(std::ptr::null(), dst.as_mut_ptr(), 4) };
        assert_eq!(code, Status::EINVAL.code());
        assert_eq!(unsafe { kvbridge_copy_handle(std::ptr::null(), std::ptr::null_mut(), 0) }, 0);
    }

    #[test]
    fn cursor_size_comes_from_engine() {
        let _guard = engine_lock();
        let api = test_api();
        unsafe { kvbridge_install_engine(&api) };

        let src = [7u8; 32];
        let mut dst = [0u8; 32];
        assert_eq!(unsafe { kvbridge_copy_cursor(src.as_ptr(), dst.as_mut_ptr()) }, 0);
        assert_eq!(&dst[..24], &[7u8; 24]);
        assert_eq!(&dst[24..], &[0u8; 8]);

        let mut size = 0usize;
        let result = unsafe { kvbridge_handle_size(HandleKind::Stat.code(), &mut size) };
        assert!(result.is_ok());
        assert_eq!(size, 8);
        assert_eq!(
            unsafe { kvbridge_handle_size(99, &mut size) },
            KvBridgeResult::InvalidArgument
        );
        kvbridge_uninstall_engine();
    }

    #[test]
    fn cursor_copy_needs_engine() {
        let _guard = engine_lock();
        kvbridge_uninstall_engine();
        let src = [7u8; 32];
        let mut dst = [0u8; 32];
        let code = unsafe { kvbridge_copy_cursor(src.as_ptr(), dst.as_mut_ptr()) };
        assert_eq!(code, Status::EINVAL.code());
        assert_eq!(dst, [0u8; 32]);
    }
}
