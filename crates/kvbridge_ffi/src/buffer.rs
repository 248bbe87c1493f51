//! Buffer types and region copies for FFI.

use crate::error::{load, result_call, store, FfiError, KvBridgeResult};
use crate::types::KvVal;
use kvbridge_core::{copy_raw, copy_to_vec, RawRegion};

/// A byte buffer for FFI.
///
/// Memory is owned by Rust. Call `kvbridge_free_buffer` to release.
#[repr(C)]
#[derive(Debug)]
pub struct KvBuffer {
    /// Pointer to data.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl KvBuffer {
    /// Creates a new buffer from a Vec.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let mut vec = vec.into_boxed_slice();
        let data = vec.as_mut_ptr();
        let len = vec.len();
        std::mem::forget(vec);

        Self {
            data,
            len,
            capacity: len,
        }
    }

    /// Creates an empty buffer.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Returns true if the buffer is null/empty.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Converts back to a Vec, consuming the buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created from a Vec.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        Vec::from_raw_parts(self.data, self.len, self.capacity)
    }
}

/// Frees a buffer allocated by kvbridge.
///
/// # Safety
///
/// The buffer must have been allocated by kvbridge FFI functions.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_free_buffer(buffer: KvBuffer) {
    drop(buffer.into_vec());
}

/// Copies `len` bytes from `src[src_pos..]` to `dst[dst_pos..]`.
///
/// Regions may overlap or be the same buffer. Both ranges are checked
/// against the declared region lengths before anything is copied.
///
/// # Safety
///
/// - `src` must be readable for `src_len` bytes
/// - `dst` must be writable for `dst_len` bytes
#[no_mangle]
pub unsafe extern "C" fn kvbridge_buffer_copy(
    src: *const u8,
    src_len: usize,
    src_pos: usize,
    dst: *mut u8,
    dst_len: usize,
    dst_pos: usize,
    len: usize,
) -> KvBridgeResult {
    result_call(|| {
        let source = RawRegion::from_raw_parts(src.cast_mut(), src_len);
        let dest = RawRegion::from_raw_parts(dst, dst_len);
        copy_raw(source, src_pos, dest, dst_pos, len)?;
        Ok(())
    })
}

/// Copies the bytes a value describes into a new buffer.
///
/// A null value yields an empty buffer.
///
/// # Safety
///
/// - `val` must point to a valid descriptor of readable bytes
/// - `out_buffer` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn kvbridge_value_to_buffer(
    val: *const KvVal,
    out_buffer: *mut KvBuffer,
) -> KvBridgeResult {
    result_call(|| {
        if out_buffer.is_null() {
            return Err(FfiError::NullPointer("out_buffer"));
        }
        let val = load(val, "val")?;
        let buffer = if val.is_null() {
            KvBuffer::empty()
        } else {
            let region = RawRegion::from_raw_parts(val.iov_base.cast(), val.iov_len);
            KvBuffer::from_vec(copy_to_vec(region)?)
        };
        store(out_buffer, buffer, "out_buffer")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::kvbridge_get_last_error;
    use kvbridge_core::NativeValue;

    #[test]
    fn buffer_from_vec() {
        let data = vec![1u8, 2, 3, 4, 5];
        let buffer = KvBuffer::from_vec(data.clone());

        assert!(!buffer.is_null());
        assert_eq!(buffer.len, 5);

        // Safety: we just created it
        let recovered = unsafe { buffer.into_vec() };
        assert_eq!(recovered, data);
    }

    #[test]
    fn buffer_empty() {
        let buffer = KvBuffer::empty();
        assert!(buffer.is_null());
        assert_eq!(buffer.len, 0);
        unsafe { kvbridge_free_buffer(buffer) };
    }

    #[test]
    fn copy_prefix() {
        let src = *b"HELLOWORLD";
        let mut dst = [0u8; 10];
        let result =
            unsafe { kvbridge_buffer_copy(src.as_ptr(), 10, 0, dst.as_mut_ptr(), 10, 0, 5) };
        assert_eq!(result, KvBridgeResult::Ok);
        assert_eq!(&dst, b"HELLO\0\0\0\0\0");
    }

    #[test]
    fn copy_within_one_buffer() {
        let mut buf = *b"abcdefgh";
        let ptr = buf.as_mut_ptr();
        let result = unsafe { kvbridge_buffer_copy(ptr, 8, 0, ptr, 8, 2, 6) };
        assert!(result.is_ok());
        assert_eq!(&buf, b"ababcdef");
    }

    #[test]
    fn copy_out_of_bounds_sets_error() {
        let src = [0u8; 4];
        let mut dst = [9u8; 4];
        let result = unsafe { kvbridge_buffer_copy(src.as_ptr(), 4, 2, dst.as_mut_ptr(), 4, 0, 3) };
        assert_eq!(result, KvBridgeResult::OutOfBounds);
        assert_eq!(dst, [9u8; 4]);
        assert!(!kvbridge_get_last_error().is_null());
    }

    #[test]
    fn copy_from_null_region() {
        let mut dst = [0u8; 4];
        let result =
            unsafe { kvbridge_buffer_copy(std::ptr::null(), 4, 0, dst.as_mut_ptr(), 4, 0, 4) };
        assert_eq!(result, KvBridgeResult::NullPointer);
    }

    #[test]
    fn value_to_buffer() {
        let data = b"payload".to_vec();
        let val = NativeValue::from_slice(&data);
        let mut out = KvBuffer::empty();
        let result = unsafe { kvbridge_value_to_buffer(&val, &mut out) };
        assert!(result.is_ok());
        assert_eq!(unsafe { out.into_vec() }, data);

        let mut out = KvBuffer::empty();
        let result = unsafe { kvbridge_value_to_buffer(&NativeValue::null(), &mut out) };
        assert!(result.is_ok());
        assert!(out.is_null());
    }
}
