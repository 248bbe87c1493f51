//! Multi-value put exports.

use crate::engine;
use crate::error::{load, status_call, store, FfiError};
use crate::types::{KvTxn, KvVal};
use kvbridge_core::PutFlags;
use std::ffi::c_int;

/// Puts two data values under `key` in one engine call.
///
/// The engine receives `[*data1, *data2]`. Descriptor updates it makes,
/// such as the stored count of a `MULTIPLE` put, are written back.
///
/// Returns the engine status unchanged, or `EINVAL` with the last error set
/// if the layer could not call the engine.
///
/// # Safety
///
/// - `key`, `data1` and `data2` must point to valid descriptors
/// - `txn` must be a transaction the installed engine accepts
#[no_mangle]
pub unsafe extern "C" fn kvbridge_put_multiple(
    txn: *mut KvTxn,
    dbi: u32,
    key: *const KvVal,
    data1: *mut KvVal,
    data2: *mut KvVal,
    flags: u32,
) -> c_int {
    status_call(|| {
        let key = load(key, "key")?;
        let mut data = [load(data1, "data1")?, load(data2, "data2")?];
        let status = engine::bridge()?.put_raw(txn, dbi, &key, &mut data, PutFlags::from_bits(flags))?;
        store(data1, data[0], "data1")?;
        store(data2, data[1], "data2")?;
        Ok(status)
    })
}

/// Puts `count` data values under `key` in one engine call.
///
/// # Safety
///
/// - `key` must point to a valid descriptor
/// - `data` must point to `count` writable descriptors
/// - `txn` must be a transaction the installed engine accepts
#[no_mangle]
pub unsafe extern "C" fn kvbridge_put_values(
    txn: *mut KvTxn,
    dbi: u32,
    key: *const KvVal,
    data: *mut KvVal,
    count: usize,
    flags: u32,
) -> c_int {
    status_call(|| {
        let key = load(key, "key")?;
        let values: &mut [KvVal] = if count == 0 {
            &mut []
        } else if data.is_null() {
            return Err(FfiError::NullPointer("data"));
        } else {
            std::slice::from_raw_parts_mut(data, count)
        };
        Ok(engine::bridge()?.put_raw(txn, dbi, &key, values, PutFlags::from_bits(flags))?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{test_api, LAST_PUT};
    use crate::engine::{kvbridge_install_engine, kvbridge_uninstall_engine};
    use crate::error::kvbridge_get_last_error;
    use crate::test_support::engine_lock;
    use kvbridge_core::{NativeValue, Status};
    use std::ffi::CStr;

    fn last_error() -> String {
        let ptr = kvbridge_get_last_error();
        assert!(!ptr.is_null());
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    #[test]
    fn delivers_both_values_and_status() {
        let _guard = engine_lock();
        let api = test_api();
        unsafe { kvbridge_install_engine(&api) };

        let key = NativeValue::from_slice(b"k");
        let mut first = NativeValue::from_slice(b"AA");
        let mut second = NativeValue::from_slice(b"BBB");
        let code = unsafe {
            kvbridge_put_multiple(std::ptr::null_mut(), 2, &key, &mut first, &mut second, 0)
        };
        assert_eq!(code, Status::KEYEXIST.code());

        let (key, values, flags) = LAST_PUT.lock().take().unwrap();
        assert_eq!(key, b"k");
        assert_eq!(values, vec![b"AA".to_vec(), b"BBB".to_vec()]);
        assert_eq!(flags, 0);
        kvbridge_uninstall_engine();
    }

    #[test]
    fn multiple_count_is_written_back() {
        let _guard = engine_lock();
        let api = test_api();
        unsafe { kvbridge_install_engine(&api) };

        let packed = b"aabbcc";
        let key = NativeValue::from_slice(b"key");
        let mut elements = NativeValue {
            iov_base: packed.as_ptr().cast_mut().cast(),
            iov_len: 2,
        };
        let mut count = NativeValue::count(3);
        unsafe {
            kvbridge_put_multiple(
                std::ptr::null_mut(),
                1,
                &key,
                &mut elements,
                &mut count,
                PutFlags::MULTIPLE.bits(),
            )
        };
        assert_eq!(count.iov_len, 2);
        kvbridge_uninstall_engine();
    }

    #[test]
    fn oversized_key_never_reaches_engine() {
        let _guard = engine_lock();
        let api = test_api();
        unsafe { kvbridge_install_engine(&api) };
        LAST_PUT.lock().take();

        let key = NativeValue::from_slice(b"a key longer than eight");
        let mut value = NativeValue::from_slice(b"v");
        let code = unsafe { kvbridge_put_values(std::ptr::null_mut(), 1, &key, &mut value, 1, 0) };
        assert_eq!(code, Status::EINVAL.code());
        assert!(last_error().contains("longer than 8"));
        assert!(LAST_PUT.lock().is_none());
        kvbridge_uninstall_engine();
    }

    #[test]
    fn missing_engine_is_einval() {
        let _guard = engine_lock();
        kvbridge_uninstall_engine();
        let key = NativeValue::from_slice(b"k");
        let mut a = NativeValue::from_slice(b"a");
        let mut b = NativeValue::from_slice(b"b");
        let code = unsafe { kvbridge_put_multiple(std::ptr::null_mut(), 1, &key, &mut a, &mut b, 0) };
        assert_eq!(code, Status::EINVAL.code());
        assert_eq!(last_error(), "no engine installed");
    }

    #[test]
    fn empty_value_array_is_rejected() {
        let _guard = engine_lock();
        let api = test_api();
        unsafe { kvbridge_install_engine(&api) };
        let key = NativeValue::from_slice(b"k");
        let code = unsafe {
            kvbridge_put_values(std::ptr::null_mut(), 1, &key, std::ptr::null_mut(), 0, 0)
        };
        assert_eq!(code, Status::EINVAL.code());
        assert_eq!(last_error(), "put requires at least one data value");
        kvbridge_uninstall_engine();
    }
}
