//! Value descriptor mapping.

use crate::error::{load, result_call, store, KvBridgeResult};
use crate::types::{KvHostVal, KvVal};
use kvbridge_core::{map_host_value, map_value};

/// Copies an engine descriptor into its host representation.
///
/// # Safety
///
/// `input` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_map_val(input: *const KvVal, out: *mut KvHostVal) -> KvBridgeResult {
    result_call(|| {
        let value = load(input, "input")?;
        store(out, map_value(value), "out")
    })
}

/// Copies a host descriptor into the engine representation.
///
/// # Safety
///
/// `input` must be readable and `out` writable.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_unmap_val(input: *const KvHostVal, out: *mut KvVal) -> KvBridgeResult {
    result_call(|| {
        let value = load(input, "input")?;
        store(out, map_host_value(value), "out")
    })
}
