//! Bounded formatting export.

use crate::error::{outcome_call, FfiError, KvBridgeResult};
use crate::types::{c_bytes, format_args, KvFormatArg};
use kvbridge_core::{BoundedFormatter, FormatterConfig, OverflowPolicy};
use std::ffi::c_char;

/// Fail with `BufferTooSmall` instead of truncating.
pub const KVBRIDGE_FORMAT_REJECT: u32 = 1;

const KNOWN_FLAGS: u32 = KVBRIDGE_FORMAT_REJECT;

/// Formats `format` with `args` into `dest`, writing at most `capacity`
/// bytes including the NUL terminator.
///
/// By default output that does not fit is truncated and the call returns
/// [`KvBridgeResult::Truncated`]. With [`KVBRIDGE_FORMAT_REJECT`] in `flags`
/// it returns [`KvBridgeResult::BufferTooSmall`] and leaves `dest` untouched.
///
/// `out_written`, if not null, receives the number of bytes written before
/// the terminator. `out_required`, if not null, receives the full rendered
/// length excluding the terminator, also when the output does not fit.
///
/// # Safety
///
/// - `dest` must be writable for `capacity` bytes
/// - `format` must be a NUL-terminated string
/// - `args` must point to `count` valid arguments
/// - non-null out pointers must be writable
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn kvbridge_format_bounded(
    dest: *mut c_char,
    capacity: usize,
    format: *const c_char,
    args: *const KvFormatArg,
    count: usize,
    flags: u32,
    out_written: *mut usize,
    out_required: *mut usize,
) -> KvBridgeResult {
    outcome_call(|| {
        if flags & !KNOWN_FLAGS != 0 {
            return Err(FfiError::InvalidArgument(format!(
                "unknown format flags {flags:#x}"
            )));
        }
        let format = c_bytes(format, "format")?;
        let args = format_args(args, count)?;
        let overflow = if flags & KVBRIDGE_FORMAT_REJECT != 0 {
            OverflowPolicy::Reject
        } else {
            OverflowPolicy::Truncate
        };
        let formatter = BoundedFormatter::new(FormatterConfig::new().overflow(overflow));

        let required = formatter.measure(format, &args)?;
        if let Some(out) = out_required.as_mut() {
            *out = required;
        }
        let dest: &mut [u8] = if capacity == 0 {
            &mut []
        } else if dest.is_null() {
            return Err(FfiError::NullPointer("dest"));
        } else {
            std::slice::from_raw_parts_mut(dest.cast(), capacity)
        };
        let formatted = formatter.format_into(dest, format, &args)?;
        if let Some(written) = out_written.as_mut() {
            *written = formatted.written;
        }
        Ok(if formatted.truncated {
            KvBridgeResult::Truncated
        } else {
            KvBridgeResult::Ok
        })
    })
}
