//! Log forwarding and subscriber setup.

use crate::error::{result_call, FfiError, KvBridgeResult};
use crate::types::{c_bytes, format_args, KvFormatArg};
use kvbridge_core::log::log_native;
use kvbridge_core::{BoundedFormatter, NativeLogLevel};
use std::ffi::{c_char, c_int, CStr};
use tracing_subscriber::EnvFilter;

/// Forwards one engine log message to `tracing`.
///
/// # Safety
///
/// - `function` must be null or a NUL-terminated string
/// - `format` must be a NUL-terminated string
/// - `args` must point to `count` valid arguments
#[no_mangle]
pub unsafe extern "C" fn kvbridge_log_message(
    level: c_int,
    function: *const c_char,
    line: c_int,
    format: *const c_char,
    args: *const KvFormatArg,
    count: usize,
) -> KvBridgeResult {
    result_call(|| {
        let level = NativeLogLevel::from_raw(level)?;
        let function = if function.is_null() {
            "?".into()
        } else {
            CStr::from_ptr(function).to_string_lossy()
        };
        let format = c_bytes(format, "format")?;
        let args = format_args(args, count)?;
        let line = u32::try_from(line).unwrap_or(0);
        log_native(&BoundedFormatter::default(), level, &function, line, format, &args)?;
        Ok(())
    })
}

/// Returns the most verbose engine level the subscriber records, or -1 if
/// none is recorded.
#[no_mangle]
pub extern "C" fn kvbridge_max_log_level() -> c_int {
    NativeLogLevel::max_enabled().map_or(-1, NativeLogLevel::code)
}

/// Installs a global `tracing` subscriber that prints to stderr.
///
/// `filter` uses `EnvFilter` syntax, e.g. `"kvbridge=debug"`. A null
/// filter reads `RUST_LOG`, falling back to `info`.
///
/// # Safety
///
/// `filter` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn kvbridge_init_logging(filter: *const c_char) -> KvBridgeResult {
    result_call(|| {
        let filter = if filter.is_null() {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        } else {
            let directives = CStr::from_ptr(filter)
                .to_str()
                .map_err(|_| FfiError::InvalidArgument("filter is not UTF-8".into()))?;
            EnvFilter::try_new(directives).map_err(|e| FfiError::InvalidArgument(e.to_string()))?
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| FfiError::Logging(e.to_string()))
    })
}
