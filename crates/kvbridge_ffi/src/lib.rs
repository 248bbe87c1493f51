//! # kvbridge FFI
//!
//! Stable C ABI for the kvbridge marshaling layer.
//!
//! This crate provides:
//! - C-compatible function exports for region copies, value mapping,
//!   multi-value puts, handle copies, bounded formatting and log forwarding
//! - Installation of the engine's function table
//! - Error code mapping with a thread-local last error message
//! - Buffer management
//!
//! ## Status codes
//!
//! Functions that reach the engine return its status as a raw `int`,
//! unchanged. When the layer rejects a request before the engine runs, they
//! return `EINVAL` and set the last error. Every other function returns a
//! [`KvBridgeResult`].

#![warn(missing_docs)]

mod buffer;
mod engine;
mod error;
mod format;
mod handle;
mod log;
mod put;
mod types;
mod value;

pub use buffer::{kvbridge_buffer_copy, kvbridge_free_buffer, kvbridge_value_to_buffer, KvBuffer};
pub use engine::{
    kvbridge_engine_installed, kvbridge_install_engine, kvbridge_uninstall_engine, KvEngineApi,
    KvHandleSizeFn, KvMaxKeySizeFn, KvPutFn,
};
pub use error::{
    clear_last_error, kvbridge_clear_error, kvbridge_get_last_error, set_last_error, ErrorCode,
    FfiError, FfiResult, KvBridgeResult,
};
pub use format::{kvbridge_format_bounded, KVBRIDGE_FORMAT_REJECT};
pub use handle::{kvbridge_copy_cursor, kvbridge_copy_handle, kvbridge_handle_size};
pub use log::{kvbridge_init_logging, kvbridge_log_message, kvbridge_max_log_level};
pub use put::{kvbridge_put_multiple, kvbridge_put_values};
pub use types::{KvFormatArg, KvFormatValue, KvHostVal, KvStr, KvTxn, KvVal};
pub use value::{kvbridge_map_val, kvbridge_unmap_val};
