//! # kvbridge Core
//!
//! Marshaling primitives between a managed host runtime and the C value
//! representation of an MDBX-style memory-mapped key-value engine.
//!
//! This crate provides:
//! - Bounds-checked, overlap-tolerant region copies ([`copy`], [`shift`], [`copy_raw`])
//! - Host/native value descriptor mapping ([`map_value`], [`map_host_value`])
//! - The multi-value put adapter ([`put_multiple`], [`put_values`], [`DupFixedBatch`])
//! - Opaque handle copies sized by the engine ([`copy_handle`], [`HandleBuf`])
//! - A bounded printf-style formatter with a call-local staging buffer
//! - Routing of engine log callbacks into `tracing`
//!
//! ## Ownership
//!
//! Nothing in this crate owns the bytes a value describes. Descriptors are
//! created at call entry and dropped before the call returns.
//!
//! ## Example
//!
//! ```rust
//! use kvbridge_core::copy;
//!
//! let source = b"HELLOWORLD";
//! let mut dest = [0u8; 10];
//! copy(source, 0, &mut dest, 0, 5).unwrap();
//! assert_eq!(&dest, b"HELLO\0\0\0\0\0");
//! ```

#![warn(missing_docs)]

#[cfg(not(target_pointer_width = "64"))]
compile_error!("kvbridge_core requires a 64-bit target: host value fields are 64-bit addresses");

mod bridge;
mod config;
mod error;
pub mod format;
mod handle;
pub mod log;
mod put;
mod region;
mod status;
mod value;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{MarshalError, MarshalResult, RegionSide};
pub use format::{
    format_bounded, BoundedFormatter, FormatArg, Formatted, FormatterConfig, OverflowPolicy,
    Staged, DEFAULT_STAGING_LIMIT, MAX_STAGING_LIMIT,
};
pub use handle::{copy_handle, copy_handle_raw, HandleBuf, HandleKind};
pub use log::{log_native, NativeLogLevel};
pub use put::{
    put_multiple, put_multiple_raw, put_raw, put_values, BatchOutcome, Dbi, DupFixedBatch,
    NativeEngine, PutFlags, RawTxn,
};
pub use region::{copy, copy_raw, copy_to_vec, shift, RawRegion};
pub use status::Status;
pub use value::{map_host_value, map_value, BorrowedValue, HostValue, NativeValue};
