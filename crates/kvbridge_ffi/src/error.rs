//! Error codes and result types.

use kvbridge_core::{MarshalError, Status};
use std::cell::RefCell;
use std::ffi::{c_int, CString};
use thiserror::Error;
use tracing::warn;

/// Result code for FFI functions that do not return an engine status.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvBridgeResult {
    /// Operation succeeded.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Null pointer.
    NullPointer = 3,
    /// A range does not fit its region.
    OutOfBounds = 4,
    /// The destination or staging buffer is too small.
    BufferTooSmall = 5,
    /// Malformed format string or arguments.
    InvalidFormat = 6,
    /// A handle buffer does not match the engine's size.
    SizeMismatch = 7,
    /// A key or value exceeds the engine's limit.
    BadValSize = 8,
    /// No engine has been installed.
    EngineMissing = 9,
    /// Feature not supported.
    NotSupported = 10,
    /// Output was written but cut short.
    Truncated = 11,
}

impl KvBridgeResult {
    /// Returns true if the result indicates complete success.
    pub fn is_ok(self) -> bool {
        self == KvBridgeResult::Ok
    }

    /// Returns true if the result indicates an error.
    ///
    /// [`KvBridgeResult::Truncated`] is neither `ok` nor an error.
    pub fn is_err(self) -> bool {
        !matches!(self, KvBridgeResult::Ok | KvBridgeResult::Truncated)
    }
}

/// Error code type for C compatibility.
pub type ErrorCode = i32;

impl From<KvBridgeResult> for ErrorCode {
    fn from(result: KvBridgeResult) -> Self {
        result as ErrorCode
    }
}

impl From<ErrorCode> for KvBridgeResult {
    fn from(code: ErrorCode) -> Self {
        match code {
            0 => KvBridgeResult::Ok,
            2 => KvBridgeResult::InvalidArgument,
            3 => KvBridgeResult::NullPointer,
            4 => KvBridgeResult::OutOfBounds,
            5 => KvBridgeResult::BufferTooSmall,
            6 => KvBridgeResult::InvalidFormat,
            7 => KvBridgeResult::SizeMismatch,
            8 => KvBridgeResult::BadValSize,
            9 => KvBridgeResult::EngineMissing,
            10 => KvBridgeResult::NotSupported,
            11 => KvBridgeResult::Truncated,
            _ => KvBridgeResult::Error,
        }
    }
}

impl From<&MarshalError> for KvBridgeResult {
    fn from(err: &MarshalError) -> Self {
        match err {
            MarshalError::OutOfBounds { .. } => KvBridgeResult::OutOfBounds,
            MarshalError::NullRegion { .. } => KvBridgeResult::NullPointer,
            MarshalError::BufferTooSmall { .. } | MarshalError::StagingOverflow { .. } => {
                KvBridgeResult::BufferTooSmall
            }
            MarshalError::InvalidFormat { .. }
            | MarshalError::MissingArgument { .. }
            | MarshalError::ArgumentMismatch { .. } => KvBridgeResult::InvalidFormat,
            MarshalError::BadValSize { .. } => KvBridgeResult::BadValSize,
            MarshalError::HandleSizeMismatch { .. } => KvBridgeResult::SizeMismatch,
            MarshalError::UnevenBatch { .. }
            | MarshalError::EmptyValueSequence
            | MarshalError::UnknownLogLevel(_) => KvBridgeResult::InvalidArgument,
        }
    }
}

/// Errors detected at the C boundary.
#[derive(Debug, Error)]
pub enum FfiError {
    /// A required pointer argument was null.
    #[error("null pointer argument: {0}")]
    NullPointer(&'static str),

    /// An argument could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No engine function table is installed.
    #[error("no engine installed")]
    EngineMissing,

    /// Logging could not be initialised.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// The marshaling layer rejected the request.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

impl FfiError {
    /// Returns the result code reported to C callers.
    pub fn code(&self) -> KvBridgeResult {
        match self {
            FfiError::NullPointer(_) => KvBridgeResult::NullPointer,
            FfiError::InvalidArgument(_) => KvBridgeResult::InvalidArgument,
            FfiError::EngineMissing => KvBridgeResult::EngineMissing,
            FfiError::Logging(_) => KvBridgeResult::Error,
            FfiError::Marshal(err) => err.into(),
        }
    }
}

/// Result type for boundary operations.
pub type FfiResult<T> = Result<T, FfiError>;

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Records `err` as the last error and returns its code.
pub(crate) fn fail(err: &FfiError) -> KvBridgeResult {
    let code = err.code();
    warn!(%err, code = ErrorCode::from(code), "request rejected at the C boundary");
    set_last_error(err.to_string());
    code
}

/// Runs a boundary operation returning a [`KvBridgeResult`].
pub(crate) fn result_call(op: impl FnOnce() -> FfiResult<()>) -> KvBridgeResult {
    outcome_call(|| op().map(|()| KvBridgeResult::Ok))
}

/// Like [`result_call`], for operations that pick their own success code.
pub(crate) fn outcome_call(op: impl FnOnce() -> FfiResult<KvBridgeResult>) -> KvBridgeResult {
    clear_last_error();
    match op() {
        Ok(code) => code,
        Err(err) => fail(&err),
    }
}

/// Runs a boundary operation returning a raw engine status.
///
/// Layer errors become `EINVAL` with the last error set.
pub(crate) fn status_call(op: impl FnOnce() -> FfiResult<Status>) -> c_int {
    clear_last_error();
    match op() {
        Ok(status) => status.code(),
        Err(err) => {
            fail(&err);
            Status::EINVAL.code()
        }
    }
}

/// Reads a required `T` from a caller pointer.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads.
pub(crate) unsafe fn load<T: Copy>(ptr: *const T, name: &'static str) -> FfiResult<T> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    Ok(ptr.read_unaligned())
}

/// Writes `value` through a required caller pointer.
///
/// # Safety
///
/// A non-null `ptr` must be valid for writes.
pub(crate) unsafe fn store<T>(ptr: *mut T, value: T, name: &'static str) -> FfiResult<()> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    ptr.write_unaligned(value);
    Ok(())
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn kvbridge_get_last_error() -> *const std::ffi::c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn kvbridge_clear_error() {
    clear_last_error();
}
