//! Type definitions for FFI.

use crate::error::{FfiError, FfiResult};
use kvbridge_core::{FormatArg, HostValue, NativeValue, RawTxn};
use std::ffi::{c_char, c_void, CStr};

/// The engine value descriptor (`MDBX_val`).
pub type KvVal = NativeValue;

/// The host value descriptor: address and length as 64-bit integers.
pub type KvHostVal = HostValue;

/// An opaque engine transaction.
pub type KvTxn = RawTxn;

/// A borrowed byte string: pointer and length, no terminator.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KvStr {
    /// Pointer to the first byte.
    pub data: *const u8,
    /// Length in bytes.
    pub len: usize,
}

/// Payload of a [`KvFormatArg`], selected by its `kind`.
#[repr(C)]
#[derive(Clone, Copy)]
pub union KvFormatValue {
    /// `KV_ARG_INT`.
    pub int: i64,
    /// `KV_ARG_UINT` and `KV_ARG_CHAR`.
    pub uint: u64,
    /// `KV_ARG_DOUBLE`.
    pub double: f64,
    /// `KV_ARG_PTR` and `KV_ARG_CSTR`.
    pub ptr: *const c_void,
    /// `KV_ARG_STR`.
    pub str: KvStr,
}

/// A typed format argument.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct KvFormatArg {
    /// One of the `KV_ARG_*` constants.
    pub kind: u32,
    /// The payload.
    pub value: KvFormatValue,
}

impl KvFormatArg {
    /// Signed integer.
    pub const INT: u32 = 0;
    /// Unsigned integer.
    pub const UINT: u32 = 1;
    /// Double.
    pub const DOUBLE: u32 = 2;
    /// Single byte, stored in `uint`.
    pub const CHAR: u32 = 3;
    /// Byte string with explicit length.
    pub const STR: u32 = 4;
    /// NUL-terminated string, stored in `ptr`.
    pub const CSTR: u32 = 5;
    /// Address.
    pub const PTR: u32 = 6;

    /// A signed integer argument.
    pub fn int(value: i64) -> Self {
        Self {
            kind: Self::INT,
            value: KvFormatValue { int: value },
        }
    }

    /// An unsigned integer argument.
    pub fn uint(value: u64) -> Self {
        Self {
            kind: Self::UINT,
            value: KvFormatValue { uint: value },
        }
    }

    /// A double argument.
    pub fn double(value: f64) -> Self {
        Self {
            kind: Self::DOUBLE,
            value: KvFormatValue { double: value },
        }
    }

    /// A single byte argument.
    pub fn char(value: u8) -> Self {
        Self {
            kind: Self::CHAR,
            value: KvFormatValue {
                uint: u64::from(value),
            },
        }
    }

    /// A byte string argument borrowing `bytes`.
    pub fn str(bytes: &[u8]) -> Self {
        Self {
            kind: Self::STR,
            value: KvFormatValue {
                str: KvStr {
                    data: bytes.as_ptr(),
                    len: bytes.len(),
                },
            },
        }
    }

    /// A NUL-terminated string argument borrowing `text`.
    pub fn cstr(text: &CStr) -> Self {
        Self {
            kind: Self::CSTR,
            value: KvFormatValue {
                ptr: text.as_ptr().cast(),
            },
        }
    }

    /// An address argument.
    pub fn ptr(address: *const c_void) -> Self {
        Self {
            kind: Self::PTR,
            value: KvFormatValue { ptr: address },
        }
    }

    /// Converts to the core argument type.
    ///
    /// # Safety
    ///
    /// String payloads must describe bytes that stay valid for `'a`.
    pub(crate) unsafe fn to_core<'a>(self, index: usize) -> FfiResult<FormatArg<'a>> {
        let arg = match self.kind {
            Self::INT => FormatArg::Int(self.value.int),
            Self::UINT => FormatArg::UInt(self.value.uint),
            Self::DOUBLE => FormatArg::Double(self.value.double),
            Self::CHAR => FormatArg::Char(self.value.uint as u8),
            Self::STR => {
                let KvStr { data, len } = self.value.str;
                if data.is_null() {
                    if len > 0 {
                        return Err(FfiError::NullPointer("string argument"));
                    }
                    FormatArg::Str(&[])
                } else {
                    FormatArg::Str(std::slice::from_raw_parts(data, len))
                }
            }
            Self::CSTR => {
                let ptr = self.value.ptr.cast::<c_char>();
                if ptr.is_null() {
                    FormatArg::Str(b"(null)")
                } else {
                    FormatArg::Str(CStr::from_ptr(ptr).to_bytes())
                }
            }
            Self::PTR => FormatArg::Ptr(self.value.ptr as usize),
            kind => {
                return Err(FfiError::InvalidArgument(format!(
                    "format argument {index} has unknown kind {kind}"
                )))
            }
        };
        Ok(arg)
    }
}

/// Converts a caller argument array.
///
/// # Safety
///
/// A non-null `args` must point to `count` valid arguments whose string
/// payloads stay valid for `'a`.
pub(crate) unsafe fn format_args<'a>(
    args: *const KvFormatArg,
    count: usize,
) -> FfiResult<Vec<FormatArg<'a>>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if args.is_null() {
        return Err(FfiError::NullPointer("args"));
    }
    std::slice::from_raw_parts(args, count)
        .iter()
        .enumerate()
        .map(|(index, arg)| arg.to_core(index))
        .collect()
}

/// Borrows a required NUL-terminated string.
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated string valid for `'a`.
pub(crate) unsafe fn c_bytes<'a>(ptr: *const c_char, name: &'static str) -> FfiResult<&'a [u8]> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    Ok(CStr::from_ptr(ptr).to_bytes())
}
