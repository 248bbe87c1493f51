//! Shared test vectors for kvbridge.
//!
//! Host bindings run the same vectors against their own entry points so
//! copies and formatting behave identically on both sides of the boundary.

use kvbridge_core::{copy, format_bounded, FormatArg, MarshalError};
use serde::{Deserialize, Serialize};

/// An owned format argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VectorArg {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point.
    Double(f64),
    /// Single byte.
    Char(u8),
    /// String.
    Str(String),
    /// Address.
    Ptr(usize),
}

impl VectorArg {
    /// Borrows this argument as a formatter argument.
    pub fn as_format_arg(&self) -> FormatArg<'_> {
        match self {
            VectorArg::Int(v) => FormatArg::Int(*v),
            VectorArg::Uint(v) => FormatArg::UInt(*v),
            VectorArg::Double(v) => FormatArg::Double(*v),
            VectorArg::Char(v) => FormatArg::Char(*v),
            VectorArg::Str(s) => FormatArg::Str(s.as_bytes()),
            VectorArg::Ptr(v) => FormatArg::Ptr(*v),
        }
    }
}

/// A bounded formatting case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// printf-style format.
    pub format: String,
    /// Arguments in order.
    pub args: Vec<VectorArg>,
    /// Destination capacity including the terminator.
    pub capacity: usize,
    /// Text expected before the terminator.
    pub expected: String,
    /// Expected error kind (if this should fail).
    pub expected_error: Option<String>,
}

/// A region copy case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Source region (hex-encoded).
    pub source_hex: String,
    /// Offset into the source.
    pub source_pos: usize,
    /// Destination region before the copy (hex-encoded).
    pub dest_hex: String,
    /// Offset into the destination.
    pub dest_pos: usize,
    /// Bytes to copy.
    pub length: usize,
    /// Destination after the copy (hex-encoded).
    pub expected_hex: String,
    /// Expected error kind (if this should fail).
    pub expected_error: Option<String>,
}

/// Returns the stable name of an error's kind, as used in vectors.
pub fn error_kind(err: &MarshalError) -> &'static str {
    match err {
        MarshalError::OutOfBounds { .. } => "out_of_bounds",
        MarshalError::NullRegion { .. } => "null_region",
        MarshalError::BufferTooSmall { .. } => "buffer_too_small",
        MarshalError::StagingOverflow { .. } => "staging_overflow",
        MarshalError::InvalidFormat { .. } => "invalid_format",
        MarshalError::MissingArgument { .. } => "missing_argument",
        MarshalError::ArgumentMismatch { .. } => "argument_mismatch",
        MarshalError::BadValSize { .. } => "bad_val_size",
        MarshalError::UnevenBatch { .. } => "uneven_batch",
        MarshalError::EmptyValueSequence => "empty_value_sequence",
        MarshalError::HandleSizeMismatch { .. } => "handle_size_mismatch",
        MarshalError::UnknownLogLevel(_) => "unknown_log_level",
    }
}

fn format_vector(
    id: &str,
    description: &str,
    format: &str,
    args: Vec<VectorArg>,
    capacity: usize,
    expected: Result<&str, &str>,
) -> FormatVector {
    let (expected, expected_error) = match expected {
        Ok(text) => (text.to_owned(), None),
        Err(kind) => (String::new(), Some(kind.to_owned())),
    };
    FormatVector {
        id: id.into(),
        description: description.into(),
        format: format.into(),
        args,
        capacity,
        expected,
        expected_error,
    }
}

/// Bounded formatting vectors.
pub fn format_vectors() -> Vec<FormatVector> {
    use VectorArg::{Double, Int, Ptr, Str, Uint};

    vec![
        format_vector("fmt_literal", "Plain text", "plain text", vec![], 64, Ok("plain text")),
        format_vector("fmt_percent", "Escaped percent", "100%%", vec![], 64, Ok("100%")),
        format_vector("fmt_int_width", "Right-aligned integer", "%5d|", vec![Int(42)], 64, Ok("   42|")),
        format_vector("fmt_int_zero_pad", "Zero padding after the sign", "%05d", vec![Int(-42)], 64, Ok("-0042")),
        format_vector("fmt_int_min", "Most negative 64-bit integer", "%lld", vec![Int(i64::MIN)], 64, Ok("-9223372036854775808")),
        format_vector("fmt_hex_alt", "Alternate upper hex", "%#X", vec![Uint(255)], 64, Ok("0XFF")),
        format_vector("fmt_octal_alt", "Alternate octal", "%#o", vec![Uint(8)], 64, Ok("010")),
        format_vector("fmt_str_precision", "String precision", "%.3s", vec![Str("abcdef".into())], 64, Ok("abc")),
        format_vector("fmt_str_left", "Left-aligned string", "%-6s|", vec![Str("ab".into())], 64, Ok("ab    |")),
        format_vector("fmt_star_width", "Width from argument", "%*d", vec![Int(6), Int(42)], 64, Ok("    42")),
        format_vector("fmt_star_negative", "Negative width left-aligns", "%*d|", vec![Int(-4), Int(7)], 64, Ok("7   |")),
        format_vector("fmt_pointer", "Pointer", "%p", vec![Ptr(0x1234)], 64, Ok("0x1234")),
        format_vector("fmt_null_pointer", "Null pointer", "%p", vec![Ptr(0)], 64, Ok("(nil)")),
        format_vector("fmt_fixed", "Rounded fixed point", "%.2f", vec![Double(2.345_678)], 64, Ok("2.35")),
        format_vector("fmt_exponent", "Exponential", "%.3e", vec![Double(12345.678)], 64, Ok("1.235e+04")),
        format_vector("fmt_general_large", "General switches to exponent", "%g", vec![Double(1e6)], 64, Ok("1e+06")),
        format_vector("fmt_general_small", "General keeps short decimals", "%g", vec![Double(0.0001)], 64, Ok("0.0001")),
        format_vector("fmt_exact_fit", "Output and terminator fill the buffer", "%s", vec![Str("abc".into())], 4, Ok("abc")),
        format_vector("fmt_truncated", "Output cut to capacity minus one", "%s", vec![Str("abc".into())], 3, Ok("ab")),
        format_vector("fmt_one_byte", "Only the terminator fits", "%d", vec![Int(12345)], 1, Ok("")),
        format_vector("fmt_zero_capacity", "No room for the terminator", "x", vec![], 0, Err("buffer_too_small")),
        format_vector("fmt_incomplete", "Trailing percent", "abc %", vec![], 64, Err("invalid_format")),
        format_vector("fmt_unsupported", "Unknown conversion", "%k", vec![], 64, Err("invalid_format")),
        format_vector("fmt_missing_arg", "Too few arguments", "%d %d", vec![Int(1)], 64, Err("missing_argument")),
        format_vector("fmt_mismatch", "String directive given an integer", "%s", vec![Int(1)], 64, Err("argument_mismatch")),
    ]
}

/// Region copy vectors.
pub fn copy_vectors() -> Vec<CopyVector> {
    vec![
        CopyVector {
            id: "copy_prefix".into(),
            description: "First five bytes into a zeroed region".into(),
            source_hex: hex_encode(b"HELLOWORLD"),
            source_pos: 0,
            dest_hex: "00000000000000000000".into(),
            dest_pos: 0,
            length: 5,
            expected_hex: hex_encode(b"HELLO\0\0\0\0\0"),
            expected_error: None,
        },
        CopyVector {
            id: "copy_offsets".into(),
            description: "Middle of the source into the middle of the destination".into(),
            source_hex: hex_encode(b"HELLOWORLD"),
            source_pos: 5,
            dest_hex: hex_encode(b"----------"),
            dest_pos: 3,
            length: 5,
            expected_hex: hex_encode(b"---WORLD--"),
            expected_error: None,
        },
        CopyVector {
            id: "copy_zero_length".into(),
            description: "Zero-length copy at the end of both regions".into(),
            source_hex: "0102".into(),
            source_pos: 2,
            dest_hex: "0304".into(),
            dest_pos: 2,
            length: 0,
            expected_hex: "0304".into(),
            expected_error: None,
        },
        CopyVector {
            id: "copy_dest_overrun".into(),
            description: "Destination range runs past the end".into(),
            source_hex: hex_encode(b"HELLOWORLD"),
            source_pos: 0,
            dest_hex: "00000000000000000000".into(),
            dest_pos: 8,
            length: 4,
            expected_hex: "00000000000000000000".into(),
            expected_error: Some("out_of_bounds".into()),
        },
        CopyVector {
            id: "copy_source_overrun".into(),
            description: "Source range runs past the end".into(),
            source_hex: "010203".into(),
            source_pos: 1,
            dest_hex: "00000000".into(),
            dest_pos: 0,
            length: 3,
            expected_hex: "00000000".into(),
            expected_error: Some("out_of_bounds".into()),
        },
    ]
}

/// Runs a format vector, returning a description of any mismatch.
pub fn check_format_vector(vector: &FormatVector) -> Result<(), String> {
    let args: Vec<FormatArg<'_>> = vector.args.iter().map(VectorArg::as_format_arg).collect();
    let mut dest = vec![0xFFu8; vector.capacity];
    let outcome = format_bounded(&mut dest, vector.format.as_bytes(), &args);
    match (outcome, vector.expected_error.as_deref()) {
        (Ok(formatted), None) => {
            let text = &dest[..formatted.written];
            if text != vector.expected.as_bytes() {
                return Err(format!(
                    "{}: got {:?}, expected {:?}",
                    vector.id,
                    String::from_utf8_lossy(text),
                    vector.expected
                ));
            }
            if dest.get(formatted.written) != Some(&0) {
                return Err(format!("{}: output is not terminated", vector.id));
            }
            Ok(())
        }
        (Err(err), Some(kind)) if error_kind(&err) == kind => Ok(()),
        (Err(err), expected) => Err(format!(
            "{}: failed with {} ({err}), expected {:?}",
            vector.id,
            error_kind(&err),
            expected
        )),
        (Ok(_), Some(kind)) => Err(format!("{}: succeeded, expected {kind}", vector.id)),
    }
}

/// Runs a copy vector, returning a description of any mismatch.
pub fn check_copy_vector(vector: &CopyVector) -> Result<(), String> {
    let source = hex_decode(&vector.source_hex)?;
    let mut dest = hex_decode(&vector.dest_hex)?;
    let outcome = copy(&source, vector.source_pos, &mut dest, vector.dest_pos, vector.length);
    match (outcome, vector.expected_error.as_deref()) {
        (Ok(()), None) | (Err(_), Some(_)) if hex_encode(&dest) != vector.expected_hex => Err(
            format!("{}: destination is {}", vector.id, hex_encode(&dest)),
        ),
        (Ok(()), None) => Ok(()),
        (Err(err), Some(kind)) if error_kind(&err) == kind => Ok(()),
        (Err(err), _) => Err(format!("{}: failed with {err}", vector.id)),
        (Ok(()), Some(kind)) => Err(format!("{}: succeeded, expected {kind}", vector.id)),
    }
}

/// Generate all test vectors as JSON for host bindings.
pub fn all_vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&AllTestVectors {
        format: format_vectors(),
        copy: copy_vectors(),
    })
}

/// Parses vectors produced by [`all_vectors_json`].
pub fn vectors_from_json(json: &str) -> serde_json::Result<(Vec<FormatVector>, Vec<CopyVector>)> {
    let all: AllTestVectors = serde_json::from_str(json)?;
    Ok((all.format, all.copy))
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    format: Vec<FormatVector>,
    copy: Vec<CopyVector>,
}

/// Encodes bytes as a hexadecimal string.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes a hexadecimal string.
pub fn hex_decode(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd-length hex string: {hex}"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex at {i}: {hex}"))
        })
        .collect()
}
