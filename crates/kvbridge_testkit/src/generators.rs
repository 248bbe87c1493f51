//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random marshaling inputs that stay
//! inside the ranges the operations accept.

use crate::vectors::VectorArg;
use kvbridge_core::HostValue;
use proptest::prelude::*;

/// An in-bounds region copy.
#[derive(Debug, Clone)]
pub struct CopyCase {
    /// Source bytes.
    pub source: Vec<u8>,
    /// Offset into the source.
    pub source_pos: usize,
    /// Destination length.
    pub dest_len: usize,
    /// Offset into the destination.
    pub dest_pos: usize,
    /// Bytes to copy.
    pub length: usize,
}

/// An in-bounds move within one buffer.
#[derive(Debug, Clone)]
pub struct ShiftCase {
    /// Buffer contents.
    pub buf: Vec<u8>,
    /// Source offset.
    pub source_pos: usize,
    /// Destination offset.
    pub dest_pos: usize,
    /// Bytes to move.
    pub length: usize,
}

/// A format string with arguments that satisfy it.
#[derive(Debug, Clone)]
pub struct FormatCase {
    /// printf-style format.
    pub format: String,
    /// Arguments in order.
    pub args: Vec<VectorArg>,
}

/// Strategy for arbitrary value bytes.
pub fn value_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Strategy for copies that fit both regions.
pub fn copy_case_strategy() -> impl Strategy<Value = CopyCase> {
    (prop::collection::vec(any::<u8>(), 0..256), 0usize..256)
        .prop_flat_map(|(source, extra)| {
            let source_len = source.len();
            (Just(source), 0..=source_len, Just(extra))
        })
        .prop_flat_map(|(source, source_pos, extra)| {
            let available = source.len() - source_pos;
            (Just(source), Just(source_pos), 0..=available, Just(extra))
        })
        .prop_flat_map(|(source, source_pos, length, extra)| {
            let dest_len = length + extra;
            (
                Just(source),
                Just(source_pos),
                Just(dest_len),
                0..=extra,
                Just(length),
            )
        })
        .prop_map(|(source, source_pos, dest_len, dest_pos, length)| CopyCase {
            source,
            source_pos,
            dest_len,
            dest_pos,
            length,
        })
}

/// Strategy for moves inside one buffer, overlapping or not.
pub fn shift_case_strategy() -> impl Strategy<Value = ShiftCase> {
    prop::collection::vec(any::<u8>(), 1..256)
        .prop_flat_map(|buf| {
            let len = buf.len();
            (Just(buf), 0..=len)
        })
        .prop_flat_map(|(buf, length)| {
            let room = buf.len() - length;
            (Just(buf), 0..=room, 0..=room, Just(length))
        })
        .prop_map(|(buf, source_pos, dest_pos, length)| ShiftCase {
            buf,
            source_pos,
            dest_pos,
            length,
        })
}

/// Strategy for host descriptors, null ones included.
pub fn host_value_strategy() -> impl Strategy<Value = HostValue> {
    prop_oneof![
        Just(HostValue::default()),
        (any::<u64>(), any::<u64>()).prop_map(|(address, length)| HostValue { address, length }),
    ]
}

/// Strategy for packed dup-fixed data: `(packed, count)`.
pub fn dup_fixed_strategy() -> impl Strategy<Value = (Vec<u8>, usize)> {
    (1usize..=16, 1usize..=32).prop_flat_map(|(element_size, count)| {
        (
            prop::collection::vec(any::<u8>(), element_size * count),
            Just(count),
        )
    })
}

/// Strategy for short keys.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..64)
}

/// Strategy for two values whose lengths differ.
pub fn distinct_length_pair_strategy() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (0usize..256, 0usize..256)
        .prop_filter("lengths must differ", |(first, second)| first != second)
        .prop_flat_map(|(first, second)| {
            (
                prop::collection::vec(any::<u8>(), first),
                prop::collection::vec(any::<u8>(), second),
            )
        })
}

fn directive_strategy() -> impl Strategy<Value = (String, Vec<VectorArg>)> {
    let flags = prop::sample::select(vec!["", "-", "+", " ", "0", "#"]);
    let width = prop::option::of(0usize..40);
    let precision = prop::option::of(0usize..20);
    (flags, width, precision, 0u8..8, any::<i64>(), any::<f64>(), "[a-z ]{0,24}")
        .prop_map(|(flag, width, precision, kind, int, double, text)| {
            let width = width.map_or(String::new(), |w| w.to_string());
            let precision = precision.map_or(String::new(), |p| format!(".{p}"));
            let (conversion, arg) = match kind {
                0 => ("d", VectorArg::Int(int)),
                1 => ("u", VectorArg::Uint(int.unsigned_abs())),
                2 => ("x", VectorArg::Uint(int.unsigned_abs())),
                3 => ("f", VectorArg::Double(double)),
                4 => ("e", VectorArg::Double(double)),
                5 => ("g", VectorArg::Double(double)),
                6 => ("s", VectorArg::Str(text)),
                _ => ("c", VectorArg::Char(b'a' + (int.unsigned_abs() % 26) as u8)),
            };
            (format!("%{flag}{width}{precision}{conversion}"), vec![arg])
        })
}

/// Strategy for valid format strings and matching arguments.
pub fn format_case_strategy() -> impl Strategy<Value = FormatCase> {
    prop::collection::vec(("[a-zA-Z:=, ]{0,8}", directive_strategy()), 0..6).prop_map(|parts| {
        let mut format = String::new();
        let mut args = Vec::new();
        for (literal, (directive, directive_args)) in parts {
            format.push_str(&literal);
            format.push_str(&directive);
            args.extend(directive_args);
        }
        FormatCase { format, args }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn copy_cases_are_in_bounds(case in copy_case_strategy()) {
            prop_assert!(case.source_pos + case.length <= case.source.len());
            prop_assert!(case.dest_pos + case.length <= case.dest_len);
        }

        #[test]
        fn shift_cases_are_in_bounds(case in shift_case_strategy()) {
            prop_assert!(case.source_pos + case.length <= case.buf.len());
            prop_assert!(case.dest_pos + case.length <= case.buf.len());
        }

        #[test]
        fn dup_fixed_splits_evenly((packed, count) in dup_fixed_strategy()) {
            prop_assert_eq!(packed.len() % count, 0);
        }

        #[test]
        fn pair_lengths_differ((first, second) in distinct_length_pair_strategy()) {
            prop_assert_ne!(first.len(), second.len());
        }

        #[test]
        fn format_cases_render(case in format_case_strategy()) {
            let args: Vec<_> = case.args.iter().map(VectorArg::as_format_arg).collect();
            let formatter = kvbridge_core::BoundedFormatter::default();
            prop_assert!(formatter.measure(case.format.as_bytes(), &args).is_ok());
        }
    }
}
